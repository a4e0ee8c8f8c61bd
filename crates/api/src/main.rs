use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use tessera_api::app::{AppServices, build_app};
use tessera_api::config::{ApiConfig, BootstrapAdmin};
use tessera_auth::{NewPrincipal, Role, Store};
use tessera_infra::{InMemoryPrincipalStore, PostgresPrincipalStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("invalid configuration")?;
    tessera_observability::init(config.log_format);

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PostgresPrincipalStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to postgres")?;
            tracing::info!("using postgres principal store");
            if config.bootstrap_admin.is_some() {
                tracing::warn!("bootstrap admin is ignored with a postgres store");
            }
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory principal store");
            Arc::new(InMemoryPrincipalStore::new())
        }
    };

    let services = Arc::new(AppServices::new(store, &config.auth).context("failed to build services")?);

    if let (None, Some(admin)) = (&config.database_url, &config.bootstrap_admin) {
        bootstrap_admin(&services, admin).await?;
    }

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn bootstrap_admin(services: &AppServices, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    let created = services
        .admin
        .create_principal(NewPrincipal {
            email: admin.email.clone(),
            display_name: "Platform Admin".to_string(),
            password: admin.password.expose_secret().to_string(),
            role: Role::PlatformAdmin,
            tenant_id: None,
        })
        .await
        .context("failed to create bootstrap admin")?;
    tracing::info!(principal_id = %created.id, "bootstrap admin created");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
