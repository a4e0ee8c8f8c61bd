use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use tessera_api::app::{AppServices, build_app};
use tessera_auth::{Argon2Config, AuthConfig, NewPrincipal, NewTenant, Page, Role, Tenant};
use tessera_infra::InMemoryPrincipalStore;

const PASSWORD: &str = "Password1";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    acme: Tenant,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let mut config = AuthConfig::new("black-box-secret-black-box-secret!");
        config.argon2 = Argon2Config {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        let services = Arc::new(
            AppServices::new(Arc::new(InMemoryPrincipalStore::new()), &config)
                .expect("failed to build services"),
        );

        let acme = seed(&services).await;

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            acme,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str) -> String {
        let res = reqwest::Client::new()
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login as {email}");
        let body: Value = res.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// root (platform admin), acme with an owner and a staff member, othertenant
/// with one staff member.
async fn seed(services: &AppServices) -> Tenant {
    let admin = &services.admin;
    let user = |email: &str, role: Role, tenant: Option<&Tenant>| NewPrincipal {
        email: email.to_string(),
        display_name: email.to_string(),
        password: PASSWORD.to_string(),
        role,
        tenant_id: tenant.map(|t| t.id),
    };

    admin
        .create_principal(user("root@platform.test", Role::PlatformAdmin, None))
        .await
        .unwrap();
    let acme = admin
        .create_tenant(NewTenant {
            slug: "acme".into(),
            name: "Acme Inc".into(),
        })
        .await
        .unwrap();
    let other = admin
        .create_tenant(NewTenant {
            slug: "othertenant".into(),
            name: "Other".into(),
        })
        .await
        .unwrap();
    for (email, role, tenant) in [
        ("owner@acme.test", Role::TenantOwner, &acme),
        ("staff@acme.test", Role::TenantStaff, &acme),
        ("staff@other.test", Role::TenantStaff, &other),
    ] {
        admin.create_principal(user(email, role, Some(tenant))).await.unwrap();
    }
    acme
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/api/auth/me", "/api/admin/tenants", "/api/companies/acme"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(res.headers()["www-authenticate"], "Bearer");
    }

    let res = srv.get("/api/auth/me", "not-a-token").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_returns_token_and_user() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "email": "Owner@Acme.test", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().unwrap().split('.').count() == 3);
    assert!(body["expires_at"].is_string());
    assert_eq!(body["user"]["email"], "owner@acme.test");
    assert_eq!(body["user"]["role"], "tenant_owner");
    assert_eq!(body["user"]["tenant_slug"], "acme");
    assert_eq!(body["user"]["tenant_id"], srv.acme.id.to_string());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut bodies = Vec::new();
    for (email, password) in [
        ("owner@acme.test", "Wrong1234"),
        ("nobody@acme.test", PASSWORD),
    ] {
        let res = client
            .post(srv.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        bodies.push(res.text().await.unwrap());
    }

    assert_eq!(bodies[0], bodies[1]);
    let body: Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(
        body,
        json!({ "error": "unauthenticated", "message": "invalid email or password" })
    );
}

#[tokio::test]
async fn me_and_logout() {
    let srv = TestServer::spawn().await;
    let token = srv.login("staff@acme.test").await;

    let res = srv.get("/api/auth/me", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["email"], "staff@acme.test");
    assert_eq!(me["tenant_slug"], "acme");
    assert_eq!(me["active"], true);

    let res = srv.post("/api/auth/logout", &token, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenant_isolation_maps_to_403_and_404() {
    let srv = TestServer::spawn().await;
    let token = srv.login("owner@acme.test").await;

    let res = srv.get("/api/companies/acme", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let tenant: Value = res.json().await.unwrap();
    assert_eq!(tenant["slug"], "acme");
    assert_eq!(tenant["status"], "active");

    let res = srv.get("/api/companies/othertenant", &token).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = srv.get("/api/companies/doesnotexist/users", &token).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn platform_admin_reads_any_tenant() {
    let srv = TestServer::spawn().await;
    let token = srv.login("root@platform.test").await;

    for slug in ["acme", "othertenant"] {
        let res = srv.get(&format!("/api/companies/{slug}/users"), &token).await;
        assert_eq!(res.status(), StatusCode::OK, "{slug}");
    }
    let res = srv.get("/api/companies/acme/users", &token).await;
    let members: Value = res.json().await.unwrap();
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn member_management_inside_a_tenant() {
    let srv = TestServer::spawn().await;
    let staff = srv.login("staff@acme.test").await;
    let owner = srv.login("owner@acme.test").await;

    let new_user = json!({
        "email": "hire@acme.test",
        "display_name": "New Hire",
        "password": PASSWORD,
        "role": "tenant_staff",
    });

    let res = srv.post("/api/companies/acme/users", &staff, new_user.clone()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.post("/api/companies/acme/users", &owner, new_user.clone()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let hire: Value = res.json().await.unwrap();
    assert_eq!(hire["tenant_slug"], "acme");

    let res = srv.post("/api/companies/acme/users", &owner, new_user).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .post(
            "/api/companies/acme/users",
            &owner,
            json!({
                "email": "boss@acme.test",
                "display_name": "Boss",
                "password": PASSWORD,
                "role": "platform_admin",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let id = hire["id"].as_str().unwrap();
    let res = srv
        .post(&format!("/api/companies/acme/users/{id}/deactivate"), &owner, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn admin_routes_require_platform_role() {
    let srv = TestServer::spawn().await;
    let owner = srv.login("owner@acme.test").await;
    let res = srv.get("/api/admin/tenants", &owner).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let root = srv.login("root@platform.test").await;
    let res = srv.get("/api/admin/tenants", &root).await;
    assert_eq!(res.status(), StatusCode::OK);
    let tenants: Value = res.json().await.unwrap();
    assert_eq!(tenants.as_array().unwrap().len(), 2);

    let res = srv.get("/api/admin/users?role=tenant_staff", &root).await;
    assert_eq!(res.status(), StatusCode::OK);
    let staff: Value = res.json().await.unwrap();
    assert_eq!(staff.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_tenant_lifecycle() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;

    let res = srv
        .post("/api/admin/tenants", &root, json!({ "slug": "globex", "name": "Globex" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let globex: Value = res.json().await.unwrap();

    let res = srv
        .post("/api/admin/tenants", &root, json!({ "slug": "globex", "name": "Again" }))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .post("/api/admin/tenants", &root, json!({ "slug": "Bad Slug", "name": "Bad" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let id = globex["id"].as_str().unwrap();
    let res = reqwest::Client::new()
        .patch(srv.url(&format!("/api/admin/tenants/{id}/status")))
        .bearer_auth(&root)
        .json(&json!({ "status": "archived" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get("/api/companies/globex", &root).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deactivated_user_is_locked_out_on_next_request() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;
    let staff = srv.login("staff@acme.test").await;
    assert_eq!(srv.get("/api/auth/me", &staff).await.status(), StatusCode::OK);

    let me: Value = srv.get("/api/auth/me", &staff).await.json().await.unwrap();
    let id = me["id"].as_str().unwrap();
    let res = srv
        .post(&format!("/api/admin/users/{id}/deactivate"), &root, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(
        srv.get("/api/auth/me", &staff).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn role_change_is_enforced_immediately() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;
    let owner = srv.login("owner@acme.test").await;

    let me: Value = srv.get("/api/auth/me", &owner).await.json().await.unwrap();
    let id = me["id"].as_str().unwrap();

    let res = reqwest::Client::new()
        .put(srv.url(&format!("/api/admin/users/{id}/role")))
        .bearer_auth(&root)
        .json(&json!({ "role": "tenant_staff" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post(
            "/api/companies/acme/users",
            &owner,
            json!({
                "email": "late@acme.test",
                "display_name": "Late",
                "password": PASSWORD,
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn store_seeded_through_services_is_visible_over_http() {
    let srv = TestServer::spawn().await;
    let tenants = srv.services.admin.list_tenants(Page::default()).await.unwrap();
    assert!(tenants.iter().any(|t| t.id == srv.acme.id));
}

#[tokio::test]
async fn legacy_role_names_are_accepted_in_bodies() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;

    let res = srv
        .post(
            "/api/admin/users",
            &root,
            json!({
                "email": "ops@platform.test",
                "display_name": "Ops",
                "password": PASSWORD,
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["role"], "platform_admin");

    let owner = srv.login("owner@acme.test").await;
    let res = srv
        .post(
            "/api/companies/acme/users",
            &owner,
            json!({
                "email": "crew@acme.test",
                "display_name": "Crew",
                "password": PASSWORD,
                "role": "company_staff",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["role"], "tenant_staff");
}

#[tokio::test]
async fn malformed_requests_get_json_error_bodies() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;

    let res = srv
        .post("/api/admin/users/not-a-uuid/deactivate", &root, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
    assert!(body["message"].is_string());

    let res = srv
        .post("/api/admin/tenants", &root, json!({ "slug": "nameless" }))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    let res = srv.get("/api/admin/users?limit=lots", &root).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    let res = reqwest::Client::new()
        .post(srv.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn admin_tenant_detail_rename_and_archive() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;
    let path = format!("/api/admin/tenants/{}", srv.acme.id);

    let res = srv.get(&path, &root).await;
    assert_eq!(res.status(), StatusCode::OK);
    let detail: Value = res.json().await.unwrap();
    assert_eq!(detail["slug"], "acme");
    assert_eq!(detail["user_count"], 2);

    let res = reqwest::Client::new()
        .put(srv.url(&path))
        .bearer_auth(&root)
        .json(&json!({ "name": "Acme Tiles" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renamed: Value = res.json().await.unwrap();
    assert_eq!(renamed["name"], "Acme Tiles");
    assert_eq!(renamed["slug"], "acme");

    let res = reqwest::Client::new()
        .delete(srv.url(&path))
        .bearer_auth(&root)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let archived: Value = res.json().await.unwrap();
    assert_eq!(archived["status"], "archived");

    assert_eq!(
        srv.get("/api/companies/acme", &root).await.status(),
        StatusCode::NOT_FOUND
    );
    let res = srv
        .get("/api/admin/tenants/00000000-0000-0000-0000-000000000000", &root)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_stats_and_pagination() {
    let srv = TestServer::spawn().await;
    let root = srv.login("root@platform.test").await;

    let res = srv.get("/api/admin/dashboard/stats", &root).await;
    assert_eq!(res.status(), StatusCode::OK);
    let stats: Value = res.json().await.unwrap();
    assert_eq!(
        stats,
        json!({
            "total_tenants": 2,
            "active_tenants": 2,
            "total_users": 4,
            "active_users": 4,
        })
    );

    let res = srv.get("/api/admin/users?skip=1&limit=2", &root).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page.as_array().unwrap().len(), 2);

    let res = srv.get("/api/admin/tenants?limit=1", &root).await;
    let tenants: Value = res.json().await.unwrap();
    assert_eq!(tenants.as_array().unwrap().len(), 1);

    let res = srv.get("/api/admin/users?limit=0", &root).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let owner = srv.login("owner@acme.test").await;
    assert_eq!(
        srv.get("/api/admin/dashboard/stats", &owner).await.status(),
        StatusCode::FORBIDDEN
    );
}
