//! Postgres-backed principal store.
//!
//! Query-only adapter: the schema is owned by the deployment, not created
//! here. Expected tables:
//!
//! ```sql
//! CREATE TABLE tenants (
//!     id          UUID PRIMARY KEY,
//!     slug        TEXT NOT NULL,
//!     name        TEXT NOT NULL,
//!     status      TEXT NOT NULL,          -- active | suspended | archived
//!     created_at  TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX tenants_live_slug ON tenants (slug) WHERE status <> 'archived';
//!
//! CREATE TABLE principals (
//!     id                     UUID PRIMARY KEY,
//!     email                  TEXT NOT NULL UNIQUE,
//!     display_name           TEXT NOT NULL,
//!     password_digest        TEXT NOT NULL,
//!     role                   TEXT NOT NULL,
//!     tenant_id              UUID NULL REFERENCES tenants (id),
//!     active                 BOOLEAN NOT NULL,
//!     last_authenticated_at  TIMESTAMPTZ NULL,
//!     created_at             TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed, Io, Tls, ... | N/A | `Unavailable` |
//!
//! Rows that fail to decode (unknown role, invalid email) are reported as
//! `Unavailable`: the store answered with something we cannot trust.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use tessera_auth::store::parse_lookup_slug;
use tessera_auth::{
    Directory, Principal, PrincipalFilter, PrincipalStore, Role, StoreError, StoreResult, Tenant,
    TenantStatus,
};
use tessera_core::{Email, PrincipalId, TenantId, TenantSlug};

const PRINCIPAL_COLUMNS: &str = "id, email, display_name, password_digest, role, tenant_id, \
                                 active, last_authenticated_at, created_at";
const TENANT_COLUMNS: &str = "id, slug, name, status, created_at";

/// Principal store backed by a Postgres connection pool.
///
/// Every operation is a single statement; there are no cross-request
/// transactions.
#[derive(Debug, Clone)]
pub struct PostgresPrincipalStore {
    pool: PgPool,
}

impl PostgresPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    async fn fetch_principal(&self, operation: &str, sql: &str, bind: Uuid) -> StoreResult<Option<Principal>> {
        let row = sqlx::query(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(principal_from_row).transpose()
    }

    async fn fetch_tenant(&self, operation: &str, sql: &str, bind: Uuid) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }
}

#[async_trait]
impl PrincipalStore for PostgresPrincipalStore {
    #[instrument(skip(self), fields(principal_id = %id), err)]
    async fn find_by_id(&self, id: PrincipalId) -> StoreResult<Option<Principal>> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1");
        self.fetch_principal("find_by_id", &sql, *id.as_uuid()).await
    }

    #[instrument(skip_all, err)]
    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<Principal>> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_email", e))?;
        row.as_ref().map(principal_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        let Some(slug) = parse_lookup_slug(slug) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1 \
             ORDER BY (status = 'archived') ASC, created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant_by_slug", e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %id), err)]
    async fn find_tenant_by_id(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");
        self.fetch_tenant("find_tenant_by_id", &sql, *id.as_uuid()).await
    }

    #[instrument(skip(self), fields(principal_id = %id), err)]
    async fn touch_last_authenticated(&self, id: PrincipalId, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE principals SET last_authenticated_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("touch_last_authenticated", e))?;
        Ok(())
    }
}

#[async_trait]
impl Directory for PostgresPrincipalStore {
    #[instrument(skip_all, fields(slug = %tenant.slug), err)]
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        // The NOT EXISTS guard makes live-slug uniqueness hold even without
        // the partial index; the index closes the race between two inserts.
        let sql = format!(
            "INSERT INTO tenants ({TENANT_COLUMNS}) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE $4 = 'archived' OR NOT EXISTS \
                 (SELECT 1 FROM tenants WHERE slug = $2 AND status <> 'archived') \
             RETURNING {TENANT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(tenant.id.as_uuid())
            .bind(tenant.slug.as_str())
            .bind(&tenant.name)
            .bind(tenant.status.as_str())
            .bind(tenant.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_tenant", e))?;
        match row {
            Some(row) => tenant_from_row(&row),
            None => Err(StoreError::Conflict(format!("slug '{}' is taken", tenant.slug))),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %id), err)]
    async fn set_tenant_status(
        &self,
        id: TenantId,
        status: TenantStatus,
    ) -> StoreResult<Option<Tenant>> {
        let sql = format!(
            "UPDATE tenants t SET status = $2 \
             WHERE t.id = $1 AND ($2 = 'archived' OR t.status <> 'archived' OR NOT EXISTS \
                 (SELECT 1 FROM tenants o WHERE o.slug = t.slug AND o.id <> t.id AND o.status <> 'archived')) \
             RETURNING {TENANT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_tenant_status", e))?;
        match row {
            Some(row) => tenant_from_row(&row).map(Some),
            // Either the tenant is unknown or un-archiving would clash on slug.
            None => match self.find_tenant_by_id(id).await? {
                Some(t) => Err(StoreError::Conflict(format!(
                    "slug '{}' is held by another tenant",
                    t.slug
                ))),
                None => Ok(None),
            },
        }
    }

    #[instrument(skip(self), err)]
    async fn rename_tenant(&self, id: TenantId, name: String) -> StoreResult<Option<Tenant>> {
        let sql = format!("UPDATE tenants SET name = $2 WHERE id = $1 RETURNING {TENANT_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(&name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_tenant", e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants ORDER BY created_at, slug");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tenants", e))?;
        rows.iter().map(tenant_from_row).collect()
    }

    #[instrument(skip_all, fields(principal_id = %principal.id), err)]
    async fn insert_principal(&self, principal: Principal) -> StoreResult<Principal> {
        let sql = format!(
            "INSERT INTO principals ({PRINCIPAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(principal.id.as_uuid())
            .bind(principal.email.as_str())
            .bind(&principal.display_name)
            .bind(&principal.password_digest)
            .bind(principal.role.as_str())
            .bind(principal.tenant_id.map(Uuid::from))
            .bind(principal.active)
            .bind(principal.last_authenticated_at)
            .bind(principal.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_principal", e))?;
        principal_from_row(&row)
    }

    #[instrument(skip(self), fields(principal_id = %id), err)]
    async fn set_active(&self, id: PrincipalId, active: bool) -> StoreResult<Option<Principal>> {
        let sql = format!(
            "UPDATE principals SET active = $2 WHERE id = $1 RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_active", e))?;
        row.as_ref().map(principal_from_row).transpose()
    }

    #[instrument(skip(self), fields(principal_id = %id), err)]
    async fn set_role(
        &self,
        id: PrincipalId,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> StoreResult<Option<Principal>> {
        let sql = format!(
            "UPDATE principals SET role = $2, tenant_id = $3 WHERE id = $1 \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(role.as_str())
            .bind(tenant_id.map(Uuid::from))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_role", e))?;
        row.as_ref().map(principal_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_principals(&self, filter: PrincipalFilter) -> StoreResult<Vec<Principal>> {
        let sql = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals \
             WHERE ($1::uuid IS NULL OR tenant_id = $1) AND ($2::text IS NULL OR role = $2) \
             ORDER BY email"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.tenant_id.map(Uuid::from))
            .bind(filter.role.map(|r| r.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_principals", e))?;
        rows.iter().map(principal_from_row).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn principal_from_row(row: &PgRow) -> StoreResult<Principal> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode principal", e);
    let email: String = row.try_get("email").map_err(decode)?;
    let role: String = row.try_get("role").map_err(decode)?;
    let tenant_id: Option<Uuid> = row.try_get("tenant_id").map_err(decode)?;

    Ok(Principal {
        id: PrincipalId::from_uuid(row.try_get("id").map_err(decode)?),
        email: Email::parse(&email).map_err(corrupt)?,
        display_name: row.try_get("display_name").map_err(decode)?,
        password_digest: row.try_get("password_digest").map_err(decode)?,
        role: role.parse::<Role>().map_err(corrupt)?,
        tenant_id: tenant_id.map(TenantId::from_uuid),
        active: row.try_get("active").map_err(decode)?,
        last_authenticated_at: row.try_get("last_authenticated_at").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn tenant_from_row(row: &PgRow) -> StoreResult<Tenant> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode tenant", e);
    let slug: String = row.try_get("slug").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    Ok(Tenant {
        id: TenantId::from_uuid(row.try_get("id").map_err(decode)?),
        slug: TenantSlug::parse(&slug).map_err(corrupt)?,
        name: row.try_get("name").map_err(decode)?,
        status: status.parse::<TenantStatus>().map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn corrupt(err: impl core::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("corrupt row: {err}"))
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
