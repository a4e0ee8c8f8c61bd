//! `tessera-auth` — authentication and tenant-scoped authorization (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and from any concrete
//! storage: persistence is reached through the traits in [`store`].

pub mod admin;
pub mod authorize;
pub mod claims;
pub mod config;
pub mod error;
pub mod login;
pub mod password;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod tenant;
pub mod token;
pub mod user;

pub use admin::{Administration, DirectoryStats, NewMember, NewTenant, Page, TenantDetail};
pub use authorize::{Access, AccessGuard};
pub use claims::{Claims, TokenSubject, validate_claims};
pub use config::{Argon2Config, AuthConfig};
pub use error::{AuthError, HashError, StoreError, TokenError};
pub use login::{Authenticator, LoginOutcome};
pub use password::PasswordHasher;
pub use principal::{Principal, PrincipalSummary};
pub use resolver::{TenantCandidate, TenantResolver};
pub use roles::{Capability, Role};
pub use store::{Directory, PrincipalFilter, PrincipalStore, Store, StoreResult};
pub use tenant::{Tenant, TenantStatus};
pub use token::{IssuedToken, TokenCodec};
pub use user::NewPrincipal;
