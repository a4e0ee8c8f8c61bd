//! `tessera-core` — identifiers and validated values shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{PrincipalId, TenantId};
pub use value_object::{Email, TenantSlug};
