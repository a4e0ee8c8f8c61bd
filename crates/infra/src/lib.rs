//! Infrastructure layer: principal store adapters.

pub mod principal_store;

pub use principal_store::{InMemoryPrincipalStore, PostgresPrincipalStore};
