//! Principal store implementations.
//!
//! - `in_memory`: `RwLock`-guarded maps for tests/dev
//! - `postgres`: query-only adapter over a `sqlx` pool

mod in_memory;
mod postgres;

pub use in_memory::InMemoryPrincipalStore;
pub use postgres::PostgresPrincipalStore;
