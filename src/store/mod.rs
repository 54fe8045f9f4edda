//! Store module
//!
//! Persistence layer for hit counts, hits and blacklists.
//! `HitBackend` is the storage seam; PostgreSQL is the production backend and
//! the in-memory backend serves tests and single-process embedding.

mod backend;
mod error;
mod memory;
mod postgres;

pub use backend::HitBackend;
pub use error::StoreError;
pub use memory::MemoryHitBackend;
pub use postgres::PgHitBackend;
