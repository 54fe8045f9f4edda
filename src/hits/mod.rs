//! Hits module
//!
//! The append-only log of individual views. Each insert or delete here moves
//! the owning hit count in the same transaction.

mod service;

pub use service::HitStore;
