//! Blacklist module
//!
//! IP addresses and user agents whose views are never counted.

mod registry;

pub use registry::BlacklistRegistry;
