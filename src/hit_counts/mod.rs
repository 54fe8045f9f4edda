//! Hit counts module
//!
//! One running total per content object, plus windowed counts read from the
//! hit log.

mod service;

pub use service::HitCountStore;
