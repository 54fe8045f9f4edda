//! Domain module
//!
//! Core domain types: content references, visitors, hits and periods.

pub mod content;
pub mod error;
pub mod hit;
pub mod period;
pub mod visitor;

pub use content::ContentRef;
pub use error::DomainError;
pub use hit::{Hit, HitCount, NewHit};
pub use period::{Period, PeriodBuilder, PeriodError};
pub use visitor::{Visitor, VisitorMatch};
