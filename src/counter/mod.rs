//! Counter module
//!
//! Runs each view through the blacklist and dedup checks before it is
//! recorded.

mod hit_counter;
mod request;


pub use hit_counter::HitCounter;
pub use request::{Rejection, ViewOutcome, ViewRequest};
