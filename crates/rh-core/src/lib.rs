//! rh-core: stable foundation for the radiant-heat workspace.
//!
//! Contains:
//! - reading (explicit optional sensor samples)
//! - ids (opaque host-facing sensor/relay identifiers)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod reading;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use reading::Reading;
