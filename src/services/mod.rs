//! Core services for EaseForm
//!
//! The submission and access-control layer: lifecycle state, device
//! fingerprinting, submission dedup, ownership resolution, and response
//! projection. Everything else in the crate is I/O glue around these.

pub mod fingerprint;
pub mod lifecycle;
pub mod ownership;
pub mod projection;
pub mod submission;

pub use fingerprint::device_fingerprint;
pub use lifecycle::AcceptanceState;
pub use ownership::{require_owned, Owned, OwnerDirectory, OwnershipResolver, Resource};
pub use projection::{normalize, ResponseView};
pub use submission::{try_submit, SubmissionStore};
