//! Shared types for EaseForm

pub mod error;

pub use error::{EaseformError, Result};
