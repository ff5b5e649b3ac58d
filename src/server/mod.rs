//! HTTP server for EaseForm

pub mod http;

pub use http::{run, AppState};
