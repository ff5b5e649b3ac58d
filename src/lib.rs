//! EaseForm - privacy-first form builder backend
//!
//! Hosts create forms, respondents answer anonymously, hosts read the
//! aggregated responses. Persistence and credential issuance live in an
//! external Supabase-style service (PostgREST + row-level security);
//! this crate implements the layer that actually carries design weight:
//!
//! ## Services
//!
//! - **Lifecycle**: derived open/closed/draft acceptance state per form
//! - **Fingerprint**: deterministic per-form device identity for anonymous dedup
//! - **Submission**: one accepted response per (form, device) pair
//! - **Ownership**: two-tier scoped/privileged authorization resolver
//! - **Projection**: normalization of stored response rows for owners

pub mod auth;
pub mod config;
pub mod db;
pub mod hosts;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{EaseformError, Result};
