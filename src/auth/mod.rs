//! Authentication for EaseForm
//!
//! Provides:
//! - Bearer token extraction from request headers
//! - Local HS256 validation of Supabase access tokens
//! - The `Principal` identity used by authorization decisions

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, Principal};
