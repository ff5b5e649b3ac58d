//! Supabase access-token validation
//!
//! Access tokens are HS256 JWTs issued by the auth collaborator; `sub`
//! carries the host id. They are verified locally against the shared
//! secret instead of round-tripping to the auth service on every request.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::types::{EaseformError, Result};

/// Claims carried by a Supabase access token
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated host id
    pub sub: String,
    /// Expiry in seconds since epoch, checked by the validator
    pub exp: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// The acting identity behind a management request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validates Supabase access tokens
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Supabase sets aud = "authenticated"; not meaningful here
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and resolve the principal behind it
    pub fn verify(&self, token: &str) -> Result<Principal> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;

        let id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            EaseformError::Unauthenticated("token subject is not a valid host id".into())
        })?;

        Ok(Principal {
            id,
            email: data.claims.email,
        })
    }
}
