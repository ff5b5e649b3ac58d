//! Configuration for EaseForm
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// EaseForm - privacy-first form builder backend
#[derive(Parser, Debug, Clone)]
#[command(name = "easeform")]
#[command(about = "Privacy-first form builder backend")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Supabase project URL (PostgREST and auth live under it)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Anon API key for the scoped (row-level-security-checked) channel
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: String,

    /// Service-role key for the privileged channel (bypasses row-level security)
    #[arg(long, env = "SUPABASE_SERVICE_KEY")]
    pub supabase_service_key: String,

    /// HS256 secret for verifying Supabase access tokens locally
    #[arg(long, env = "SUPABASE_JWT_SECRET")]
    pub supabase_jwt_secret: Option<String>,

    /// Frontend origin allowed by CORS
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:8080")]
    pub frontend_url: String,

    /// Deployment environment (development or production)
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Path prefix for the API routes
    #[arg(long, env = "API_PREFIX", default_value = "/api")]
    pub api_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Storage request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Whether this instance runs in the development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get effective JWT secret (uses a default in development)
    pub fn jwt_secret(&self) -> String {
        if self.is_development() {
            self.supabase_jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.supabase_jwt_secret
                .clone()
                .expect("SUPABASE_JWT_SECRET is required in production")
        }
    }

    /// Origins allowed by CORS: localhost defaults, the configured
    /// frontend, and extra dev-server ports in development only.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![
            "http://localhost:8080".to_string(),
            "http://127.0.0.1:8080".to_string(),
        ];

        if !origins.contains(&self.frontend_url) {
            origins.push(self.frontend_url.clone());
        }

        if self.is_development() {
            origins.extend([
                "http://localhost:5500".to_string(),
                "http://127.0.0.1:5500".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ]);
        }

        origins
    }

    /// Whether the given Origin header value may receive CORS headers
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins().iter().any(|o| o == origin)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.supabase_url.is_empty() {
            return Err("SUPABASE_URL must be set".to_string());
        }

        if self.supabase_anon_key.is_empty() {
            return Err("SUPABASE_ANON_KEY must be set".to_string());
        }

        if self.supabase_service_key.is_empty() {
            return Err("SUPABASE_SERVICE_KEY must be set".to_string());
        }

        if !self.is_development() && self.supabase_jwt_secret.is_none() {
            return Err("SUPABASE_JWT_SECRET is required in production".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            listen: "0.0.0.0:8000".parse().unwrap(),
            supabase_url: "https://project.supabase.co".into(),
            supabase_anon_key: "anon".into(),
            supabase_service_key: "service".into(),
            supabase_jwt_secret: Some("secret".into()),
            frontend_url: "https://forms.example.com".into(),
            environment: "production".into(),
            api_prefix: "/api".into(),
            log_level: "info".into(),
            request_timeout_ms: 30000,
        }
    }

    #[test]
    fn test_dev_origins_only_in_development() {
        let mut args = base_args();
        assert!(!args.origin_allowed("http://localhost:3000"));

        args.environment = "development".into();
        assert!(args.origin_allowed("http://localhost:3000"));
    }

    #[test]
    fn test_frontend_url_always_allowed() {
        let args = base_args();
        assert!(args.origin_allowed("https://forms.example.com"));
        assert!(args.origin_allowed("http://localhost:8080"));
        assert!(!args.origin_allowed("https://evil.example.com"));
    }

    #[test]
    fn test_validate_requires_jwt_secret_in_production() {
        let mut args = base_args();
        args.supabase_jwt_secret = None;
        assert!(args.validate().is_err());

        args.environment = "development".into();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_keys() {
        let mut args = base_args();
        args.supabase_service_key = String::new();
        assert!(args.validate().is_err());
    }
}
