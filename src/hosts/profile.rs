//! Host-profile bootstrap
//!
//! A form row carries a foreign key to its owning host. The first form a
//! principal creates may arrive before any `hosts` row exists, so the
//! create path ensures one first. The check and insert run on the
//! privileged channel: a brand-new principal has no row the scoped
//! channel could see.

use tracing::info;

use crate::auth::Principal;
use crate::db::{eq, HostRecord, PrivilegedClient, HOST_TABLE};
use crate::types::{EaseformError, Result};

/// Ensure the principal's host row exists before a form insert.
///
/// Failure here must abort the caller's create: inserting a form without
/// a valid owner reference would break the ownership invariant.
pub async fn ensure_profile(privileged: &PrivilegedClient, principal: &Principal) -> Result<()> {
    let existing = privileged
        .select_one(HOST_TABLE, &[eq("id", principal.id)], "id")
        .await
        .map_err(bootstrap_error)?;

    if existing.is_some() {
        return Ok(());
    }

    info!(host = %principal.id, "host profile missing, creating one");

    let email = placeholder_email(principal);
    let profile = HostRecord {
        id: principal.id,
        name: display_name(&email),
        email,
        active_forms_count: 0,
    };

    let row = serde_json::to_value(&profile).map_err(|e| EaseformError::Bootstrap(e.to_string()))?;
    privileged
        .insert(HOST_TABLE, &row)
        .await
        .map_err(bootstrap_error)?;

    Ok(())
}

fn bootstrap_error(err: EaseformError) -> EaseformError {
    EaseformError::Bootstrap(err.to_string())
}

/// Token email, or a placeholder when the token carries none
fn placeholder_email(principal: &Principal) -> String {
    principal
        .email
        .clone()
        .unwrap_or_else(|| format!("{}@placeholder.local", principal.id))
}

/// Local part of the email doubles as the initial display name
fn display_name(email: &str) -> String {
    email.split('@').next().unwrap_or("host").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_display_name_is_email_local_part() {
        assert_eq!(display_name("ada@example.com"), "ada");
        assert_eq!(display_name("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_placeholder_email_when_token_has_none() {
        let principal = Principal {
            id: Uuid::from_u128(5),
            email: None,
        };
        let email = placeholder_email(&principal);
        assert_eq!(email, format!("{}@placeholder.local", principal.id));

        let named = Principal {
            id: Uuid::from_u128(5),
            email: Some("ada@example.com".into()),
        };
        assert_eq!(placeholder_email(&named), "ada@example.com");
    }
}
