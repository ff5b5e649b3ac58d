//! Ownership resolution
//!
//! The storage layer reports "no rows" both when a resource is missing
//! and when row-level security hides it from the caller. Every
//! owner-scoped operation threads through this resolver, which settles
//! that ambiguity with a privileged owner lookup:
//!
//! - nothing there either: the resource does not exist
//! - owner matches the caller: the scoped denial was spurious (a
//!   freshly-created owning row may not be visible to the per-row check
//!   yet), so the same operation is retried on the privileged channel
//! - owner differs: forbidden, surfaced to the caller as not-found
//!
//! The resolver owns the privileged channel and lends it to the retry
//! closure; together with the host-profile bootstrap it is the only
//! holder of that capability.

use async_trait::async_trait;
use std::future::Future;
use tracing::warn;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::{eq, PrivilegedClient, FORM_TABLE, RESPONSE_TABLE};
use crate::types::{EaseformError, Result};

/// Outcome of an owner-scoped operation
#[derive(Debug)]
pub enum Owned<T> {
    Authorized(T),
    NotFound,
    /// The resource exists and belongs to someone else. Surfaced as
    /// not-found at the boundary; the variant survives for logging.
    Forbidden,
}

/// Resource kinds the resolver can look up owners for
#[derive(Debug, Clone, Copy)]
pub enum Resource {
    Form(Uuid),
    Response(Uuid),
}

/// Privileged owner lookups. Implemented by the privileged channel;
/// tests substitute an in-memory directory.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn owner_of(&self, resource: Resource) -> Result<Option<Uuid>>;
}

pub struct OwnershipResolver<D> {
    directory: D,
}

impl<D: OwnerDirectory> OwnershipResolver<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Run one owner-scoped operation to a three-way outcome.
    ///
    /// `primary` is the operation on the caller's scoped channel,
    /// yielding the affected row or `None`. `retry` rebuilds the same
    /// operation against the directory's privileged channel and only
    /// runs after the owner lookup has confirmed the caller.
    pub async fn resolve<'a, T, PF, R, RF>(
        &'a self,
        resource: Resource,
        principal: &Principal,
        primary: PF,
        retry: R,
    ) -> Result<Owned<T>>
    where
        PF: Future<Output = Result<Option<T>>>,
        R: FnOnce(&'a D) -> RF,
        RF: Future<Output = Result<Option<T>>> + 'a,
    {
        if let Some(row) = primary.await? {
            return Ok(Owned::Authorized(row));
        }

        match self.directory.owner_of(resource).await? {
            None => Ok(Owned::NotFound),
            Some(owner) if owner == principal.id => {
                warn!(
                    ?resource,
                    host = %principal.id,
                    "scoped operation returned no rows for the owner, retrying privileged"
                );
                match retry(&self.directory).await? {
                    Some(row) => Ok(Owned::Authorized(row)),
                    // Deleted between the two checks
                    None => Ok(Owned::NotFound),
                }
            }
            Some(_) => Ok(Owned::Forbidden),
        }
    }
}

/// Collapse an outcome into the boundary error shape. Foreign and
/// missing resources produce byte-identical messages.
pub fn require_owned<T>(outcome: Owned<T>, message: &str) -> Result<T> {
    match outcome {
        Owned::Authorized(row) => Ok(row),
        Owned::NotFound => Err(EaseformError::NotFound(message.to_string())),
        Owned::Forbidden => Err(EaseformError::Forbidden(message.to_string())),
    }
}

fn uuid_field(row: &serde_json::Value, key: &str) -> Option<Uuid> {
    row.get(key)?.as_str()?.parse().ok()
}

#[async_trait]
impl OwnerDirectory for PrivilegedClient {
    async fn owner_of(&self, resource: Resource) -> Result<Option<Uuid>> {
        match resource {
            Resource::Form(id) => {
                let row = self.select_one(FORM_TABLE, &[eq("id", id)], "host_id").await?;
                Ok(row.as_ref().and_then(|r| uuid_field(r, "host_id")))
            }
            Resource::Response(id) => {
                // A response is owned through its parent form
                let Some(row) = self
                    .select_one(RESPONSE_TABLE, &[eq("id", id)], "form_id")
                    .await?
                else {
                    return Ok(None);
                };
                let Some(form_id) = uuid_field(&row, "form_id") else {
                    return Ok(None);
                };
                let form = self
                    .select_one(FORM_TABLE, &[eq("id", form_id)], "host_id")
                    .await?;
                Ok(form.as_ref().and_then(|r| uuid_field(r, "host_id")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MemoryDirectory {
        owners: HashMap<Uuid, Uuid>,
        lookups: AtomicUsize,
    }

    impl MemoryDirectory {
        fn new(entries: &[(Uuid, Uuid)]) -> Self {
            Self {
                owners: entries.iter().copied().collect(),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OwnerDirectory for MemoryDirectory {
        async fn owner_of(&self, resource: Resource) -> Result<Option<Uuid>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let (Resource::Form(id) | Resource::Response(id)) = resource;
            Ok(self.owners.get(&id).copied())
        }
    }

    fn principal(n: u128) -> Principal {
        Principal {
            id: Uuid::from_u128(n),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_the_directory() {
        let resolver = OwnershipResolver::new(MemoryDirectory::new(&[]));

        let outcome = resolver
            .resolve(
                Resource::Form(Uuid::from_u128(1)),
                &principal(10),
                async { Ok(Some("row")) },
                |_| async { panic!("retry must not run") },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Owned::Authorized("row")));
        assert_eq!(resolver.directory.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_everywhere_is_not_found() {
        let resolver = OwnershipResolver::new(MemoryDirectory::new(&[]));

        let outcome = resolver
            .resolve(
                Resource::Form(Uuid::from_u128(1)),
                &principal(10),
                async { Ok(None::<&str>) },
                |_| async { Ok(None) },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Owned::NotFound));
    }

    #[tokio::test]
    async fn test_spurious_scoped_denial_retries_privileged() {
        let form = Uuid::from_u128(1);
        let resolver =
            OwnershipResolver::new(MemoryDirectory::new(&[(form, Uuid::from_u128(10))]));

        let outcome = resolver
            .resolve(
                Resource::Form(form),
                &principal(10),
                async { Ok(None) },
                |_| async { Ok(Some("retried row")) },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Owned::Authorized("retried row")));
    }

    #[tokio::test]
    async fn test_foreign_owner_is_forbidden() {
        let form = Uuid::from_u128(1);
        let resolver =
            OwnershipResolver::new(MemoryDirectory::new(&[(form, Uuid::from_u128(99))]));

        let outcome = resolver
            .resolve(
                Resource::Form(form),
                &principal(10),
                async { Ok(None::<&str>) },
                |_| async { panic!("retry must not run for a foreign owner") },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Owned::Forbidden));
    }

    #[tokio::test]
    async fn test_row_vanishing_between_checks_is_not_found() {
        let form = Uuid::from_u128(1);
        let resolver =
            OwnershipResolver::new(MemoryDirectory::new(&[(form, Uuid::from_u128(10))]));

        let outcome = resolver
            .resolve(
                Resource::Form(form),
                &principal(10),
                async { Ok(None::<&str>) },
                |_| async { Ok(None) },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Owned::NotFound));
    }

    #[test]
    fn test_require_owned_masks_forbidden_as_not_found() {
        let missing = require_owned(
            Owned::<()>::NotFound,
            "Form not found or permission denied",
        )
        .unwrap_err();
        let foreign = require_owned(
            Owned::<()>::Forbidden,
            "Form not found or permission denied",
        )
        .unwrap_err();

        assert_eq!(missing.status_code(), foreign.status_code());
        assert_eq!(missing.to_string(), foreign.to_string());
    }
}
