//! Host profiles
//!
//! Hosts are provisioned lazily: the auth collaborator knows about a
//! principal before this backend does, so the owning `hosts` row is
//! created on first use.

pub mod profile;

pub use profile::ensure_profile;
