//! Storage collaborator access
//!
//! Two HTTP channels against the same PostgREST surface: scoped
//! (row-level security applies) and privileged (bypasses it). Record
//! shapes for the `forms`, `responses`, and `hosts` tables live in
//! `records`.

pub mod postgrest;
pub mod records;

pub use postgrest::{eq, PrivilegedClient, ScopedClient};
pub use records::{
    FormListItem, FormRecord, HostRecord, LifecycleFlags, Question, FORM_TABLE, HOST_TABLE,
    RESPONSE_TABLE,
};
