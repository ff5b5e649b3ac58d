//! PostgREST client channels
//!
//! The storage collaborator is a Supabase-style PostgREST service. Every
//! operation goes through one of two channels:
//!
//! - [`ScopedClient`]: anon API key plus (for authenticated calls) the
//!   caller's access token. The storage layer's row-level security
//!   decides which rows are visible.
//! - [`PrivilegedClient`]: service-role key, row visibility unchecked.
//!   Handed only to the ownership resolver and the host-profile
//!   bootstrap; nothing else may hold one.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::Args;
use crate::types::{EaseformError, Result};

/// Build an `eq.` filter on one column
pub fn eq(column: &str, value: impl ToString) -> (String, String) {
    (column.to_string(), format!("eq.{}", value.to_string()))
}

/// One authenticated connection to the PostgREST surface
#[derive(Clone)]
struct Channel {
    http: reqwest::Client,
    base: String,
    api_key: String,
    bearer: Option<String>,
}

impl Channel {
    fn table_url(&self, table: &str, params: &[(String, String)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base, table);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// Issue one request and return the affected rows.
    ///
    /// Mutations carry `Prefer: return=representation` so an empty row
    /// set is observable (the row-level permission engine reports denial
    /// and absence identically, as no rows).
    async fn execute(
        &self,
        method: Method,
        table: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Vec<Value>> {
        let url = self.table_url(table, params);
        debug!(%method, %url, "storage request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("apikey", &self.api_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.bearer.as_deref().unwrap_or(&self.api_key)),
            );

        if method != Method::GET {
            request = request.header("Prefer", "return=representation");
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EaseformError::Storage(format!(
                "{} {} returned {}: {}",
                method, table, status, detail
            )));
        }

        let rows: Value = response.json().await?;
        match rows {
            Value::Array(rows) => Ok(rows),
            // PostgREST answers a bare object for single-object requests
            other => Ok(vec![other]),
        }
    }

    async fn select(
        &self,
        table: &str,
        filters: &[(String, String)],
        columns: &str,
        order: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut params = vec![("select".to_string(), columns.to_string())];
        params.extend_from_slice(filters);
        if let Some(order) = order {
            params.push(("order".to_string(), order.to_string()));
        }
        self.execute(Method::GET, table, &params, None).await
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>> {
        self.execute(Method::POST, table, &[], Some(row)).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[(String, String)],
        patch: &Value,
    ) -> Result<Vec<Value>> {
        self.execute(Method::PATCH, table, filters, Some(patch)).await
    }

    async fn delete(&self, table: &str, filters: &[(String, String)]) -> Result<Vec<Value>> {
        self.execute(Method::DELETE, table, filters, None).await
    }
}

/// Scoped channel: row-level security applies to every operation
#[derive(Clone)]
pub struct ScopedClient {
    chan: Channel,
}

impl ScopedClient {
    /// Channel for anonymous callers (public form reads and submissions)
    pub fn anonymous(args: &Args, http: reqwest::Client) -> Self {
        Self {
            chan: Channel {
                http,
                base: args.supabase_url.clone(),
                api_key: args.supabase_anon_key.clone(),
                bearer: None,
            },
        }
    }

    /// Channel acting on behalf of an authenticated host
    pub fn for_token(args: &Args, http: reqwest::Client, access_token: &str) -> Self {
        Self {
            chan: Channel {
                http,
                base: args.supabase_url.clone(),
                api_key: args.supabase_anon_key.clone(),
                bearer: Some(access_token.to_string()),
            },
        }
    }

    pub async fn select(
        &self,
        table: &str,
        filters: &[(String, String)],
        columns: &str,
        order: Option<&str>,
    ) -> Result<Vec<Value>> {
        self.chan.select(table, filters, columns, order).await
    }

    pub async fn select_one(
        &self,
        table: &str,
        filters: &[(String, String)],
        columns: &str,
    ) -> Result<Option<Value>> {
        let rows = self.chan.select(table, filters, columns, None).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>> {
        self.chan.insert(table, row).await
    }

    pub async fn update(
        &self,
        table: &str,
        filters: &[(String, String)],
        patch: &Value,
    ) -> Result<Vec<Value>> {
        self.chan.update(table, filters, patch).await
    }

    pub async fn delete(&self, table: &str, filters: &[(String, String)]) -> Result<Vec<Value>> {
        self.chan.delete(table, filters).await
    }
}

/// Privileged channel: bypasses row-level security
#[derive(Clone)]
pub struct PrivilegedClient {
    chan: Channel,
}

impl PrivilegedClient {
    pub fn new(args: &Args, http: reqwest::Client) -> Self {
        Self {
            chan: Channel {
                http,
                base: args.supabase_url.clone(),
                api_key: args.supabase_service_key.clone(),
                bearer: None,
            },
        }
    }

    pub async fn select(
        &self,
        table: &str,
        filters: &[(String, String)],
        columns: &str,
        order: Option<&str>,
    ) -> Result<Vec<Value>> {
        self.chan.select(table, filters, columns, order).await
    }

    pub async fn select_one(
        &self,
        table: &str,
        filters: &[(String, String)],
        columns: &str,
    ) -> Result<Option<Value>> {
        let rows = self.chan.select(table, filters, columns, None).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>> {
        self.chan.insert(table, row).await
    }

    pub async fn update(
        &self,
        table: &str,
        filters: &[(String, String)],
        patch: &Value,
    ) -> Result<Vec<Value>> {
        self.chan.update(table, filters, patch).await
    }

    pub async fn delete(&self, table: &str, filters: &[(String, String)]) -> Result<Vec<Value>> {
        self.chan.delete(table, filters).await
    }
}
