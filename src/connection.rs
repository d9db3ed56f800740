//! # Storage Account Connection
//!
//! Parses storage connection strings and derives the per-request options the
//! repository hands to the table client.
//!
//! A connection string is a list of `Key=Value` segments separated by `;`.
//! Keys are matched case-insensitively. Two forms are accepted:
//!
//! ```text
//! UseDevelopmentStorage=true
//! DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net
//! ```
//!
//! `TableEndpoint` and `QueueEndpoint` override the derived endpoints.

use crate::constants::{DEFAULT_SERVER_TIMEOUT, DEFAULT_USE_NAGLE};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_TABLE_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";
const DEV_QUEUE_ENDPOINT: &str = "http://127.0.0.1:10001/devstoreaccount1";
const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("Connection string is empty")]
    Empty,

    #[error("Malformed connection string segment '{segment}': expected Key=Value")]
    MalformedSegment { segment: String },

    #[error("Connection string is missing required setting '{setting}'")]
    MissingSetting { setting: &'static str },

    #[error("Unsupported endpoints protocol '{protocol}'")]
    UnsupportedProtocol { protocol: String },
}

pub type ConnectionResult<T> = Result<T, ConnectionStringError>;

/// Parsed storage account
#[derive(Clone, PartialEq, Eq)]
pub struct StorageAccount {
    account_name: String,
    account_key: Option<String>,
    table_endpoint: String,
    queue_endpoint: String,
    development: bool,
}

impl StorageAccount {
    /// Parse a connection string
    pub fn parse(connection_string: &str) -> ConnectionResult<Self> {
        let settings = parse_settings(connection_string)?;

        let dev_storage = settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if dev_storage {
            return Ok(Self {
                account_name: DEV_ACCOUNT_NAME.to_string(),
                account_key: None,
                table_endpoint: settings
                    .get("tableendpoint")
                    .cloned()
                    .unwrap_or_else(|| DEV_TABLE_ENDPOINT.to_string()),
                queue_endpoint: settings
                    .get("queueendpoint")
                    .cloned()
                    .unwrap_or_else(|| DEV_QUEUE_ENDPOINT.to_string()),
                development: true,
            });
        }

        let account_name = settings
            .get("accountname")
            .cloned()
            .ok_or(ConnectionStringError::MissingSetting {
                setting: "AccountName",
            })?;
        let account_key = settings
            .get("accountkey")
            .cloned()
            .ok_or(ConnectionStringError::MissingSetting {
                setting: "AccountKey",
            })?;

        let protocol = settings
            .get("defaultendpointsprotocol")
            .map(|p| p.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
        if protocol != "https" && protocol != "http" {
            return Err(ConnectionStringError::UnsupportedProtocol { protocol });
        }

        let suffix = settings
            .get("endpointsuffix")
            .map(String::as_str)
            .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);

        let table_endpoint = settings
            .get("tableendpoint")
            .cloned()
            .unwrap_or_else(|| format!("{protocol}://{account_name}.table.{suffix}"));
        let queue_endpoint = settings
            .get("queueendpoint")
            .cloned()
            .unwrap_or_else(|| format!("{protocol}://{account_name}.queue.{suffix}"));

        Ok(Self {
            account_name,
            account_key: Some(account_key),
            table_endpoint,
            queue_endpoint,
            development: false,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn account_key(&self) -> Option<&str> {
        self.account_key.as_deref()
    }

    pub fn table_endpoint(&self) -> &str {
        &self.table_endpoint
    }

    pub fn queue_endpoint(&self) -> &str {
        &self.queue_endpoint
    }

    /// Whether this account targets the local storage emulator
    pub fn is_development(&self) -> bool {
        self.development
    }
}

impl fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccount")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "***"))
            .field("table_endpoint", &self.table_endpoint)
            .field("queue_endpoint", &self.queue_endpoint)
            .field("development", &self.development)
            .finish()
    }
}

fn parse_settings(connection_string: &str) -> ConnectionResult<HashMap<String, String>> {
    let trimmed = connection_string.trim();
    if trimmed.is_empty() {
        return Err(ConnectionStringError::Empty);
    }

    let mut settings = HashMap::new();
    for segment in trimmed.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        // Account keys are base64 and may end in '=', so split on the first one only
        let (key, value) = segment
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| ConnectionStringError::MalformedSegment {
                segment: segment.to_string(),
            })?;
        settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    Ok(settings)
}

/// Options handed to the table client with every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Server-side timeout for the operation
    pub server_timeout: Duration,
    /// Coalesce small writes at the transport level
    pub use_nagle: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            server_timeout: DEFAULT_SERVER_TIMEOUT,
            use_nagle: DEFAULT_USE_NAGLE,
        }
    }
}

impl RequestOptions {
    pub fn with_nagle(mut self, use_nagle: bool) -> Self {
        self.use_nagle = use_nagle;
        self
    }

    pub fn with_server_timeout(mut self, server_timeout: Duration) -> Self {
        self.server_timeout = server_timeout;
        self
    }
}
