//! Store connection configuration

use std::fmt;

use crate::error::StorageError;

/// Default SurrealDB namespace for imported graphs
pub const DEFAULT_NAMESPACE: &str = "recordbridge";

/// Default SurrealDB database name
pub const DEFAULT_DATABASE: &str = "main";

/// Level at which the configured user signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    Root,
    Database,
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScope::Root => write!(f, "root"),
            AuthScope::Database => write!(f, "database"),
        }
    }
}

/// Remote SurrealDB connection read from `SURREALDB_*` variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    pub scope: AuthScope,
}

impl StoreConfig {
    /// Read the remote store configuration from the environment.
    ///
    /// Returns `None` when `SURREALDB_ENDPOINT` is unset. Once an endpoint
    /// is given, `SURREALDB_USERNAME` and `SURREALDB_PASSWORD` are required;
    /// `SURREALDB_NAMESPACE`, `SURREALDB_DATABASE` and `SURREALDB_ROOT`
    /// fall back to `recordbridge`, `main` and a database-scoped sign-in.
    pub fn from_env() -> Result<Option<Self>, StorageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, StorageError> {
        let Some(endpoint) = lookup("SURREALDB_ENDPOINT") else {
            return Ok(None);
        };
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                StorageError::Connection(format!("SURREALDB_ENDPOINT is set but {key} is not"))
            })
        };

        let scope = match lookup("SURREALDB_ROOT") {
            Some(flag) if flag.eq_ignore_ascii_case("true") => AuthScope::Root,
            _ => AuthScope::Database,
        };
        Ok(Some(Self {
            username: required("SURREALDB_USERNAME")?,
            password: required("SURREALDB_PASSWORD")?,
            namespace: lookup("SURREALDB_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            database: lookup("SURREALDB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            endpoint,
            scope,
        }))
    }
}
