//! Connection options and store errors.

use std::fmt;

use invkit_report::ReportError;
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use crate::conf::{C_DB_HOST_DEFAULT, N_DB_PORT_DEFAULT};

/// PostgreSQL connection parameters (`DB_HOST`, `DB_PORT`, `DB_DATABASE`,
/// `DB_USERNAME`, `DB_PASSWORD`).
#[derive(Clone, PartialEq, Eq)]
pub struct SpecDbConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
}

impl Default for SpecDbConnection {
    fn default() -> Self {
        Self {
            host: C_DB_HOST_DEFAULT.to_string(),
            port: N_DB_PORT_DEFAULT,
            database: String::new(),
            username: String::new(),
            password: None,
        }
    }
}

impl SpecDbConnection {
    pub fn to_connect_options(&self) -> PgConnectOptions {
        let opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username);
        match &self.password {
            Some(c_password) => opts.password(c_password),
            None => opts,
        }
    }
}

// Password stays out of logs.
impl fmt::Debug for SpecDbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecDbConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Store adapter failure.
#[derive(Debug, Error)]
pub enum DbError {
    /// Async runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    /// Pool could not connect.
    #[error("failed to connect to {host}:{port}/{database}: {source}")]
    Connect {
        host: String,
        port: u16,
        database: String,
        #[source]
        source: sqlx::Error,
    },
    /// Query failure.
    #[error("query `{context}` failed: {source}")]
    Query {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    /// Required snapshot table file is absent.
    #[error("snapshot table `{0}` not found")]
    MissingTable(String),
    /// Snapshot file unreadable or of the wrong shape.
    #[error("snapshot table `{table}`: {message}")]
    Snapshot { table: String, message: String },
    /// Stored values violate the model (negative counts).
    #[error("{0}")]
    InvalidData(String),
}

impl From<DbError> for ReportError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidData(message) => ReportError::InvalidData(message),
            other => ReportError::Source(other.to_string()),
        }
    }
}
