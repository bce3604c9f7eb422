//! MySQL data-source access for checks.
//!
//! Checks own their connection lifecycle: acquire at the start of a run via
//! [`connect`], release by dropping the connection before returning. This
//! module only maps [`DbSettings`] onto connection options and wraps query
//! execution with typed errors; queries themselves live in the check modules.

use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder, Params, Row};

use crate::config::DbSettings;

/// Build connection options from settings.
fn connection_opts(settings: &DbSettings) -> Opts {
    OptsBuilder::new()
        .ip_or_hostname(Some(settings.host.clone()))
        .tcp_port(settings.port)
        .user(Some(settings.user.clone()))
        .pass(Some(settings.password.clone()))
        .db_name(Some(settings.database.clone()))
        .into()
}

/// Open a connection to the configured database.
///
/// # Errors
///
/// Returns [`DbError::Connect`] with the target endpoint when the handshake
/// fails.
pub fn connect(settings: &DbSettings) -> Result<Conn, DbError> {
    Conn::new(connection_opts(settings)).map_err(|source| DbError::Connect {
        database: settings.database.clone(),
        host: settings.host.clone(),
        port: settings.port,
        source,
    })
}

/// Execute a parameterized read query and fetch all rows.
///
/// # Errors
///
/// Returns [`DbError::Query`] when preparation or execution fails.
pub fn query_rows(conn: &mut Conn, query: &str, params: Params) -> Result<Vec<Row>, DbError> {
    conn.exec(query, params).map_err(DbError::Query)
}

/// Nullable string column at `idx`; `None` for SQL NULL or a missing column.
#[must_use]
pub fn string_at(row: &Row, idx: usize) -> Option<String> {
    row.get::<Option<String>, usize>(idx).flatten()
}

/// Nullable unsigned integer column at `idx`.
#[must_use]
pub fn u64_at(row: &Row, idx: usize) -> Option<u64> {
    row.get::<Option<u64>, usize>(idx).flatten()
}

/// Comma-joined `?` placeholders for an `IN (...)` clause of `count` values.
#[must_use]
pub fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Errors from the data-source layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The connection handshake failed.
    #[error("Failed to connect to database '{database}' at {host}:{port}: {source}")]
    Connect {
        /// Target database (schema) name.
        database: String,
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Underlying driver error.
        #[source]
        source: mysql::Error,
    },

    /// A query failed to prepare or execute.
    #[error("Query failed: {0}")]
    Query(#[source] mysql::Error),
}
