//! Vertica client over the Postgres frontend protocol.
//!
//! Uses a single sqlx `PgConnection`. Queries go through the simple query
//! protocol, which Vertica accepts without server-side prepared statements
//! and which never makes sqlx look types up in `pg_catalog`.

use crate::config::{ConnectionConfig, SslPolicy};
use crate::db::vertica_type::VerticaType;
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ExtractError, Result};
use crate::sql::sanitize;
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Column as SqlxColumn, Connection, Executor, Row as SqlxRow, ValueRef};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Rows between progress log lines while materializing a result.
const PROGRESS_INTERVAL: usize = 100_000;

/// Vertica database client.
#[derive(Debug)]
pub struct VerticaClient {
    conn: Mutex<Option<PgConnection>>,
    read_timeout: Duration,
}

impl VerticaClient {
    /// Opens one connection using `config`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(config)?;

        debug!(
            "Connecting to {} (ssl: {:?})",
            config.display_string(),
            config.ssl
        );

        let conn = tokio::time::timeout(config.read_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| {
                ExtractError::connection(format!(
                    "Connection to {} timed out",
                    config.display_string()
                ))
            })?
            .map_err(|e| map_connection_error(e, config))?;

        info!("Connected to {}", config.display_string());

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            read_timeout: config.read_timeout,
        })
    }

    async fn fetch_all(&self, sql: &str) -> Result<(Vec<ColumnInfo>, Vec<Row>)> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| ExtractError::connection("Connection already closed"))?;

        let mut columns: Option<Vec<ColumnInfo>> = None;
        let mut rows = Vec::new();
        {
            let mut stream = (&mut *conn).fetch(sql);
            while let Some(row) = stream
                .try_next()
                .await
                .map_err(|e| ExtractError::query(format_query_error(e)))?
            {
                if columns.is_none() {
                    columns = Some(column_info(&row));
                }
                rows.push(convert_row(&row)?);
                if rows.len() % PROGRESS_INTERVAL == 0 {
                    debug!("Fetched {} rows", rows.len());
                }
            }
        }

        let columns = match columns {
            Some(columns) => columns,
            None => describe_empty(conn, sql).await?,
        };

        Ok((columns, rows))
    }
}

/// Recovers the columns of a query that returned no rows.
///
/// The simple query protocol only exposes a row description alongside a
/// row, so the query is outer-joined onto a single row to get one row of
/// nulls back.
async fn describe_empty(conn: &mut PgConnection, sql: &str) -> Result<Vec<ColumnInfo>> {
    let describe = describe_query(sql);
    debug!("Describing empty result: {describe}");

    let row = (&mut *conn)
        .fetch_optional(describe.as_str())
        .await
        .map_err(|e| {
            ExtractError::query(format!(
                "Query returned no rows and its columns could not be described: {}",
                format_query_error(e)
            ))
        })?;

    row.map(|row| column_info(&row)).ok_or_else(|| {
        ExtractError::query("Query returned no rows and its columns could not be described")
    })
}

/// Wraps `sql` so that it yields exactly one row of nulls when it is empty.
fn describe_query(sql: &str) -> String {
    let body = sanitize(sql);
    let body = body.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!("SELECT q.* FROM (SELECT 1 AS one) AS d LEFT JOIN ({body}) AS q ON 1 = 1")
}

#[async_trait]
impl DatabaseClient for VerticaClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let (columns, rows) = tokio::time::timeout(self.read_timeout, self.fetch_all(sql))
            .await
            .map_err(|_| {
                ExtractError::query(format!(
                    "Query exceeded read timeout of {} seconds",
                    self.read_timeout.as_secs()
                ))
            })??;

        let result = QueryResult::with_data(columns, rows).with_execution_time(start.elapsed());
        info!(
            "Query returned {} rows in {:?}",
            result.row_count, result.execution_time
        );
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close()
                .await
                .map_err(|e| ExtractError::connection(e.to_string()))?;
        }
        Ok(())
    }
}

/// Builds sqlx connect options from a resolved config.
pub(crate) fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    let ssl_mode = match config.ssl {
        // Encrypt, but trust any certificate for any host name.
        SslPolicy::Unverified => PgSslMode::Require,
        SslPolicy::Disabled => PgSslMode::Disable,
    };

    Ok(PgConnectOptions::new()
        .host(config.require_host()?)
        .port(config.port)
        .database(config.require_database()?)
        .username(config.require_user()?)
        .password(config.require_password()?)
        .ssl_mode(ssl_mode)
        .application_name(env!("CARGO_PKG_NAME")))
}

fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| {
            let vertica_type = VerticaType::from_type_info(col.type_info());
            ColumnInfo::new(col.name(), vertica_type.to_string())
        })
        .collect()
}

/// Converts a sqlx PgRow to our Row type, decoding by Vertica type OID.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .map(|col| {
            let raw = row
                .try_get_raw(col.ordinal())
                .map_err(|e| ExtractError::query(e.to_string()))?;
            if raw.is_null() {
                return Ok(Value::Null);
            }

            let vertica_type = VerticaType::from_type_info(col.type_info());
            raw.as_str()
                .map_err(|e| e.to_string())
                .and_then(|text| vertica_type.decode(text))
                .map_err(|e| {
                    ExtractError::query(format!(
                        "Cannot decode column '{}' ({vertica_type}): {e}",
                        col.name()
                    ))
                })
        })
        .collect()
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ExtractError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ExtractError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is reachable."
        ))
    } else if error_str.contains("authentication failed") || error_str.contains("password") {
        ExtractError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ExtractError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        ExtractError::connection(format!(
            "TLS negotiation with {host}:{port} failed. Set VERTICA_NO_SSL or pass --no-ssl \
             if the server does not accept encrypted connections."
        ))
    } else {
        ExtractError::connection(error.to_string())
    }
}

/// Formats a query error with server detail and hint when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
