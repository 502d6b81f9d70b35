//! Database access for the driver export path.
//!
//! Provides a trait-based interface so the exporter can run against the real
//! Vertica client or an in-memory mock.

mod mock;
mod types;
mod vertica;
pub mod vertica_type;

pub use mock::MockDatabaseClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};
pub use vertica::VerticaClient;
pub use vertica_type::VerticaType;

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Opens a database connection for the given configuration.
///
/// Each invocation opens its own connection; nothing is pooled or shared.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = VerticaClient::connect(config).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a SQL query and returns the complete result set.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
