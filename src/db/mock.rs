//! Mock database client for testing.
//!
//! Returns a predefined result (or error) for every query and records the
//! SQL it was given.

use super::{DatabaseClient, QueryResult};
use crate::error::{ExtractError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    result: QueryResult,
    failure: Option<String>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a mock that returns an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that returns `result` for every query.
    pub fn with_result(result: QueryResult) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    /// Creates a mock whose queries fail with a query error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// SQL statements executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        match &self.failure {
            Some(message) => Err(ExtractError::query(message.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
