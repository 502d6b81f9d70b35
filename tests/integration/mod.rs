//! Integration tests for warehouse-extract.

pub mod cli_test;
pub mod common;
pub mod credentials_test;
pub mod driver_test;
pub mod vsql_pipeline_test;
