//! warehouse-extract - Vertica query export and project data helpers.
//!
//! This library backs the `make-dataset` and `some-plot` binaries and exposes
//! the core modules for integration tests.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod plot;
pub mod sql;
