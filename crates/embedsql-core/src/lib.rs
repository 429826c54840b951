//! Core types and traits for embedsql.
//!
//! This crate provides the backend-agnostic pieces of the embedded SQL facade:
//!
//! - [`Value`] sum type for parameters and result cells
//! - [`FromValue`] for typed, NULL-aware extraction
//! - [`Error`] taxonomy carrying backend-native codes and messages
//! - [`DatabaseConfig`] and [`OpenFlags`] for opening connections
//! - [`Backend`], [`BackendConnection`] and [`BackendStatement`] traits
//!   that an embedded engine implements to plug into the facade

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod value;

pub use backend::{
    Backend, BackendConnection, BackendStatement, COMMIT_SQL, ROLLBACK_SQL, TransactionMode,
};
pub use config::{DatabaseConfig, MEMORY_PATH, OpenFlags};
pub use convert::FromValue;
pub use error::{
    BindError, BindErrorKind, ConfigError, ConnectionError, ConnectionErrorKind, Error,
    QueryError, QueryErrorKind, ReadError, ReadErrorKind, Result,
};
pub use value::Value;
