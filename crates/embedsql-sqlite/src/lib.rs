//! SQLite backend for embedsql.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate implements the backend traits from embedsql-core on top of the
//! bundled libsqlite3, through `libsqlite3-sys`.
//!
//! # Type Mapping
//!
//! | Value variant | SQLite storage class | Read back as |
//! |---------------|----------------------|--------------|
//! | `Null` | NULL | `Null` |
//! | `Bool` | INTEGER (0/1) | `BigInt` |
//! | `TinyInt` .. `BigInt` | INTEGER | `BigInt` |
//! | `UTinyInt` .. `UInt` | INTEGER | `BigInt` |
//! | `UBigInt` (<= `i64::MAX`) | INTEGER | `BigInt` |
//! | `Double` | REAL | `Double` |
//! | `Text` | TEXT | `Text` |
//! | `Bytes` | BLOB | `Bytes` |
//! | `Timestamp` | INTEGER (epoch seconds) | `BigInt` |
//!
//! A `UBigInt` above `i64::MAX` has no INTEGER representation and is rejected
//! at bind time.
//!
//! # Errors
//!
//! Extended result codes are enabled on every connection, so error codes are
//! the most specific SQLite reports (for example 1555 for a primary key
//! violation); the message text is SQLite's own.

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{SqliteBackend, SqliteConnection, SqliteStatement};

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedsql_core::Backend;

    #[test]
    fn test_sqlite_version() {
        let version = sqlite_version();
        assert!(version.starts_with('3'));
        assert!(sqlite_version_number() >= 3_000_000);
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(SqliteBackend.name(), "sqlite");
    }
}
