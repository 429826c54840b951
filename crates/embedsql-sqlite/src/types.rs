//! Type encoding and decoding between Rust and SQLite.
//!
//! SQLite has a simple type system with 5 storage classes:
//! - INTEGER: Signed integer (1, 2, 3, 4, 6, or 8 bytes)
//! - REAL: 8-byte IEEE floating point
//! - TEXT: UTF-8 or UTF-16 string
//! - BLOB: Binary data
//! - NULL: The NULL value
//!
//! Every integer-like [`Value`] (including `Bool` and `Timestamp`) is stored
//! as INTEGER. Reading always yields the storage class: INTEGER comes back as
//! [`Value::BigInt`], whatever variant was bound. A TEXT cell holding bytes
//! that are not valid UTF-8 is read as [`Value::Bytes`].

use crate::ffi;
use embedsql_core::Value;
use std::ffi::{CStr, c_int};

/// Bind a Value to a prepared statement parameter.
///
/// Returns the SQLite result code. `SQLITE_MISMATCH` (which SQLite's own bind
/// calls never return) signals a `UBigInt` above `i64::MAX`, and
/// `SQLITE_TOOBIG` a payload whose length does not fit a C int.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
pub unsafe fn bind_value(stmt: *mut ffi::sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: caller guarantees stmt is valid
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),

            Value::Bool(b) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*b)),

            Value::TinyInt(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),

            Value::SmallInt(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),

            Value::Int(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),

            Value::BigInt(v) | Value::Timestamp(v) => ffi::sqlite3_bind_int64(stmt, index, *v),

            Value::UTinyInt(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),

            Value::USmallInt(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),

            Value::UInt(v) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*v)),

            Value::UBigInt(v) => match i64::try_from(*v) {
                Ok(v) => ffi::sqlite3_bind_int64(stmt, index, v),
                Err(_) => ffi::SQLITE_MISMATCH,
            },

            Value::Double(v) => ffi::sqlite3_bind_double(stmt, index, *v),

            Value::Text(s) => bind_text(stmt, index, s),

            Value::Bytes(b) => bind_blob(stmt, index, b),
        }
    }
}

/// Bind UTF-8 text, copied by SQLite.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
pub unsafe fn bind_text(stmt: *mut ffi::sqlite3_stmt, index: c_int, text: &str) -> c_int {
    let Ok(len) = c_int::try_from(text.len()) else {
        return ffi::SQLITE_TOOBIG;
    };
    // SAFETY: pointer and length describe `text`; SQLITE_TRANSIENT makes SQLite copy it
    unsafe {
        ffi::sqlite3_bind_text(
            stmt,
            index,
            text.as_ptr().cast(),
            len,
            ffi::SQLITE_TRANSIENT(),
        )
    }
}

/// Bind a blob, copied by SQLite.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
pub unsafe fn bind_blob(stmt: *mut ffi::sqlite3_stmt, index: c_int, bytes: &[u8]) -> c_int {
    let Ok(len) = c_int::try_from(bytes.len()) else {
        return ffi::SQLITE_TOOBIG;
    };
    // SAFETY: pointer and length describe `bytes`; SQLITE_TRANSIENT makes SQLite copy it
    unsafe {
        ffi::sqlite3_bind_blob(
            stmt,
            index,
            bytes.as_ptr().cast(),
            len,
            ffi::SQLITE_TRANSIENT(),
        )
    }
}

/// Read a column value from a result row.
///
/// Returns `Err(SQLITE_NOMEM)` when SQLite could not materialize a text
/// value.
///
/// # Safety
/// - `stmt` must be a valid prepared statement that has just returned SQLITE_ROW
/// - `index` must be a valid 0-based column index
pub unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Result<Value, c_int> {
    // SAFETY: caller guarantees stmt is positioned on a row and index is in range
    unsafe {
        let col_type = ffi::sqlite3_column_type(stmt, index);

        match col_type {
            ffi::SQLITE_NULL => Ok(Value::Null),

            ffi::SQLITE_INTEGER => Ok(Value::BigInt(ffi::sqlite3_column_int64(stmt, index))),

            ffi::SQLITE_FLOAT => Ok(Value::Double(ffi::sqlite3_column_double(stmt, index))),

            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_column_text(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() {
                    return Err(ffi::SQLITE_NOMEM);
                }
                let bytes = std::slice::from_raw_parts(ptr, len as usize).to_vec();
                // Text that is not UTF-8 is handed back unchanged as bytes
                Ok(String::from_utf8(bytes)
                    .map_or_else(|e| Value::Bytes(e.into_bytes()), Value::Text))
            }

            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_column_blob(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                // Zero-length blobs come back as a null pointer
                if ptr.is_null() || len == 0 {
                    Ok(Value::Bytes(Vec::new()))
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Ok(Value::Bytes(slice.to_vec()))
                }
            }

            _ => Ok(Value::Null),
        }
    }
}

/// Get the column name from a result.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: caller guarantees stmt is valid
    unsafe {
        let ptr = ffi::sqlite3_column_name(stmt, index);
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(String::from)
        }
    }
}
