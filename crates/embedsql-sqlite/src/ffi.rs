//! Low-level FFI surface of libsqlite3.
//!
//! The symbols come from `libsqlite3-sys`, which compiles the bundled SQLite
//! amalgamation. Only what the backend uses is re-exported here, together
//! with a few safe helpers for reading strings out of the library.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, c_int};

pub use libsqlite3_sys::{
    SQLITE_ABORT, SQLITE_AUTH, SQLITE_BLOB, SQLITE_BUSY, SQLITE_CANTOPEN, SQLITE_CONSTRAINT,
    SQLITE_CORRUPT, SQLITE_DONE, SQLITE_ERROR, SQLITE_FLOAT, SQLITE_FULL, SQLITE_INTEGER,
    SQLITE_INTERRUPT, SQLITE_IOERR, SQLITE_LIMIT_LENGTH, SQLITE_LOCKED, SQLITE_MISMATCH,
    SQLITE_MISUSE, SQLITE_NOMEM, SQLITE_NOTADB, SQLITE_NULL, SQLITE_OK, SQLITE_OPEN_CREATE,
    SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE, SQLITE_OPEN_SHAREDCACHE, SQLITE_OPEN_URI,
    SQLITE_PERM, SQLITE_RANGE, SQLITE_READONLY, SQLITE_ROW, SQLITE_TEXT, SQLITE_TOOBIG,
    SQLITE_TRANSIENT, sqlite3, sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int64,
    sqlite3_bind_null, sqlite3_bind_parameter_count, sqlite3_bind_parameter_index,
    sqlite3_bind_text, sqlite3_busy_timeout, sqlite3_changes, sqlite3_clear_bindings, sqlite3_close,
    sqlite3_column_blob, sqlite3_column_bytes, sqlite3_column_count,
    sqlite3_column_double, sqlite3_column_int64, sqlite3_column_name, sqlite3_column_text,
    sqlite3_column_type, sqlite3_db_handle, sqlite3_errcode, sqlite3_errmsg, sqlite3_errstr,
    sqlite3_exec, sqlite3_extended_errcode, sqlite3_extended_result_codes, sqlite3_finalize,
    sqlite3_free, sqlite3_get_autocommit, sqlite3_last_insert_rowid, sqlite3_libversion,
    sqlite3_libversion_number, sqlite3_limit, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_reset,
    sqlite3_step, sqlite3_stmt,
};

/// Get the SQLite library version as a string.
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a static string
    unsafe {
        let ptr = sqlite3_libversion();
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown")
    }
}

/// Get the SQLite library version as a number.
pub fn version_number() -> i32 {
    // SAFETY: sqlite3_libversion_number is always safe to call
    unsafe { sqlite3_libversion_number() }
}

/// Convert an SQLite result code to a human-readable string.
pub fn error_string(code: c_int) -> &'static str {
    // SAFETY: sqlite3_errstr returns a static string
    unsafe {
        let ptr = sqlite3_errstr(code);
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown error")
    }
}

/// The most recent error message on a connection.
///
/// # Safety
/// `db` must be a valid connection handle.
pub unsafe fn errmsg(db: *mut sqlite3) -> String {
    // SAFETY: caller guarantees db is valid; errmsg never returns null for a valid handle
    unsafe {
        let ptr = sqlite3_errmsg(db);
        if ptr.is_null() {
            return error_string(SQLITE_NOMEM).to_string();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// The most recent extended result code on a connection.
///
/// # Safety
/// `db` must be a valid connection handle.
pub unsafe fn extended_errcode(db: *mut sqlite3) -> c_int {
    // SAFETY: caller guarantees db is valid
    unsafe { sqlite3_extended_errcode(db) }
}

/// Strip an extended result code down to its primary code.
pub const fn primary_code(code: c_int) -> c_int {
    code & 0xff
}
