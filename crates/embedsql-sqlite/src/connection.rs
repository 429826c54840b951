//! SQLite connection and statement implementation.
//!
//! This module provides safe wrappers around SQLite's C API and implements
//! the backend traits from embedsql-core.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers
#![allow(clippy::if_not_else)] // Clearer for error handling

use crate::ffi;
use crate::types;
use embedsql_core::{
    Backend, BackendConnection, BackendStatement, DatabaseConfig, Error, Result, Value,
    error::{
        BindError, BindErrorKind, ConnectionError, ConnectionErrorKind, QueryError,
        QueryErrorKind, ReadError, ReadErrorKind,
    },
};
use std::ffi::{CStr, CString, c_int};
use std::ptr;

/// The SQLite backend.
///
/// Opens connections through `sqlite3_open_v2` with the flags, busy timeout
/// and length limit taken from a [`DatabaseConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl Backend for SqliteBackend {
    type Connection = SqliteConnection;

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn open(&self, config: &DatabaseConfig) -> Result<SqliteConnection> {
        SqliteConnection::open(config)
    }
}

fn open_flags(config: &DatabaseConfig) -> c_int {
    let mut flags = if config.flags.read_only {
        ffi::SQLITE_OPEN_READONLY
    } else {
        ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
    };
    if config.flags.shared_cache {
        flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
    }
    flags | ffi::SQLITE_OPEN_URI
}

/// A connection to a SQLite database.
///
/// The handle is owned exclusively; it is closed on drop.
pub struct SqliteConnection {
    db: *mut ffi::sqlite3,
    path: String,
    /// Length cap from the config; SQLite never lowers its own limit below 30 bytes.
    max_length: Option<usize>,
}

// SAFETY: the bundled library is built thread-safe, and a connection is only
// ever used by its single owner, so moving it to another thread is sound.
unsafe impl Send for SqliteConnection {}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let open_error = |code: Option<i32>, message: String| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Open,
                code,
                message,
                path: Some(config.path.clone()),
            })
        };

        config
            .validate()
            .map_err(|e| open_error(None, e.message))?;
        let c_path = CString::new(config.path.as_str())
            .map_err(|_| open_error(None, "Invalid path: contains null byte".to_string()))?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe {
            ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, open_flags(config), ptr::null())
        };

        if rc != ffi::SQLITE_OK {
            let (code, msg) = if !db.is_null() {
                // SAFETY: db is a valid (failed) handle that must still be closed
                unsafe {
                    let code = ffi::extended_errcode(db);
                    let msg = ffi::errmsg(db);
                    ffi::sqlite3_close(db);
                    (code, msg)
                }
            } else {
                (rc, ffi::error_string(rc).to_string())
            };
            return Err(open_error(Some(code), msg));
        }

        let conn = Self {
            db,
            path: config.path.clone(),
            max_length: config.max_length,
        };

        // SAFETY: db is valid
        unsafe {
            ffi::sqlite3_extended_result_codes(db, 1);
            if config.busy_timeout_ms > 0 {
                let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
                ffi::sqlite3_busy_timeout(db, ms);
            }
            if let Some(max) = config.max_length {
                let max = c_int::try_from(max).unwrap_or(c_int::MAX);
                ffi::sqlite3_limit(db, ffi::SQLITE_LIMIT_LENGTH, max);
            }
        }

        // sqlite3_open_v2 defers reading the file; touch the header now so a
        // locked, unreadable or malformed file fails the open.
        if let Err(e) = conn.execute("PRAGMA schema_version") {
            return Err(open_error(e.code(), e.message().to_string()));
        }

        tracing::debug!(
            path = %config.path,
            read_only = config.flags.read_only,
            shared_cache = config.flags.shared_cache,
            busy_timeout_ms = config.busy_timeout_ms,
            "Opened SQLite database"
        );
        Ok(conn)
    }
}

impl BackendConnection for SqliteConnection {
    type Statement = SqliteStatement;

    fn execute(&self, sql: &str) -> Result<()> {
        tracing::trace!(sql = %sql, "Executing SQL");
        let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if !errmsg.is_null() {
                // SAFETY: errmsg is valid and owned by us
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };
            // SAFETY: db is valid
            let code = unsafe { ffi::extended_errcode(self.db) };
            let code = if ffi::primary_code(code) == ffi::primary_code(rc) {
                code
            } else {
                rc
            };

            return Err(Error::Query(QueryError {
                kind: error_code_to_kind(code),
                code: Some(code),
                sql: Some(sql.to_string()),
                message: msg,
            }));
        }

        Ok(())
    }

    fn prepare(&self, sql: &str) -> Result<SqliteStatement> {
        tracing::trace!(sql = %sql, "Preparing statement");
        let stmt = prepare_stmt(self.db, sql)?;
        Ok(SqliteStatement {
            stmt,
            db: self.db,
            sql: sql.to_string(),
            max_length: self.max_length,
        })
    }

    fn last_insert_rowid(&self) -> i64 {
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    fn changes(&self) -> u64 {
        // SAFETY: db is valid
        let changes = unsafe { ffi::sqlite3_changes(self.db) };
        u64::try_from(changes).unwrap_or(0)
    }

    fn in_transaction(&self) -> bool {
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_get_autocommit(self.db) == 0 }
    }

    fn close(mut self) -> Result<()> {
        let db = std::mem::replace(&mut self.db, ptr::null_mut());
        // SAFETY: db is valid and no longer reachable through self
        let rc = unsafe { ffi::sqlite3_close(db) };
        if rc != ffi::SQLITE_OK {
            // SAFETY: db is still open after a failed close
            let err = unsafe { query_error(db, None) };
            // Unfinalized statements keep the handle alive; drop retries the close.
            self.db = db;
            return Err(err);
        }
        tracing::debug!(path = %self.path, "Closed SQLite database");
        Ok(())
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: db is valid; every statement borrowed from it is gone
            unsafe {
                ffi::sqlite3_close(self.db);
            }
        }
    }
}

/// A compiled SQLite statement.
///
/// Finalized on drop.
pub struct SqliteStatement {
    stmt: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
    sql: String,
    max_length: Option<usize>,
}

impl std::fmt::Debug for SqliteStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

impl SqliteStatement {
    fn check_bind(&self, rc: c_int, index: usize) -> Result<()> {
        match rc {
            ffi::SQLITE_OK => Ok(()),
            ffi::SQLITE_MISMATCH => Err(Error::Bind(BindError {
                kind: BindErrorKind::Mismatch,
                index,
                code: None,
                message: "unsigned value does not fit a 64-bit signed integer".to_string(),
            })),
            _ => {
                // SAFETY: db is valid
                let (code, message) = unsafe { native_error(self.db, rc) };
                let kind = if ffi::primary_code(code) == ffi::SQLITE_TOOBIG {
                    BindErrorKind::Range
                } else {
                    BindErrorKind::Backend
                };
                Err(Error::Bind(BindError {
                    kind,
                    index,
                    code: Some(code),
                    message,
                }))
            }
        }
    }

    /// Reject payloads over the configured cap, which may be lower than
    /// anything SQLite itself enforces.
    fn check_length(&self, index: usize, len: usize) -> Result<()> {
        if len > self.max_length() {
            return Err(Error::Bind(BindError {
                kind: BindErrorKind::Range,
                index,
                code: Some(ffi::SQLITE_TOOBIG),
                message: ffi::error_string(ffi::SQLITE_TOOBIG).to_string(),
            }));
        }
        Ok(())
    }

    fn bind_index(index: usize) -> Result<c_int> {
        c_int::try_from(index).map_err(|_| {
            Error::Bind(BindError {
                kind: BindErrorKind::Backend,
                index,
                code: Some(ffi::SQLITE_RANGE),
                message: ffi::error_string(ffi::SQLITE_RANGE).to_string(),
            })
        })
    }
}

impl BackendStatement for SqliteStatement {
    fn parameter_count(&self) -> usize {
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) as usize }
    }

    fn parameter_index(&self, name: &str) -> Option<usize> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: stmt and name are valid
        let index = unsafe { ffi::sqlite3_bind_parameter_index(self.stmt, c_name.as_ptr()) };
        (index > 0).then_some(index as usize)
    }

    fn column_count(&self) -> usize {
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_column_count(self.stmt) as usize }
    }

    fn column_name(&self, index: usize) -> Option<String> {
        if index >= self.column_count() {
            return None;
        }
        // SAFETY: stmt is valid, index is in range
        unsafe { types::column_name(self.stmt, index as c_int) }
    }

    fn max_length(&self) -> usize {
        // SAFETY: db is valid; a negative new value only queries the limit
        let limit = unsafe { ffi::sqlite3_limit(self.db, ffi::SQLITE_LIMIT_LENGTH, -1) };
        let limit = usize::try_from(limit).unwrap_or(0);
        self.max_length.map_or(limit, |cap| cap.min(limit))
    }

    fn bind(&mut self, index: usize, value: &Value) -> Result<()> {
        let i = Self::bind_index(index)?;
        match value {
            Value::Text(s) => self.check_length(index, s.len())?,
            Value::Bytes(b) => self.check_length(index, b.len())?,
            _ => {}
        }
        // SAFETY: stmt is valid
        let rc = unsafe { types::bind_value(self.stmt, i, value) };
        if rc == ffi::SQLITE_MISMATCH {
            tracing::warn!(index, value = ?value, "Unsigned value exceeds i64::MAX; not bound");
        }
        self.check_bind(rc, index)
    }

    fn bind_text(&mut self, index: usize, text: &str) -> Result<()> {
        let i = Self::bind_index(index)?;
        self.check_length(index, text.len())?;
        // SAFETY: stmt is valid
        let rc = unsafe { types::bind_text(self.stmt, i, text) };
        self.check_bind(rc, index)
    }

    fn bind_blob(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        let i = Self::bind_index(index)?;
        self.check_length(index, bytes.len())?;
        // SAFETY: stmt is valid
        let rc = unsafe { types::bind_blob(self.stmt, i, bytes) };
        self.check_bind(rc, index)
    }

    fn step(&mut self) -> Result<bool> {
        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(self.stmt) };
        match rc {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            // SAFETY: db is valid
            _ => Err(unsafe { query_error(self.db, Some(&self.sql)) }),
        }
    }

    fn column(&self, index: usize) -> Result<Value> {
        if index >= self.column_count() {
            return Err(Error::Read(ReadError {
                kind: ReadErrorKind::Column,
                index: Some(index),
                code: None,
                message: format!(
                    "column index {} out of range (statement has {} columns)",
                    index,
                    self.column_count()
                ),
            }));
        }
        // SAFETY: stmt is valid, positioned on a row, index is in range
        unsafe { types::read_column(self.stmt, index as c_int) }.map_err(|rc| {
            Error::Read(ReadError {
                kind: ReadErrorKind::Backend,
                index: Some(index),
                code: Some(rc),
                message: ffi::error_string(rc).to_string(),
            })
        })
    }

    fn reset(&mut self) -> Result<()> {
        // sqlite3_reset repeats the code of a failed step, which step already
        // reported; the statement is rewound either way.
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_reset(self.stmt) };
        Ok(())
    }

    fn clear_bindings(&mut self) -> Result<()> {
        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_clear_bindings(self.stmt) };
        if rc != ffi::SQLITE_OK {
            // SAFETY: db is valid
            return Err(unsafe { query_error(self.db, Some(&self.sql)) });
        }
        Ok(())
    }

    fn last_insert_rowid(&self) -> i64 {
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    fn changes(&self) -> u64 {
        // SAFETY: db is valid
        let changes = unsafe { ffi::sqlite3_changes(self.db) };
        u64::try_from(changes).unwrap_or(0)
    }
}

impl Drop for SqliteStatement {
    fn drop(&mut self) {
        // SAFETY: stmt is valid and finalized exactly once
        unsafe {
            ffi::sqlite3_finalize(self.stmt);
        }
    }
}

// Helper functions

fn null_byte_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Misuse,
        code: None,
        sql: Some(sql.to_string()),
        message: "SQL contains null byte".to_string(),
    })
}

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<*mut ffi::sqlite3_stmt> {
    let c_sql = CString::new(sql).map_err(|_| null_byte_error(sql))?;

    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
    let mut tail: *const std::ffi::c_char = ptr::null();

    // SAFETY: All pointers are valid
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(
            db,
            c_sql.as_ptr(),
            c_sql.as_bytes().len() as c_int,
            &mut stmt,
            &mut tail,
        )
    };

    if rc != ffi::SQLITE_OK {
        // SAFETY: db is valid
        return Err(unsafe { query_error(db, Some(sql)) });
    }

    // Blank or comment-only SQL compiles to no statement at all
    if stmt.is_null() {
        return Err(Error::Query(QueryError {
            kind: QueryErrorKind::Misuse,
            code: None,
            sql: Some(sql.to_string()),
            message: "SQL text contains no statement".to_string(),
        }));
    }

    // The tail points into c_sql, whose bytes are those of sql
    let consumed = if tail.is_null() {
        sql.len()
    } else {
        tail as usize - c_sql.as_ptr() as usize
    };
    let rest = sql.get(consumed..).unwrap_or_default();
    if !is_blank_sql(rest) {
        // SAFETY: stmt is valid and not yet owned by a SqliteStatement
        unsafe { ffi::sqlite3_finalize(stmt) };
        return Err(Error::Query(QueryError {
            kind: QueryErrorKind::Misuse,
            code: None,
            sql: Some(sql.to_string()),
            message: format!("SQL text has more than one statement; unused: {}", rest.trim()),
        }));
    }

    Ok(stmt)
}

/// Is this SQL nothing but whitespace, semicolons and comments?
fn is_blank_sql(mut sql: &str) -> bool {
    loop {
        sql = sql.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |i| &rest[i..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            // An unterminated block comment runs to the end, as in SQLite
            sql = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else {
            return sql.is_empty();
        }
    }
}

/// Code and message for a failed call that returned `rc`.
///
/// Prefers the connection's extended code and message when they describe the
/// same failure.
///
/// # Safety
/// `db` must be a valid connection handle.
unsafe fn native_error(db: *mut ffi::sqlite3, rc: c_int) -> (c_int, String) {
    // SAFETY: caller guarantees db is valid
    unsafe {
        let code = ffi::extended_errcode(db);
        if ffi::primary_code(code) == ffi::primary_code(rc) {
            (code, ffi::errmsg(db))
        } else {
            (rc, ffi::error_string(rc).to_string())
        }
    }
}

/// Build a query error from the connection's current error state.
///
/// # Safety
/// `db` must be a valid connection handle.
unsafe fn query_error(db: *mut ffi::sqlite3, sql: Option<&str>) -> Error {
    // SAFETY: caller guarantees db is valid
    let (code, message) = unsafe { (ffi::extended_errcode(db), ffi::errmsg(db)) };

    Error::Query(QueryError {
        kind: error_code_to_kind(code),
        code: Some(code),
        sql: sql.map(str::to_string),
        message,
    })
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    match ffi::primary_code(code) {
        ffi::SQLITE_BUSY => QueryErrorKind::Busy,
        ffi::SQLITE_LOCKED => QueryErrorKind::Locked,
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_READONLY => QueryErrorKind::ReadOnly,
        ffi::SQLITE_CORRUPT | ffi::SQLITE_NOTADB => QueryErrorKind::Corrupt,
        ffi::SQLITE_IOERR | ffi::SQLITE_CANTOPEN => QueryErrorKind::Io,
        ffi::SQLITE_FULL => QueryErrorKind::Full,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_MISUSE | ffi::SQLITE_RANGE => QueryErrorKind::Misuse,
        ffi::SQLITE_INTERRUPT | ffi::SQLITE_ABORT => QueryErrorKind::Interrupted,
        _ => QueryErrorKind::Database,
    }
}
