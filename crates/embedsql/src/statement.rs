//! Compiled statements.

use crate::database::Database;
use embedsql_core::{
    Backend, BackendConnection, BackendStatement, BindError, BindErrorKind, Error, FromValue,
    ReadError, Result, Value,
};
use embedsql_sqlite::SqliteBackend;
use std::marker::PhantomData;

type BackendStmt<B> = <<B as Backend>::Connection as BackendConnection>::Statement;

/// Where a statement's cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Not yet run, or just reset
    Ready,
    /// Positioned on a result row
    Row,
    /// Exhausted; stays here until reset
    Done,
}

/// A compiled statement bound to its [`Database`].
///
/// Parameters are 1-based, result columns 0-based. A statement is reusable:
/// [`reset`](Self::reset) rewinds it while keeping bindings, and
/// [`clear_bindings`](Self::clear_bindings) sets every parameter to NULL.
pub struct Statement<'db, B: Backend = SqliteBackend> {
    inner: BackendStmt<B>,
    sql: String,
    cursor: Cursor,
    _db: PhantomData<&'db Database<B>>,
}

impl<B: Backend> std::fmt::Debug for Statement<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl<'db, B: Backend> Statement<'db, B> {
    pub(crate) fn new(inner: BackendStmt<B>, sql: &str) -> Self {
        Self {
            inner,
            sql: sql.to_string(),
            cursor: Cursor::Ready,
            _db: PhantomData,
        }
    }

    /// Bind a value to a 1-based parameter.
    ///
    /// Anything convertible into a [`Value`] is accepted; an empty `Option`
    /// binds NULL.
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match &value {
            Value::Text(s) => self.check_length(index, s.len())?,
            Value::Bytes(b) => self.check_length(index, b.len())?,
            _ => {}
        }
        self.inner.bind(index, &value)
    }

    /// Bind UTF-8 text to a 1-based parameter.
    pub fn bind_text(&mut self, index: usize, text: &str) -> Result<()> {
        self.check_length(index, text.len())?;
        self.inner.bind_text(index, text)
    }

    /// Bind a blob to a 1-based parameter.
    ///
    /// Fails with [`BindErrorKind::Range`] when the blob is longer than the
    /// backend's maximum length.
    pub fn bind_blob(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        self.check_length(index, bytes.len())?;
        self.inner.bind_blob(index, bytes)
    }

    fn check_length(&self, index: usize, len: usize) -> Result<()> {
        let max = self.inner.max_length();
        if len > max {
            return Err(Error::Bind(BindError {
                kind: BindErrorKind::Range,
                index,
                code: None,
                message: format!("payload of {len} bytes exceeds the maximum length of {max} bytes"),
            }));
        }
        Ok(())
    }

    /// Run the statement, or advance to its next row.
    ///
    /// Returns true when a row is available to [`get`](Self::get), false once
    /// the statement is exhausted. An exhausted statement keeps returning
    /// false until [`reset`](Self::reset).
    pub fn run(&mut self) -> Result<bool> {
        if self.cursor == Cursor::Done {
            return Ok(false);
        }
        tracing::trace!(sql = %self.sql, "Stepping statement");
        match self.inner.step() {
            Ok(true) => {
                self.cursor = Cursor::Row;
                Ok(true)
            }
            Ok(false) => {
                self.cursor = Cursor::Done;
                Ok(false)
            }
            Err(e) => {
                // A retry steps again from the start
                self.cursor = Cursor::Ready;
                Err(e)
            }
        }
    }

    /// Read a 0-based column of the current row.
    ///
    /// Use `Option<T>` for nullable columns; a non-optional `T` fails with
    /// [`ReadErrorKind::Type`](embedsql_core::ReadErrorKind::Type) on NULL.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        if self.cursor != Cursor::Row {
            return Err(Error::Read(ReadError::no_row(index)));
        }
        let value = self.inner.column(index)?;
        T::from_value(&value).map_err(|e| Error::Read(e.at(index)))
    }

    /// Read every column of the current row.
    pub fn values(&self) -> Result<Vec<Value>> {
        if self.cursor != Cursor::Row {
            return Err(Error::Read(ReadError::no_row(0)));
        }
        (0..self.inner.column_count())
            .map(|i| self.inner.column(i))
            .collect()
    }

    /// Rewind so the statement can run again. Bindings are kept.
    pub fn reset(&mut self) -> Result<()> {
        self.inner.reset()?;
        self.cursor = Cursor::Ready;
        Ok(())
    }

    /// Set every parameter back to NULL.
    pub fn clear_bindings(&mut self) -> Result<()> {
        self.inner.clear_bindings()
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.last_insert_rowid()
    }

    pub fn changes(&self) -> u64 {
        self.inner.changes()
    }

    pub fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    /// 1-based index of a named parameter, prefix included (`:id`, `@id`, `$id`).
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.inner.parameter_index(name)
    }

    pub fn column_count(&self) -> usize {
        self.inner.column_count()
    }

    pub fn column_name(&self, index: usize) -> Option<String> {
        self.inner.column_name(index)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedsql_core::{BindErrorKind, ReadErrorKind};

    fn db_with_table() -> Database {
        let db = Database::open_memory().unwrap();
        db.execute("CREATE TABLE t (a INTEGER, b TEXT)").unwrap();
        db
    }

    #[test]
    fn test_get_before_run() {
        let db = Database::open_memory().unwrap();
        let stmt = db.prepare("SELECT 1").unwrap();
        match stmt.get::<i64>(0).unwrap_err() {
            Error::Read(e) => {
                assert_eq!(e.kind, ReadErrorKind::NoRow);
                assert_eq!(e.index, Some(0));
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_done_is_sticky_until_reset() {
        let db = Database::open_memory().unwrap();
        let mut stmt = db.prepare("SELECT 7").unwrap();
        assert!(stmt.run().unwrap());
        assert!(!stmt.run().unwrap());
        assert!(!stmt.run().unwrap());
        assert!(matches!(
            stmt.get::<i64>(0),
            Err(Error::Read(ReadError {
                kind: ReadErrorKind::NoRow,
                ..
            }))
        ));

        stmt.reset().unwrap();
        assert!(stmt.run().unwrap());
        assert_eq!(stmt.get::<i64>(0).unwrap(), 7);
    }

    #[test]
    fn test_reset_keeps_bindings() {
        let db = db_with_table();
        let mut insert = db.prepare("INSERT INTO t (a, b) VALUES (?, ?)").unwrap();
        insert.bind(1, 1).unwrap();
        insert.bind(2, "x").unwrap();
        assert!(!insert.run().unwrap());
        insert.reset().unwrap();
        assert!(!insert.run().unwrap());
        insert.reset().unwrap();
        insert.clear_bindings().unwrap();
        assert!(!insert.run().unwrap());

        let mut select = db.prepare("SELECT a, b FROM t ORDER BY rowid").unwrap();
        let mut rows = Vec::new();
        while select.run().unwrap() {
            rows.push(select.values().unwrap());
        }
        assert_eq!(
            rows,
            vec![
                vec![Value::BigInt(1), Value::Text("x".to_string())],
                vec![Value::BigInt(1), Value::Text("x".to_string())],
                vec![Value::Null, Value::Null],
            ]
        );
    }

    #[test]
    fn test_null_requires_option() {
        let db = Database::open_memory().unwrap();
        let mut stmt = db.prepare("SELECT NULL").unwrap();
        assert!(stmt.run().unwrap());
        assert_eq!(stmt.get::<Option<i64>>(0).unwrap(), None);
        assert_eq!(stmt.get::<Option<String>>(0).unwrap(), None);
        match stmt.get::<i64>(0).unwrap_err() {
            Error::Read(e) => {
                assert_eq!(e.kind, ReadErrorKind::Type);
                assert_eq!(e.index, Some(0));
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_column_out_of_range() {
        let db = Database::open_memory().unwrap();
        let mut stmt = db.prepare("SELECT 1").unwrap();
        assert!(stmt.run().unwrap());
        assert!(matches!(
            stmt.get::<i64>(3),
            Err(Error::Read(ReadError {
                kind: ReadErrorKind::Column,
                ..
            }))
        ));
    }

    #[test]
    fn test_bind_index_out_of_range() {
        let db = Database::open_memory().unwrap();
        let mut stmt = db.prepare("SELECT ?").unwrap();
        match stmt.bind(5, 1).unwrap_err() {
            Error::Bind(e) => {
                assert_eq!(e.kind, BindErrorKind::Backend);
                assert_eq!(e.index, 5);
                assert_eq!(e.code, Some(25));
            }
            other => panic!("expected bind error, got {other:?}"),
        }
    }

    #[test]
    fn test_metadata() {
        let db = db_with_table();
        let stmt = db
            .prepare("SELECT a AS first, b AS second FROM t WHERE a = :a AND b = :b")
            .unwrap();
        assert_eq!(stmt.parameter_count(), 2);
        assert_eq!(stmt.parameter_index(":b"), Some(2));
        assert_eq!(stmt.column_count(), 2);
        assert_eq!(stmt.column_name(0).as_deref(), Some("first"));
        assert_eq!(stmt.column_name(2), None);
        assert!(stmt.sql().starts_with("SELECT a AS first"));
    }

    #[test]
    fn test_prepare_fails_on_unknown_table() {
        let db = Database::open_memory().unwrap();
        let err = db.prepare("SELECT * FROM nope").unwrap_err();
        assert_eq!(err.message(), "no such table: nope");
        assert_eq!(err.sql(), Some("SELECT * FROM nope"));
    }
}
