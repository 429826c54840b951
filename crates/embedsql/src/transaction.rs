//! Scoped transactions.

use crate::database::Database;
use crate::statement::Statement;
use embedsql_core::{Backend, COMMIT_SQL, ROLLBACK_SQL, Result, TransactionMode};
use embedsql_sqlite::SqliteBackend;

/// A BEGIN..COMMIT/ROLLBACK scope on a [`Database`].
///
/// Dropping an unresolved transaction rolls it back; a failure of that
/// automatic rollback is logged and discarded. [`commit`](Self::commit) and
/// [`rollback`](Self::rollback) consume the guard, so a transaction resolves
/// at most once:
///
/// ```compile_fail
/// use embedsql::{Database, TransactionMode};
///
/// let db = Database::open_memory()?;
/// let tx = db.transaction(TransactionMode::Deferred)?;
/// tx.commit()?;
/// tx.rollback()?;
/// # Ok::<(), embedsql::Error>(())
/// ```
#[must_use = "an unresolved transaction rolls back when dropped"]
pub struct Transaction<'db, B: Backend = SqliteBackend> {
    db: &'db Database<B>,
    mode: TransactionMode,
    needs_rollback: bool,
}

impl<B: Backend> std::fmt::Debug for Transaction<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("mode", &self.mode)
            .field("needs_rollback", &self.needs_rollback)
            .finish_non_exhaustive()
    }
}

impl<'db, B: Backend> Transaction<'db, B> {
    /// Start a transaction with `BEGIN <mode> TRANSACTION`.
    ///
    /// Fails with a query error if a transaction is already open.
    pub fn begin(db: &'db Database<B>, mode: TransactionMode) -> Result<Self> {
        db.execute(mode.begin_sql())?;
        tracing::debug!(mode = ?mode, path = %db.path(), "Transaction started");
        Ok(Self {
            db,
            mode,
            needs_rollback: true,
        })
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Execute SQL inside the transaction.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.db.execute(sql)
    }

    /// Compile a statement inside the transaction.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'db, B>> {
        self.db.prepare(sql)
    }

    /// Commit the transaction.
    ///
    /// A COMMIT that fails with a busy database leaves the transaction open
    /// with its writes intact. The caller can retry through
    /// `Database::execute("COMMIT")` or give up with `"ROLLBACK"`.
    pub fn commit(mut self) -> Result<()> {
        self.needs_rollback = false;
        self.db.execute(COMMIT_SQL)?;
        tracing::debug!(mode = ?self.mode, "Transaction committed");
        Ok(())
    }

    /// Roll back the transaction.
    pub fn rollback(mut self) -> Result<()> {
        self.needs_rollback = false;
        self.db.execute(ROLLBACK_SQL)?;
        tracing::debug!(mode = ?self.mode, "Transaction rolled back");
        Ok(())
    }
}

impl<B: Backend> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        if !self.needs_rollback {
            return;
        }
        match self.db.execute(ROLLBACK_SQL) {
            Ok(()) => tracing::debug!(mode = ?self.mode, "Unresolved transaction rolled back"),
            Err(e) => tracing::warn!(error = %e, "Automatic rollback failed"),
        }
    }
}
