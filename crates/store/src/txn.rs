use std::cell::Cell;

use crate::error::StoreError;
use crate::SqliteStore;

/// A reference-counted transaction guard.
///
/// Nested guards stack via SQLite `SAVEPOINT`s: only the outermost guard's
/// commit issues a real `COMMIT`; an inner guard's commit releases its
/// savepoint. A guard dropped without calling [`Self::commit`] rolls back —
/// to the enclosing savepoint if nested, or the whole transaction if
/// outermost — so a `?`-propagated error anywhere inside the guarded scope
/// can never leave a partial write observable.
pub struct TransactionGuard<'a> {
    store: &'a SqliteStore,
    depth_at_entry: u32,
    finished: Cell<bool>,
}

impl<'a> TransactionGuard<'a> {
    pub(crate) fn begin(store: &'a SqliteStore) -> Result<Self, StoreError> {
        let depth_at_entry = store.txn_depth.get();
        if depth_at_entry == 0 {
            store.conn.borrow().execute_batch("BEGIN IMMEDIATE")?;
        } else {
            store
                .conn
                .borrow()
                .execute_batch(&format!("SAVEPOINT sp{depth_at_entry}"))?;
        }
        store.txn_depth.set(depth_at_entry + 1);
        Ok(Self {
            store,
            depth_at_entry,
            finished: Cell::new(false),
        })
    }

    /// Commits this guard's scope. At depth zero this is a real `COMMIT`;
    /// otherwise it releases the nested savepoint, leaving the enclosing
    /// guard free to commit or roll back the whole transaction later.
    pub fn commit(self) -> Result<(), StoreError> {
        if self.depth_at_entry == 0 {
            self.store.conn.borrow().execute_batch("COMMIT")?;
        } else {
            self.store
                .conn
                .borrow()
                .execute_batch(&format!("RELEASE sp{depth}", depth = self.depth_at_entry))?;
        }
        self.store.txn_depth.set(self.depth_at_entry);
        self.finished.set(true);
        Ok(())
    }

    fn rollback(&self) {
        let result = if self.depth_at_entry == 0 {
            self.store.conn.borrow().execute_batch("ROLLBACK")
        } else {
            self.store.conn.borrow().execute_batch(&format!(
                "ROLLBACK TO sp{depth}; RELEASE sp{depth}",
                depth = self.depth_at_entry
            ))
        };
        if let Err(error) = result {
            tracing::error!(%error, "failed to roll back transaction guard on drop");
        }
        self.store.txn_depth.set(self.depth_at_entry);
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished.get() {
            self.rollback();
            self.finished.set(true);
        }
    }
}
