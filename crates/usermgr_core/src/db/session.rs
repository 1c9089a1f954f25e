//! Per-call storage session.
//!
//! # Responsibility
//! - Wrap one connection exclusively owned by a single unit of work.
//! - Release the connection when the session goes out of scope.
//!
//! # Invariants
//! - A session is never shared between callers.
//! - Dropping a session closes its connection on every exit path.

use super::DbResult;
use log::debug;
use rusqlite::{Connection, Transaction};
use std::time::Instant;

/// One open connection, alive for the duration of a unit of work.
pub struct Session {
    conn: Connection,
    opened_at: Instant,
}

impl Session {
    pub(crate) fn new(conn: Connection) -> Self {
        debug!("event=session_open module=db status=ok");
        Self {
            conn,
            opened_at: Instant::now(),
        }
    }

    /// Begins a deferred transaction bound to this session.
    ///
    /// The transaction rolls back on drop unless committed.
    pub fn begin(&mut self) -> DbResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Borrows the underlying connection for statements outside a transaction.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(
            "event=session_release module=db status=ok held_ms={}",
            self.opened_at.elapsed().as_millis()
        );
    }
}
