//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or shared-cache in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Apply the configured schema mode before a handle becomes usable.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Anchor connections have the schema mode fully applied.

use super::config::{ConnectionConfig, DbTarget, SchemaMode};
use super::migrations::{apply_migrations, current_user_version, recreate_schema};
use super::DbResult;
use crate::logging::single_line;
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_LOGGED_SQL_CHARS: usize = 500;

/// Resolves the location every connection of one handle opens.
///
/// In-memory targets get a fresh shared-cache name, so each handle sees its
/// own database and sessions of that handle share it.
pub(crate) fn resolve_location(target: &DbTarget) -> PathBuf {
    match target {
        DbTarget::Memory => PathBuf::from(format!(
            "file:usermgr-{}?mode=memory&cache=shared",
            Uuid::new_v4().simple()
        )),
        DbTarget::File(path) => path.clone(),
    }
}

/// Opens the anchor connection of a handle and applies the schema mode.
///
/// # Side effects
/// - Creates, migrates or recreates entity tables depending on schema mode.
/// - Emits `db_open` logging events with duration and status.
pub(crate) fn open_anchor(config: &ConnectionConfig, location: &Path) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.target.mode();
    info!(
        "event=db_open module=db status=start mode={} schema_mode={} credentials={}",
        mode,
        config.schema_mode.as_str(),
        if config.credentials.is_some() { "present" } else { "absent" }
    );

    let mut conn = match open_connection(location, config.log_queries) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };

    match bootstrap_schema(&mut conn, config.schema_mode) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens one configured connection at `location`.
pub(crate) fn open_connection(location: &Path, log_queries: bool) -> DbResult<Connection> {
    let mut conn = Connection::open(location)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if log_queries {
        conn.trace(Some(trace_sql));
    }
    Ok(conn)
}

fn bootstrap_schema(conn: &mut Connection, schema_mode: SchemaMode) -> DbResult<()> {
    match schema_mode {
        SchemaMode::None => {
            // Touch the file so unreachable targets fail at init time.
            let version = current_user_version(conn)?;
            debug!("event=schema_version_read module=db status=ok user_version={version}");
            Ok(())
        }
        SchemaMode::Update => apply_migrations(conn),
        SchemaMode::Create => recreate_schema(conn),
    }
}

fn trace_sql(sql: &str) {
    debug!(
        "event=sql module=db status=ok sql={}",
        single_line(sql, MAX_LOGGED_SQL_CHARS)
    );
}
