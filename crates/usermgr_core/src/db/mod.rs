//! SQLite storage bootstrap, connection factory and sessions.
//!
//! # Responsibility
//! - Own the live storage handle and rebuild it on demand.
//! - Open per-call sessions against that handle.
//! - Apply schema migrations according to the configured schema mode.
//!
//! # Invariants
//! - At most one live handle exists per factory.
//! - Sessions are never opened against a closed handle.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod config;
pub mod factory;
pub mod migrations;
mod open;
pub mod session;

pub use config::{ConfigError, ConnectionConfig, Credentials, DbTarget, SchemaMode};
pub use factory::{ConnectionFactory, InitError, StoreHandle};
pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The handle was closed by reconfiguration or shutdown.
    HandleClosed,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::HandleClosed => write!(f, "storage handle is closed"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::HandleClosed => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
