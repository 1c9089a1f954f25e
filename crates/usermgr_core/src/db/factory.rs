//! Lazily initialized, reconfigurable connection factory.
//!
//! # Responsibility
//! - Build the storage handle on first use from explicit or default config.
//! - Tear the handle down on reconfiguration and shutdown.
//! - Report engine construction failures as fatal `InitError`s.
//!
//! # Invariants
//! - At most one live handle exists per factory at any time.
//! - Handle construction happens under the state lock, so racing first
//!   callers observe the same handle.
//! - A closed handle is never returned; the next caller rebuilds it.

use super::config::{ConfigError, ConnectionConfig, DEFAULT_CONFIG_FILE};
use super::open::{open_anchor, open_connection, resolve_location};
use super::session::Session;
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Fatal failure to construct the storage engine.
///
/// Nothing can run without a handle, so callers must not degrade this into
/// an empty or absent result.
#[derive(Debug)]
pub enum InitError {
    /// The default configuration source could not be loaded.
    Config { path: PathBuf, source: ConfigError },
    /// The engine could not be opened or its schema could not be applied.
    Engine { target: String, source: DbError },
}

impl Display for InitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config { path, source } => write!(
                f,
                "storage initialization failed loading `{}`: {source}",
                path.display()
            ),
            Self::Engine { target, source } => {
                write!(f, "storage initialization failed for `{target}`: {source}")
            }
        }
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config { source, .. } => Some(source),
            Self::Engine { source, .. } => Some(source),
        }
    }
}

/// Live storage engine handle that sessions are opened from.
pub struct StoreHandle {
    config: ConnectionConfig,
    location: PathBuf,
    anchor: Mutex<Option<Connection>>,
}

impl StoreHandle {
    fn build(config: ConnectionConfig) -> DbResult<Self> {
        let location = resolve_location(&config.target);
        let anchor = open_anchor(&config, &location)?;
        Ok(Self {
            config,
            location,
            anchor: Mutex::new(Some(anchor)),
        })
    }

    /// Configuration this handle was built from.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Opens a new session exclusively owned by the caller.
    ///
    /// # Errors
    /// - `HandleClosed` after `close()`.
    /// - `Sqlite` when the connection cannot be opened.
    pub fn open_session(&self) -> DbResult<Session> {
        let anchor = self.lock_anchor();
        if anchor.is_none() {
            return Err(DbError::HandleClosed);
        }
        let conn = open_connection(&self.location, self.config.log_queries)?;
        Ok(Session::new(conn))
    }

    pub fn is_closed(&self) -> bool {
        self.lock_anchor().is_none()
    }

    /// Closes the handle. Safe to call more than once.
    ///
    /// In-memory databases are discarded with their anchor connection.
    pub fn close(&self) {
        let Some(conn) = self.lock_anchor().take() else {
            return;
        };
        match conn.close() {
            Ok(()) => info!(
                "event=handle_close module=db status=ok mode={}",
                self.config.target.mode()
            ),
            Err((_, err)) => warn!(
                "event=handle_close module=db status=error mode={} error={}",
                self.config.target.mode(),
                err
            ),
        }
    }

    fn lock_anchor(&self) -> MutexGuard<'_, Option<Connection>> {
        self.anchor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct FactoryState {
    config: Option<ConnectionConfig>,
    handle: Option<Arc<StoreHandle>>,
}

/// Owner of the single live storage handle.
///
/// Constructed by the composition root and borrowed by repositories.
pub struct ConnectionFactory {
    default_source: PathBuf,
    state: Mutex<FactoryState>,
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFactory {
    /// Creates a factory that reads `usermgr.toml` when no configuration is set.
    pub fn new() -> Self {
        Self::with_default_source(DEFAULT_CONFIG_FILE)
    }

    /// Creates a factory with a custom default configuration source file.
    pub fn with_default_source(path: impl Into<PathBuf>) -> Self {
        Self {
            default_source: path.into(),
            state: Mutex::new(FactoryState::default()),
        }
    }

    /// Creates a factory with an explicit configuration already set.
    pub fn with_config(config: ConnectionConfig) -> Self {
        let factory = Self::new();
        factory.lock_state().config = Some(config);
        factory
    }

    /// Builds the handle if none is live.
    ///
    /// # Errors
    /// - `InitError` when configuration cannot be loaded or the engine cannot
    ///   be constructed.
    pub fn initialize(&self) -> Result<(), InitError> {
        let mut state = self.lock_state();
        self.ensure_live(&mut state).map(|_| ())
    }

    /// Returns the live handle, building it first when absent or closed.
    pub fn get_handle(&self) -> Result<Arc<StoreHandle>, InitError> {
        let mut state = self.lock_state();
        self.ensure_live(&mut state)
    }

    /// Replaces the configuration, closing the current handle.
    ///
    /// The next `get_handle()` builds against `config` only.
    pub fn set_configuration(&self, config: ConnectionConfig) {
        let mut state = self.lock_state();
        let closed = close_handle(&mut state);
        info!(
            "event=factory_reconfigure module=db status=ok closed_handle={} mode={} schema_mode={}",
            closed,
            config.target.mode(),
            config.schema_mode.as_str()
        );
        state.config = Some(config);
    }

    /// Closes the live handle and forgets the configuration. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        let closed = close_handle(&mut state);
        state.config = None;
        if closed {
            info!("event=factory_shutdown module=db status=ok");
        }
    }

    /// Returns the explicitly set configuration, if any.
    pub fn configuration(&self) -> Option<ConnectionConfig> {
        self.lock_state().config.clone()
    }

    fn ensure_live(&self, state: &mut FactoryState) -> Result<Arc<StoreHandle>, InitError> {
        if let Some(handle) = state.handle.as_ref().filter(|handle| !handle.is_closed()) {
            return Ok(Arc::clone(handle));
        }

        let started_at = Instant::now();
        let config = match &state.config {
            Some(config) => config.clone(),
            None => ConnectionConfig::load_or_default(&self.default_source).map_err(|source| {
                error!(
                    "event=factory_init module=db status=error error_code=config_load_failed path={} error={}",
                    self.default_source.display(),
                    source
                );
                InitError::Config {
                    path: self.default_source.clone(),
                    source,
                }
            })?,
        };

        let target = config.target.to_string();
        let handle = StoreHandle::build(config).map_err(|source| {
            error!(
                "event=factory_init module=db status=error error_code=engine_build_failed target={} error={}",
                target, source
            );
            InitError::Engine {
                target: target.clone(),
                source,
            }
        })?;

        info!(
            "event=factory_init module=db status=ok target={} duration_ms={}",
            target,
            started_at.elapsed().as_millis()
        );
        let handle = Arc::new(handle);
        state.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }

    fn lock_state(&self) -> MutexGuard<'_, FactoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionFactory {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn close_handle(state: &mut FactoryState) -> bool {
    match state.handle.take() {
        Some(handle) if !handle.is_closed() => {
            handle.close();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionFactory;
    use crate::db::{ConnectionConfig, DbError};
    use std::sync::Arc;

    #[test]
    fn get_handle_is_idempotent_until_shutdown() {
        let factory = ConnectionFactory::with_config(ConnectionConfig::in_memory());

        let first = factory.get_handle().unwrap();
        let second = factory.get_handle().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        factory.shutdown();
        assert!(first.is_closed());
        assert!(factory.configuration().is_none());
    }

    #[test]
    fn shutdown_without_handle_is_a_no_op() {
        let factory = ConnectionFactory::with_config(ConnectionConfig::in_memory());
        factory.shutdown();
        factory.shutdown();
        assert!(factory.configuration().is_none());
    }

    #[test]
    fn closed_handle_is_rebuilt_on_next_get() {
        let factory = ConnectionFactory::with_config(ConnectionConfig::in_memory());
        let first = factory.get_handle().unwrap();
        first.close();

        assert!(matches!(first.open_session(), Err(DbError::HandleClosed)));
        let rebuilt = factory.get_handle().unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert!(!rebuilt.is_closed());
    }
}
