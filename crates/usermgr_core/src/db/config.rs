//! Connection configuration and the default configuration source.
//!
//! # Responsibility
//! - Describe where storage lives and how its schema is managed.
//! - Load configuration from a TOML file when none is set explicitly.
//!
//! # Invariants
//! - A missing default source file means built-in defaults, never an error.
//! - Passwords never appear in `Debug` output or logs.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

/// File name of the default configuration source, resolved against the
/// working directory.
pub const DEFAULT_CONFIG_FILE: &str = "usermgr.toml";
/// Database file used when no configuration source exists.
pub const DEFAULT_DB_FILE: &str = "usermgr.db";

/// Where the storage engine connects to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum DbTarget {
    /// Private in-memory database, recreated for every handle.
    Memory,
    /// SQLite database file.
    File(PathBuf),
}

impl DbTarget {
    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

impl From<String> for DbTarget {
    fn from(value: String) -> Self {
        match value.trim() {
            "memory" | ":memory:" => Self::Memory,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

impl Display for DbTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, ":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Schema management applied when a handle is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Leave the schema untouched.
    None,
    /// Apply pending migrations, keeping existing rows.
    #[default]
    Update,
    /// Drop entity tables and create them from scratch.
    Create,
}

impl SchemaMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Update => "update",
            Self::Create => "create",
        }
    }
}

/// Authentication material for engines that use it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration the connection factory builds its handle from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub target: DbTarget,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub schema_mode: SchemaMode,
    #[serde(default)]
    pub log_queries: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DB_FILE)
    }
}

impl ConnectionConfig {
    /// In-memory database with schema updates and query logging off.
    pub fn in_memory() -> Self {
        Self {
            target: DbTarget::Memory,
            credentials: None,
            schema_mode: SchemaMode::Update,
            log_queries: false,
        }
    }

    /// File database with schema updates and query logging off.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: DbTarget::File(path.into()),
            ..Self::in_memory()
        }
    }

    pub fn with_schema_mode(mut self, schema_mode: SchemaMode) -> Self {
        self.schema_mode = schema_mode;
        self
    }

    pub fn with_log_queries(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    /// - `Io` when the file exists but cannot be read.
    /// - `Parse` when the file is not a valid configuration.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }
}

/// Failure to read the configuration source.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid connection config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}
