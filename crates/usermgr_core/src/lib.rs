//! Core persistence logic for usermgr.
//! This crate owns the storage handle, the per-call unit of work and the
//! user repository/service contracts.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{
    ConfigError, ConnectionConfig, ConnectionFactory, Credentials, DbError, DbTarget, InitError,
    SchemaMode, Session, StoreHandle,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::user::{User, UserId, UserValidationError};
pub use repo::unit_of_work::with_unit_of_work;
pub use repo::user_repo::{
    ReadFailurePolicy, RepoError, RepoResult, SqliteUserRepository, UserRepository,
};
pub use service::user_service::UserService;
