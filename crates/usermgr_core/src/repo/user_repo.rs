//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the five transactional operations over `users` storage.
//! - Keep SQL details inside the core persistence boundary.
//! - Apply the read failure policy at the read boundary only.
//!
//! # Invariants
//! - Every operation is its own unit of work.
//! - Any scalar field values are accepted; storage constraints decide.
//! - Write failures always propagate; `InitError` always propagates.
//! - `created_at` is written once by `save` and never by `update`.

use crate::db::{ConnectionFactory, DbError, InitError};
use crate::model::user::{User, UserId};
use crate::repo::unit_of_work::with_unit_of_work;
use log::warn;
use rusqlite::{params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    age,
    created_at
FROM users";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// Storage engine could not be constructed. Fatal.
    Init(InitError),
    Db(DbError),
    /// Operation needs a persisted user but `id` is unset.
    MissingId,
    NotFound(UserId),
    /// `save` received a user that already has an identifier.
    AlreadyPersisted(UserId),
    InvalidData(String),
}

impl RepoError {
    /// Returns whether no further storage work can proceed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingId => write!(f, "user has no id; save it first"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::AlreadyPersisted(id) => write!(f, "user already persisted with id {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Init(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::MissingId
            | Self::NotFound(_)
            | Self::AlreadyPersisted(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<InitError> for RepoError {
    fn from(value: InitError) -> Self {
        Self::Init(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What reads do with a non-fatal failure after rolling back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Report the failure as absent/empty and log it.
    #[default]
    Degrade,
    /// Return the failure to the caller.
    Propagate,
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_all(&self) -> RepoResult<Vec<User>>;
    fn save(&self, user: User) -> RepoResult<User>;
    fn update(&self, user: User) -> RepoResult<User>;
    fn delete(&self, user: User) -> RepoResult<()>;
}

/// SQLite-backed user repository borrowing the application's factory.
pub struct SqliteUserRepository<'f> {
    factory: &'f ConnectionFactory,
    read_policy: ReadFailurePolicy,
}

impl<'f> SqliteUserRepository<'f> {
    pub fn new(factory: &'f ConnectionFactory) -> Self {
        Self {
            factory,
            read_policy: ReadFailurePolicy::default(),
        }
    }

    pub fn with_read_policy(mut self, read_policy: ReadFailurePolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    /// Reads one user, keeping failures distinct from absence.
    pub fn try_find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        with_unit_of_work(self.factory, "find_by_id", |tx| {
            let mut stmt = tx.prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_user_row(row)?));
            }
            Ok(None)
        })
    }

    /// Reads all users in storage order, keeping failures distinct from
    /// an empty table.
    pub fn try_find_all(&self) -> RepoResult<Vec<User>> {
        with_unit_of_work(self.factory, "find_all", |tx| {
            let mut stmt = tx.prepare(&format!("{USER_SELECT_SQL};"))?;
            let mut rows = stmt.query([])?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(parse_user_row(row)?);
            }
            Ok(users)
        })
    }

    fn apply_read_policy<T>(
        &self,
        operation: &'static str,
        result: RepoResult<T>,
        fallback: impl FnOnce() -> T,
    ) -> RepoResult<T> {
        match result {
            Err(err) if !err.is_fatal() && self.read_policy == ReadFailurePolicy::Degrade => {
                warn!(
                    "event=read_degraded module=repo status=error op={} error={}",
                    operation, err
                );
                Ok(fallback())
            }
            other => other,
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.apply_read_policy("find_by_id", self.try_find_by_id(id), || None)
    }

    fn find_all(&self) -> RepoResult<Vec<User>> {
        self.apply_read_policy("find_all", self.try_find_all(), Vec::new)
    }

    fn save(&self, mut user: User) -> RepoResult<User> {
        if let Some(id) = user.id {
            return Err(RepoError::AlreadyPersisted(id));
        }

        let created_at = now_epoch_ms();
        let id = with_unit_of_work(self.factory, "save", |tx| {
            tx.execute(
                "INSERT INTO users (name, email, age, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![user.name, user.email, user.age, created_at],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        user.id = Some(id);
        user.created_at = Some(created_at);
        Ok(user)
    }

    fn update(&self, user: User) -> RepoResult<User> {
        let id = user.id.ok_or(RepoError::MissingId)?;

        with_unit_of_work(self.factory, "update", |tx| {
            let changed = tx.execute(
                "UPDATE users
                 SET
                    name = ?1,
                    email = ?2,
                    age = ?3
                 WHERE id = ?4;",
                params![user.name, user.email, user.age, id],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        })?;

        Ok(user)
    }

    fn delete(&self, user: User) -> RepoResult<()> {
        let id = user.id.ok_or(RepoError::MissingId)?;

        with_unit_of_work(self.factory, "delete", |tx| {
            let changed = tx.execute("DELETE FROM users WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        })
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let created_at: i64 = row.get("created_at")?;
    if created_at < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative created_at `{created_at}` in users.created_at"
        )));
    }

    Ok(User {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        age: row.get("age")?,
        created_at: Some(created_at),
    })
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
