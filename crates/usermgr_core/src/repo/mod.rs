//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract consumed by services.
//! - Isolate SQLite query and transaction details from orchestration.
//!
//! # Invariants
//! - Every repository call runs inside exactly one unit of work.
//! - Absence is `None`/empty, never an error.

pub mod unit_of_work;
pub mod user_repo;
