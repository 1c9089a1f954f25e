//! Domain model for persisted records.
//!
//! # Responsibility
//! - Define data structures shared by repository, service and driver layers.
//!
//! # Invariants
//! - Identity is assigned by storage, never by callers.

pub mod user;
