//! Core use-case services.
//!
//! # Responsibility
//! - Translate identifiers into repository calls for driver layers.
//! - Keep console/driver code decoupled from storage details.

pub mod user_service;
