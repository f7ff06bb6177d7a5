//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract consumed by the ranking engine.
//! - Isolate SQLite query details from engine/service orchestration.
//!
//! # Invariants
//! - Repository writes validate model records before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod ranking_repo;
