//! # fleetmig-core
//!
//! The migration engine for a fleet of logical services sharing one
//! database: a directory scanner, an in-memory migration index, and an
//! orchestration layer that applies, force-applies, fakes, and verifies
//! migrations against whatever [`repository::Repository`] is plugged in.
//!
//! This crate has no database driver dependency. A concrete backend (for
//! example a Postgres one backed by `tokio-postgres`/`deadpool-postgres`)
//! lives in its own crate and implements [`repository::Repository`].

pub mod directive;
pub mod engine;
pub mod error;
pub mod migration;
pub mod repository;
pub mod scanner;
pub mod set;

pub use engine::Engine;
pub use error::{EngineResult, Error, ScanError};
pub use migration::{Migration, MigrationKey};
pub use repository::Repository;
pub use set::MigrationSet;
