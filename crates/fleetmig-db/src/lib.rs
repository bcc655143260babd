//! # fleetmig-db
//!
//! The Postgres backend for `fleetmig-core`'s [`fleetmig_core::repository::Repository`]
//! trait: a `deadpool-postgres` connection pool, the bootstrap DDL for the two
//! bookkeeping tables, and SQLSTATE-aware error translation (undefined_table →
//! auto-create-and-retry-once, per the engine's table-missing contract).

pub mod ddl;
pub mod error;
pub mod pool;
pub mod repository;

pub use error::DbError;
pub use pool::{create_pool, PoolConfig};
pub use repository::PgRepository;
