//! Connection pool construction.

use crate::error::DbError;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

/// The subset of `DB_*` configuration needed to open a pool.
pub struct PoolConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_size: usize,
}

/// Builds a `NoTls` pool sized by `cfg.max_size`.
///
/// Production deployments that need TLS should construct their own
/// `deadpool_postgres::Manager` with a TLS connector; this crate targets the
/// same local/dev-friendly default the teacher's `create_pool_with_config` does.
pub fn create_pool(cfg: &PoolConfig) -> Result<Pool, DbError> {
    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .host(&cfg.host)
        .port(cfg.port)
        .user(&cfg.user)
        .password(&cfg.password)
        .dbname(&cfg.database);

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let manager = Manager::from_config(pg_config, NoTls, manager_config);

    Pool::builder(manager)
        .max_size(cfg.max_size)
        .build()
        .map_err(DbError::from)
}
