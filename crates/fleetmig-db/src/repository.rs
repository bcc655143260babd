//! The Postgres [`Repository`] implementation.

use crate::ddl;
use crate::error::DbError;
use deadpool_postgres::Pool;
use fleetmig_core::repository::{LogKey, LogRecord, Repository};

pub struct PgRepository {
    pool: Pool,
}

impl PgRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn query_version(&self, name: &str) -> Result<i32, DbError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT version FROM migration_services WHERE name = $1",
                &[&name],
            )
            .await
            .map_err(DbError::from_db_error)?;
        Ok(row.map(|r| r.get::<_, i32>("version")).unwrap_or(0))
    }

    async fn insert_log(&self, record: &LogRecord) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO migration_service_logs \
                 (migration_services_name, priority, version, file_name, sql, hash) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (migration_services_name, priority, version, file_name) \
                 DO UPDATE SET sql = EXCLUDED.sql, hash = EXCLUDED.hash",
                &[
                    &record.service_name,
                    &record.service_priority,
                    &record.file_version,
                    &record.file_name,
                    &record.sql,
                    &record.hash,
                ],
            )
            .await
            .map_err(DbError::from_db_error)?;
        Ok(())
    }
}

impl Repository for PgRepository {
    type Error = DbError;

    async fn get_service_version(&self, name: &str) -> Result<i32, DbError> {
        match self.query_version(name).await {
            Err(e) if e.is_undefined_table() => {
                self.create_migration_table().await?;
                self.query_version(name).await
            }
            other => other,
        }
    }

    async fn update_service_version(&self, name: &str, version: i32) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO migration_services (name, version) VALUES ($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET version = EXCLUDED.version",
                &[&name, &version],
            )
            .await
            .map_err(DbError::from_db_error)?;
        Ok(())
    }

    async fn exec(&self, sql: &str) -> Result<(), DbError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await.map_err(DbError::from_db_error)?;
        match tx.batch_execute(sql).await {
            Ok(()) => {
                tx.commit().await.map_err(DbError::from_db_error)?;
                Ok(())
            }
            Err(e) => {
                let translated = DbError::from_db_error(e);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback after failed migration also failed");
                }
                Err(translated)
            }
        }
    }

    async fn write_migration_service_log(&self, record: LogRecord) -> Result<(), DbError> {
        match self.insert_log(&record).await {
            Err(e) if e.is_undefined_table() => {
                self.create_migration_table().await?;
                self.insert_log(&record).await
            }
            other => other,
        }
    }

    async fn get_hash_from_migration_service_log(&self, key: LogKey<'_>) -> Result<String, DbError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT hash FROM migration_service_logs \
                 WHERE migration_services_name = $1 AND priority = $2 \
                 AND version = $3 AND file_name = $4",
                &[
                    &key.service_name,
                    &key.service_priority,
                    &key.file_version,
                    &key.file_name,
                ],
            )
            .await
            .map_err(DbError::from_db_error)?;
        Ok(row.map(|r| r.get::<_, String>("hash")).unwrap_or_default())
    }

    async fn create_migration_table(&self) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client
            .batch_execute(ddl::BOOTSTRAP)
            .await
            .map_err(DbError::from_db_error)?;
        Ok(())
    }
}
