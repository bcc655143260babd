//! Bootstrap DDL for the two bookkeeping tables.
//!
//! Idempotent: `CREATE TABLE IF NOT EXISTS`, `CREATE OR REPLACE FUNCTION`, and
//! `DROP TRIGGER IF EXISTS` followed by `CREATE TRIGGER` (the target Postgres
//! version may not support `CREATE OR REPLACE TRIGGER`).

pub const BOOTSTRAP: &str = r#"
CREATE OR REPLACE FUNCTION fleetmig_set_updated_at() RETURNS trigger AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TABLE IF NOT EXISTS migration_services (
    id serial PRIMARY KEY,
    name varchar NOT NULL UNIQUE,
    version int NOT NULL DEFAULT 0,
    created_at timestamptz NOT NULL DEFAULT NOW(),
    updated_at timestamptz NOT NULL DEFAULT NOW()
);

DROP TRIGGER IF EXISTS migration_services_set_updated_at ON migration_services;
CREATE TRIGGER migration_services_set_updated_at
    BEFORE UPDATE ON migration_services
    FOR EACH ROW EXECUTE FUNCTION fleetmig_set_updated_at();

CREATE TABLE IF NOT EXISTS migration_service_logs (
    id serial PRIMARY KEY,
    migration_services_name varchar NOT NULL,
    priority int NOT NULL,
    version int NOT NULL,
    file_name varchar NOT NULL,
    sql text NOT NULL,
    hash varchar NOT NULL,
    created_at timestamptz NOT NULL DEFAULT NOW(),
    updated_at timestamptz NOT NULL DEFAULT NOW(),
    UNIQUE (migration_services_name, priority, version, file_name)
);

CREATE INDEX IF NOT EXISTS migration_service_logs_hash_idx ON migration_service_logs (hash);

DROP TRIGGER IF EXISTS migration_service_logs_set_updated_at ON migration_service_logs;
CREATE TRIGGER migration_service_logs_set_updated_at
    BEFORE UPDATE ON migration_service_logs
    FOR EACH ROW EXECUTE FUNCTION fleetmig_set_updated_at();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_ddl_is_written_to_be_idempotent() {
        assert!(BOOTSTRAP.contains("CREATE TABLE IF NOT EXISTS migration_services"));
        assert!(BOOTSTRAP.contains("CREATE TABLE IF NOT EXISTS migration_service_logs"));
        assert!(BOOTSTRAP.contains("CREATE OR REPLACE FUNCTION"));
        assert!(BOOTSTRAP.contains("DROP TRIGGER IF EXISTS"));
        assert!(BOOTSTRAP.contains("CREATE INDEX IF NOT EXISTS"));
    }
}
