//! `fleetmig` command-line and HTTP entrypoint.
//!
//! The public surface is intentionally small: most logic lives in
//! `fleetmig-core`/`fleetmig-db`, this crate only parses argv, loads
//! configuration, connects to the database, and dispatches.

pub mod cli;
pub mod config;
pub mod http;

use config::Config;
use fleetmig_core::Engine;
use fleetmig_db::{DbError, PgRepository, PoolConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Runs the `fleetmig` CLI with an argv-style argument list.
///
/// Most callers should pass `std::env::args().collect()`.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let command = cli::parse_args(&args)?;
    if let cli::Command::Help = command {
        cli::print_help();
        return Ok(());
    }

    let config = Config::load()?;
    let pool = connect_with_retry(&config.database).await?;
    let engine = Engine::new(PgRepository::new(pool));

    match command {
        cli::Command::Help => unreachable!("handled above"),
        cli::Command::Init => {
            engine.init().await?;
            tracing::info!("bookkeeping tables ready");
        }
        cli::Command::Force(paths) => {
            let n = engine.force_apply(&paths, &config.env_name).await?;
            tracing::info!(applied = n, "force-applied migrations");
        }
        cli::Command::Fake(paths) => {
            engine.fake_apply(&paths).await?;
            tracing::info!("fake-applied migrations");
        }
        cli::Command::Check(paths) => {
            let paths = default_to_dir(paths, &config.migration_dir);
            let (all_equal, differing) = engine.check_migration_hash(&paths).await?;
            if all_equal {
                println!("all migrations match their recorded hash");
            } else {
                println!("hash mismatch in {} file(s):", differing.len());
                for path in &differing {
                    println!("  {}", path.display());
                }
                anyhow::bail!("hash check failed");
            }
        }
        cli::Command::CheckApply(paths) => {
            let paths = default_to_dir(paths, &config.migration_dir);
            let n = engine
                .check_and_apply_migrations(&paths, &config.env_name)
                .await?;
            tracing::info!(applied = n, "check-and-apply complete");
        }
        cli::Command::FinalSql(service) => {
            let sql = engine.get_sql(&config.migration_dir, &service).await?;
            print!("{sql}");
        }
        cli::Command::ApplyAll { apply_only } => {
            let n = if config.force_apply {
                engine
                    .force_apply(&[config.migration_dir.clone()], &config.env_name)
                    .await?
            } else {
                engine
                    .apply_all(&config.migration_dir, &config.env_name)
                    .await?
            };
            tracing::info!(applied = n, "applied migrations");

            let apply_only = apply_only || config.apply_only;
            if !apply_only {
                serve_http(config, engine).await?;
            }
        }
    }

    Ok(())
}

fn default_to_dir(paths: Vec<PathBuf>, dir: &Path) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![dir.to_path_buf()]
    } else {
        paths
    }
}

async fn connect_with_retry(cfg: &config::DatabaseConfig) -> anyhow::Result<deadpool_postgres::Pool> {
    let pool_cfg = PoolConfig {
        host: cfg.host.clone(),
        port: cfg.port,
        user: cfg.user.clone(),
        password: cfg.password.clone(),
        database: cfg.database.clone(),
        max_size: cfg.max_connections,
    };

    const MAX_ATTEMPTS: u32 = 10;
    let pool = fleetmig_db::create_pool(&pool_cfg)?;

    for attempt in 1..=MAX_ATTEMPTS {
        match pool.get().await {
            Ok(_) => return Ok(pool),
            Err(error) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, %error, "failed to connect to database, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(error) => {
                anyhow::bail!(DbError::from(error));
            }
        }
    }

    unreachable!("loop always returns or bails on the final attempt")
}

async fn serve_http(config: Config, engine: Engine<PgRepository>) -> anyhow::Result<()> {
    let state = Arc::new(http::AppState {
        engine,
        migration_dir: config.migration_dir,
        env_name: config.env_name,
        ready: AtomicBool::new(true),
    });

    let addr = format!("{}:{}", config.http_host, config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, http::router(state)).await?;
    Ok(())
}
