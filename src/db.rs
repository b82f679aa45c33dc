//! Database pool and schema bootstrap.

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};
use tracing::{Instrument, debug, info_span};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// DSN for a private, process-local database.
pub const MEMORY_DSN: &str = "sqlite::memory:";

/// Open a pool for `dsn` and make sure the schema exists.
///
/// Acquiring a connection times out instead of waiting forever, so a wedged
/// database surfaces as an error to the caller.
///
/// # Errors
/// Returns an error if the DSN is invalid, the database cannot be opened, or
/// the schema cannot be applied.
pub async fn connect(dsn: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(dsn)
        .with_context(|| format!("Invalid database DSN: {dsn}"))?;

    // Every connection to `:memory:` is its own database, so keep exactly one
    // and never recycle it.
    let in_memory = dsn.contains(":memory:");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
    };

    let pool = pool_options
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    apply_schema(&pool).await?;

    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        let span = info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "DDL",
            db.statement = statement.as_str()
        );
        sqlx::query(statement)
            .execute(pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }
    debug!("Database schema ready");
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}
