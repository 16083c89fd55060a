use diesel::{sql_query, RunQueryDsl, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use crate::error::{DbError, Result};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs every pending migration and returns how many were applied.
///
/// A migration whose objects already exist (a database created before the
/// migrations table was) is recorded as applied and skipped.
pub fn apply_migrations(conn: &mut SqliteConnection) -> Result<usize> {
    let mut applied = 0;
    loop {
        match conn.run_pending_migrations(MIGRATIONS) {
            Ok(versions) => {
                applied += versions.len();
                break;
            }
            Err(e) if e.to_string().contains("already exists") => {
                mark_first_pending(conn)?;
                applied += 1;
            }
            Err(e) => return Err(DbError::MigrationError(e.to_string())),
        }
    }

    if applied > 0 {
        info!(applied, "applied database migrations");
    } else {
        debug!("database schema is up to date");
    }
    Ok(applied)
}

fn mark_first_pending(conn: &mut SqliteConnection) -> Result<()> {
    let pending = conn
        .pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::MigrationError(e.to_string()))?;
    if let Some(first) = pending.first() {
        debug!(version = %first.name().version(), "marking migration as applied");
        sql_query("INSERT INTO __diesel_schema_migrations (version) VALUES (?1)")
            .bind::<diesel::sql_types::Text, _>(first.name().version().to_string())
            .execute(conn)?;
    }

    Ok(())
}
