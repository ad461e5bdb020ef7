mod cooldowns;
mod membership;
mod transitions;
mod types;

use std::{str::FromStr, sync::atomic::AtomicBool};

pub use sqlx::Error;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Sqlite,
};

pub use types::*;

type Pool = sqlx::Pool<Sqlite>;
static WAS_CONSTRUCTED: AtomicBool = AtomicBool::new(false);

/// Persistent storage of list memberships and cooldowns.
///
/// Every multi-step change to a single (user, list) pair is done
/// either as one conditional statement or inside one transaction,
/// so command handlers and the enforcement loop can run at the same
/// time without locks of their own.
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Open (or create) the database at the given sqlx connection string.
    ///
    /// # Panics
    ///
    /// Panics if called a second time. Two pools on one SQLite file
    /// would just fight over the lock.
    pub async fn new(url: &str) -> Result<Database, Error> {
        assert!(
            !WAS_CONSTRUCTED.swap(true, std::sync::atomic::Ordering::SeqCst),
            "Second database was constructed. This is not allowed."
        );

        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(
                SqliteConnectOptions::from_str(url)?
                    .pragma("cache_size", "-8192")
                    .busy_timeout(std::time::Duration::from_secs(60)),
            )
            .await?;

        Self::with_pool(pool).await
    }

    /// In-memory database for tests. Must be a single connection,
    /// since every new connection to `:memory:` is a new empty database.
    #[cfg(test)]
    pub(crate) async fn new_in_memory() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Self::with_pool(pool).await.unwrap()
    }

    async fn with_pool(pool: Pool) -> Result<Database, Error> {
        // LISTS:
        // name (unique primary key, string; the list's display name)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS lists (
                name TEXT PRIMARY KEY NOT NULL
            ) STRICT;",
        ))
        .await?;

        // MEMBERS:
        // list_name (string)
        // user_id (i64 because sqlite doesn't support u64)
        // display_name (name the user had on joining, may be NULL)
        // joined_at (unix milliseconds, UTC)
        // (list_name, user_id) is unique, so a user is on a list at most once.
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS members (
                list_name TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                display_name TEXT NULL,
                joined_at INTEGER NOT NULL,
                PRIMARY KEY (list_name, user_id)
            ) STRICT;",
        ))
        .await?;

        // COOLDOWNS:
        // user_id (i64)
        // list_name (string)
        // display_name (may be NULL)
        // expires_at (unix milliseconds, UTC; numbers so that comparisons are exact)
        // (user_id, list_name) is unique, so upserts replace the old cooldown.
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS cooldowns (
                user_id INTEGER NOT NULL,
                list_name TEXT NOT NULL,
                display_name TEXT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, list_name)
            ) STRICT;",
        ))
        .await?;

        pool.execute(sqlx::query(
            "CREATE INDEX IF NOT EXISTS cooldowns_expires_at ON cooldowns(expires_at);",
        ))
        .await?;

        Ok(Database { pool })
    }

    /// Make sure every list of these names has a record.
    pub async fn ensure_lists<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), Error> {
        for name in names {
            sqlx::query("INSERT INTO lists(name) VALUES (?) ON CONFLICT DO NOTHING;")
                .bind(name)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Remove every member who has an active cooldown for the list they're on.
    /// Returns how many were removed. Cooldowns themselves are left alone.
    pub async fn evict_cooled_down_members(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            "DELETE FROM members
            WHERE EXISTS (
                SELECT 1 FROM cooldowns
                WHERE cooldowns.user_id=members.user_id
                    AND cooldowns.list_name=members.list_name
                    AND cooldowns.expires_at>?
            );",
        )
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn idle_cleanup(&self) {
        let _ = sqlx::query("VACUUM;").execute(&self.pool).await;
        let _ = sqlx::query("ANALYZE;").execute(&self.pool).await;
    }
}
