use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use teloxide::types::UserId;

use super::{types::user_to_db, Cooldown, Database, DeleteOutcome, Error};

/// Look up the cooldown of a user for a list, on any connection or transaction.
pub(super) async fn fetch_cooldown<'e>(
    executor: impl SqliteExecutor<'e>,
    user: UserId,
    list_name: &str,
) -> Result<Option<Cooldown>, Error> {
    sqlx::query(
        "SELECT user_id, list_name, display_name, expires_at FROM cooldowns
        WHERE user_id=? AND list_name=?;",
    )
    .bind(user_to_db(user))
    .bind(list_name)
    .map(Cooldown::from_sqlite_row)
    .fetch_optional(executor)
    .await
}

/// Create or replace the cooldown of a user for a list, on any connection or transaction.
///
/// If `display_name` is `None`, a name already stored for this cooldown is kept.
pub(super) async fn write_cooldown<'e>(
    executor: impl SqliteExecutor<'e>,
    user: UserId,
    list_name: &str,
    display_name: Option<&str>,
    expires_at: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO cooldowns(user_id, list_name, display_name, expires_at)
            VALUES (?, ?, ?, ?)
        ON CONFLICT DO
            UPDATE SET display_name=COALESCE(excluded.display_name, display_name),
                expires_at=excluded.expires_at;",
    )
    .bind(user_to_db(user))
    .bind(list_name)
    .bind(display_name)
    .bind(expires_at.timestamp_millis())
    .execute(executor)
    .await?;
    Ok(())
}

impl Database {
    /// Get the cooldown of a user for a list, whether it's still active or not.
    #[allow(unused)]
    pub async fn find_cooldown(
        &self,
        user: UserId,
        list_name: &str,
    ) -> Result<Option<Cooldown>, Error> {
        fetch_cooldown(&self.pool, user, list_name).await
    }

    /// Set the cooldown of a user for a list, replacing the previous one if any.
    #[allow(unused)]
    pub async fn upsert_cooldown(
        &self,
        user: UserId,
        list_name: &str,
        display_name: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        write_cooldown(&self.pool, user, list_name, display_name, expires_at).await
    }

    /// Delete the cooldown of a user for a list.
    pub async fn delete_cooldown(
        &self,
        user: UserId,
        list_name: &str,
    ) -> Result<DeleteOutcome, Error> {
        let result = sqlx::query("DELETE FROM cooldowns WHERE user_id=? AND list_name=?;")
            .bind(user_to_db(user))
            .bind(list_name)
            .execute(&self.pool)
            .await?;

        Ok(match result.rows_affected() {
            0 => DeleteOutcome::NotFound,
            _ => DeleteOutcome::Deleted,
        })
    }

    /// Get all cooldowns that haven't expired by `now`, soonest to expire first.
    pub async fn find_active_cooldowns(&self, now: DateTime<Utc>) -> Result<Vec<Cooldown>, Error> {
        sqlx::query(
            "SELECT user_id, list_name, display_name, expires_at FROM cooldowns
            WHERE expires_at>?
            ORDER BY expires_at, user_id;",
        )
        .bind(now.timestamp_millis())
        .map(Cooldown::from_sqlite_row)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    const LIST: &str = "Crystal of Chaos";

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn upsert_overwrites() {
        let db = Database::new_in_memory().await;
        let user = UserId(7);

        assert_eq!(db.find_cooldown(user, LIST).await.unwrap(), None);

        db.upsert_cooldown(user, LIST, Some("Alice"), noon() + Duration::hours(1))
            .await
            .unwrap();
        db.upsert_cooldown(user, LIST, None, noon() + Duration::hours(2))
            .await
            .unwrap();

        let cooldown = db.find_cooldown(user, LIST).await.unwrap().unwrap();
        assert_eq!(cooldown.expires_at, noon() + Duration::hours(2));
        assert_eq!(cooldown.display_name.as_deref(), Some("Alice"));
        assert_eq!(cooldown.list_name, LIST);
        assert_eq!(cooldown.remaining(noon()), Duration::hours(2));

        // Other lists are separate keys.
        assert_eq!(db.find_cooldown(user, "Other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let db = Database::new_in_memory().await;
        let user = UserId(7);

        assert_eq!(
            db.delete_cooldown(user, LIST).await.unwrap(),
            DeleteOutcome::NotFound
        );
        db.upsert_cooldown(user, LIST, None, noon()).await.unwrap();
        assert_eq!(
            db.delete_cooldown(user, LIST).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(db.find_cooldown(user, LIST).await.unwrap(), None);
    }

    #[tokio::test]
    async fn active_means_strictly_after_now() {
        let db = Database::new_in_memory().await;

        db.upsert_cooldown(UserId(1), LIST, None, noon() - Duration::seconds(1))
            .await
            .unwrap();
        db.upsert_cooldown(UserId(2), LIST, None, noon()).await.unwrap();
        db.upsert_cooldown(UserId(3), LIST, None, noon() + Duration::days(2))
            .await
            .unwrap();
        db.upsert_cooldown(UserId(4), "Other", None, noon() + Duration::days(1))
            .await
            .unwrap();

        let active = db.find_active_cooldowns(noon()).await.unwrap();
        let users: Vec<_> = active.iter().map(|x| x.user).collect();
        assert_eq!(users, vec![UserId(4), UserId(3)]);
        assert!(active.iter().all(|x| x.is_active(noon())));

        let expired = db.find_cooldown(UserId(2), LIST).await.unwrap().unwrap();
        assert!(!expired.is_active(noon()));
        assert_eq!(expired.remaining(noon()), Duration::zero());
    }
}
