use chrono::{DateTime, Utc};
use teloxide::types::UserId;

use super::{
    types::user_to_db, AddOutcome, Database, Error, Member, Membership, RemoveOutcome,
};

impl Database {
    /// Get everyone on a list, creating the list's record first if it doesn't exist yet.
    ///
    /// Creating is idempotent, so this never fails because of a missing list.
    pub async fn get_or_create(&self, list_name: &str) -> Result<Membership, Error> {
        sqlx::query("INSERT INTO lists(name) VALUES (?) ON CONFLICT DO NOTHING;")
            .bind(list_name)
            .execute(&self.pool)
            .await?;

        let members = sqlx::query(
            "SELECT user_id, display_name, joined_at FROM members
            WHERE list_name=?
            ORDER BY joined_at, rowid;",
        )
        .bind(list_name)
        .map(Member::from_sqlite_row)
        .fetch_all(&self.pool)
        .await?;

        Ok(Membership {
            list_name: list_name.to_string(),
            members,
        })
    }

    /// Put a user on a list, unless they're already on it.
    #[allow(unused)]
    pub async fn add_user(
        &self,
        list_name: &str,
        user: UserId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AddOutcome, Error> {
        let result = sqlx::query(
            "INSERT INTO members(list_name, user_id, display_name, joined_at)
            VALUES (?, ?, ?, ?)
        ON CONFLICT DO NOTHING;",
        )
        .bind(list_name)
        .bind(user_to_db(user))
        .bind(display_name)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(match result.rows_affected() {
            0 => AddOutcome::AlreadyMember,
            _ => AddOutcome::Added,
        })
    }

    /// Take a user off a list, telling whether they were on it.
    pub async fn remove_user(&self, list_name: &str, user: UserId) -> Result<RemoveOutcome, Error> {
        let removed = self.delete_member(list_name, user).await?;
        Ok(match removed {
            0 => RemoveOutcome::NotMember,
            _ => RemoveOutcome::Removed,
        })
    }

    /// Take a user off a list if they're on it. Doesn't care if they weren't.
    pub async fn pull_user(&self, list_name: &str, user: UserId) -> Result<(), Error> {
        self.delete_member(list_name, user).await?;
        Ok(())
    }

    /// Take everyone off a list. Returns how many were on it.
    pub async fn clear(&self, list_name: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM members WHERE list_name=?;")
            .bind(list_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_member(&self, list_name: &str, user: UserId) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM members WHERE list_name=? AND user_id=?;")
            .bind(list_name)
            .bind(user_to_db(user))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
