use chrono::{DateTime, Utc};
use teloxide::types::UserId;

use super::{
    cooldowns::{fetch_cooldown, write_cooldown},
    types::user_to_db,
    Cooldown, Database, Error, JoinOutcome,
};

impl Database {
    /// Put a user on a list, if they're not on cooldown for it.
    ///
    /// All in one transaction: an expired cooldown is deleted, then the
    /// user is inserted only if no active cooldown exists and they aren't
    /// on the list already.
    pub async fn join_list(
        &self,
        list_name: &str,
        user: UserId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, Error> {
        let now_millis = now.timestamp_millis();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO lists(name) VALUES (?) ON CONFLICT DO NOTHING;")
            .bind(list_name)
            .execute(&mut *tx)
            .await?;

        let swept = sqlx::query(
            "DELETE FROM cooldowns WHERE user_id=? AND list_name=? AND expires_at<=?;",
        )
        .bind(user_to_db(user))
        .bind(list_name)
        .bind(now_millis)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let inserted = sqlx::query(
            "INSERT INTO members(list_name, user_id, display_name, joined_at)
            SELECT ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM cooldowns
                WHERE user_id=? AND list_name=? AND expires_at>?
            )
        ON CONFLICT DO NOTHING;",
        )
        .bind(list_name)
        .bind(user_to_db(user))
        .bind(display_name)
        .bind(now_millis)
        .bind(user_to_db(user))
        .bind(list_name)
        .bind(now_millis)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if inserted > 0 {
            JoinOutcome::Joined {
                swept_expired: swept > 0,
            }
        } else if let Some(cooldown) = fetch_cooldown(&mut *tx, user, list_name).await? {
            // Expired ones were deleted above, so this one is active.
            JoinOutcome::OnCooldown(cooldown)
        } else {
            JoinOutcome::AlreadyMember
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Take a user off a list and put them on cooldown for it until `expires_at`,
    /// replacing any cooldown they had. Whether they were on the list doesn't matter.
    ///
    /// If no `display_name` is given, the name they signed up with is kept.
    pub async fn confirm(
        &self,
        list_name: &str,
        user: UserId,
        display_name: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Cooldown, Error> {
        let mut tx = self.pool.begin().await?;

        let member_name = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM members WHERE list_name=? AND user_id=? RETURNING display_name;",
        )
        .bind(list_name)
        .bind(user_to_db(user))
        .fetch_optional(&mut *tx)
        .await?
        .flatten();

        let display_name = display_name.map(str::to_string).or(member_name);

        write_cooldown(
            &mut *tx,
            user,
            list_name,
            display_name.as_deref(),
            expires_at,
        )
        .await?;

        // Read it back, so a name stored by an earlier cooldown is included.
        let cooldown = fetch_cooldown(&mut *tx, user, list_name)
            .await?
            .ok_or(Error::RowNotFound)?;

        tx.commit().await?;
        Ok(cooldown)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::database::AddOutcome;

    const LIST: &str = "Crystal of Chaos";
    const ALICE: UserId = UserId(100);

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn join_then_already_member() {
        let db = Database::new_in_memory().await;

        let outcome = db.join_list(LIST, ALICE, Some("Alice"), noon()).await;
        assert_eq!(
            outcome.unwrap(),
            JoinOutcome::Joined {
                swept_expired: false
            }
        );
        let outcome = db.join_list(LIST, ALICE, Some("Alice"), noon()).await;
        assert_eq!(outcome.unwrap(), JoinOutcome::AlreadyMember);

        assert_eq!(db.get_or_create(LIST).await.unwrap().users(), vec![ALICE]);
    }

    #[tokio::test]
    async fn active_cooldown_blocks_join() {
        let db = Database::new_in_memory().await;
        let expires_at = noon() + Duration::minutes(1);
        db.upsert_cooldown(ALICE, LIST, None, expires_at).await.unwrap();

        let outcome = db.join_list(LIST, ALICE, None, noon()).await.unwrap();
        let JoinOutcome::OnCooldown(cooldown) = &outcome else {
            panic!("Expected a cooldown, got {outcome:?}");
        };
        assert_eq!(cooldown.expires_at, expires_at);

        // Nothing changed.
        assert!(db.get_or_create(LIST).await.unwrap().members.is_empty());
        assert!(db.find_cooldown(ALICE, LIST).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn active_cooldown_wins_over_existing_membership() {
        let db = Database::new_in_memory().await;
        db.add_user(LIST, ALICE, None, noon()).await.unwrap();
        db.upsert_cooldown(ALICE, LIST, None, noon() + Duration::days(1))
            .await
            .unwrap();

        let outcome = db.join_list(LIST, ALICE, None, noon()).await.unwrap();
        assert!(matches!(outcome, JoinOutcome::OnCooldown(_)));
    }

    #[tokio::test]
    async fn expired_cooldown_is_swept_on_join() {
        let db = Database::new_in_memory().await;
        // Expiring exactly now counts as expired.
        db.upsert_cooldown(ALICE, LIST, None, noon()).await.unwrap();

        let outcome = db.join_list(LIST, ALICE, None, noon()).await.unwrap();
        assert_eq!(
            outcome,
            JoinOutcome::Joined {
                swept_expired: true
            }
        );
        assert_eq!(db.find_cooldown(ALICE, LIST).await.unwrap(), None);
        assert_eq!(db.get_or_create(LIST).await.unwrap().users(), vec![ALICE]);
    }

    #[tokio::test]
    async fn confirm_moves_member_to_cooldown() {
        let db = Database::new_in_memory().await;
        assert_eq!(
            db.add_user(LIST, ALICE, Some("Alice"), noon()).await.unwrap(),
            AddOutcome::Added
        );

        let expires_at = noon() + Duration::weeks(1);
        let cooldown = db.confirm(LIST, ALICE, None, expires_at).await.unwrap();

        assert_eq!(cooldown.expires_at, expires_at);
        assert_eq!(cooldown.display_name.as_deref(), Some("Alice"));
        assert!(db.get_or_create(LIST).await.unwrap().members.is_empty());
        assert_eq!(db.find_cooldown(ALICE, LIST).await.unwrap(), Some(cooldown));
    }

    #[tokio::test]
    async fn confirm_overwrites_and_works_on_non_members() {
        let db = Database::new_in_memory().await;
        db.upsert_cooldown(ALICE, LIST, Some("Old"), noon() + Duration::days(30))
            .await
            .unwrap();

        let expires_at = noon() + Duration::days(1);
        let cooldown = db.confirm(LIST, ALICE, None, expires_at).await.unwrap();
        assert_eq!(cooldown.expires_at, expires_at);
        assert_eq!(cooldown.display_name.as_deref(), Some("Old"));

        let cooldown = db
            .confirm(LIST, ALICE, Some("New"), expires_at)
            .await
            .unwrap();
        assert_eq!(cooldown.display_name.as_deref(), Some("New"));
    }
}
