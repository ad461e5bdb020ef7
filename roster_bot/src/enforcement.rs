use std::{sync::Weak, time::Duration};

use chrono::{DateTime, Utc};

use crate::database::{Database, Error};

/// Take everyone off the lists they're on cooldown for.
///
/// Running this again right after changes nothing. Expired cooldowns are
/// not touched here; they get cleaned up when their user joins again.
pub async fn enforce_cooldowns(database: &Database, now: DateTime<Utc>) -> Result<u64, Error> {
    let evicted = database.evict_cooled_down_members(now).await?;
    if evicted > 0 {
        log::info!("Evicted {evicted} list members that are on cooldown.");
    }
    Ok(evicted)
}

/// Run [`enforce_cooldowns`] every `interval`, until the database is gone.
///
/// Database errors are logged and retried on the next tick.
pub async fn enforcement_spinloop(database: Weak<Database>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(database) = database.upgrade() else {
            // No more database!
            log::debug!("Database is gone, stopping cooldown enforcement.");
            return;
        };

        if let Err(e) = enforce_cooldowns(&database, Utc::now()).await {
            log::error!("Database error while enforcing cooldowns! {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use teloxide::types::UserId;

    use super::*;

    const LIST: &str = "Crystal of Chaos";
    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn evicts_only_active_cooldowns() {
        let db = Database::new_in_memory().await;

        // Alice somehow got on the list while on cooldown.
        db.add_user(LIST, ALICE, None, noon()).await.unwrap();
        db.upsert_cooldown(ALICE, LIST, None, noon() + Duration::days(7))
            .await
            .unwrap();
        // Bob's cooldown ran out, so he's allowed to stay.
        db.add_user(LIST, BOB, None, noon()).await.unwrap();
        db.upsert_cooldown(BOB, LIST, None, noon() - Duration::days(1))
            .await
            .unwrap();
        // A cooldown for another list doesn't matter here.
        db.upsert_cooldown(BOB, "Other", None, noon() + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(enforce_cooldowns(&db, noon()).await.unwrap(), 1);

        let membership = db.get_or_create(LIST).await.unwrap();
        assert_eq!(membership.users(), vec![BOB]);

        // Cooldowns are left as they were, expired or not.
        assert!(db.find_cooldown(ALICE, LIST).await.unwrap().is_some());
        assert!(db.find_cooldown(BOB, LIST).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let db = Database::new_in_memory().await;
        db.add_user(LIST, ALICE, None, noon()).await.unwrap();
        db.add_user(LIST, BOB, None, noon()).await.unwrap();
        db.upsert_cooldown(ALICE, LIST, None, noon() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(enforce_cooldowns(&db, noon()).await.unwrap(), 1);
        let after_first = db.get_or_create(LIST).await.unwrap();
        let cooldowns_first = db.find_active_cooldowns(noon()).await.unwrap();

        assert_eq!(enforce_cooldowns(&db, noon()).await.unwrap(), 0);
        assert_eq!(db.get_or_create(LIST).await.unwrap(), after_first);
        assert_eq!(db.find_active_cooldowns(noon()).await.unwrap(), cooldowns_first);
    }

    #[tokio::test]
    async fn spinloop_stops_without_database() {
        let db = std::sync::Arc::new(Database::new_in_memory().await);
        db.add_user(LIST, ALICE, None, Utc::now()).await.unwrap();
        db.upsert_cooldown(ALICE, LIST, None, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        let handle = tokio::spawn(enforcement_spinloop(
            std::sync::Arc::downgrade(&db),
            std::time::Duration::from_millis(10),
        ));

        // The first tick fires right away.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(db.get_or_create(LIST).await.unwrap().members.is_empty());

        drop(db);
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
