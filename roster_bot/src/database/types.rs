use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use teloxide::types::UserId;

/// Convert a stored Unix millisecond timestamp back to a date.
/// Out-of-range values can't be written by us; they'd read as the epoch.
pub(super) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[allow(clippy::cast_possible_wrap)]
pub(super) fn user_to_db(user: UserId) -> i64 {
    user.0 as i64
}

#[allow(clippy::cast_sign_loss)]
fn user_from_db(id: i64) -> UserId {
    UserId(id as u64)
}

/// A user signed up for a list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub user: UserId,
    /// Name the user had when they signed up, if known.
    pub display_name: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub(super) fn from_sqlite_row(row: SqliteRow) -> Member {
        Member {
            user: user_from_db(row.get("user_id")),
            display_name: row.get("display_name"),
            joined_at: from_millis(row.get("joined_at")),
        }
    }
}

/// Everyone signed up for one list, in the order they signed up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    pub list_name: String,
    pub members: Vec<Member>,
}

impl Membership {
    #[allow(unused)]
    #[must_use]
    pub fn users(&self) -> Vec<UserId> {
        self.members.iter().map(|x| x.user).collect()
    }
}

/// A user who was confirmed off a list and can't rejoin it until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cooldown {
    pub user: UserId,
    pub list_name: String,
    pub display_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Cooldown {
    pub(super) fn from_sqlite_row(row: SqliteRow) -> Cooldown {
        Cooldown {
            user: user_from_db(row.get("user_id")),
            list_name: row.get("list_name"),
            display_name: row.get("display_name"),
            expires_at: from_millis(row.get("expires_at")),
        }
    }

    /// A cooldown stops being active the moment `now` reaches `expires_at`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Result of [`Database::add_user`].
///
/// [`Database::add_user`]: super::Database::add_user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyMember,
}

/// Result of [`Database::remove_user`].
///
/// [`Database::remove_user`]: super::Database::remove_user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotMember,
}

/// Result of [`Database::delete_cooldown`].
///
/// [`Database::delete_cooldown`]: super::Database::delete_cooldown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Result of [`Database::join_list`].
///
/// [`Database::join_list`]: super::Database::join_list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user is now on the list. `swept_expired` is `true` if an
    /// expired cooldown was found and deleted on the way.
    Joined { swept_expired: bool },
    /// The user was already on the list. Nothing changed.
    AlreadyMember,
    /// The user is on cooldown for this list. Nothing changed.
    OnCooldown(Cooldown),
}
