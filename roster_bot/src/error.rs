use chrono::{DateTime, Duration, Utc};
use html_escape::encode_text;

use crate::misc::format_duration;

/// Everything that can go wrong with a roster command.
///
/// These all end up as a reply to whoever sent the command, so the
/// messages are written for them, in Telegram HTML.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("There is no list \"{}\". Send /list to see all lists.", encode_text(.0))]
    InvalidListReference(String),
    #[error("Only administrators can do that.")]
    Unauthorized,
    #[error("Already signed up for {}.", encode_text(.0))]
    AlreadyMember(String),
    #[error("Not signed up for {}.", encode_text(.0))]
    NotAMember(String),
    #[error(
        "On cooldown for {} for another {}, until {} UTC.",
        encode_text(.list),
        format_duration(.remaining),
        .expires_at.format("%Y-%m-%d %H:%M")
    )]
    ActiveCooldown {
        list: String,
        expires_at: DateTime<Utc>,
        remaining: Duration,
    },
    #[error("The cooldown of {} would end too far in the future.", encode_text(.0))]
    CooldownOutOfRange(String),
    #[error("No cooldown found.")]
    CooldownNotFound,
    #[error(
        "Can't tell who \"{}\" is. Reply to their message, mention them by name, or use their numeric ID.",
        encode_text(.0)
    )]
    UnresolvedMention(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown command \"{}\". Send /list help to see all commands.", encode_text(.0))]
    UnknownCommand(String),
    #[error("Database error, please try again later.")]
    StorageUnavailable(#[from] sqlx::Error),
    #[error("Telegram error, please try again later.")]
    Upstream(#[from] teloxide::RequestError),
}
