use chrono::Duration;
use html_escape::encode_text;
use teloxide::types::{User, UserId};

/// Print a duration the way humans read a countdown, like `6d 23h 59m`.
/// Zero-valued leading parts are skipped, and anything under a minute
/// is rounded up to `1m` so a live cooldown never reads as zero.
#[must_use]
pub fn format_duration(duration: &Duration) -> String {
    let total_minutes = (duration.num_seconds().max(0) + 59) / 60;
    let days = total_minutes / (24 * 60);
    let hours = total_minutes / 60 % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    parts.push(format!("{minutes}m"));

    parts.join(" ")
}

/// Name to remember a user by: `@username` if they have one, full name otherwise.
#[must_use]
pub fn display_name(user: &User) -> String {
    if let Some(username) = &user.username {
        format!("@{username}")
    } else {
        user.full_name()
    }
}

/// HTML link to a user, with their remembered name if there's one,
/// or their ID otherwise.
#[must_use]
pub fn user_link(id: UserId, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("<a href=\"tg://user?id={id}\">{}</a>", encode_text(name)),
        None => format!("<a href=\"tg://user?id={id}\">{id}</a>"),
    }
}
