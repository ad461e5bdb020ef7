use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use teloxide::{
    payloads::{EditMessageTextSetters, SendMessageSetters},
    prelude::*,
    types::{ChatId, MessageId, ParseMode},
    ApiError, RequestError,
};
use tokio::sync::{Mutex, Notify};

use crate::{
    config::ListRegistry,
    database::{Cooldown, Database, Error, Membership},
    error::RosterError,
    misc::{format_duration, user_link},
    state::BotState,
};

/// Telegram won't take messages longer than this.
const MAX_MESSAGE_LENGTH: usize = 4096;

/// The status board message kept up to date in a chat.
pub struct StatusBoard {
    chat: Option<ChatId>,
    /// Message currently showing the board. Only known since startup.
    last_message: Mutex<Option<MessageId>>,
    refresh: Arc<Notify>,
}

impl StatusBoard {
    #[must_use]
    pub fn new(chat: Option<ChatId>) -> StatusBoard {
        StatusBoard {
            chat,
            last_message: Mutex::new(None),
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Ask for the board to be redrawn soon, rather than on the next tick.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }
}

/// Query the database and draw the board of all lists.
pub async fn render_board(
    database: &Database,
    lists: &ListRegistry,
    now: DateTime<Utc>,
) -> Result<String, Error> {
    let mut memberships = Vec::new();
    for list in lists {
        memberships.push(database.get_or_create(&list.name).await?);
    }
    let cooldowns = database.find_active_cooldowns(now).await?;

    Ok(format_board(lists, &memberships, &cooldowns, now))
}

/// Draw the board in Telegram HTML. Lists are shown in configured order.
#[must_use]
pub fn format_board(
    lists: &ListRegistry,
    memberships: &[Membership],
    cooldowns: &[Cooldown],
    now: DateTime<Utc>,
) -> String {
    let mut lines = Vec::new();

    for list in lists {
        lines.push(format!(
            "<b>{}</b> (<code>{}</code>, cooldown {})",
            html_escape::encode_text(&list.name),
            html_escape::encode_text(&list.id),
            format_duration(&list.cooldown),
        ));

        let members = memberships
            .iter()
            .find(|x| x.list_name == list.name)
            .map(|x| x.members.as_slice())
            .unwrap_or_default();

        if members.is_empty() {
            lines.push("<i>Nobody signed up.</i>".to_string());
        }
        for (number, member) in members.iter().enumerate() {
            lines.push(format!(
                "{}. {}",
                number + 1,
                user_link(member.user, member.display_name.as_deref())
            ));
        }

        let mut on_cooldown = cooldowns
            .iter()
            .filter(|x| x.list_name == list.name && x.is_active(now))
            .peekable();
        if on_cooldown.peek().is_some() {
            lines.push("On cooldown:".to_string());
        }
        for cooldown in on_cooldown {
            lines.push(format!(
                "• {} - {} left",
                user_link(cooldown.user, cooldown.display_name.as_deref()),
                format_duration(&cooldown.remaining(now))
            ));
        }

        lines.push(String::new());
    }
    lines.pop();

    join_lines_truncated(&lines, MAX_MESSAGE_LENGTH)
}

/// Join lines with newlines, dropping whole lines from the end if it gets
/// too long. Cutting a line in half could cut an HTML tag in half too.
fn join_lines_truncated(lines: &[String], max_chars: usize) -> String {
    const ELLIPSIS: &str = "…";

    let mut output = String::new();
    let mut length = 0;
    for (index, line) in lines.iter().enumerate() {
        let line_length = line.chars().count() + usize::from(index > 0);
        // Room for the ellipsis line, unless this is the last line anyway.
        let reserve = if index + 1 < lines.len() { 2 } else { 0 };
        if length + line_length + reserve > max_chars {
            output.push('\n');
            output.push_str(ELLIPSIS);
            break;
        }
        if index > 0 {
            output.push('\n');
        }
        output.push_str(line);
        length += line_length;
    }
    output
}

/// Edit the status message to show the current board, or send a new one
/// if there's no message or it can't be edited anymore.
async fn refresh_status(bot: &Bot, state: &BotState, chat: ChatId) -> Result<(), RosterError> {
    let text = render_board(&state.database, &state.config.lists, Utc::now()).await?;

    let mut last_message = state.status.last_message.lock().await;

    if let Some(message_id) = *last_message {
        match bot
            .edit_message_text(chat, message_id, &text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(()),
            Err(e) => {
                log::warn!("Couldn't edit the status message, sending a new one: {e}");
            }
        }
    }

    let message = bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .await?;
    *last_message = Some(message.id);

    Ok(())
}

/// Keep the status board up to date: redraw it every `status_refresh`
/// and whenever [`StatusBoard::request_refresh`] is called.
///
/// Does nothing if no status chat is configured.
pub async fn status_spinloop(bot: Bot, state: Weak<BotState>) {
    loop {
        let Some(state_arc) = state.upgrade() else {
            return;
        };
        let Some(chat) = state_arc.status.chat else {
            log::info!("No status chat configured, not keeping a status board.");
            return;
        };

        if let Err(e) = refresh_status(&bot, &state_arc, chat).await {
            log::warn!("Failed to refresh the status board: {e:?}");
        }

        let refresh = state_arc.status.refresh.clone();
        let interval = state_arc.config.status_refresh;
        // Don't keep the state alive while waiting.
        drop(state_arc);

        tokio::select! {
            () = tokio::time::sleep(interval) => (),
            () = refresh.notified() => (),
        }
    }
}
