use std::sync::Arc;

use bot_commons::{
    command_text::CommandText,
    is_chat_admin,
    mentions::{reply_author, text_mentions},
};
use chrono::Utc;
use teloxide::{
    payloads::SendMessageSetters,
    prelude::*,
    types::{Me, ParseMode, ReplyParameters, User},
    RequestError,
};

use crate::{
    error::RosterError,
    misc::display_name,
    roster::{self, Actor, Command, PointedAt, Reply, Request, Target},
    state::BotState,
    COMMAND_NAME,
};

/// Figure out whether the sender of this message may use privileged commands.
async fn sender_is_admin(
    bot: &Bot,
    message: &Message,
    sender: &User,
    state: &BotState,
) -> Result<bool, RequestError> {
    if state.is_global_admin(sender.id) {
        return Ok(true);
    }
    if let Some(chat) = &message.sender_chat {
        // Anonymous admins post as the chat itself.
        return Ok(chat.id == message.chat.id);
    }
    is_chat_admin(bot, &message.chat, sender.id).await
}

/// Parse and run a `/list` command from this message.
async fn run_command(
    bot: &Bot,
    message: &Message,
    sender: &User,
    params: &str,
    state: &BotState,
) -> Result<Reply, RosterError> {
    let as_target = |user: &User| Target {
        user: user.id,
        display_name: Some(display_name(user)),
    };
    let pointed_at = PointedAt {
        mention: text_mentions(message)
            .first()
            .map(|&(text, user)| (text.to_string(), as_target(user))),
        reply: reply_author(message).map(as_target),
    };

    let request = Request::parse(params, pointed_at)?;

    // Only bother Telegram about admin rights if they matter.
    let is_admin = request.is_privileged() && sender_is_admin(bot, message, sender, state).await?;

    let actor = Actor {
        user: sender.id,
        display_name: Some(display_name(sender)),
        is_admin,
    };

    roster::process(
        &state.database,
        &state.config.lists,
        &actor,
        request,
        Utc::now(),
    )
    .await
}

/// People leaving the chat with the status board are taken off every list.
async fn handle_left_member(user: &User, state: &BotState) {
    if let Err(e) = roster::pull_everywhere(&state.database, &state.config.lists, user.id).await {
        log::error!("Failed to take {} off the lists: {e:?}", user.id);
        return;
    }
    log::info!("{} left the status chat, took them off all lists.", user.id);
    state.status.request_refresh();
}

pub async fn handle_message(
    bot: Bot,
    me: Me,
    message: Message,
    state: Arc<BotState>,
) -> Result<(), RequestError> {
    if let Some(user) = message.left_chat_member() {
        if state.config.status_chat == Some(message.chat.id) {
            handle_left_member(user, &state).await;
        }
        return Ok(());
    }

    let Some(text) = message.text() else {
        return Ok(());
    };
    let Some(command) = CommandText::parse(text, me.username()) else {
        return Ok(());
    };
    let Some(sender) = message.from.as_ref() else {
        return Ok(());
    };
    // Bot ignores messages made by itself.
    if sender.id == me.id {
        return Ok(());
    }

    let response = if command.is(COMMAND_NAME) {
        match run_command(&bot, &message, sender, command.params, &state).await {
            Ok(reply) => {
                if reply.changed_anything() {
                    state.status.request_refresh();
                }
                reply.to_string()
            }
            Err(e) => {
                match &e {
                    RosterError::StorageUnavailable(inner) => {
                        log::error!("Database error! {inner:?}");
                    }
                    RosterError::Upstream(inner) => {
                        log::warn!("Telegram error while handling a command: {inner:?}");
                    }
                    _ => (),
                }
                e.to_string()
            }
        }
    } else if command.is("start") || command.is("help") {
        Command::generate_help()
    } else {
        return Ok(());
    };

    bot.send_message(message.chat.id, response)
        .reply_parameters(ReplyParameters::new(message.id))
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}
