//! Boilerplate shared between bots: logging, runtime start-up,
//! command splitting and figuring out who a message is talking about.

use std::future::Future;

use teloxide::{prelude::*, types::UserId};

/// Splitting `/command@BotName params` into its parts.
pub mod command_text;

/// Finding users a message points at.
pub mod mentions;

/// Initialize logging and start the `closure` in an async runtime.
///
/// Logging uses the filter from environment variable `RUST_LOG` if set,
/// or `default_filter` otherwise. This uses the crate [pretty_env_logger][]
/// internally, see its documentation for the filter syntax.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
///
/// # Panics
///
/// Panics if the tokio runtime can't be built.
pub fn start_everything(default_filter: &str, closure: impl Future<Output = ()>) {
    let log_level = std::env::var_os("RUST_LOG")
        .and_then(|x| x.into_string().ok())
        .unwrap_or_else(|| default_filter.to_string());

    // journald timestamps everything by itself.
    let running_as_systemd_service = std::env::var_os("JOURNAL_STREAM").is_some();

    let mut builder = match running_as_systemd_service {
        true => pretty_env_logger::formatted_builder(),
        false => pretty_env_logger::formatted_timed_builder(),
    };

    builder.parse_filters(&log_level);

    if builder.try_init().is_err() {
        log::error!("Tried to init logger twice!");
    }

    log::info!("hi");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build the tokio runtime!")
        .block_on(closure);
}

/// Find out if a user of this ID is an owner or an administrator of the chat of that ID.
///
/// In private chats nobody is, so this returns `false` for them without asking Telegram.
pub async fn is_chat_admin(
    bot: &Bot,
    chat: &teloxide::types::Chat,
    user: UserId,
) -> Result<bool, teloxide::RequestError> {
    if chat.is_private() {
        return Ok(false);
    }

    let member = bot.get_chat_member(chat.id, user).await?;
    Ok(member.kind.is_privileged())
}
