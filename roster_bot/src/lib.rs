//! Source code for Roster Bot: sign-up lists where confirmed users
//! go on a per-list cooldown before they may sign up again.

/// Configuration and the registry of lists.
mod config;

/// Errors shown to users.
mod error;

/// The database: list memberships and cooldowns.
mod database;

/// Periodic eviction of users who are on cooldown for a list they're in.
mod enforcement;

/// Parsing and running of roster commands, independent of Telegram.
mod roster;

/// The status board message.
mod status;

/// Process-wide state shared by handlers and background loops.
mod state;

/// Miscellaneous functions.
mod misc;

/// Functions that handle events from Telegram.
mod handlers;

/// Entry function that starts the bot.
mod entry;
pub use entry::*;

/// Command that everything this bot does goes through.
pub const COMMAND_NAME: &str = "list";

/// Configuration file path, relative to the working directory.
pub const CONFIG_PATH: &str = "roster_bot.toml";
