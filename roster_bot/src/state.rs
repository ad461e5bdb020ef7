use std::sync::Arc;

use teloxide::types::UserId;

use crate::{config::BotConfig, database::Database, status::StatusBoard};

/// Everything handlers and background loops share. Made once on startup.
pub struct BotState {
    pub database: Arc<Database>,
    pub config: BotConfig,
    pub status: StatusBoard,
}

impl BotState {
    #[must_use]
    pub fn new(database: Arc<Database>, config: BotConfig) -> BotState {
        BotState {
            status: StatusBoard::new(config.status_chat),
            database,
            config,
        }
    }

    /// Whether this user is a bot admin everywhere, regardless of chat.
    #[must_use]
    pub fn is_global_admin(&self, user: UserId) -> bool {
        self.config.admins.contains(&user)
    }
}
