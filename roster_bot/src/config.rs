use std::{collections::HashSet, io::ErrorKind, path::Path};

use chrono::Duration;
use serde::Deserialize;
use teloxide::types::{ChatId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read the config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse the config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no lists are configured")]
    NoLists,
    #[error("list id \"{0}\" is used more than once")]
    DuplicateId(String),
    #[error("list name \"{0}\" is used more than once")]
    DuplicateName(String),
    #[error("list \"{0}\" must have a positive cooldown")]
    NonPositiveCooldown(String),
    #[error("list \"{0}\" has a cooldown longer than {max} days", max = MAX_COOLDOWN_DAYS)]
    CooldownTooLong(String),
}

/// Longest cooldown a list may have.
const MAX_COOLDOWN_DAYS: i64 = 100 * 365;

/// A list as it's written in the config file.
#[derive(Clone, Debug, Deserialize)]
struct ListEntry {
    id: String,
    name: String,
    cooldown_secs: i64,
}

/// The config file, as it's written.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    admins: Vec<u64>,
    #[serde(default)]
    status_chat: Option<i64>,
    #[serde(default = "default_enforcement_interval")]
    enforcement_interval_secs: u64,
    #[serde(default = "default_status_refresh")]
    status_refresh_secs: u64,
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_lists")]
    lists: Vec<ListEntry>,
}

fn default_enforcement_interval() -> u64 {
    60
}

fn default_status_refresh() -> u64 {
    5 * 60
}

fn default_database() -> String {
    "sqlite:roster.sqlite".to_string()
}

fn default_lists() -> Vec<ListEntry> {
    vec![ListEntry {
        id: "1".to_string(),
        name: "Crystal of Chaos".to_string(),
        cooldown_secs: Duration::weeks(1).num_seconds(),
    }]
}

/// Bot configuration, loaded once on startup.
#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Users that may use privileged commands anywhere.
    pub admins: Vec<UserId>,
    /// Chat to keep the status board message in, if any.
    pub status_chat: Option<ChatId>,
    pub enforcement_interval: std::time::Duration,
    pub status_refresh: std::time::Duration,
    /// sqlx connection string for the database.
    pub database: String,
    pub lists: ListRegistry,
}

impl BotConfig {
    /// Load the config from a TOML file at `path`.
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<BotConfig, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("No config at {}, using defaults.", path.display());
                Self::from_toml("")
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(text: &str) -> Result<BotConfig, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;

        let lists = file
            .lists
            .into_iter()
            .map(|entry| {
                let cooldown = Duration::try_seconds(entry.cooldown_secs)
                    .ok_or_else(|| ConfigError::CooldownTooLong(entry.name.clone()))?;
                Ok(ListDefinition {
                    id: entry.id,
                    name: entry.name,
                    cooldown,
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(BotConfig {
            admins: file.admins.into_iter().map(UserId).collect(),
            status_chat: file.status_chat.map(ChatId),
            enforcement_interval: std::time::Duration::from_secs(
                file.enforcement_interval_secs.max(1),
            ),
            status_refresh: std::time::Duration::from_secs(file.status_refresh_secs.max(1)),
            database: file.database,
            lists: ListRegistry::new(lists)?,
        })
    }
}

/// A single configured list users can sign up for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListDefinition {
    /// Short identifier used in commands.
    pub id: String,
    /// Unique display name. This is also what the database keys lists by.
    pub name: String,
    /// How long a user can't rejoin after being confirmed.
    pub cooldown: Duration,
}

/// The fixed set of lists. Can't be changed after startup.
#[derive(Clone, Debug)]
pub struct ListRegistry {
    lists: Vec<ListDefinition>,
}

impl ListRegistry {
    pub fn new(lists: Vec<ListDefinition>) -> Result<ListRegistry, ConfigError> {
        if lists.is_empty() {
            return Err(ConfigError::NoLists);
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for list in &lists {
            if !ids.insert(list.id.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateId(list.id.clone()));
            }
            if !names.insert(list.name.as_str()) {
                return Err(ConfigError::DuplicateName(list.name.clone()));
            }
            if list.cooldown <= Duration::zero() {
                return Err(ConfigError::NonPositiveCooldown(list.name.clone()));
            }
            if list.cooldown > Duration::days(MAX_COOLDOWN_DAYS) {
                return Err(ConfigError::CooldownTooLong(list.name.clone()));
            }
        }

        Ok(ListRegistry { lists })
    }

    /// Find a list by its identifier, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ListDefinition> {
        self.lists.iter().find(|x| x.id.eq_ignore_ascii_case(id))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListDefinition> {
        self.lists.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|x| x.name.as_str())
    }
}

impl<'a> IntoIterator for &'a ListRegistry {
    type Item = &'a ListDefinition;
    type IntoIter = std::slice::Iter<'a, ListDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
