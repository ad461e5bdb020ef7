mod commands;

use std::fmt::Display;

use chrono::{DateTime, SubsecRound, Utc};
use html_escape::encode_text;
use teloxide::types::UserId;

pub use commands::{Command, COMMANDS};

use crate::{
    config::{ListDefinition, ListRegistry},
    database::{Cooldown, Database, DeleteOutcome, JoinOutcome, RemoveOutcome},
    error::RosterError,
    misc::{format_duration, user_link},
    status::render_board,
};

/// Whoever sent a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user: UserId,
    pub display_name: Option<String>,
    /// Whether this actor may use privileged commands.
    pub is_admin: bool,
}

/// A user a command is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub user: UserId,
    pub display_name: Option<String>,
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&user_link(self.user, self.display_name.as_deref()))
    }
}

/// Users a command message points at besides its words.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointedAt {
    /// First user mentioned by name, with the text of that mention.
    pub mention: Option<(String, Target)>,
    /// Author of the replied-to message.
    pub reply: Option<Target>,
}

/// A parsed roster command. List IDs are as typed, not checked yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Show,
    Help,
    Join { list_id: String },
    Leave { list_id: String },
    Remove { list_id: String, target: Target },
    Clear { list_id: String },
    Confirm { list_id: String, target: Target },
    RemoveCooldown { list_id: String, target: Target },
}

impl Request {
    /// Whether only admins may make this request.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Request::Remove { .. }
                | Request::Clear { .. }
                | Request::Confirm { .. }
                | Request::RemoveCooldown { .. }
        )
    }
}

/// What a successful request did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Board(String),
    Help(String),
    Joined { list: String },
    Left { list: String },
    Removed { list: String, target: Target },
    Cleared { list: String, count: u64 },
    Confirmed { list: String, target: Target, cooldown: Cooldown },
    CooldownRemoved { list: String, target: Target },
}

impl Reply {
    /// Whether this changed any lists or cooldowns.
    #[must_use]
    pub fn changed_anything(&self) -> bool {
        match self {
            Reply::Board(_) | Reply::Help(_) => false,
            Reply::Cleared { count, .. } => *count > 0,
            _ => true,
        }
    }
}

/// Telegram HTML text of the reply.
impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Board(text) | Reply::Help(text) => f.write_str(text),
            Reply::Joined { list } => write!(f, "Signed up for {}.", encode_text(list)),
            Reply::Left { list } => write!(f, "Left {}.", encode_text(list)),
            Reply::Removed { list, target } => {
                write!(f, "Took {target} off {}.", encode_text(list))
            }
            Reply::Cleared { list, count } => {
                write!(f, "Cleared {} ({count} removed).", encode_text(list))
            }
            Reply::Confirmed {
                list,
                target,
                cooldown,
            } => write!(
                f,
                "Confirmed {target} for {}. They can sign up again after {} UTC.",
                encode_text(list),
                cooldown.expires_at.format("%Y-%m-%d %H:%M")
            ),
            Reply::CooldownRemoved { list, target } => {
                write!(f, "Removed the cooldown of {target} for {}.", encode_text(list))
            }
        }
    }
}

fn find_list<'a>(lists: &'a ListRegistry, list_id: &str) -> Result<&'a ListDefinition, RosterError> {
    lists
        .find(list_id)
        .ok_or_else(|| RosterError::InvalidListReference(list_id.to_string()))
}

/// Run a request on behalf of `actor`.
///
/// Privileged requests from non-admins are refused before the database is touched.
/// Each request is complete on its own; nothing is left half-done between calls.
///
/// `now` is cut to whole milliseconds first, the precision the database keeps.
pub async fn process(
    database: &Database,
    lists: &ListRegistry,
    actor: &Actor,
    request: Request,
    now: DateTime<Utc>,
) -> Result<Reply, RosterError> {
    if request.is_privileged() && !actor.is_admin {
        return Err(RosterError::Unauthorized);
    }
    let now = now.trunc_subsecs(3);

    match request {
        Request::Show => Ok(Reply::Board(render_board(database, lists, now).await?)),
        Request::Help => Ok(Reply::Help(Command::generate_help())),
        Request::Join { list_id } => {
            let list = find_list(lists, &list_id)?;
            let outcome = database
                .join_list(&list.name, actor.user, actor.display_name.as_deref(), now)
                .await?;

            match outcome {
                JoinOutcome::Joined { swept_expired } => {
                    if swept_expired {
                        log::debug!("Swept expired cooldown of {} for {}", actor.user, list.name);
                    }
                    log::debug!("{} joined {}", actor.user, list.name);
                    Ok(Reply::Joined {
                        list: list.name.clone(),
                    })
                }
                JoinOutcome::AlreadyMember => Err(RosterError::AlreadyMember(list.name.clone())),
                JoinOutcome::OnCooldown(cooldown) => Err(RosterError::ActiveCooldown {
                    list: list.name.clone(),
                    expires_at: cooldown.expires_at,
                    remaining: cooldown.remaining(now),
                }),
            }
        }
        Request::Leave { list_id } => {
            let list = find_list(lists, &list_id)?;
            match database.remove_user(&list.name, actor.user).await? {
                RemoveOutcome::Removed => {
                    log::debug!("{} left {}", actor.user, list.name);
                    Ok(Reply::Left {
                        list: list.name.clone(),
                    })
                }
                RemoveOutcome::NotMember => Err(RosterError::NotAMember(list.name.clone())),
            }
        }
        Request::Remove { list_id, target } => {
            let list = find_list(lists, &list_id)?;
            match database.remove_user(&list.name, target.user).await? {
                RemoveOutcome::Removed => {
                    log::info!("{} removed {} from {}", actor.user, target.user, list.name);
                    Ok(Reply::Removed {
                        list: list.name.clone(),
                        target,
                    })
                }
                RemoveOutcome::NotMember => Err(RosterError::NotAMember(list.name.clone())),
            }
        }
        Request::Clear { list_id } => {
            let list = find_list(lists, &list_id)?;
            let count = database.clear(&list.name).await?;
            log::info!("{} cleared {} ({count} removed)", actor.user, list.name);
            Ok(Reply::Cleared {
                list: list.name.clone(),
                count,
            })
        }
        Request::Confirm { list_id, target } => {
            let list = find_list(lists, &list_id)?;
            let expires_at = now
                .checked_add_signed(list.cooldown)
                .ok_or_else(|| RosterError::CooldownOutOfRange(list.name.clone()))?;
            let cooldown = database
                .confirm(
                    &list.name,
                    target.user,
                    target.display_name.as_deref(),
                    expires_at,
                )
                .await?;
            log::info!(
                "{} confirmed {} for {}, cooldown for {}",
                actor.user,
                target.user,
                list.name,
                format_duration(&list.cooldown)
            );
            // Prefer whatever name the database remembers over a bare ID.
            let target = Target {
                display_name: cooldown.display_name.clone(),
                ..target
            };
            Ok(Reply::Confirmed {
                list: list.name.clone(),
                target,
                cooldown,
            })
        }
        Request::RemoveCooldown { list_id, target } => {
            let list = find_list(lists, &list_id)?;
            match database.delete_cooldown(target.user, &list.name).await? {
                DeleteOutcome::Deleted => {
                    log::info!(
                        "{} removed the cooldown of {} for {}",
                        actor.user,
                        target.user,
                        list.name
                    );
                    Ok(Reply::CooldownRemoved {
                        list: list.name.clone(),
                        target,
                    })
                }
                DeleteOutcome::NotFound => Err(RosterError::CooldownNotFound),
            }
        }
    }
}

/// Take a user off every list, without touching their cooldowns.
pub async fn pull_everywhere(
    database: &Database,
    lists: &ListRegistry,
    user: UserId,
) -> Result<(), RosterError> {
    for list in lists {
        database.pull_user(&list.name, user).await?;
    }
    Ok(())
}
