use teloxide::types::UserId;

use super::{PointedAt, Request, Target};
use crate::{error::RosterError, COMMAND_NAME};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Help,
    Join,
    Leave,
    Remove,
    Clear,
    Confirm,
    RemoveCooldown,
}

/// A keyword that can follow `/list`.
pub struct Command {
    pub keyword: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub privileged: bool,
    kind: Kind,
}

pub const COMMANDS: &[Command] = &[
    Command {
        keyword: "help",
        usage: "/list help",
        description: "Show this help.",
        privileged: false,
        kind: Kind::Help,
    },
    Command {
        keyword: "join",
        usage: "/list join &lt;list&gt;",
        description: "Sign up for a list.",
        privileged: false,
        kind: Kind::Join,
    },
    Command {
        keyword: "leave",
        usage: "/list leave &lt;list&gt;",
        description: "Take yourself off a list.",
        privileged: false,
        kind: Kind::Leave,
    },
    Command {
        keyword: "remove",
        usage: "/list remove &lt;user&gt; &lt;list&gt;",
        description: "Take someone off a list, without a cooldown.",
        privileged: true,
        kind: Kind::Remove,
    },
    Command {
        keyword: "clear",
        usage: "/list clear &lt;list&gt;",
        description: "Take everyone off a list, without cooldowns.",
        privileged: true,
        kind: Kind::Clear,
    },
    Command {
        keyword: "confirm",
        usage: "/list confirm &lt;list&gt; &lt;user&gt;",
        description: "Take someone off a list and start their cooldown for it.",
        privileged: true,
        kind: Kind::Confirm,
    },
    Command {
        keyword: "removecd",
        usage: "/list removecd &lt;list&gt; &lt;user&gt;",
        description: "End someone's cooldown for a list early.",
        privileged: true,
        kind: Kind::RemoveCooldown,
    },
];

impl Command {
    fn find(keyword: &str) -> Option<&'static Command> {
        COMMANDS
            .iter()
            .find(|x| x.keyword.eq_ignore_ascii_case(keyword))
    }

    /// Help text for all commands, in Telegram HTML.
    #[must_use]
    pub fn generate_help() -> String {
        let mut response = format!(
            "<b>HELP:</b>\n\n/{COMMAND_NAME} - Show all lists and who is on them.\n\n"
        );
        for command in COMMANDS {
            response += command.usage;
            response += " - ";
            response += command.description;
            if command.privileged {
                response += " <i>(admins only)</i>";
            }
            response += "\n\n";
        }
        response.push_str(concat!(
            "A &lt;user&gt; is a numeric user ID or a mention by name. ",
            "It can be left out when replying to that user's message."
        ));
        response
    }
}

/// Work out which user the given words refer to.
///
/// A single number is taken as a user ID. Other words must be exactly
/// the text of the name mention in the message. With no words at all,
/// it's the author of the replied-to message. An `@username` can't be
/// resolved.
fn resolve_target(
    words: &[&str],
    pointed_at: PointedAt,
    usage: &'static str,
) -> Result<Target, RosterError> {
    if words.is_empty() {
        return pointed_at.reply.ok_or(RosterError::Usage(usage));
    }

    if let [word] = words {
        if let Ok(id) = word.parse::<u64>() {
            return Ok(Target {
                user: UserId(id),
                display_name: None,
            });
        }
    }

    let typed = words.join(" ");
    match pointed_at.mention {
        Some((text, target)) if text.split_whitespace().eq(words.iter().copied()) => Ok(target),
        _ => Err(RosterError::UnresolvedMention(typed)),
    }
}

impl Request {
    /// Parse the text after `/list` into a request.
    ///
    /// `pointed_at` holds the users the message mentions by name or
    /// replies to, used for commands that take a user.
    pub fn parse(params: &str, pointed_at: PointedAt) -> Result<Request, RosterError> {
        let mut words = params.split_whitespace();

        let Some(keyword) = words.next() else {
            return Ok(Request::Show);
        };

        let command =
            Command::find(keyword).ok_or_else(|| RosterError::UnknownCommand(keyword.to_string()))?;
        let usage = || RosterError::Usage(command.usage);
        let rest: Vec<&str> = words.collect();

        let single_list_id = || match rest.as_slice() {
            [list_id] => Ok(list_id.to_string()),
            _ => Err(usage()),
        };

        Ok(match command.kind {
            Kind::Help => Request::Help,
            Kind::Join => Request::Join {
                list_id: single_list_id()?,
            },
            Kind::Leave => Request::Leave {
                list_id: single_list_id()?,
            },
            Kind::Clear => Request::Clear {
                list_id: single_list_id()?,
            },
            Kind::Remove => {
                // The user goes first; a name mention may be several words.
                let (list_id, mention) = rest.split_last().ok_or_else(usage)?;
                Request::Remove {
                    list_id: list_id.to_string(),
                    target: resolve_target(mention, pointed_at, command.usage)?,
                }
            }
            Kind::Confirm | Kind::RemoveCooldown => {
                let (list_id, mention) = rest.split_first().ok_or_else(usage)?;
                let list_id = list_id.to_string();
                let target = resolve_target(mention, pointed_at, command.usage)?;
                if command.kind == Kind::Confirm {
                    Request::Confirm { list_id, target }
                } else {
                    Request::RemoveCooldown { list_id, target }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn bob() -> Target {
        Target {
            user: UserId(2),
            display_name: Some("Bob".to_string()),
        }
    }

    fn nobody() -> PointedAt {
        PointedAt::default()
    }

    fn replying_to_bob() -> PointedAt {
        PointedAt {
            mention: None,
            reply: Some(bob()),
        }
    }

    fn mentioning_bob() -> PointedAt {
        PointedAt {
            mention: Some(("Bob Bobson".to_string(), bob())),
            reply: None,
        }
    }

    #[test]
    fn simple_keywords() {
        assert_eq!(Request::parse("", nobody()).unwrap(), Request::Show);
        assert_eq!(Request::parse("HeLp", nobody()).unwrap(), Request::Help);
        assert_eq!(
            Request::parse("JOIN 1", nobody()).unwrap(),
            Request::Join {
                list_id: "1".to_string()
            }
        );
        assert_eq!(
            Request::parse("leave  cc ", nobody()).unwrap(),
            Request::Leave {
                list_id: "cc".to_string()
            }
        );
        assert_eq!(
            Request::parse("clear 1", nobody()).unwrap(),
            Request::Clear {
                list_id: "1".to_string()
            }
        );
    }

    #[test]
    fn bad_keywords_and_arity() {
        assert!(matches!(
            Request::parse("dance 1", nobody()),
            Err(RosterError::UnknownCommand(x)) if x == "dance"
        ));
        assert!(matches!(
            Request::parse("join", nobody()),
            Err(RosterError::Usage(_))
        ));
        assert!(matches!(
            Request::parse("join 1 2", nobody()),
            Err(RosterError::Usage(_))
        ));
        assert!(matches!(
            Request::parse("confirm", replying_to_bob()),
            Err(RosterError::Usage(_))
        ));
    }

    #[test]
    fn user_by_id() {
        let user_12345 = Target {
            user: UserId(12345),
            display_name: None,
        };
        assert_eq!(
            Request::parse("confirm 1 12345", nobody()).unwrap(),
            Request::Confirm {
                list_id: "1".to_string(),
                target: user_12345.clone()
            }
        );
        assert_eq!(
            Request::parse("remove 12345 1", nobody()).unwrap(),
            Request::Remove {
                list_id: "1".to_string(),
                target: user_12345.clone()
            }
        );
        // A typed ID wins over the replied-to user.
        assert_eq!(
            Request::parse("removecd 1 12345", replying_to_bob()).unwrap(),
            Request::RemoveCooldown {
                list_id: "1".to_string(),
                target: user_12345
            }
        );
    }

    #[test]
    fn user_by_mention() {
        // Name mentions can be several words long.
        assert_eq!(
            Request::parse("remove Bob Bobson 1", mentioning_bob()).unwrap(),
            Request::Remove {
                list_id: "1".to_string(),
                target: bob()
            }
        );
        assert_eq!(
            Request::parse("removecd 1 Bob  Bobson", mentioning_bob()).unwrap(),
            Request::RemoveCooldown {
                list_id: "1".to_string(),
                target: bob()
            }
        );
        // Words that aren't the mention are not the mentioned user.
        assert!(matches!(
            Request::parse("confirm 1 Carol", mentioning_bob()),
            Err(RosterError::UnresolvedMention(x)) if x == "Carol"
        ));
    }

    #[test]
    fn user_by_reply() {
        assert_eq!(
            Request::parse("confirm 1", replying_to_bob()).unwrap(),
            Request::Confirm {
                list_id: "1".to_string(),
                target: bob()
            }
        );
        assert!(matches!(
            Request::parse("remove 1", nobody()),
            Err(RosterError::Usage(_))
        ));
    }

    #[test]
    fn named_user_is_never_swapped_for_the_replied_to_one() {
        for text in ["confirm 1 @carol", "remove @carol 1", "removecd 1 @carol"] {
            assert!(
                matches!(
                    Request::parse(text, replying_to_bob()),
                    Err(RosterError::UnresolvedMention(x)) if x == "@carol"
                ),
                "{text}"
            );
        }
        assert!(matches!(
            Request::parse("confirm 1 @carol", nobody()),
            Err(RosterError::UnresolvedMention(_))
        ));
    }

    #[test]
    fn privileges_match_the_table() {
        for command in COMMANDS {
            let request = Request::parse(&format!("{} 1 2", command.keyword), nobody())
                .or_else(|_| Request::parse(&format!("{} 1", command.keyword), nobody()))
                .or_else(|_| Request::parse(command.keyword, nobody()))
                .unwrap();
            assert_eq!(request.is_privileged(), command.privileged, "{}", command.keyword);
        }
    }

    #[test]
    fn help_mentions_everything() {
        let help = Command::generate_help();
        for command in COMMANDS {
            assert!(help.contains(command.usage));
        }
    }
}
