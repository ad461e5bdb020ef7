/// A text command split into its parts.
///
/// For `/List@Roster_Bot join 1` the `callname` is `/List` and
/// `params` is `join 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandText<'a> {
    pub callname: &'a str,
    pub params: &'a str,
}

impl<'a> CommandText<'a> {
    /// Split a message text into a command and its parameters.
    ///
    /// Returns `None` if the text isn't a command, or if it's a command
    /// addressed at a different bot with the `@username` suffix.
    /// `bot_username` is compared ignoring ASCII case, as Telegram does.
    #[must_use]
    pub fn parse(text: &'a str, bot_username: &str) -> Option<CommandText<'a>> {
        if !text.starts_with('/') {
            return None;
        }

        let command = text.split_whitespace().next()?;

        if !command.is_ascii() {
            // Telegram commands must be ASCII.
            // See https://core.telegram.org/bots/api#botcommand
            return None;
        }

        let params = text[command.len()..].trim();

        let callname = if let Some(username_start) = command.find('@') {
            if !command[username_start + '@'.len_utf8()..].eq_ignore_ascii_case(bot_username) {
                // This command is not for us.
                return None;
            }
            &command[..username_start]
        } else {
            command
        };

        Some(CommandText { callname, params })
    }

    /// Whether this command is `/name`, ignoring ASCII case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.callname
            .strip_prefix('/')
            .is_some_and(|x| x.eq_ignore_ascii_case(name))
    }
}
