use teloxide::types::{Message, MessageEntityKind, User};

/// Returns all users mentioned by link in this message, in order, each
/// with the text the mention is written as.
///
/// These are users without a username that were picked from the
/// mention menu. Mentions by `@username` are not included, since the
/// Bot API gives no way to turn those into a user.
#[must_use]
pub fn text_mentions(message: &Message) -> Vec<(&str, &User)> {
    let Some(ents) = message
        .parse_entities()
        .or_else(|| message.parse_caption_entities())
    else {
        return vec![];
    };

    ents.iter()
        .filter_map(|ent| match ent.kind() {
            MessageEntityKind::TextMention { user } => Some((ent.text(), user)),
            _ => None, // none other contain users
        })
        .collect()
}

/// Returns the author of the message this one replies to, if any.
#[must_use]
pub fn reply_author(message: &Message) -> Option<&User> {
    message.reply_to_message().and_then(|m| m.from.as_ref())
}
