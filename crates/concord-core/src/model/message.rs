use serde::{Deserialize, Serialize};

use super::guild::EmojiPayload;
use super::user::UserPayload;

/// A chat message as delivered by message create/update events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Partial update events may omit the author.
    #[serde(default)]
    pub author: Option<UserPayload>,
    #[serde(default)]
    pub mentions: Vec<UserPayload>,
    #[serde(default)]
    pub mention_everyone: bool,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MessagePayload {
    /// Creates a message payload authored by `author`.
    pub fn new(
        id: impl Into<String>,
        channel_id: impl Into<String>,
        author: UserPayload,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            author: Some(author),
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A reaction added to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub emoji: EmojiPayload,
}
