use serde::{Deserialize, Serialize};

use super::channel::ChannelPayload;
use super::user::UserPayload;

/// A guild role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePayload {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// RGB color; `0` means the role does not color names.
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub permissions: u64,
}

/// A custom guild emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl EmojiPayload {
    /// Returns the form used in reaction API paths (`name` or `name:id`).
    pub fn api_name(&self) -> String {
        match &self.id {
            Some(id) => format!("{}:{id}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A guild membership of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPayload {
    pub guild_id: String,
    pub user: UserPayload,
    #[serde(default)]
    pub nick: Option<String>,
    /// Role IDs held by the member.
    #[serde(default)]
    pub roles: Vec<String>,
    /// RFC 3339 join timestamp.
    #[serde(default)]
    pub joined_at: Option<String>,
}

impl MemberPayload {
    /// Creates a member payload for `user` in `guild_id`.
    pub fn new(guild_id: impl Into<String>, user: UserPayload) -> Self {
        Self {
            guild_id: guild_id.into(),
            user,
            ..Default::default()
        }
    }
}

/// A remote guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildPayload {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Icon hash.
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub emojis: Vec<EmojiPayload>,
    /// Members included with the payload (usually only on guild create).
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    /// Channels included with the payload (usually only on guild create).
    #[serde(default)]
    pub channels: Vec<ChannelPayload>,
}

impl GuildPayload {
    /// Creates a guild payload with the given ID, name and owner.
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            ..Default::default()
        }
    }
}
