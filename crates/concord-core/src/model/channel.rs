use serde::{Deserialize, Serialize};

/// Channel category as reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
}

/// A remote channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPayload {
    pub id: String,
    /// Absent for direct-message channels.
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default, rename = "type")]
    pub kind: ChannelType,
}

impl ChannelPayload {
    /// Creates a guild text channel payload.
    pub fn new(id: impl Into<String>, guild_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild_id: Some(guild_id.into()),
            name: name.into(),
            ..Default::default()
        }
    }
}
