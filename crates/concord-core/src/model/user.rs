use serde::{Deserialize, Serialize};

/// A remote user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    /// Avatar hash, if the user has a custom avatar.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub verified: bool,
}

impl UserPayload {
    /// Creates a minimal user payload with the given ID and username.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    /// Marks this user as a bot account.
    pub fn bot(mut self) -> Self {
        self.bot = true;
        self
    }
}
