use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use concord_core::{UserPayload, snowflake};
use parking_lot::RwLock;

use super::{CacheRef, Channel, Member, report};

pub(crate) const CDN_URL: &str = "https://cdn.discordapp.com";

/// A cached user account.
pub struct User {
    id: String,
    data: RwLock<UserPayload>,
    cache: CacheRef,
}

impl User {
    pub(crate) fn new(payload: UserPayload, cache: CacheRef) -> Self {
        Self {
            id: payload.id.clone(),
            data: RwLock::new(payload),
            cache,
        }
    }

    pub(crate) fn update(&self, payload: UserPayload) {
        *self.data.write() = payload;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a copy of the current payload.
    pub fn snapshot(&self) -> UserPayload {
        self.data.read().clone()
    }

    pub fn username(&self) -> String {
        self.data.read().username.clone()
    }

    pub fn discriminator(&self) -> String {
        self.data.read().discriminator.clone()
    }

    pub fn is_bot(&self) -> bool {
        self.data.read().bot
    }

    pub fn is_verified(&self) -> bool {
        self.data.read().verified
    }

    /// `username#discriminator`, or just the username for accounts without one.
    pub fn tag(&self) -> String {
        let data = self.data.read();
        if data.discriminator.is_empty() || data.discriminator == "0" {
            data.username.clone()
        } else {
            format!("{}#{}", data.username, data.discriminator)
        }
    }

    /// Mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Returns the account creation time encoded in the user ID.
    pub fn created_at(&self) -> Option<SystemTime> {
        snowflake::created_at(&self.id)
    }

    /// Returns the avatar URL at `size` pixels, falling back to the default
    /// avatar for users without a custom one.
    pub fn avatar_url(&self, size: u32) -> String {
        let data = self.data.read();
        match &data.avatar {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{CDN_URL}/avatars/{}/{hash}.{ext}?size={size}", self.id)
            }
            None => {
                let index = data.discriminator.parse::<u16>().unwrap_or(0) % 5;
                format!("{CDN_URL}/embed/avatars/{index}.png")
            }
        }
    }

    /// Returns this user's membership in `guild_id`.
    pub async fn as_member(&self, guild_id: &str) -> Option<Arc<Member>> {
        self.cache.get()?.member(guild_id, &self.id).await
    }

    /// Opens (or reuses) a direct-message channel with this user.
    pub async fn create_dm_channel(&self) -> Option<Arc<Channel>> {
        let cache = self.cache.get()?;
        let payload = report(
            "create dm channel",
            cache.rest().create_dm_channel(&self.id).await,
        )?;
        Some(cache.upsert_channel(payload))
    }

    /// Sends a direct message to this user.
    pub async fn send_dm(&self, content: &str) -> Option<crate::Message> {
        self.create_dm_channel().await?.send(content).await
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.data.read().username)
            .finish()
    }
}
