use std::fmt;
use std::sync::Arc;

use concord_core::MemberPayload;
use parking_lot::RwLock;

use super::{CacheRef, Guild, User, report};

/// A cached guild membership.
pub struct Member {
    guild_id: String,
    user: Arc<User>,
    data: RwLock<MemberPayload>,
    cache: CacheRef,
}

impl Member {
    pub(crate) fn new(payload: MemberPayload, user: Arc<User>, cache: CacheRef) -> Self {
        Self {
            guild_id: payload.guild_id.clone(),
            user,
            data: RwLock::new(payload),
            cache,
        }
    }

    pub(crate) fn update(&self, payload: MemberPayload) {
        *self.data.write() = payload;
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// The cached user behind this membership.
    pub fn user(&self) -> &Arc<User> {
        &self.user
    }

    pub fn snapshot(&self) -> MemberPayload {
        self.data.read().clone()
    }

    pub fn nickname(&self) -> Option<String> {
        self.data.read().nick.clone()
    }

    /// Nickname if set, username otherwise.
    pub fn display_name(&self) -> String {
        self.nickname().unwrap_or_else(|| self.user.username())
    }

    pub fn roles(&self) -> Vec<String> {
        self.data.read().roles.clone()
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.data.read().roles.iter().any(|r| r == role_id)
    }

    pub fn joined_at(&self) -> Option<String> {
        self.data.read().joined_at.clone()
    }

    pub fn mention(&self) -> String {
        self.user.mention()
    }

    /// Resolves the owning guild.
    pub async fn guild(&self) -> Option<Arc<Guild>> {
        self.cache.get()?.guild(&self.guild_id).await
    }

    /// Returns the display color: the color of the highest-positioned role
    /// this member holds that has a nonzero color, or `0`.
    ///
    /// The result is memoized in the guild until the member or the guild's
    /// roles change.
    pub async fn color(&self) -> u32 {
        let Some(guild) = self.guild().await else {
            return 0;
        };
        guild.member_color(self.user.id(), || self.roles())
    }

    /// Bans this member, deleting `delete_message_days` of their messages.
    pub async fn ban(&self, delete_message_days: u8) -> bool {
        let Some(cache) = self.cache.get() else {
            return false;
        };
        let result = cache
            .rest()
            .create_ban(&self.guild_id, self.user.id(), delete_message_days)
            .await;
        report("ban member", result).is_some()
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("guild_id", &self.guild_id)
            .field("user_id", &self.user.id())
            .finish()
    }
}
