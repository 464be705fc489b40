use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use concord_core::{EmojiPayload, GuildPayload, RolePayload, snowflake};
use parking_lot::{Mutex, RwLock};

use super::user::CDN_URL;
use super::{CacheRef, Channel, Member};

/// A cached guild.
///
/// Members and channels live in the cache's own maps; [`members`](Self::members)
/// and [`channels`](Self::channels) scan them.
pub struct Guild {
    id: String,
    data: RwLock<GuildPayload>,
    /// Member ID → memoized display color.
    colors: Mutex<HashMap<String, u32>>,
    cache: CacheRef,
}

impl Guild {
    pub(crate) fn new(payload: GuildPayload, cache: CacheRef) -> Self {
        Self {
            id: payload.id.clone(),
            data: RwLock::new(payload),
            colors: Mutex::new(HashMap::new()),
            cache,
        }
    }

    /// Replaces the payload. Roles may have changed, so memoized colors go.
    pub(crate) fn update(&self, payload: GuildPayload) {
        *self.data.write() = payload;
        self.colors.lock().clear();
    }

    pub(crate) fn adjust_member_count(&self, joined: bool) {
        let mut data = self.data.write();
        data.member_count = if joined {
            data.member_count.saturating_add(1)
        } else {
            data.member_count.saturating_sub(1)
        };
    }

    // ─── Color cache ──────────────────────────────────────────────────────

    /// Returns the memoized color for `user_id`, computing it from `roles`
    /// on a miss. The memo stays locked until the result is stored.
    pub(crate) fn member_color(&self, user_id: &str, roles: impl FnOnce() -> Vec<String>) -> u32 {
        let mut colors = self.colors.lock();
        if let Some(color) = colors.get(user_id) {
            return *color;
        }
        let color = self.top_role_color(&roles());
        colors.insert(user_id.to_owned(), color);
        color
    }

    #[cfg(test)]
    pub(crate) fn cached_color(&self, user_id: &str) -> Option<u32> {
        self.colors.lock().get(user_id).copied()
    }

    pub(crate) fn forget_color(&self, user_id: &str) {
        self.colors.lock().remove(user_id);
    }

    pub(crate) fn top_role_color(&self, role_ids: &[String]) -> u32 {
        self.data
            .read()
            .roles
            .iter()
            .filter(|role| role.color != 0 && role_ids.contains(&role.id))
            .max_by_key(|role| role.position)
            .map_or(0, |role| role.color)
    }

    // ─── Accessors ────────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> GuildPayload {
        self.data.read().clone()
    }

    pub fn name(&self) -> String {
        self.data.read().name.clone()
    }

    pub fn owner_id(&self) -> String {
        self.data.read().owner_id.clone()
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.data.read().owner_id == user_id
    }

    pub fn region(&self) -> String {
        self.data.read().region.clone()
    }

    pub fn member_count(&self) -> u64 {
        self.data.read().member_count
    }

    pub fn roles(&self) -> Vec<RolePayload> {
        self.data.read().roles.clone()
    }

    pub fn role(&self, role_id: &str) -> Option<RolePayload> {
        self.data
            .read()
            .roles
            .iter()
            .find(|role| role.id == role_id)
            .cloned()
    }

    pub fn emojis(&self) -> Vec<EmojiPayload> {
        self.data.read().emojis.clone()
    }

    pub fn icon_url(&self) -> Option<String> {
        let data = self.data.read();
        let hash = data.icon.as_deref()?;
        Some(format!("{CDN_URL}/icons/{}/{hash}.png", self.id))
    }

    pub fn created_at(&self) -> Option<SystemTime> {
        snowflake::created_at(&self.id)
    }

    // ─── Relationships ────────────────────────────────────────────────────

    /// Resolves the owner's membership.
    pub async fn owner(&self) -> Option<Arc<Member>> {
        let owner_id = self.owner_id();
        self.member(&owner_id).await
    }

    /// Resolves `user_id`'s membership in this guild.
    pub async fn member(&self, user_id: &str) -> Option<Arc<Member>> {
        self.cache.get()?.member(&self.id, user_id).await
    }

    /// Returns the members currently cached for this guild.
    pub fn members(&self) -> Vec<Arc<Member>> {
        self.cache
            .get()
            .map(|cache| cache.members_of(&self.id))
            .unwrap_or_default()
    }

    /// Returns the channels currently cached for this guild.
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.cache
            .get()
            .map(|cache| cache.channels_of(&self.id))
            .unwrap_or_default()
    }
}

impl fmt::Debug for Guild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guild")
            .field("id", &self.id)
            .field("name", &self.data.read().name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use concord_core::{MemberPayload, RolePayload};

    use crate::testing::{MockRest, cache_with, guild_payload, user};

    #[tokio::test]
    async fn test_owner_is_fetched_lazily() {
        let rest = MockRest::new().with_member(MemberPayload::new("10", user("1", "owner")));
        let cache = cache_with(rest.clone());
        let guild = cache.upsert_guild(guild_payload("10", "1"));

        let owner = guild.owner().await.unwrap();
        assert_eq!(owner.user().username(), "owner");
        assert!(guild.is_owner(owner.user().id()));
        assert_eq!(rest.fetches(), 1);
    }

    #[tokio::test]
    async fn test_update_clears_colors() {
        let cache = cache_with(MockRest::new());
        let mut payload = guild_payload("10", "1");
        payload.roles.push(RolePayload {
            id: "r".into(),
            color: 0xabcdef,
            ..Default::default()
        });
        cache.upsert_guild(payload.clone());

        let mut member = MemberPayload::new("10", user("2", "bob"));
        member.roles.push("r".into());
        let bob = cache.upsert_member(member);
        assert_eq!(bob.color().await, 0xabcdef);

        payload.roles[0].color = 0x123456;
        let guild = cache.upsert_guild(payload);
        assert!(guild.cached_color("2").is_none());
        assert_eq!(bob.color().await, 0x123456);
    }

    #[test]
    fn test_member_count_saturates() {
        let cache = cache_with(MockRest::new());
        let guild = cache.upsert_guild(guild_payload("10", "1"));
        guild.adjust_member_count(false);
        assert_eq!(guild.member_count(), 0);
        guild.adjust_member_count(true);
        assert_eq!(guild.member_count(), 1);
    }

    #[test]
    fn test_icon_url() {
        let cache = cache_with(MockRest::new());
        let mut payload = guild_payload("10", "1");
        assert!(cache.upsert_guild(payload.clone()).icon_url().is_none());

        payload.icon = Some("hash".into());
        assert_eq!(
            cache.upsert_guild(payload).icon_url().as_deref(),
            Some("https://cdn.discordapp.com/icons/10/hash.png")
        );
    }
}
