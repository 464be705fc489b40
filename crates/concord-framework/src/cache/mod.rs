//! Concurrent entity cache.
//!
//! [`EntityCache`] keeps one live instance per remote user, member, guild and
//! channel. Instances are handed out as `Arc`s and mutated in place on every
//! update, so all holders observe the same state.
//!
//! # Lookup
//!
//! The async getters ([`user`](EntityCache::user), [`guild`](EntityCache::guild),
//! ...) consult, in order:
//!
//! 1. the in-memory map
//! 2. the [`LocalState`] collaborator
//! 3. the [`RestClient`] collaborator
//!
//! A fallback hit is inserted through the matching `upsert_*` method. A miss
//! everywhere returns `None` and caches nothing, so the next lookup retries.
//!
//! # Locking
//!
//! Each kind has its own `parking_lot::RwLock`. Guards never live across an
//! `.await`: fetches happen unlocked and only the final insert is guarded. The
//! existence check and insert of an upsert share one write lock, so racing
//! upserts of the same ID converge on a single instance.

mod channel;
mod guild;
mod member;
mod user;

pub use channel::Channel;
pub use guild::Guild;
pub use member::Member;
pub use user::User;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use concord_core::{
    ApiError, ApiResult, ChannelPayload, GuildPayload, LocalState, MemberPayload, RestClient,
    UserPayload,
};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

// ============================================================================
// Store
// ============================================================================

/// One kind's map.
struct Store<K, V> {
    map: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> Store<K, V> {
    fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.read().get(key).cloned()
    }

    /// Mutates the existing entry with `update`, or inserts `create(payload)`.
    fn upsert<P>(
        &self,
        key: K,
        payload: P,
        create: impl FnOnce(P) -> V,
        update: impl FnOnce(&V, P),
    ) -> Arc<V> {
        if let Some(existing) = self.get(&key) {
            update(&existing, payload);
            return existing;
        }

        let (entity, leftover) = {
            let mut map = self.map.write();
            match map.get(&key) {
                Some(existing) => (Arc::clone(existing), Some(payload)),
                None => {
                    let entity = Arc::new(create(payload));
                    map.insert(key, Arc::clone(&entity));
                    (entity, None)
                }
            }
        };

        // Lost the insert race: apply this update to the winner.
        if let Some(payload) = leftover {
            update(&entity, payload);
        }
        entity
    }

    fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.write().remove(key)
    }

    fn values(&self) -> Vec<Arc<V>> {
        self.map.read().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }
}

// ============================================================================
// EntityCache
// ============================================================================

pub(crate) struct CacheInner {
    users: Store<String, User>,
    members: Store<(String, String), Member>,
    guilds: Store<String, Guild>,
    channels: Store<String, Channel>,
    rest: Arc<dyn RestClient>,
    state: Arc<dyn LocalState>,
}

/// Entry counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub users: usize,
    pub members: usize,
    pub guilds: usize,
    pub channels: usize,
}

/// Handle to the shared entity cache. Cloning is cheap.
#[derive(Clone)]
pub struct EntityCache {
    inner: Arc<CacheInner>,
}

impl EntityCache {
    /// Creates an empty cache backed by the given collaborators.
    pub fn new(rest: Arc<dyn RestClient>, state: Arc<dyn LocalState>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                users: Store::new(),
                members: Store::new(),
                guilds: Store::new(),
                channels: Store::new(),
                rest,
                state,
            }),
        }
    }

    /// Returns the REST collaborator used for fetches and outbound calls.
    pub fn rest(&self) -> &Arc<dyn RestClient> {
        &self.inner.rest
    }

    pub(crate) fn downgrade(&self) -> CacheRef {
        CacheRef(Arc::downgrade(&self.inner))
    }

    // ─── Get-or-fetch ─────────────────────────────────────────────────────

    /// Returns the user with `user_id`, fetching it on a miss.
    pub async fn user(&self, user_id: &str) -> Option<Arc<User>> {
        if let Some(user) = self.inner.users.get(user_id) {
            return Some(user);
        }
        if let Some(payload) = self.inner.state.user(user_id) {
            return Some(self.upsert_user(payload));
        }
        let fetched = self.inner.rest.fetch_user(user_id).await;
        settle_fetch("user", user_id, fetched).map(|p| self.upsert_user(p))
    }

    /// Returns the guild with `guild_id`, fetching it on a miss.
    pub async fn guild(&self, guild_id: &str) -> Option<Arc<Guild>> {
        if let Some(guild) = self.inner.guilds.get(guild_id) {
            return Some(guild);
        }
        if let Some(payload) = self.inner.state.guild(guild_id) {
            return Some(self.upsert_guild(payload));
        }
        let fetched = self.inner.rest.fetch_guild(guild_id).await;
        settle_fetch("guild", guild_id, fetched).map(|p| self.upsert_guild(p))
    }

    /// Returns the channel with `channel_id`, fetching it on a miss.
    pub async fn channel(&self, channel_id: &str) -> Option<Arc<Channel>> {
        if let Some(channel) = self.inner.channels.get(channel_id) {
            return Some(channel);
        }
        if let Some(payload) = self.inner.state.channel(channel_id) {
            return Some(self.upsert_channel(payload));
        }
        let fetched = self.inner.rest.fetch_channel(channel_id).await;
        settle_fetch("channel", channel_id, fetched).map(|p| self.upsert_channel(p))
    }

    /// Returns `user_id`'s membership in `guild_id`, fetching it on a miss.
    pub async fn member(&self, guild_id: &str, user_id: &str) -> Option<Arc<Member>> {
        if let Some(member) = self.peek_member(guild_id, user_id) {
            return Some(member);
        }
        if let Some(payload) = self.inner.state.member(guild_id, user_id) {
            return Some(self.upsert_member(payload));
        }
        let fetched = self.inner.rest.fetch_member(guild_id, user_id).await;
        settle_fetch("member", user_id, fetched).map(|p| self.upsert_member(p))
    }

    // ─── Memory-only lookups ──────────────────────────────────────────────

    pub fn peek_user(&self, user_id: &str) -> Option<Arc<User>> {
        self.inner.users.get(user_id)
    }

    pub fn peek_guild(&self, guild_id: &str) -> Option<Arc<Guild>> {
        self.inner.guilds.get(guild_id)
    }

    pub fn peek_channel(&self, channel_id: &str) -> Option<Arc<Channel>> {
        self.inner.channels.get(channel_id)
    }

    pub fn peek_member(&self, guild_id: &str, user_id: &str) -> Option<Arc<Member>> {
        self.inner
            .members
            .get(&(guild_id.to_owned(), user_id.to_owned()))
    }

    // ─── Upsert ───────────────────────────────────────────────────────────

    /// Inserts a user or updates the live instance in place.
    pub fn upsert_user(&self, payload: UserPayload) -> Arc<User> {
        self.inner.users.upsert(
            payload.id.clone(),
            payload,
            |p| User::new(p, self.downgrade()),
            User::update,
        )
    }

    /// Inserts a guild or updates the live instance in place.
    ///
    /// Members and channels embedded in the payload are upserted into their
    /// own maps; the guild itself keeps neither list.
    pub fn upsert_guild(&self, mut payload: GuildPayload) -> Arc<Guild> {
        let members = std::mem::take(&mut payload.members);
        let channels = std::mem::take(&mut payload.channels);
        let guild_id = payload.id.clone();

        let guild = self.inner.guilds.upsert(
            guild_id.clone(),
            payload,
            |p| Guild::new(p, self.downgrade()),
            Guild::update,
        );

        for mut channel in channels {
            channel.guild_id.get_or_insert_with(|| guild_id.clone());
            self.upsert_channel(channel);
        }
        for mut member in members {
            if member.guild_id.is_empty() {
                member.guild_id.clone_from(&guild_id);
            }
            self.upsert_member(member);
        }

        guild
    }

    /// Inserts a channel or updates the live instance in place.
    pub fn upsert_channel(&self, payload: ChannelPayload) -> Arc<Channel> {
        self.inner.channels.upsert(
            payload.id.clone(),
            payload,
            |p| Channel::new(p, self.downgrade()),
            Channel::update,
        )
    }

    /// Inserts a member or updates the live instance in place.
    ///
    /// The embedded user is upserted first and shared by the member. Any
    /// memoized display color for the member is invalidated.
    pub fn upsert_member(&self, payload: MemberPayload) -> Arc<Member> {
        let user = self.upsert_user(payload.user.clone());
        let key = (payload.guild_id.clone(), payload.user.id.clone());

        let member = self.inner.members.upsert(
            key,
            payload,
            |p| Member::new(p, user, self.downgrade()),
            Member::update,
        );

        // Invalidate after the write.
        if let Some(guild) = self.peek_guild(member.guild_id()) {
            guild.forget_color(member.user().id());
        }
        member
    }

    // ─── Removal ──────────────────────────────────────────────────────────

    /// Removes a user. Outstanding references stay valid.
    pub fn remove_user(&self, user_id: &str) -> Option<Arc<User>> {
        self.inner.users.remove(user_id)
    }

    pub fn remove_guild(&self, guild_id: &str) -> Option<Arc<Guild>> {
        self.inner.guilds.remove(guild_id)
    }

    pub fn remove_channel(&self, channel_id: &str) -> Option<Arc<Channel>> {
        self.inner.channels.remove(channel_id)
    }

    pub fn remove_member(&self, guild_id: &str, user_id: &str) -> Option<Arc<Member>> {
        let removed = self
            .inner
            .members
            .remove(&(guild_id.to_owned(), user_id.to_owned()));
        if let Some(guild) = self.peek_guild(guild_id) {
            guild.forget_color(user_id);
        }
        removed
    }

    // ─── Detached entities ────────────────────────────────────────────────

    /// Builds a channel that is not stored in the cache.
    pub(crate) fn detached_channel(&self, payload: ChannelPayload) -> Arc<Channel> {
        Arc::new(Channel::new(payload, self.downgrade()))
    }

    /// Builds a member that is not stored in the cache. The user is still
    /// resolved through the cache.
    pub(crate) fn detached_member(&self, payload: MemberPayload) -> Arc<Member> {
        let user = self.upsert_user(payload.user.clone());
        Arc::new(Member::new(payload, user, self.downgrade()))
    }

    // ─── Scans ────────────────────────────────────────────────────────────

    pub(crate) fn members_of(&self, guild_id: &str) -> Vec<Arc<Member>> {
        self.inner
            .members
            .values()
            .into_iter()
            .filter(|m| m.guild_id() == guild_id)
            .collect()
    }

    pub(crate) fn channels_of(&self, guild_id: &str) -> Vec<Arc<Channel>> {
        self.inner
            .channels
            .values()
            .into_iter()
            .filter(|c| c.guild_id().as_deref() == Some(guild_id))
            .collect()
    }

    /// Returns entry counts per kind.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            users: self.inner.users.len(),
            members: self.inner.members.len(),
            guilds: self.inner.guilds.len(),
            channels: self.inner.channels.len(),
        }
    }
}

impl fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("stats", &self.stats())
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Weak back-reference from an entity to its owning cache.
#[derive(Clone)]
pub(crate) struct CacheRef(Weak<CacheInner>);

impl CacheRef {
    pub(crate) fn get(&self) -> Option<EntityCache> {
        self.0.upgrade().map(|inner| EntityCache { inner })
    }
}

fn settle_fetch<T>(kind: &'static str, id: &str, result: ApiResult<T>) -> Option<T> {
    match result {
        Ok(payload) => Some(payload),
        Err(err @ (ApiError::NotFound { .. } | ApiError::NotSupported)) => {
            debug!(kind, id, error = %err, "Cache miss could not be filled");
            None
        }
        Err(err) => {
            warn!(kind, id, error = %err, "Fetch failed");
            None
        }
    }
}

/// Logs a failed outbound call and converts the result to an `Option`.
pub(crate) fn report<T>(action: &'static str, result: ApiResult<T>) -> Option<T> {
    result
        .inspect_err(|err| warn!(action, error = %err, "Outbound call failed"))
        .ok()
}
