//! Test doubles and fixtures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use concord_core::{
    ApiError, ApiResult, ChannelPayload, ChannelType, GuildPayload, MemberPayload,
    MessagePayload, NoLocalState, RestClient, UserPayload,
};
use parking_lot::Mutex;

use crate::cache::EntityCache;

pub(crate) fn user(id: &str, username: &str) -> UserPayload {
    UserPayload::new(id, username)
}

pub(crate) fn guild_payload(id: &str, owner_id: &str) -> GuildPayload {
    GuildPayload::new(id, format!("guild-{id}"), owner_id)
}

pub(crate) fn message(id: &str, channel_id: &str, author: UserPayload, content: &str) -> MessagePayload {
    MessagePayload::new(id, channel_id, author, content)
}

pub(crate) fn cache_with(rest: MockRest) -> EntityCache {
    EntityCache::new(Arc::new(rest), Arc::new(NoLocalState))
}

#[derive(Default)]
struct MockState {
    guilds: HashMap<String, GuildPayload>,
    channels: HashMap<String, ChannelPayload>,
    members: HashMap<(String, String), MemberPayload>,
    users: HashMap<String, UserPayload>,
    history: HashMap<String, Vec<MessagePayload>>,
    calls: Vec<String>,
}

/// In-memory [`RestClient`] that records outbound calls.
#[derive(Clone, Default)]
pub(crate) struct MockRest {
    state: Arc<Mutex<MockState>>,
    fetches: Arc<AtomicUsize>,
    failing_fetches: Arc<AtomicUsize>,
    failing_outbound: Arc<AtomicBool>,
    sent: Arc<AtomicUsize>,
}

impl MockRest {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_guild(self, guild: GuildPayload) -> Self {
        self.state.lock().guilds.insert(guild.id.clone(), guild);
        self
    }

    pub(crate) fn with_member(self, member: MemberPayload) -> Self {
        let key = (member.guild_id.clone(), member.user.id.clone());
        self.state.lock().members.insert(key, member);
        self
    }

    pub(crate) fn with_user(self, user: UserPayload) -> Self {
        self.state.lock().users.insert(user.id.clone(), user);
        self
    }

    /// Seeds `count` messages in `channel_id`, newest first.
    pub(crate) fn with_history(self, channel_id: &str, count: usize) -> Self {
        let messages = (0..count)
            .rev()
            .map(|i| message(&format!("h{i}"), channel_id, user("2", "bob"), "old"))
            .collect();
        self.state
            .lock()
            .history
            .insert(channel_id.to_owned(), messages);
        self
    }

    /// Fails the next `count` fetches with a server error.
    pub(crate) fn failing_fetches(self, count: usize) -> Self {
        self.failing_fetches.store(count, Ordering::SeqCst);
        self
    }

    /// Fails every outbound call.
    pub(crate) fn failing_outbound(self) -> Self {
        self.failing_outbound.store(true, Ordering::SeqCst);
        self
    }

    /// Number of fetch attempts so far.
    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Outbound calls in order, formatted as `name arg...`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn fetch<T: Clone>(
        &self,
        kind: &'static str,
        id: &str,
        lookup: impl FnOnce(&MockState) -> Option<T>,
    ) -> ApiResult<T> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ApiError::Http {
                status: 503,
                message: "unavailable".into(),
            });
        }
        lookup(&self.state.lock()).ok_or_else(|| ApiError::not_found(kind, id))
    }

    fn outbound(&self, call: String) -> ApiResult<()> {
        if self.failing_outbound.load(Ordering::SeqCst) {
            return Err(ApiError::Http {
                status: 403,
                message: "missing permissions".into(),
            });
        }
        self.state.lock().calls.push(call);
        Ok(())
    }

    fn own_message(&self, channel_id: &str, content: &str) -> MessagePayload {
        let n = self.sent.fetch_add(1, Ordering::SeqCst);
        message(&format!("m{n}"), channel_id, user("99", "concord").bot(), content)
    }
}

#[async_trait]
impl RestClient for MockRest {
    async fn fetch_guild(&self, guild_id: &str) -> ApiResult<GuildPayload> {
        self.fetch("guild", guild_id, |s| s.guilds.get(guild_id).cloned())
    }

    async fn fetch_channel(&self, channel_id: &str) -> ApiResult<ChannelPayload> {
        self.fetch("channel", channel_id, |s| s.channels.get(channel_id).cloned())
    }

    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> ApiResult<MemberPayload> {
        let key = (guild_id.to_owned(), user_id.to_owned());
        self.fetch("member", user_id, |s| s.members.get(&key).cloned())
    }

    async fn fetch_user(&self, user_id: &str) -> ApiResult<UserPayload> {
        self.fetch("user", user_id, |s| s.users.get(user_id).cloned())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> ApiResult<MessagePayload> {
        self.outbound(format!("send_message {channel_id} {content}"))?;
        Ok(self.own_message(channel_id, content))
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> ApiResult<MessagePayload> {
        self.outbound(format!("edit_message {channel_id} {message_id} {content}"))?;
        let mut edited = self.own_message(channel_id, content);
        edited.id = message_id.to_owned();
        Ok(edited)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ApiResult<()> {
        self.outbound(format!("delete_message {channel_id} {message_id}"))
    }

    async fn delete_messages(&self, channel_id: &str, message_ids: &[String]) -> ApiResult<()> {
        self.outbound(format!("delete_messages {channel_id} {}", message_ids.len()))
    }

    async fn channel_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> ApiResult<Vec<MessagePayload>> {
        if self.failing_outbound.load(Ordering::SeqCst) {
            return Err(ApiError::Timeout);
        }
        let state = self.state.lock();
        let history = state.history.get(channel_id).cloned().unwrap_or_default();
        Ok(history.into_iter().take(limit).collect())
    }

    async fn channel_message(&self, channel_id: &str, message_id: &str) -> ApiResult<MessagePayload> {
        let state = self.state.lock();
        state
            .history
            .get(channel_id)
            .and_then(|h| h.iter().find(|m| m.id == message_id).cloned())
            .ok_or_else(|| ApiError::not_found("message", message_id))
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> ApiResult<()> {
        self.outbound(format!("add_reaction {channel_id} {message_id} {emoji}"))
    }

    async fn remove_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> ApiResult<()> {
        self.outbound(format!(
            "remove_reaction {channel_id} {message_id} {emoji} {user_id}"
        ))
    }

    async fn create_ban(
        &self,
        guild_id: &str,
        user_id: &str,
        delete_message_days: u8,
    ) -> ApiResult<()> {
        self.outbound(format!("create_ban {guild_id} {user_id} {delete_message_days}"))
    }

    async fn create_dm_channel(&self, user_id: &str) -> ApiResult<ChannelPayload> {
        self.outbound(format!("create_dm_channel {user_id}"))?;
        Ok(ChannelPayload {
            id: format!("dm-{user_id}"),
            kind: ChannelType::Dm,
            ..Default::default()
        })
    }
}
