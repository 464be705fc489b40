use std::fmt;
use std::sync::Arc;

use concord_core::{ChannelPayload, ChannelType};
use parking_lot::RwLock;
use tracing::debug;

use super::{CacheRef, Guild, report};
use crate::message::Message;

/// A cached channel.
pub struct Channel {
    id: String,
    data: RwLock<ChannelPayload>,
    cache: CacheRef,
}

impl Channel {
    pub(crate) fn new(payload: ChannelPayload, cache: CacheRef) -> Self {
        Self {
            id: payload.id.clone(),
            data: RwLock::new(payload),
            cache,
        }
    }

    pub(crate) fn update(&self, payload: ChannelPayload) {
        *self.data.write() = payload;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> ChannelPayload {
        self.data.read().clone()
    }

    pub fn name(&self) -> String {
        self.data.read().name.clone()
    }

    pub fn topic(&self) -> Option<String> {
        self.data.read().topic.clone()
    }

    pub fn position(&self) -> i32 {
        self.data.read().position
    }

    pub fn is_nsfw(&self) -> bool {
        self.data.read().nsfw
    }

    pub fn kind(&self) -> ChannelType {
        self.data.read().kind
    }

    pub fn is_dm(&self) -> bool {
        matches!(self.kind(), ChannelType::Dm | ChannelType::GroupDm)
    }

    /// `None` for direct-message channels.
    pub fn guild_id(&self) -> Option<String> {
        self.data.read().guild_id.clone()
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }

    /// Resolves the owning guild.
    pub async fn guild(&self) -> Option<Arc<Guild>> {
        let guild_id = self.guild_id()?;
        self.cache.get()?.guild(&guild_id).await
    }

    // ─── Outbound ─────────────────────────────────────────────────────────

    /// Sends a text message to this channel.
    pub async fn send(&self, content: &str) -> Option<Message> {
        let cache = self.cache.get()?;
        let payload = report(
            "send message",
            cache.rest().send_message(&self.id, content).await,
        )?;
        Message::from_payload(&cache, payload)
    }

    /// Fetches up to `limit` recent messages, newest first.
    ///
    /// Messages without an author are skipped.
    pub async fn messages(&self, limit: usize) -> Vec<Message> {
        let Some(cache) = self.cache.get() else {
            return Vec::new();
        };
        let result = cache.rest().channel_messages(&self.id, limit).await;
        report("fetch messages", result)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|payload| Message::from_payload(&cache, payload))
            .collect()
    }

    /// Fetches one message by ID.
    pub async fn message(&self, message_id: &str) -> Option<Message> {
        let cache = self.cache.get()?;
        let payload = report(
            "fetch message",
            cache.rest().channel_message(&self.id, message_id).await,
        )?;
        Message::from_payload(&cache, payload)
    }

    /// Deletes the `count` most recent messages.
    pub async fn delete_messages(&self, count: usize) -> bool {
        let Some(cache) = self.cache.get() else {
            return false;
        };
        let Some(recent) = report(
            "fetch messages",
            cache.rest().channel_messages(&self.id, count).await,
        ) else {
            return false;
        };
        if recent.is_empty() {
            debug!(channel_id = %self.id, "Nothing to delete");
            return true;
        }

        let ids: Vec<String> = recent.into_iter().map(|m| m.id).collect();
        let result = cache.rest().delete_messages(&self.id, &ids).await;
        report("bulk delete", result).is_some()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("name", &self.data.read().name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use concord_core::ChannelPayload;

    use crate::testing::{MockRest, cache_with, guild_payload};

    #[tokio::test]
    async fn test_send_returns_message_with_cached_author() {
        let rest = MockRest::new();
        let cache = cache_with(rest.clone());
        let channel = cache.upsert_channel(ChannelPayload::new("20", "10", "general"));

        let sent = channel.send("hello").await.unwrap();
        assert_eq!(sent.content(), "hello");
        assert_eq!(sent.channel_id(), "20");
        assert!(cache.peek_user(sent.author().id()).is_some());
        assert_eq!(rest.calls(), ["send_message 20 hello"]);
    }

    #[tokio::test]
    async fn test_send_failure_is_none() {
        let rest = MockRest::new().failing_outbound();
        let cache = cache_with(rest);
        let channel = cache.upsert_channel(ChannelPayload::new("20", "10", "general"));
        assert!(channel.send("hello").await.is_none());
        assert!(!channel.delete_messages(5).await);
    }

    #[tokio::test]
    async fn test_delete_messages_bulk_deletes_recent() {
        let rest = MockRest::new().with_history("20", 3);
        let cache = cache_with(rest.clone());
        let channel = cache.upsert_channel(ChannelPayload::new("20", "10", "general"));

        assert_eq!(channel.messages(10).await.len(), 3);
        assert!(channel.delete_messages(2).await);
        assert_eq!(rest.calls().last().unwrap(), "delete_messages 20 2");
    }

    #[tokio::test]
    async fn test_guild_is_resolved_through_cache() {
        let rest = MockRest::new().with_guild(guild_payload("10", "1"));
        let cache = cache_with(rest);
        let channel = cache.upsert_channel(ChannelPayload::new("20", "10", "general"));

        let guild = channel.guild().await.unwrap();
        assert_eq!(guild.id(), "10");
        assert_eq!(channel.mention(), "<#20>");
    }
}
