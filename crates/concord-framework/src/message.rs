//! The dispatchable message.
//!
//! A [`Message`] is a normalized message event: the raw payload plus the
//! cached author and mentioned users. Each message handler receives its own
//! copy carrying the [`Args`] captured by that handler's pattern.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use concord_core::{MessagePayload, snowflake};

use crate::cache::{Channel, EntityCache, Guild, Member, User, report};
use crate::pattern::Args;

struct MessageData {
    payload: MessagePayload,
    author: Arc<User>,
    mentions: Vec<Arc<User>>,
    cache: EntityCache,
}

/// A normalized chat message. Cloning is cheap.
#[derive(Clone)]
pub struct Message {
    data: Arc<MessageData>,
    args: Args,
}

impl Message {
    /// Normalizes a payload, resolving the author and mentions through the
    /// cache. Returns `None` if the payload has no author.
    pub fn from_payload(cache: &EntityCache, mut payload: MessagePayload) -> Option<Self> {
        let author = cache.upsert_user(payload.author.clone()?);
        let mentions = std::mem::take(&mut payload.mentions)
            .into_iter()
            .map(|user| cache.upsert_user(user))
            .collect();

        Some(Self {
            data: Arc::new(MessageData {
                payload,
                author,
                mentions,
                cache: cache.clone(),
            }),
            args: Args::default(),
        })
    }

    /// Returns a copy of this message carrying `args`.
    pub(crate) fn with_args(&self, args: Args) -> Self {
        Self {
            data: Arc::clone(&self.data),
            args,
        }
    }

    pub fn id(&self) -> &str {
        &self.data.payload.id
    }

    pub fn channel_id(&self) -> &str {
        &self.data.payload.channel_id
    }

    /// `None` for direct messages.
    pub fn guild_id(&self) -> Option<&str> {
        self.data.payload.guild_id.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.data.payload.content
    }

    pub fn author(&self) -> &Arc<User> {
        &self.data.author
    }

    pub fn mentions(&self) -> &[Arc<User>] {
        &self.data.mentions
    }

    pub fn mentions_everyone(&self) -> bool {
        self.data.payload.mention_everyone
    }

    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.data.mentions.iter().any(|u| u.id() == user_id)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.data.payload.timestamp.as_deref()
    }

    pub fn created_at(&self) -> Option<SystemTime> {
        snowflake::created_at(self.id())
    }

    /// The payload this message was built from. `mentions` is emptied; use
    /// [`mentions`](Self::mentions) instead.
    pub fn payload(&self) -> &MessagePayload {
        &self.data.payload
    }

    /// Arguments captured by the handler's pattern. Empty for interceptors.
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Shorthand for `self.args().arg(name)`.
    pub fn arg(&self, name: &str) -> &str {
        self.args.arg(name)
    }

    // ─── Relationships ────────────────────────────────────────────────────

    pub async fn channel(&self) -> Option<Arc<Channel>> {
        self.data.cache.channel(self.channel_id()).await
    }

    /// Resolves the guild, through the channel if the payload lacks a guild ID.
    pub async fn guild(&self) -> Option<Arc<Guild>> {
        match self.guild_id() {
            Some(guild_id) => self.data.cache.guild(guild_id).await,
            None => self.channel().await?.guild().await,
        }
    }

    /// Resolves the author's membership in the message's guild.
    pub async fn member(&self) -> Option<Arc<Member>> {
        let guild = self.guild().await?;
        self.data.cache.member(guild.id(), self.author().id()).await
    }

    // ─── Outbound ─────────────────────────────────────────────────────────

    /// Sends `content` to the channel this message came from.
    pub async fn reply(&self, content: &str) -> Option<Message> {
        let rest = self.data.cache.rest();
        let payload = report(
            "reply",
            rest.send_message(self.channel_id(), content).await,
        )?;
        Message::from_payload(&self.data.cache, payload)
    }

    /// Replaces this message's content. Only works on the client's own messages.
    pub async fn edit(&self, content: &str) -> Option<Message> {
        let rest = self.data.cache.rest();
        let result = rest
            .edit_message(self.channel_id(), self.id(), content)
            .await;
        Message::from_payload(&self.data.cache, report("edit message", result)?)
    }

    pub async fn delete(&self) -> bool {
        let rest = self.data.cache.rest();
        let result = rest.delete_message(self.channel_id(), self.id()).await;
        report("delete message", result).is_some()
    }

    /// Adds a reaction. `emoji` is a unicode emoji or `name:id`.
    pub async fn react(&self, emoji: &str) -> bool {
        let rest = self.data.cache.rest();
        let result = rest.add_reaction(self.channel_id(), self.id(), emoji).await;
        report("add reaction", result).is_some()
    }

    /// Removes `user_id`'s reaction.
    pub async fn remove_reaction(&self, emoji: &str, user_id: &str) -> bool {
        let rest = self.data.cache.rest();
        let result = rest
            .remove_reaction(self.channel_id(), self.id(), emoji, user_id)
            .await;
        report("remove reaction", result).is_some()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id())
            .field("channel_id", &self.channel_id())
            .field("author", &self.author().id())
            .field("content", &self.content())
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use concord_core::ChannelPayload;

    use super::*;
    use crate::pattern::Pattern;
    use crate::testing::{MockRest, cache_with, guild_payload, message, user};

    #[test]
    fn test_from_payload_requires_author() {
        let cache = cache_with(MockRest::new());
        let payload = MessagePayload {
            id: "1".into(),
            channel_id: "20".into(),
            ..Default::default()
        };
        assert!(Message::from_payload(&cache, payload).is_none());
    }

    #[test]
    fn test_author_and_mentions_are_cached() {
        let cache = cache_with(MockRest::new());
        let mut payload = message("1", "20", user("2", "bob"), "hi <@3>");
        payload.mentions.push(user("3", "carol"));

        let msg = Message::from_payload(&cache, payload).unwrap();
        assert!(Arc::ptr_eq(msg.author(), &cache.peek_user("2").unwrap()));
        assert!(msg.mentions_user("3"));
        assert_eq!(cache.stats().users, 2);
    }

    #[test]
    fn test_with_args_shares_payload() {
        let cache = cache_with(MockRest::new());
        let msg =
            Message::from_payload(&cache, message("1", "20", user("2", "bob"), "say hi")).unwrap();
        let args = Pattern::new("say {text}").capture(msg.content());
        let copy = msg.with_args(args);

        assert_eq!(copy.arg("text"), "hi");
        assert_eq!(msg.arg("text"), "");
        assert!(Arc::ptr_eq(&msg.data, &copy.data));
    }

    #[tokio::test]
    async fn test_guild_resolves_through_channel() {
        let rest = MockRest::new().with_guild(guild_payload("10", "1"));
        let cache = cache_with(rest);
        cache.upsert_channel(ChannelPayload::new("20", "10", "general"));

        let msg =
            Message::from_payload(&cache, message("1", "20", user("2", "bob"), "hi")).unwrap();
        assert!(msg.guild_id().is_none());
        assert_eq!(msg.guild().await.unwrap().id(), "10");
    }

    #[tokio::test]
    async fn test_outbound_pass_throughs() {
        let rest = MockRest::new();
        let cache = cache_with(rest.clone());
        let msg =
            Message::from_payload(&cache, message("1", "20", user("2", "bob"), "hi")).unwrap();

        assert!(msg.reply("pong").await.is_some());
        assert!(msg.react("👍").await);
        assert!(msg.remove_reaction("👍", "2").await);
        assert!(msg.delete().await);
        assert_eq!(
            rest.calls(),
            [
                "send_message 20 pong",
                "add_reaction 20 1 👍",
                "remove_reaction 20 1 👍 2",
                "delete_message 20 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_outbound_failure_is_reported_not_raised() {
        let cache = cache_with(MockRest::new().failing_outbound());
        let msg =
            Message::from_payload(&cache, message("1", "20", user("2", "bob"), "hi")).unwrap();

        assert!(msg.reply("pong").await.is_none());
        assert!(msg.edit("new").await.is_none());
        assert!(!msg.delete().await);
    }
}
