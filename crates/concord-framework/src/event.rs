//! Domain values handed to lifecycle handlers.
//!
//! Most lifecycle handlers receive a cached entity directly (`Arc<Guild>`,
//! `Arc<Channel>`, `Arc<Member>`). The events below carry more than one
//! entity, or data the cache does not keep.

use std::fmt;
use std::sync::Arc;

use concord_core::{EmojiPayload, ReactionPayload};

use crate::cache::{Channel, EntityCache, Guild, Member, User, report};
use crate::message::Message;

/// The session is established.
#[derive(Debug, Clone)]
pub struct Ready {
    /// The account the client is logged in as.
    pub user: Arc<User>,
    pub session_id: String,
    /// Guilds that will follow as guild-create events.
    pub guild_ids: Vec<String>,
}

/// A guild became unavailable or the account left it.
#[derive(Debug, Clone)]
pub struct GuildDelete {
    pub guild_id: String,
    pub unavailable: bool,
    /// The cached instance that was removed, if there was one.
    pub guild: Option<Arc<Guild>>,
}

/// A ban was added or lifted.
#[derive(Debug, Clone)]
pub struct GuildBan {
    pub guild_id: String,
    pub user: Arc<User>,
}

/// A reaction was added to a message.
#[derive(Clone)]
pub struct Reaction {
    payload: ReactionPayload,
    cache: EntityCache,
}

impl Reaction {
    pub(crate) fn new(payload: ReactionPayload, cache: EntityCache) -> Self {
        Self { payload, cache }
    }

    pub fn user_id(&self) -> &str {
        &self.payload.user_id
    }

    pub fn channel_id(&self) -> &str {
        &self.payload.channel_id
    }

    pub fn message_id(&self) -> &str {
        &self.payload.message_id
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.payload.guild_id.as_deref()
    }

    pub fn emoji(&self) -> &EmojiPayload {
        &self.payload.emoji
    }

    pub async fn user(&self) -> Option<Arc<User>> {
        self.cache.user(self.user_id()).await
    }

    pub async fn member(&self) -> Option<Arc<Member>> {
        self.cache.member(self.guild_id()?, self.user_id()).await
    }

    pub async fn channel(&self) -> Option<Arc<Channel>> {
        self.cache.channel(self.channel_id()).await
    }

    /// Fetches the message that was reacted to.
    pub async fn message(&self) -> Option<Message> {
        self.channel().await?.message(self.message_id()).await
    }

    /// Removes this reaction.
    pub async fn remove(&self) -> bool {
        let result = self
            .cache
            .rest()
            .remove_reaction(
                self.channel_id(),
                self.message_id(),
                &self.payload.emoji.api_name(),
                self.user_id(),
            )
            .await;
        report("remove reaction", result).is_some()
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("payload", &self.payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use concord_core::{ChannelPayload, EmojiPayload, ReactionPayload};

    use super::*;
    use crate::testing::{MockRest, cache_with, user};

    fn reaction(cache: &EntityCache) -> Reaction {
        Reaction::new(
            ReactionPayload {
                user_id: "2".into(),
                channel_id: "20".into(),
                message_id: "30".into(),
                guild_id: Some("10".into()),
                emoji: EmojiPayload {
                    id: Some("55".into()),
                    name: "party".into(),
                    animated: false,
                },
            },
            cache.clone(),
        )
    }

    #[tokio::test]
    async fn test_remove_uses_api_emoji_name() {
        let rest = MockRest::new();
        let cache = cache_with(rest.clone());
        assert!(reaction(&cache).remove().await);
        assert_eq!(rest.calls(), ["remove_reaction 20 30 party:55 2"]);
    }

    #[tokio::test]
    async fn test_resolves_user_and_channel() {
        let cache = cache_with(MockRest::new());
        cache.upsert_user(user("2", "bob"));
        cache.upsert_channel(ChannelPayload::new("20", "10", "general"));

        let reaction = reaction(&cache);
        assert_eq!(reaction.user().await.unwrap().username(), "bob");
        assert_eq!(reaction.channel().await.unwrap().name(), "general");
        assert!(reaction.member().await.is_none());
    }
}
