//! External collaborator traits.
//!
//! The core never talks to the network itself. It consumes three
//! collaborators supplied by the application:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`Gateway`] | Push subscription model: one callback per [`EventKind`]. |
//! | [`RestClient`] | Request/response calls, used for cache misses and outbound actions. |
//! | [`LocalState`] | Fast synchronous lookups into the gateway session's own state. |

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{ApiError, ApiResult, TransportResult};
use crate::event::{EventKind, GatewayEvent};
use crate::model::{ChannelPayload, GuildPayload, MemberPayload, MessagePayload, UserPayload};

/// Callback registered with a [`Gateway`] for one event kind.
///
/// The returned future completes once the event has been handed off; the
/// gateway should not wait for handlers to finish.
pub type EventCallback = Arc<dyn Fn(GatewayEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// A persistent, push-based event source.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Registers `callback` to be invoked once per event of `kind`.
    ///
    /// Gateways may deliver events concurrently from their own tasks.
    fn subscribe(&self, kind: EventKind, callback: EventCallback);

    /// Opens the connection. Failure here is fatal to the client.
    async fn connect(&self) -> TransportResult<()>;

    /// Closes the connection.
    async fn disconnect(&self);
}

/// Request/response access to the remote API.
///
/// Every method has a default that returns [`ApiError::NotSupported`], so a
/// collaborator only implements what it can serve.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn fetch_guild(&self, _guild_id: &str) -> ApiResult<GuildPayload> {
        Err(ApiError::NotSupported)
    }

    async fn fetch_channel(&self, _channel_id: &str) -> ApiResult<ChannelPayload> {
        Err(ApiError::NotSupported)
    }

    async fn fetch_member(&self, _guild_id: &str, _user_id: &str) -> ApiResult<MemberPayload> {
        Err(ApiError::NotSupported)
    }

    async fn fetch_user(&self, _user_id: &str) -> ApiResult<UserPayload> {
        Err(ApiError::NotSupported)
    }

    /// Sends a text message to a channel.
    async fn send_message(&self, _channel_id: &str, _content: &str) -> ApiResult<MessagePayload> {
        Err(ApiError::NotSupported)
    }

    async fn edit_message(
        &self,
        _channel_id: &str,
        _message_id: &str,
        _content: &str,
    ) -> ApiResult<MessagePayload> {
        Err(ApiError::NotSupported)
    }

    async fn delete_message(&self, _channel_id: &str, _message_id: &str) -> ApiResult<()> {
        Err(ApiError::NotSupported)
    }

    async fn delete_messages(&self, _channel_id: &str, _message_ids: &[String]) -> ApiResult<()> {
        Err(ApiError::NotSupported)
    }

    /// Fetches up to `limit` recent messages from a channel, newest first.
    async fn channel_messages(
        &self,
        _channel_id: &str,
        _limit: usize,
    ) -> ApiResult<Vec<MessagePayload>> {
        Err(ApiError::NotSupported)
    }

    async fn channel_message(
        &self,
        _channel_id: &str,
        _message_id: &str,
    ) -> ApiResult<MessagePayload> {
        Err(ApiError::NotSupported)
    }

    /// `emoji` is in API form (`name` or `name:id`).
    async fn add_reaction(&self, _channel_id: &str, _message_id: &str, _emoji: &str) -> ApiResult<()> {
        Err(ApiError::NotSupported)
    }

    async fn remove_reaction(
        &self,
        _channel_id: &str,
        _message_id: &str,
        _emoji: &str,
        _user_id: &str,
    ) -> ApiResult<()> {
        Err(ApiError::NotSupported)
    }

    /// Bans a user, deleting `delete_message_days` worth of their messages.
    async fn create_ban(
        &self,
        _guild_id: &str,
        _user_id: &str,
        _delete_message_days: u8,
    ) -> ApiResult<()> {
        Err(ApiError::NotSupported)
    }

    async fn create_dm_channel(&self, _user_id: &str) -> ApiResult<ChannelPayload> {
        Err(ApiError::NotSupported)
    }
}

/// [`RestClient`] that supports nothing; every call fails with `NotSupported`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRestClient;

#[async_trait]
impl RestClient for DisabledRestClient {}

/// Synchronous lookups into state the gateway session already holds.
///
/// Consulted between the in-memory cache and a REST fetch. Lookups must be
/// cheap and must not block; returning `None` is always acceptable.
pub trait LocalState: Send + Sync {
    fn guild(&self, _guild_id: &str) -> Option<GuildPayload> {
        None
    }

    fn channel(&self, _channel_id: &str) -> Option<ChannelPayload> {
        None
    }

    fn member(&self, _guild_id: &str, _user_id: &str) -> Option<MemberPayload> {
        None
    }

    fn user(&self, _user_id: &str) -> Option<UserPayload> {
        None
    }
}

/// [`LocalState`] with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocalState;

impl LocalState for NoLocalState {}
