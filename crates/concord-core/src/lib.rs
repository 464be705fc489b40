//! # Concord Core
//!
//! The foundation layer of the Concord client framework.
//!
//! This crate defines what flows into and out of the core engine without
//! implementing any of it:
//!
//! - **Payload model**: plain snapshots of remote users, members, guilds,
//!   channels and messages ([`model`])
//! - **Gateway events**: the finite set of inbound events as a tagged variant
//!   ([`GatewayEvent`], [`EventKind`])
//! - **Collaborators**: the traits an application implements to plug in a
//!   real connection ([`Gateway`], [`RestClient`], [`LocalState`])
//! - **Errors**: [`ApiError`] and [`TransportError`]
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────┐
//! │   Gateway   │────▶│ Dispatcher │────▶│  Handler  │
//! │ (external)  │     │ + Cache    │────▶│  Handler  │
//! └─────────────┘     └────────────┘────▶│Interceptor│
//!        ▲                  │            └───────────┘
//!        │            ┌─────▼──────┐
//!        └────────────│ RestClient │
//!                     └────────────┘
//! ```

pub mod error;
pub mod event;
pub mod gateway;
pub mod model;
pub mod snowflake;

pub use error::{ApiError, ApiResult, TransportError, TransportResult};
pub use event::{
    BanPayload, EventKind, GatewayEvent, GuildDeletePayload, MemberRemovePayload, ReadyPayload,
};
pub use gateway::{DisabledRestClient, EventCallback, Gateway, LocalState, NoLocalState, RestClient};
pub use model::{
    ChannelPayload, ChannelType, EmojiPayload, GuildPayload, MemberPayload, MessagePayload,
    ReactionPayload, RolePayload, UserPayload,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::*;
    pub use super::event::*;
    pub use super::gateway::*;
    pub use super::model::*;
}
