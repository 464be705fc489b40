//! # Concord Framework
//!
//! The event engine of the Concord client framework.
//!
//! This layer provides:
//! - [`EntityCache`]: one live, shared instance per remote user, member,
//!   guild and channel, with get-or-fetch lookups
//! - [`HandlerRegistry`]: permanent handlers, pattern-gated for messages,
//!   optionally one-shot
//! - [`Interceptors`]: temporary "wait for the next matching message"
//!   subscriptions with timeouts
//! - [`Dispatcher`]: normalizes each inbound event and fans it out to
//!   interceptors and handlers
//!
//! Connecting a gateway and running the whole thing is the job of
//! `concord-runtime`.

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod interceptor;
pub mod message;
pub mod pattern;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheStats, Channel, EntityCache, Guild, Member, User};
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::{DispatchError, DispatchResult};
pub use event::{GuildBan, GuildDelete, Reaction, Ready};
pub use handler::{
    Callback, HandleResponse, Handler, HandlerEntry, HandlerId, HandlerRegistry, callback,
};
pub use interceptor::{
    CancelHandle, DEFAULT_BUFFER, DEFAULT_WAIT_TIMEOUT, Interceptors, Subscription,
    SubscriptionId, Teardown, WaitOutcome,
};
pub use message::Message;
pub use pattern::{Args, Pattern};
