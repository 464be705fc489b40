//! # Concord
//!
//! A concurrent, type-safe client framework for real-time chat gateways.
//!
//! ## Overview
//!
//! Concord sits between a persistent gateway connection and application
//! code. It keeps one live, shared instance of every remote user, member,
//! guild and channel, turns raw gateway events into those domain objects,
//! and fans each event out to registered handlers and temporary
//! "wait for the next matching message" interceptors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────────────────────────┐
//! │   Gateway   │────▶│ Dispatcher │────▶│ Interceptors (bounded queues) │
//! │ (external)  │     │  + Cache   │────▶│ Handler (own task)            │
//! └─────────────┘     └────────────┘────▶│ Handler (own task)            │
//!                           │            └───────────────────────────────┘
//!                     ┌─────▼──────┐
//!                     │ RestClient │  cache misses, replies, bans, ...
//!                     └────────────┘
//! ```
//!
//! - **Core**: payload model, gateway events, collaborator traits
//! - **Framework**: entity cache, handler registry, interceptors, dispatcher
//! - **Runtime**: `Client`, configuration and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use concord::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RuntimeError> {
//!     let client = Client::builder(MyGateway::connect_with(token))
//!         .rest(MyRestClient::new(token))
//!         .build()?;
//!
//!     client.on_message("greet {name}", false, |message: Message| async move {
//!         message.reply(&format!("Hello, {}!", message.arg("name"))).await
//!     });
//!
//!     let waiter = client.clone();
//!     client.on_message("quiz", false, move |message: Message| {
//!         let client = waiter.clone();
//!         async move {
//!             message.reply("What is 6 * 7?").await;
//!             let author = message.author().id().to_owned();
//!             let answer = client
//!                 .wait_for_match(Duration::from_secs(10), |m| m.author().id() == author)
//!                 .await;
//!             match answer.matched() {
//!                 Some(m) if m.content() == "42" => message.reply("Correct!").await,
//!                 _ => message.reply("Time's up.").await,
//!             }
//!         }
//!     });
//!
//!     client.run().await
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use concord_core as core;
pub use concord_framework as framework;
pub use concord_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use concord::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;
    pub use std::time::Duration;

    // Runtime - main entry point
    pub use concord_runtime::{Client, ClientBuilder, ConcordConfig, RuntimeError, RuntimeResult};

    // Domain objects handed to handlers
    pub use concord_framework::{
        Args, Channel, Guild, GuildBan, GuildDelete, Member, Message, Reaction, Ready, User,
    };

    // Registration and interception
    pub use concord_framework::{
        CancelHandle, HandleResponse, HandlerId, Pattern, Subscription, WaitOutcome,
    };

    // Collaborator traits for custom gateways
    pub use concord_core::{
        ApiError, ApiResult, EventCallback, EventKind, Gateway, GatewayEvent, LocalState,
        RestClient, TransportError, TransportResult,
    };
}
