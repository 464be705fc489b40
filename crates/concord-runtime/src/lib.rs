//! Concord Runtime - orchestration layer for the Concord client framework.
//!
//! This crate provides:
//! - [`Client`]: wires a [`Gateway`](concord_core::Gateway) to the event
//!   engine and drives the connection lifecycle
//! - Layered configuration through `figment` ([`config`])
//! - Logging setup on top of `tracing-subscriber` ([`logging`])
//!
//! ```ignore
//! use concord_runtime::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), concord_runtime::RuntimeError> {
//!     let client = Client::builder(MyGateway::new())
//!         .rest(MyRestClient::new())
//!         .build()?;
//!
//!     client.on_message("ping", false, |message: Message| async move {
//!         message.reply("pong").await
//!     });
//!
//!     // Runs until Ctrl+C
//!     client.run().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use client::{Client, ClientBuilder};
pub use config::{ConcordConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by applications
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
