//! Client orchestration.
//!
//! A [`Client`] wires a [`Gateway`] to the event engine: it owns the
//! [`EntityCache`], [`HandlerRegistry`], [`Interceptors`] and [`Dispatcher`],
//! subscribes once per [`EventKind`] and drives the connection lifecycle.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use concord_runtime::Client;
//!
//! let client = Client::builder(my_gateway)
//!     .rest(my_rest_client)
//!     .build()?;
//!
//! client.on_message("ping", false, |message: Message| async move {
//!     message.reply("pong").await
//! });
//!
//! client.run().await?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use concord_core::{
    DisabledRestClient, EventCallback, EventKind, Gateway, GatewayEvent, LocalState, NoLocalState,
    RestClient,
};
use concord_framework::{
    CancelHandle, Channel, Dispatcher, EntityCache, Guild, GuildBan, GuildDelete, HandleResponse,
    HandlerId, HandlerRegistry, Interceptors, Member, Message, Pattern, Reaction, Ready,
    Subscription, WaitOutcome,
};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::signal;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConcordConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

#[derive(Debug, Default)]
struct Lifecycle {
    running: bool,
    /// Gateway callbacks are registered on the first start only.
    subscribed: bool,
}

/// A gateway client with its event engine.
///
/// Cloning is cheap; clones share the same cache, handlers and connection,
/// so a clone can be moved into a handler.
#[derive(Clone)]
pub struct Client {
    config: Arc<ConcordConfig>,
    gateway: Arc<dyn Gateway>,
    dispatcher: Arc<Dispatcher>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl Client {
    /// Creates a builder around `gateway`.
    pub fn builder<G: Gateway + 'static>(gateway: G) -> ClientBuilder {
        ClientBuilder::new(Arc::new(gateway))
    }

    fn from_parts(
        config: ConcordConfig,
        gateway: Arc<dyn Gateway>,
        rest: Arc<dyn RestClient>,
        local_state: Arc<dyn LocalState>,
    ) -> Self {
        let cache = EntityCache::new(rest, local_state);
        let interceptors = Interceptors::new(
            config.client.interceptor_buffer,
            config.client.default_wait_timeout(),
        );
        let dispatcher = Dispatcher::new(cache, HandlerRegistry::new(), interceptors)
            .ignore_bots(config.client.ignore_bots);

        info!(
            ignore_bots = config.client.ignore_bots,
            interceptor_buffer = config.client.interceptor_buffer,
            default_wait_timeout_secs = config.client.default_wait_timeout_secs,
            "Client initialized from configuration"
        );

        Self {
            config: Arc::new(config),
            gateway,
            dispatcher: Arc::new(dispatcher),
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
        }
    }

    pub fn config(&self) -> &ConcordConfig {
        &self.config
    }

    pub fn cache(&self) -> &EntityCache {
        self.dispatcher.cache()
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        self.dispatcher.handlers()
    }

    pub fn interceptors(&self) -> &Interceptors {
        self.dispatcher.interceptors()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The logged-in account's user ID, known once the ready event arrived.
    pub fn self_id(&self) -> Option<String> {
        self.dispatcher.self_id()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().running
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn subscribe_all(&self) {
        for kind in EventKind::ALL {
            let dispatcher = Arc::clone(&self.dispatcher);
            let callback: EventCallback = Arc::new(move |event: GatewayEvent| {
                let dispatcher = Arc::clone(&dispatcher);
                async move {
                    let dispatched = dispatcher.dispatch(event);
                    trace!(
                        kind = %dispatched.kind(),
                        invoked = dispatched.invoked(),
                        "Event handed off"
                    );
                }
                .boxed()
            });
            self.gateway.subscribe(kind, callback);
        }
        debug!(kinds = EventKind::ALL.len(), "Subscribed to gateway events");
    }

    /// Subscribes to the gateway (first start only) and connects.
    ///
    /// A connection failure is returned and leaves the client stopped; it
    /// may be started again.
    pub async fn start(&self) -> RuntimeResult<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.running {
                warn!("Client is already running");
                return Ok(());
            }
            lifecycle.running = true;
            if !lifecycle.subscribed {
                self.subscribe_all();
                lifecycle.subscribed = true;
            }
        }

        info!("Connecting to gateway");
        if let Err(e) = self.gateway.connect().await {
            self.lifecycle.lock().running = false;
            error!(error = %e, "Gateway connection failed");
            return Err(e.into());
        }

        info!("Client started");
        Ok(())
    }

    /// Disconnects the gateway.
    ///
    /// Handler tasks already spawned run to completion; live interceptor
    /// subscriptions end on their own timeouts.
    pub async fn stop(&self) -> RuntimeResult<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.running {
                warn!("Client is not running");
                return Ok(());
            }
            lifecycle.running = false;
        }

        info!("Disconnecting from gateway");
        self.gateway.disconnect().await;

        info!("Client stopped");
        Ok(())
    }

    /// Runs the client until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await?;

        info!("Concord client is now running. Press Ctrl+C to stop.");
        Self::wait_for_shutdown().await;

        self.stop().await
    }

    /// Runs the client until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await
    }

    async fn wait_for_shutdown() {
        #[cfg(unix)]
        {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = Self::wait_for_ctrl_c() => {}
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, shutting down");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to register SIGTERM handler");
                    Self::wait_for_ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            Self::wait_for_ctrl_c().await;
        }
    }

    async fn wait_for_ctrl_c() {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Registers a message handler gated by `pattern`.
    ///
    /// See [`HandlerRegistry::on_message`].
    pub fn on_message<F, Fut>(&self, pattern: impl Into<Pattern>, once: bool, f: F) -> HandlerId
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandleResponse,
    {
        self.handlers().on_message(pattern, once, f)
    }

    /// Removes a handler. Returns `false` if it was already gone.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.handlers().remove(id)
    }

    // =========================================================================
    // Interception
    // =========================================================================

    /// See [`Interceptors::wait_for_match`].
    pub async fn wait_for_match<P>(&self, timeout: Duration, predicate: P) -> WaitOutcome
    where
        P: FnMut(&Message) -> bool + Send,
    {
        self.interceptors().wait_for_match(timeout, predicate).await
    }

    /// See [`Interceptors::wait_for_match_or_else`].
    pub async fn wait_for_match_or_else<P, T>(
        &self,
        timeout: Duration,
        predicate: P,
        on_timeout: T,
    ) -> WaitOutcome
    where
        P: FnMut(&Message) -> bool + Send,
        T: FnOnce() + Send,
    {
        self.interceptors()
            .wait_for_match_or_else(timeout, predicate, on_timeout)
            .await
    }

    /// Waits using `client.default_wait_timeout_secs`.
    pub async fn wait_for_next<P>(&self, predicate: P) -> WaitOutcome
    where
        P: FnMut(&Message) -> bool + Send,
    {
        self.interceptors().wait_for_next(predicate).await
    }

    /// See [`Interceptors::watch_forever`].
    pub fn watch_forever<F, Fut>(&self, on_event: F) -> CancelHandle
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandleResponse,
    {
        self.interceptors().watch_forever(on_event)
    }

    pub fn subscribe(&self, timeout: Option<Duration>) -> Subscription {
        self.interceptors().subscribe(timeout)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.interceptors().unsubscribe(subscription)
    }
}

macro_rules! delegate_registration {
    ($($name:ident($arg:ty);)*) => {
        impl Client {
            $(
                #[doc = concat!("See [`HandlerRegistry::", stringify!($name), "`].")]
                pub fn $name<F, Fut>(&self, once: bool, f: F) -> HandlerId
                where
                    F: Fn($arg) -> Fut + Send + Sync + 'static,
                    Fut: Future + Send + 'static,
                    Fut::Output: HandleResponse,
                {
                    self.handlers().$name(once, f)
                }
            )*
        }
    };
}

delegate_registration! {
    on_ready(Arc<Ready>);
    on_guild_create(Arc<Guild>);
    on_guild_update(Arc<Guild>);
    on_guild_delete(Arc<GuildDelete>);
    on_channel_create(Arc<Channel>);
    on_channel_update(Arc<Channel>);
    on_channel_delete(Arc<Channel>);
    on_member_add(Arc<Member>);
    on_member_update(Arc<Member>);
    on_member_remove(Arc<Member>);
    on_guild_ban_add(Arc<GuildBan>);
    on_guild_ban_remove(Arc<GuildBan>);
    on_message_reaction_add(Arc<Reaction>);
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("running", &self.is_running())
            .field("handlers", self.handlers())
            .field("interceptors", self.interceptors())
            .finish()
    }
}

// =============================================================================
// ClientBuilder
// =============================================================================

/// Builder for a [`Client`].
///
/// Without [`config`](Self::config), configuration is loaded through
/// [`ConfigLoader`] from the current directory, the user config directory
/// and `CONCORD_*` variables.
pub struct ClientBuilder {
    gateway: Arc<dyn Gateway>,
    rest: Arc<dyn RestClient>,
    local_state: Arc<dyn LocalState>,
    config: Option<ConcordConfig>,
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl ClientBuilder {
    fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            rest: Arc::new(DisabledRestClient),
            local_state: Arc::new(NoLocalState),
            config: None,
            config_loader: ConfigLoader::new(),
            init_logging: true,
        }
    }

    /// Sets the REST collaborator used for cache misses and outbound calls.
    pub fn rest<R: RestClient + 'static>(mut self, rest: R) -> Self {
        self.rest = Arc::new(rest);
        self
    }

    pub fn local_state<S: LocalState + 'static>(mut self, state: S) -> Self {
        self.local_state = Arc::new(state);
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: ConcordConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a whole configuration over the loaded sources.
    pub fn merge(mut self, config: ConcordConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Whether `build` installs the global subscriber (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads and validates configuration, sets up logging and builds the client.
    pub fn build(self) -> RuntimeResult<Client> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        Ok(Client::from_parts(
            config,
            self.gateway,
            self.rest,
            self.local_state,
        ))
    }
}
