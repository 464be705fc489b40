//! Permanent handlers and their registry.
//!
//! A [`Handler`] is a sum type with one variant per event kind. Each variant
//! carries a typed callback, and the message variant additionally carries the
//! compiled [`Pattern`] that gates it.
//!
//! Callbacks are plain async closures. Their return value goes through
//! [`HandleResponse`], so a handler may return `()`, `Option<_>` or
//! `Result<_, E>`; errors are logged and never reach the dispatcher.
//!
//! ```rust,ignore
//! registry.on_message("ping", false, |msg: Message| async move {
//!     msg.reply("pong").await;
//! });
//!
//! registry.on_member_add(false, |member: Arc<Member>| async move {
//!     info!(user = %member.display_name(), "joined");
//! });
//! ```
//!
//! # Removal
//!
//! The registry never hands out positions. Entries are addressed by
//! [`HandlerId`], and dispatch iterates a snapshot taken under a brief read
//! lock, so registration or removal during dispatch cannot skip, repeat, or
//! misplace a handler.
//!
//! A one-shot handler (`once = true`) runs at most once even under concurrent
//! dispatch: the first dispatcher to flip its `fired` flag wins, removes it,
//! and invokes it.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use concord_core::EventKind;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, error, span, warn};

use crate::cache::{Channel, Guild, Member};
use crate::event::{GuildBan, GuildDelete, Reaction, Ready};
use crate::message::Message;
use crate::pattern::Pattern;

// ============================================================================
// HandleResponse
// ============================================================================

/// Converts a handler's return value into an outcome the dispatcher logs.
pub trait HandleResponse: Send {
    fn into_outcome(self) -> Result<(), String>;
}

impl HandleResponse for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl HandleResponse for bool {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: HandleResponse> HandleResponse for Option<T> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_or(Ok(()), HandleResponse::into_outcome)
    }
}

impl<T: HandleResponse, E: fmt::Display + Send> HandleResponse for Result<T, E> {
    fn into_outcome(self) -> Result<(), String> {
        match self {
            Ok(value) => value.into_outcome(),
            Err(err) => Err(err.to_string()),
        }
    }
}

// ============================================================================
// Callbacks
// ============================================================================

/// A type-erased async callback taking `T`.
pub type Callback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Erases an async closure into a [`Callback`].
pub fn callback<T, F, Fut>(f: F) -> Callback<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandleResponse,
{
    Arc::new(move |arg| f(arg).map(HandleResponse::into_outcome).boxed())
}

/// A permanent handler for one event kind.
#[derive(Clone)]
pub enum Handler {
    Message {
        pattern: Pattern,
        callback: Callback<Message>,
    },
    Ready(Callback<Arc<Ready>>),
    GuildCreate(Callback<Arc<Guild>>),
    GuildUpdate(Callback<Arc<Guild>>),
    GuildDelete(Callback<Arc<GuildDelete>>),
    ChannelCreate(Callback<Arc<Channel>>),
    ChannelUpdate(Callback<Arc<Channel>>),
    ChannelDelete(Callback<Arc<Channel>>),
    MemberAdd(Callback<Arc<Member>>),
    MemberUpdate(Callback<Arc<Member>>),
    MemberRemove(Callback<Arc<Member>>),
    BanAdd(Callback<Arc<GuildBan>>),
    BanRemove(Callback<Arc<GuildBan>>),
    ReactionAdd(Callback<Arc<Reaction>>),
}

impl Handler {
    /// Returns the event kind this handler listens to.
    ///
    /// Message handlers report [`EventKind::MessageCreate`] but also receive
    /// message updates.
    pub fn kind(&self) -> EventKind {
        match self {
            Handler::Message { .. } => EventKind::MessageCreate,
            Handler::Ready(_) => EventKind::Ready,
            Handler::GuildCreate(_) => EventKind::GuildCreate,
            Handler::GuildUpdate(_) => EventKind::GuildUpdate,
            Handler::GuildDelete(_) => EventKind::GuildDelete,
            Handler::ChannelCreate(_) => EventKind::ChannelCreate,
            Handler::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Handler::ChannelDelete(_) => EventKind::ChannelDelete,
            Handler::MemberAdd(_) => EventKind::MemberAdd,
            Handler::MemberUpdate(_) => EventKind::MemberUpdate,
            Handler::MemberRemove(_) => EventKind::MemberRemove,
            Handler::BanAdd(_) => EventKind::BanAdd,
            Handler::BanRemove(_) => EventKind::BanRemove,
            Handler::ReactionAdd(_) => EventKind::ReactionAdd,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Message { pattern, .. } => f
                .debug_struct("Message")
                .field("pattern", &pattern.as_str())
                .finish(),
            other => write!(f, "{}", other.kind()),
        }
    }
}

// ============================================================================
// HandlerEntry
// ============================================================================

/// Stable identifier of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered handler.
pub struct HandlerEntry {
    id: HandlerId,
    once: bool,
    fired: AtomicBool,
    handler: Handler,
}

impl HandlerEntry {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("id", &self.id)
            .field("once", &self.once)
            .field("handler", &self.handler)
            .finish()
    }
}

// ============================================================================
// HandlerRegistry
// ============================================================================

#[derive(Default)]
struct RegistryInner {
    entries: RwLock<Vec<Arc<HandlerEntry>>>,
    next_id: AtomicU64,
}

/// Ordered collection of permanent handlers. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<RegistryInner>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler and returns its ID.
    pub fn register(&self, once: bool, handler: Handler) -> HandlerId {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.entries.write().push(Arc::new(HandlerEntry {
            id,
            once,
            fired: AtomicBool::new(false),
            handler,
        }));
        id
    }

    /// Removes a handler. Returns `false` if it was already gone.
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut entries = self.inner.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.inner.entries.read().iter().any(|entry| entry.id == id)
    }

    /// Returns the current entries in registration order.
    pub fn snapshot(&self) -> Vec<Arc<HandlerEntry>> {
        self.inner.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.entries.write().clear();
    }

    /// Claims an entry for invocation.
    ///
    /// Always succeeds for permanent handlers. For one-shot handlers exactly
    /// one caller wins; the winner removes the entry.
    fn claim(&self, entry: &HandlerEntry) -> bool {
        if !entry.once {
            return true;
        }
        if entry.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.remove(entry.id);
        true
    }

    /// Visits every entry `select` accepts, in registration order, after
    /// claiming it.
    ///
    /// `select` runs before the claim, so a one-shot handler that does not
    /// match stays registered.
    pub fn for_each_matching<T>(
        &self,
        mut select: impl FnMut(&Handler) -> Option<T>,
        mut invoke: impl FnMut(&HandlerEntry, T),
    ) {
        for entry in self.snapshot() {
            let Some(selected) = select(&entry.handler) else {
                continue;
            };
            if self.claim(&entry) {
                invoke(&entry, selected);
            }
        }
    }

    // ─── Registration helpers ─────────────────────────────────────────────

    /// Registers a message handler gated by `pattern`.
    pub fn on_message<F, Fut>(&self, pattern: impl Into<Pattern>, once: bool, f: F) -> HandlerId
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandleResponse,
    {
        self.register(
            once,
            Handler::Message {
                pattern: pattern.into(),
                callback: callback(f),
            },
        )
    }
}

macro_rules! registration_helpers {
    ($($(#[$meta:meta])* $name:ident => $variant:ident($arg:ty);)*) => {
        impl HandlerRegistry {
            $(
                $(#[$meta])*
                pub fn $name<F, Fut>(&self, once: bool, f: F) -> HandlerId
                where
                    F: Fn($arg) -> Fut + Send + Sync + 'static,
                    Fut: Future + Send + 'static,
                    Fut::Output: HandleResponse,
                {
                    self.register(once, Handler::$variant(callback(f)))
                }
            )*
        }
    };
}

registration_helpers! {
    /// Registers a handler for session establishment.
    on_ready => Ready(Arc<Ready>);
    on_guild_create => GuildCreate(Arc<Guild>);
    on_guild_update => GuildUpdate(Arc<Guild>);
    on_guild_delete => GuildDelete(Arc<GuildDelete>);
    on_channel_create => ChannelCreate(Arc<Channel>);
    on_channel_update => ChannelUpdate(Arc<Channel>);
    /// The channel passed is the removed cache instance, or a detached one
    /// built from the event if it was never cached.
    on_channel_delete => ChannelDelete(Arc<Channel>);
    on_member_add => MemberAdd(Arc<Member>);
    on_member_update => MemberUpdate(Arc<Member>);
    /// The member passed is the removed cache instance, or a detached one.
    on_member_remove => MemberRemove(Arc<Member>);
    on_guild_ban_add => BanAdd(Arc<GuildBan>);
    on_guild_ban_remove => BanRemove(Arc<GuildBan>);
    on_message_reaction_add => ReactionAdd(Arc<Reaction>);
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Runs one callback invocation, containing errors and panics.
pub(crate) async fn run_isolated<T>(label: &str, callback: Callback<T>, arg: T) {
    // The call itself happens inside the caught future, so a panic before the
    // first await is caught too.
    let invocation = AssertUnwindSafe(async move { callback(arg).await }).catch_unwind();
    match invocation.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(handler = label, error = %err, "Handler returned an error"),
        Err(panic) => error!(
            handler = label,
            panic = panic_message(&*panic),
            "Handler panicked"
        ),
    }
}

/// Spawns one handler invocation on its own task.
pub(crate) fn spawn_invocation<T: Send + 'static>(
    id: HandlerId,
    kind: EventKind,
    callback: Callback<T>,
    arg: T,
) -> JoinHandle<()> {
    let span = span!(Level::DEBUG, "handler", id = %id, event = %kind);
    tokio::spawn(
        async move {
            let label = id.to_string();
            run_isolated(&label, callback, arg).await;
        }
        .instrument(span),
    )
}
