//! Event dispatcher.
//!
//! [`Dispatcher::dispatch`] is invoked once per inbound [`GatewayEvent`]. It
//! is synchronous and never waits on a handler:
//!
//! 1. **Normalize**: apply the event to the [`EntityCache`] and build the
//!    domain value handlers receive.
//! 2. **Intercept** (messages only): offer the message to every live
//!    subscription in [`Interceptors`], best effort.
//! 3. **Fan out**: snapshot the [`HandlerRegistry`], select handlers for this
//!    event kind (message handlers must also match their pattern), claim
//!    one-shot handlers, and spawn one task per invocation.
//!
//! Messages authored by the client itself, or by any bot account when
//! `ignore_bots` is set, are filtered before step 2. Malformed events are
//! dropped with a debug log; handler errors and panics are logged on their
//! own task and never reach the dispatcher.

use std::fmt;
use std::sync::Arc;

use concord_core::{EventKind, GatewayEvent, MemberPayload, MessagePayload};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{Level, debug, span, trace};

use crate::cache::EntityCache;
use crate::error::{DispatchError, DispatchResult};
use crate::event::{GuildBan, GuildDelete, Reaction, Ready};
use crate::handler::{Callback, Handler, HandlerRegistry, spawn_invocation};
use crate::interceptor::Interceptors;
use crate::message::Message;

// ============================================================================
// Dispatched
// ============================================================================

/// What a single dispatch did.
///
/// Dropping this detaches the spawned handler tasks; they keep running.
#[derive(Debug)]
pub struct Dispatched {
    kind: EventKind,
    intercepted: usize,
    tasks: Vec<JoinHandle<()>>,
    filtered: bool,
}

impl Dispatched {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            intercepted: 0,
            tasks: Vec::new(),
            filtered: false,
        }
    }

    fn filtered(kind: EventKind) -> Self {
        Self {
            filtered: true,
            ..Self::new(kind)
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Number of handler invocations spawned.
    pub fn invoked(&self) -> usize {
        self.tasks.len()
    }

    /// Number of interceptors that accepted the message.
    pub fn intercepted(&self) -> usize {
        self.intercepted
    }

    /// `true` if the event was filtered or dropped before fan-out.
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// Waits for every spawned invocation to finish.
    pub async fn join(self) {
        for task in self.tasks {
            // Invocations contain their own panics; a JoinError here means
            // the runtime is shutting down.
            let _ = task.await;
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes normalized events to interceptors and handlers.
pub struct Dispatcher {
    cache: EntityCache,
    handlers: HandlerRegistry,
    interceptors: Interceptors,
    self_id: RwLock<Option<String>>,
    ignore_bots: bool,
}

impl Dispatcher {
    pub fn new(cache: EntityCache, handlers: HandlerRegistry, interceptors: Interceptors) -> Self {
        Self {
            cache,
            handlers,
            interceptors,
            self_id: RwLock::new(None),
            ignore_bots: true,
        }
    }

    /// Whether messages from bot accounts are filtered. Defaults to `true`.
    pub fn ignore_bots(mut self, ignore: bool) -> Self {
        self.ignore_bots = ignore;
        self
    }

    /// Sets the client's own user ID. Normally learned from the ready event.
    pub fn set_self_id(&self, user_id: impl Into<String>) {
        *self.self_id.write() = Some(user_id.into());
    }

    pub fn self_id(&self) -> Option<String> {
        self.self_id.read().clone()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// Dispatches one event. Must be called within a Tokio runtime.
    pub fn dispatch(&self, event: GatewayEvent) -> Dispatched {
        let kind = event.kind();
        let span = span!(Level::DEBUG, "dispatch", event = %kind);
        let _enter = span.enter();

        match event {
            GatewayEvent::Ready(payload) => {
                self.set_self_id(payload.user.id.clone());
                let ready = Arc::new(Ready {
                    user: self.cache.upsert_user(payload.user),
                    session_id: payload.session_id,
                    guild_ids: payload.guilds,
                });
                debug!(user_id = %ready.user.id(), guilds = ready.guild_ids.len(), "Session ready");
                self.fan_out(kind, ready, |h| match h {
                    Handler::Ready(cb) => Some(cb),
                    _ => None,
                })
            }

            GatewayEvent::MessageCreate(payload) | GatewayEvent::MessageUpdate(payload) => {
                self.dispatch_message(kind, payload)
            }

            GatewayEvent::GuildCreate(payload) => {
                let guild = self.cache.upsert_guild(payload);
                self.fan_out(kind, guild, |h| match h {
                    Handler::GuildCreate(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::GuildUpdate(payload) => {
                let guild = self.cache.upsert_guild(payload);
                self.fan_out(kind, guild, |h| match h {
                    Handler::GuildUpdate(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::GuildDelete(payload) => {
                let removed = Arc::new(GuildDelete {
                    guild: self.cache.remove_guild(&payload.id),
                    guild_id: payload.id,
                    unavailable: payload.unavailable,
                });
                self.fan_out(kind, removed, |h| match h {
                    Handler::GuildDelete(cb) => Some(cb),
                    _ => None,
                })
            }

            GatewayEvent::ChannelCreate(payload) => {
                let channel = self.cache.upsert_channel(payload);
                self.fan_out(kind, channel, |h| match h {
                    Handler::ChannelCreate(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::ChannelUpdate(payload) => {
                let channel = self.cache.upsert_channel(payload);
                self.fan_out(kind, channel, |h| match h {
                    Handler::ChannelUpdate(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::ChannelDelete(payload) => {
                let channel = match self.cache.remove_channel(&payload.id) {
                    Some(channel) => channel,
                    None => self.cache.detached_channel(payload),
                };
                self.fan_out(kind, channel, |h| match h {
                    Handler::ChannelDelete(cb) => Some(cb),
                    _ => None,
                })
            }

            GatewayEvent::MemberAdd(payload) => {
                // Redelivered adds leave the count alone.
                let known = self
                    .cache
                    .peek_member(&payload.guild_id, &payload.user.id)
                    .is_some();
                if !known {
                    if let Some(guild) = self.cache.peek_guild(&payload.guild_id) {
                        guild.adjust_member_count(true);
                    }
                }
                let member = self.cache.upsert_member(payload);
                self.fan_out(kind, member, |h| match h {
                    Handler::MemberAdd(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::MemberUpdate(payload) => {
                let member = self.cache.upsert_member(payload);
                self.fan_out(kind, member, |h| match h {
                    Handler::MemberUpdate(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::MemberRemove(payload) => {
                let member = match self.cache.remove_member(&payload.guild_id, &payload.user.id) {
                    Some(member) => {
                        if let Some(guild) = self.cache.peek_guild(&payload.guild_id) {
                            guild.adjust_member_count(false);
                        }
                        member
                    }
                    None => self
                        .cache
                        .detached_member(MemberPayload::new(payload.guild_id, payload.user)),
                };
                self.fan_out(kind, member, |h| match h {
                    Handler::MemberRemove(cb) => Some(cb),
                    _ => None,
                })
            }

            GatewayEvent::BanAdd(payload) => {
                let ban = Arc::new(GuildBan {
                    user: self.cache.upsert_user(payload.user),
                    guild_id: payload.guild_id,
                });
                self.fan_out(kind, ban, |h| match h {
                    Handler::BanAdd(cb) => Some(cb),
                    _ => None,
                })
            }
            GatewayEvent::BanRemove(payload) => {
                let ban = Arc::new(GuildBan {
                    user: self.cache.upsert_user(payload.user),
                    guild_id: payload.guild_id,
                });
                self.fan_out(kind, ban, |h| match h {
                    Handler::BanRemove(cb) => Some(cb),
                    _ => None,
                })
            }

            GatewayEvent::ReactionAdd(payload) => {
                let reaction = Arc::new(Reaction::new(payload, self.cache.clone()));
                self.fan_out(kind, reaction, |h| match h {
                    Handler::ReactionAdd(cb) => Some(cb),
                    _ => None,
                })
            }
        }
    }

    // ─── Messages ─────────────────────────────────────────────────────────

    fn dispatch_message(&self, kind: EventKind, payload: MessagePayload) -> Dispatched {
        let message = match self.accept_message(kind, payload) {
            Ok(Some(message)) => message,
            Ok(None) => return Dispatched::filtered(kind),
            Err(err) => {
                debug!(error = %err, "Dropping event");
                return Dispatched::filtered(kind);
            }
        };

        let mut dispatched = Dispatched::new(kind);
        dispatched.intercepted = self.interceptors.deliver(&message);

        self.handlers.for_each_matching(
            |handler| match handler {
                Handler::Message { pattern, callback } => pattern
                    .match_content(message.content())
                    .map(|args| (Arc::clone(callback), args)),
                _ => None,
            },
            |entry, (callback, args)| {
                trace!(handler = %entry.id(), "Message handler matched");
                dispatched.tasks.push(spawn_invocation(
                    entry.id(),
                    kind,
                    callback,
                    message.with_args(args),
                ));
            },
        );

        dispatched
    }

    /// Filters and normalizes a message. `Ok(None)` means filtered.
    fn accept_message(
        &self,
        kind: EventKind,
        payload: MessagePayload,
    ) -> DispatchResult<Option<Message>> {
        let Some(author) = &payload.author else {
            return Err(DispatchError::malformed(kind, "message has no author"));
        };

        if self.self_id.read().as_deref() == Some(author.id.as_str()) {
            trace!("Ignoring own message");
            return Ok(None);
        }
        if self.ignore_bots && author.bot {
            trace!(author_id = %author.id, "Ignoring bot message");
            return Ok(None);
        }

        Ok(Message::from_payload(&self.cache, payload))
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────

    /// Spawns every handler `select` accepts with a clone of `value`.
    fn fan_out<T>(
        &self,
        kind: EventKind,
        value: T,
        select: impl Fn(&Handler) -> Option<&Callback<T>>,
    ) -> Dispatched
    where
        T: Clone + Send + 'static,
    {
        let mut dispatched = Dispatched::new(kind);
        self.handlers.for_each_matching(
            |handler| select(handler).map(Arc::clone),
            |entry, callback| {
                dispatched
                    .tasks
                    .push(spawn_invocation(entry.id(), kind, callback, value.clone()));
            },
        );
        dispatched
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.len())
            .field("interceptors", &self.interceptors.len())
            .field("self_id", &self.self_id())
            .field("ignore_bots", &self.ignore_bots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use concord_core::{
        BanPayload, ChannelPayload, GuildDeletePayload, MemberRemovePayload, ReadyPayload,
    };
    use parking_lot::Mutex;

    use super::*;
    use crate::cache::{Channel, Guild, Member};
    use crate::testing::{MockRest, cache_with, guild_payload, message, user};

    fn dispatcher() -> Dispatcher {
        let cache = cache_with(MockRest::new());
        Dispatcher::new(cache, HandlerRegistry::new(), Interceptors::default())
    }

    fn create(content: &str, author: &str) -> GatewayEvent {
        GatewayEvent::MessageCreate(message("1", "20", user(author, author), content))
    }

    #[tokio::test]
    async fn test_matching_handler_gets_args() {
        let dispatcher = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatcher.handlers().on_message("greet {name} {rest}", false, {
            let seen = Arc::clone(&seen);
            move |msg: Message| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock()
                        .push((msg.arg("name").to_owned(), msg.arg("rest").to_owned()));
                }
            }
        });

        let dispatched = dispatcher.dispatch(create("greet Alice likes cake and tea", "2"));
        assert_eq!(dispatched.invoked(), 1);
        dispatched.join().await;

        assert_eq!(
            *seen.lock(),
            [("Alice".to_owned(), "likes cake and tea".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_own_and_bot_messages_are_filtered() {
        let dispatcher = dispatcher();
        dispatcher.handlers().on_message("ping", false, |_m: Message| async {});
        dispatcher.set_self_id("99");

        assert!(dispatcher.dispatch(create("ping", "99")).is_filtered());

        let bot = message("1", "20", user("5", "bot").bot(), "ping");
        let dispatched = dispatcher.dispatch(GatewayEvent::MessageCreate(bot.clone()));
        assert!(dispatched.is_filtered());
        assert_eq!(dispatched.invoked(), 0);

        let permissive = dispatcher.ignore_bots(false);
        assert_eq!(permissive.dispatch(GatewayEvent::MessageCreate(bot)).invoked(), 1);
    }

    #[tokio::test]
    async fn test_missing_author_is_dropped() {
        let dispatcher = dispatcher();
        dispatcher.handlers().on_message("ping", false, |_m: Message| async {});
        let payload = MessagePayload {
            id: "1".into(),
            channel_id: "20".into(),
            content: "ping".into(),
            ..Default::default()
        };

        let dispatched = dispatcher.dispatch(GatewayEvent::MessageUpdate(payload));
        assert!(dispatched.is_filtered());
        assert_eq!(dispatcher.cache().stats().users, 0);
    }

    #[tokio::test]
    async fn test_once_handler_fires_once() {
        let dispatcher = dispatcher();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.handlers().on_message("ping", true, {
            let count = Arc::clone(&count);
            move |_m: Message| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        dispatcher.dispatch(create("ping", "2")).join().await;
        dispatcher.dispatch(create("ping", "2")).join().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(dispatcher.handlers().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_once_handler_under_concurrent_dispatch() {
        let dispatcher = Arc::new(dispatcher());
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.handlers().on_message("ping", true, {
            let count = Arc::clone(&count);
            move |_m: Message| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { dispatcher.dispatch(create("ping", "2")).join().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interceptors_see_messages_before_handlers() {
        let dispatcher = dispatcher();
        let mut sub = dispatcher.interceptors().subscribe(None);

        let dispatched = dispatcher.dispatch(create("unmatched text", "2"));
        assert_eq!(dispatched.intercepted(), 1);
        assert_eq!(dispatched.invoked(), 0);
        assert_eq!(sub.recv().await.unwrap().content(), "unmatched text");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_match_through_dispatch() {
        let dispatcher = Arc::new(dispatcher());
        let waiter = tokio::spawn({
            let interceptors = dispatcher.interceptors().clone();
            async move {
                interceptors
                    .wait_for_match(Duration::from_secs(10), |m| m.author().id() == "3")
                    .await
            }
        });
        tokio::task::yield_now().await;

        dispatcher.dispatch(create("from two", "2"));
        dispatcher.dispatch(create("from three", "3"));

        let matched = waiter.await.unwrap().matched().unwrap();
        assert_eq!(matched.content(), "from three");
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_affect_others() {
        let dispatcher = dispatcher();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.handlers().on_message("boom", false, |m: Message| async move {
            if m.content() == "boom" {
                panic!("handler bug");
            }
        });
        dispatcher.handlers().on_message("boom", false, {
            let count = Arc::clone(&count);
            move |_m: Message| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let dispatched = dispatcher.dispatch(create("boom", "2"));
        assert_eq!(dispatched.invoked(), 2);
        dispatched.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ready_sets_self_id() {
        let dispatcher = dispatcher();
        let session = Arc::new(Mutex::new(None));
        dispatcher.handlers().on_ready(false, {
            let session = Arc::clone(&session);
            move |ready: Arc<Ready>| {
                let session = Arc::clone(&session);
                async move {
                    *session.lock() = Some(ready.session_id.clone());
                }
            }
        });

        dispatcher
            .dispatch(GatewayEvent::Ready(ReadyPayload {
                session_id: "abc".into(),
                user: user("99", "concord").bot(),
                guilds: vec!["10".into()],
            }))
            .join()
            .await;

        assert_eq!(dispatcher.self_id().as_deref(), Some("99"));
        assert_eq!(session.lock().as_deref(), Some("abc"));
        assert!(dispatcher.dispatch(create("hi", "99")).is_filtered());
    }

    #[tokio::test]
    async fn test_guild_lifecycle_updates_cache() {
        let dispatcher = dispatcher();
        let deleted = Arc::new(Mutex::new(None));
        dispatcher.handlers().on_guild_delete(false, {
            let deleted = Arc::clone(&deleted);
            move |event: Arc<GuildDelete>| {
                let deleted = Arc::clone(&deleted);
                async move {
                    *deleted.lock() = Some(event);
                }
            }
        });

        let created = dispatcher.dispatch(GatewayEvent::GuildCreate(guild_payload("10", "1")));
        assert_eq!(created.invoked(), 0);
        let held = dispatcher.cache().peek_guild("10").unwrap();

        let mut renamed = guild_payload("10", "1");
        renamed.name = "renamed".into();
        dispatcher.dispatch(GatewayEvent::GuildUpdate(renamed));
        assert_eq!(held.name(), "renamed");

        dispatcher
            .dispatch(GatewayEvent::GuildDelete(GuildDeletePayload {
                id: "10".into(),
                unavailable: false,
            }))
            .join()
            .await;

        assert!(dispatcher.cache().peek_guild("10").is_none());
        let event = deleted.lock().take().unwrap();
        assert!(Arc::ptr_eq(event.guild.as_ref().unwrap(), &held));
        assert!(!event.unavailable);
    }

    #[tokio::test]
    async fn test_channel_delete_passes_detached_when_uncached() {
        let dispatcher = dispatcher();
        let names = Arc::new(Mutex::new(Vec::new()));
        dispatcher.handlers().on_channel_delete(false, {
            let names = Arc::clone(&names);
            move |channel: Arc<Channel>| {
                let names = Arc::clone(&names);
                async move {
                    names.lock().push(channel.name());
                }
            }
        });

        dispatcher
            .dispatch(GatewayEvent::ChannelCreate(ChannelPayload::new("20", "10", "cached")))
            .join()
            .await;
        dispatcher
            .dispatch(GatewayEvent::ChannelDelete(ChannelPayload::new("20", "10", "stale")))
            .join()
            .await;
        dispatcher
            .dispatch(GatewayEvent::ChannelDelete(ChannelPayload::new("21", "10", "never")))
            .join()
            .await;

        assert_eq!(*names.lock(), ["cached", "never"]);
        assert_eq!(dispatcher.cache().stats().channels, 0);
    }

    #[tokio::test]
    async fn test_member_add_and_remove() {
        let dispatcher = dispatcher();
        let mut guild = guild_payload("10", "1");
        guild.member_count = 1;
        dispatcher.dispatch(GatewayEvent::GuildCreate(guild));

        let removed = Arc::new(Mutex::new(Vec::new()));
        dispatcher.handlers().on_member_remove(false, {
            let removed = Arc::clone(&removed);
            move |member: Arc<Member>| {
                let removed = Arc::clone(&removed);
                async move {
                    removed.lock().push(member.user().id().to_owned());
                }
            }
        });

        dispatcher.dispatch(GatewayEvent::MemberAdd(MemberPayload::new("10", user("2", "bob"))));
        let guild: Arc<Guild> = dispatcher.cache().peek_guild("10").unwrap();
        assert_eq!(guild.member_count(), 2);
        assert!(dispatcher.cache().peek_member("10", "2").is_some());

        dispatcher
            .dispatch(GatewayEvent::MemberRemove(MemberRemovePayload {
                guild_id: "10".into(),
                user: user("2", "bob"),
            }))
            .join()
            .await;

        assert_eq!(guild.member_count(), 1);
        assert!(dispatcher.cache().peek_member("10", "2").is_none());
        assert_eq!(*removed.lock(), ["2"]);
    }

    #[tokio::test]
    async fn test_redelivered_member_events_keep_count() {
        let dispatcher = dispatcher();
        let mut guild = guild_payload("10", "1");
        guild.member_count = 1;
        dispatcher.dispatch(GatewayEvent::GuildCreate(guild));
        let guild = dispatcher.cache().peek_guild("10").unwrap();

        let add = || GatewayEvent::MemberAdd(MemberPayload::new("10", user("2", "bob")));
        dispatcher.dispatch(add());
        dispatcher.dispatch(add());
        assert_eq!(guild.member_count(), 2);

        let remove = || {
            GatewayEvent::MemberRemove(MemberRemovePayload {
                guild_id: "10".into(),
                user: user("2", "bob"),
            })
        };
        dispatcher.dispatch(remove());
        dispatcher.dispatch(remove());
        assert_eq!(guild.member_count(), 1);
    }

    #[tokio::test]
    async fn test_once_handler_removed_between_others() {
        let dispatcher = dispatcher();
        let counters: Vec<_> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        for (i, counter) in counters.iter().enumerate() {
            let counter = Arc::clone(counter);
            dispatcher.handlers().on_message("ping", i == 0, move |_m: Message| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        let first = dispatcher.dispatch(create("ping", "2"));
        assert_eq!(first.invoked(), 3);
        first.join().await;
        assert_eq!(dispatcher.handlers().len(), 2);

        let second = dispatcher.dispatch(create("ping", "2"));
        assert_eq!(second.invoked(), 2);
        second.join().await;

        let counts: Vec<_> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(counts, [1, 2, 2]);
    }

    #[tokio::test]
    async fn test_ban_handlers_are_kind_specific() {
        let dispatcher = dispatcher();
        let added = Arc::new(AtomicUsize::new(0));
        dispatcher.handlers().on_guild_ban_add(false, {
            let added = Arc::clone(&added);
            move |ban: Arc<GuildBan>| {
                let added = Arc::clone(&added);
                async move {
                    assert_eq!(ban.user.username(), "mallory");
                    added.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let ban = BanPayload {
            guild_id: "10".into(),
            user: user("6", "mallory"),
        };
        assert_eq!(dispatcher.dispatch(GatewayEvent::BanRemove(ban.clone())).invoked(), 0);
        dispatcher.dispatch(GatewayEvent::BanAdd(ban)).join().await;
        assert_eq!(added.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registration_during_dispatch_is_safe() {
        let dispatcher = Arc::new(dispatcher());
        let registry = dispatcher.handlers().clone();
        dispatcher.handlers().on_message("ping", false, move |_m: Message| {
            let registry = registry.clone();
            async move {
                registry.on_message("ping", true, |_m: Message| async {});
            }
        });

        dispatcher.dispatch(create("ping", "2")).join().await;
        assert_eq!(dispatcher.handlers().len(), 2);
        let second = dispatcher.dispatch(create("ping", "2"));
        assert_eq!(second.invoked(), 2);
        second.join().await;
        assert_eq!(dispatcher.handlers().len(), 2);
    }
}
