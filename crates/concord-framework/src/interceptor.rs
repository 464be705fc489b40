//! Temporary message subscriptions.
//!
//! [`Interceptors`] lets a task wait for the next message matching a predicate
//! without registering a permanent handler. Every message the dispatcher
//! accepts is offered to every live [`Subscription`] before handlers run.
//!
//! # Delivery
//!
//! Each subscription owns a bounded buffer (16 messages by default). Delivery
//! uses `try_send`: a full buffer drops the message for that subscriber only,
//! and the dispatcher never waits on a slow consumer.
//!
//! # Teardown
//!
//! A subscription ends exactly once, for one [`Teardown`] reason. Match,
//! timeout, explicit cancel and drop all race through the same [`Lease`]; the
//! first to settle it removes the registry entry and wakes any pending
//! `recv`, and every later attempt is a no-op.
//!
//! ```rust,ignore
//! match interceptors
//!     .wait_for_match(Duration::from_secs(30), |m| m.author().id() == asker)
//!     .await
//! {
//!     WaitOutcome::Matched(reply) => { /* ... */ }
//!     WaitOutcome::TimedOut => { /* ... */ }
//!     WaitOutcome::Cancelled => {}
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, span, trace};

use crate::handler::{HandleResponse, callback, run_isolated};
use crate::message::Message;

/// Default per-subscription buffer capacity.
pub const DEFAULT_BUFFER: usize = 16;

/// Default timeout for [`Interceptors::wait_for_next`].
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Lease
// ============================================================================

/// Why a subscription ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Matched,
    TimedOut,
    Cancelled,
}

/// Settle-once teardown record shared by a subscription and its handles.
struct Lease {
    token: CancellationToken,
    outcome: OnceLock<Teardown>,
}

impl Lease {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            outcome: OnceLock::new(),
        }
    }

    fn outcome(&self) -> Option<Teardown> {
        self.outcome.get().copied()
    }
}

/// Identifier of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber {
    tx: mpsc::Sender<Message>,
    lease: Arc<Lease>,
}

struct Shared {
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    default_timeout: Duration,
}

impl Shared {
    /// Records `reason` if nothing else has. The winner removes the registry
    /// entry and cancels the lease token.
    fn settle(&self, id: SubscriptionId, lease: &Lease, reason: Teardown) -> bool {
        if lease.outcome.set(reason).is_err() {
            return false;
        }
        self.subscribers.lock().remove(&id);
        lease.token.cancel();
        trace!(subscription = %id, ?reason, "Subscription settled");
        true
    }
}

// ============================================================================
// Interceptors
// ============================================================================

/// Registry of live subscriptions. Cloning shares the registry.
#[derive(Clone)]
pub struct Interceptors {
    shared: Arc<Shared>,
}

impl Default for Interceptors {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER, DEFAULT_WAIT_TIMEOUT)
    }
}

impl Interceptors {
    /// Creates a registry whose subscriptions buffer `capacity` messages.
    ///
    /// A `capacity` of zero is raised to one.
    pub fn new(capacity: usize, default_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
                default_timeout,
            }),
        }
    }

    /// Opens a subscription that ends after `timeout`, or never if `None`.
    pub fn subscribe(&self, timeout: Option<Duration>) -> Subscription {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.shared.capacity);
        let lease = Arc::new(Lease::new());

        self.shared.subscribers.lock().insert(
            id,
            Subscriber {
                tx,
                lease: Arc::clone(&lease),
            },
        );
        trace!(subscription = %id, ?timeout, "Subscription opened");

        Subscription {
            id,
            rx,
            lease,
            deadline: timeout.map(|t| Instant::now() + t),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancels a subscription. Returns `false` if it had already ended.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        subscription.cancel()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offers `message` to every live subscription without blocking.
    ///
    /// Returns how many subscriptions accepted it.
    pub fn deliver(&self, message: &Message) -> usize {
        let subscribers = self.shared.subscribers.lock();
        let mut delivered = 0;

        for (id, subscriber) in subscribers.iter() {
            if subscriber.lease.token.is_cancelled() {
                continue;
            }
            match subscriber.tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscription = %id, message_id = %message.id(), "Subscriber buffer full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(subscription = %id, "Subscriber already closed");
                }
            }
        }

        delivered
    }

    /// Waits for the next message satisfying `predicate`, for at most `timeout`.
    ///
    /// Suspends only the calling task. The predicate runs on this task, never
    /// on the dispatcher's.
    pub async fn wait_for_match<P>(&self, timeout: Duration, predicate: P) -> WaitOutcome
    where
        P: FnMut(&Message) -> bool + Send,
    {
        self.wait_for_match_or_else(timeout, predicate, || {}).await
    }

    /// Like [`wait_for_match`](Self::wait_for_match), and runs `on_timeout`
    /// exactly once if the wait ends by timing out.
    ///
    /// `on_timeout` does not run when a match or a cancel settles first.
    pub async fn wait_for_match_or_else<P, T>(
        &self,
        timeout: Duration,
        mut predicate: P,
        on_timeout: T,
    ) -> WaitOutcome
    where
        P: FnMut(&Message) -> bool + Send,
        T: FnOnce() + Send,
    {
        let mut subscription = self.subscribe(Some(timeout));

        while let Some(message) = subscription.recv().await {
            if predicate(&message) && subscription.settle(Teardown::Matched) {
                return WaitOutcome::Matched(message);
            }
        }

        match subscription.outcome() {
            Some(Teardown::TimedOut) => {
                on_timeout();
                WaitOutcome::TimedOut
            }
            _ => WaitOutcome::Cancelled,
        }
    }

    /// [`wait_for_match`](Self::wait_for_match) with the configured default timeout.
    pub async fn wait_for_next<P>(&self, predicate: P) -> WaitOutcome
    where
        P: FnMut(&Message) -> bool + Send,
    {
        self.wait_for_match(self.shared.default_timeout, predicate)
            .await
    }

    /// Runs `on_event` for every accepted message until cancelled.
    ///
    /// The loop runs on its own task and processes messages one at a time;
    /// errors and panics from `on_event` are logged and the loop continues.
    pub fn watch_forever<F, Fut>(&self, on_event: F) -> CancelHandle
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandleResponse,
    {
        let mut subscription = self.subscribe(None);
        let handle = subscription.cancel_handle();
        let callback = callback(on_event);
        let span = span!(Level::DEBUG, "watch", subscription = %subscription.id());

        tokio::spawn(
            async move {
                let label = subscription.id().to_string();
                while let Some(message) = subscription.recv().await {
                    run_isolated(&label, Arc::clone(&callback), message).await;
                }
                debug!("Watch ended");
            }
            .instrument(span),
        );

        handle
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("live", &self.len())
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Result of [`Interceptors::wait_for_match`].
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Matched(Message),
    TimedOut,
    Cancelled,
}

impl WaitOutcome {
    /// Returns the matched message, if any.
    pub fn matched(self) -> Option<Message> {
        match self {
            WaitOutcome::Matched(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }
}

enum Next {
    Message(Option<Message>),
    Deadline,
    Cancelled,
}

/// One live interceptor. Dropping it cancels it.
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Message>,
    lease: Arc<Lease>,
    deadline: Option<Instant>,
    shared: Arc<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receives the next delivered message.
    ///
    /// Returns `None` once the subscription has ended, whether by timeout,
    /// cancellation, or a match.
    pub async fn recv(&mut self) -> Option<Message> {
        if self.lease.outcome().is_some() {
            return None;
        }

        let next = {
            let token = &self.lease.token;
            let rx = &mut self.rx;
            let deadline = self.deadline;
            let expiry = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                () = token.cancelled() => Next::Cancelled,
                () = expiry => Next::Deadline,
                message = rx.recv() => Next::Message(message),
            }
        };

        match next {
            Next::Message(message) => message,
            Next::Deadline => {
                self.settle(Teardown::TimedOut);
                None
            }
            Next::Cancelled => None,
        }
    }

    /// Ends the subscription. Returns `false` if it had already ended.
    pub fn cancel(&self) -> bool {
        self.settle(Teardown::Cancelled)
    }

    /// Returns a handle that can cancel this subscription from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            id: self.id,
            lease: Arc::clone(&self.lease),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Why the subscription ended, or `None` while it is live.
    pub fn outcome(&self) -> Option<Teardown> {
        self.lease.outcome()
    }

    fn settle(&self, reason: Teardown) -> bool {
        self.shared.settle(self.id, &self.lease, reason)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.settle(Teardown::Cancelled);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// Cancels a subscription from outside the task that owns it.
#[derive(Clone)]
pub struct CancelHandle {
    id: SubscriptionId,
    lease: Arc<Lease>,
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Ends the subscription. Idempotent; returns `true` only for the call
    /// that actually ended it.
    pub fn cancel(&self) -> bool {
        self.shared.settle(self.id, &self.lease, Teardown::Cancelled)
    }

    pub fn is_finished(&self) -> bool {
        self.lease.outcome().is_some()
    }

    /// Completes once the subscription has ended for any reason.
    pub async fn finished(&self) {
        self.lease.token.cancelled().await;
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("id", &self.id)
            .field("outcome", &self.lease.outcome())
            .finish()
    }
}
