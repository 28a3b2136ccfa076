use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cairn_types::models::Message;

use crate::subscription::Subscription;

/// Deliveries a subscription may have queued before it counts as lagging.
pub const SUBSCRIBER_BACKLOG: usize = 1024;

/// Fans new messages out to every attached subscription.
///
/// Constructed once at startup and handed to whoever publishes or
/// subscribes. There is no history: a subscription only sees messages
/// published while it is attached.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    /// One bounded queue per attached subscription. Publishing never waits;
    /// a reader whose queue is full is detached instead.
    subscribers: RwLock<HashMap<Uuid, mpsc::Sender<Arc<Message>>>>,

    backlog: usize,

    /// Set by `shutdown`; later subscriptions start out closed.
    closed: AtomicBool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_backlog(SUBSCRIBER_BACKLOG)
    }

    /// A bus whose subscriptions are detached once `backlog` deliveries
    /// are waiting unread.
    pub fn with_backlog(backlog: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(HashMap::new()),
                backlog: backlog.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Attach a new subscription that ends when `cancel` fires.
    pub fn subscribe(&self, cancel: CancellationToken) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.backlog);

        {
            let mut subscribers = self
                .inner
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            // Checked under the lock so a concurrent shutdown cannot miss us.
            // A refused sender is dropped here and the subscription ends at once.
            if !self.inner.closed.load(Ordering::Acquire) {
                subscribers.insert(id, tx);
            }
        }

        Subscription::new(id, rx, cancel, self.clone())
    }

    /// Deliver `message` to every currently attached subscription.
    /// Returns how many received it.
    ///
    /// A subscription whose backlog is full is detached. It still drains
    /// what was queued and then ends, so its client reconnects and
    /// re-fetches rather than silently skipping messages.
    pub fn publish(&self, message: Message) -> usize {
        let message = Arc::new(message);
        let mut gone = Vec::new();

        let delivered = {
            let subscribers = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);

            let mut delivered = 0;
            for (id, tx) in subscribers.iter() {
                match tx.try_send(Arc::clone(&message)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(subscription = %id, "subscriber lagging, detaching");
                        gone.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => gone.push(*id),
                }
            }
            delivered
        };

        for id in gone {
            self.detach(id);
        }

        debug!(message_id = %message.id, delivered, "published message");
        delivered
    }

    /// Remove a subscription from the fanout set. Returns whether it was attached.
    pub fn detach(&self, id: Uuid) -> bool {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Detach everyone and refuse new attachments. Every live subscription
    /// ends after draining what it was already sent.
    pub fn shutdown(&self) {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.closed.store(true, Ordering::Release);
        let count = subscribers.len();
        subscribers.clear();
        info!("Event bus shut down, released {} subscriptions", count);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}
