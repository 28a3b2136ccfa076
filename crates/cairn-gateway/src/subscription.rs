use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use cairn_types::models::Message;

use crate::bus::EventBus;

/// One client's live attachment to the [`EventBus`].
///
/// Yields messages in the order the bus delivered them. Ends when its
/// cancellation token fires or the bus shuts down, and leaves the bus's
/// fanout set before reporting the end. Dropping it detaches as well.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<Arc<Message>>,
    cancel: CancellationToken,
    bus: EventBus,
    attached: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: Uuid,
        rx: mpsc::Receiver<Arc<Message>>,
        cancel: CancellationToken,
        bus: EventBus,
    ) -> Self {
        Self {
            id,
            rx,
            cancel,
            bus,
            attached: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next message. `None` once cancelled or closed; every
    /// later call returns `None` immediately.
    pub async fn next(&mut self) -> Option<Message> {
        if !self.attached {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.release();
                None
            }
            received = self.rx.recv() => match received {
                Some(message) => Some(Arc::unwrap_or_clone(message)),
                None => {
                    self.release();
                    None
                }
            },
        }
    }

    /// Adapt into a stream that ends with the subscription.
    pub fn into_stream(self) -> impl Stream<Item = Message> {
        async_stream::stream! {
            let mut subscription = self;
            while let Some(message) = subscription.next().await {
                yield message;
            }
        }
    }

    fn release(&mut self) {
        if self.attached {
            self.attached = false;
            self.bus.detach(self.id);
            self.rx.close();
            debug!(subscription = %self.id, "subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
