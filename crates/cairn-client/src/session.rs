use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use cairn_types::models::Message;

use crate::error::ClientError;
use crate::gateway::MessageGateway;
use crate::history::InputHistory;
use crate::scroll::{ScrollAction, ScrollTracker};
use crate::timeline::{Identity, Merge, Timeline};

/// Everything one chat view needs: the reconciled timeline, scroll state
/// and input history, on top of a [`MessageGateway`].
///
/// Stream deliveries go to [`ChatSession::receive`]; the stream itself is
/// owned by the caller so it can be polled alongside UI events.
pub struct ChatSession<G> {
    gateway: G,
    timeline: Timeline,
    scroll: ScrollTracker,
    history: InputHistory,
}

/// A send that has been shown locally but not yet answered by the server.
#[derive(Debug)]
pub struct PendingSend {
    placeholder: Uuid,
    content: String,
}

impl PendingSend {
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Id of the tentative entry in the timeline.
    pub fn placeholder(&self) -> Uuid {
        self.placeholder
    }
}

impl<G: MessageGateway> ChatSession<G> {
    pub fn new(gateway: G, me: Identity) -> Self {
        Self {
            gateway,
            timeline: Timeline::new(me),
            scroll: ScrollTracker::new(),
            history: InputHistory::new(),
        }
    }

    /// Fetch the full list and start over from it.
    pub async fn load(&mut self) -> Result<ScrollAction, ClientError> {
        let messages = self.gateway.list_messages().await?;
        self.timeline.load(messages);
        Ok(self.scroll.jump_to_latest())
    }

    /// Show `content` right away, then replace it with the stored record.
    /// On failure the tentative entry is removed and the error returned.
    ///
    /// Holds the session for the whole round trip. A UI that must keep
    /// rendering and merging stream deliveries meanwhile should use
    /// [`ChatSession::begin_send`] and [`ChatSession::finish_send`] instead.
    pub async fn send(&mut self, content: &str) -> Result<Message, ClientError> {
        let pending = self.begin_send(content)?;
        let result = self.gateway.create_message(pending.content()).await;
        self.finish_send(pending, result)
    }

    /// Append the tentative entry for `content`. The caller issues the
    /// create call for [`PendingSend::content`] and hands its result to
    /// [`ChatSession::finish_send`].
    pub fn begin_send(&mut self, content: &str) -> Result<PendingSend, ClientError> {
        let placeholder = self.timeline.begin_send(content, Utc::now())?;
        Ok(PendingSend {
            placeholder,
            content: content.to_string(),
        })
    }

    /// Settle a send started with [`ChatSession::begin_send`]: confirm the
    /// stored record, or revert the tentative entry and pass the error on.
    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        result: Result<Message, ClientError>,
    ) -> Result<Message, ClientError> {
        match result {
            Ok(message) => {
                self.timeline.confirm(message.clone());
                self.history.push(&pending.content);
                self.scroll.jump_to_latest();
                Ok(message)
            }
            Err(e) => {
                warn!("Send {} failed, reverting: {}", pending.placeholder, e);
                self.timeline.abort_send();
                Err(e)
            }
        }
    }

    /// Merge a message delivered by the live stream.
    pub fn receive(&mut self, message: Message) -> ScrollAction {
        match self.timeline.apply_remote(message) {
            Merge::Appended => self.scroll.on_append(),
            Merge::Replaced(_) | Merge::Ignored => ScrollAction::Stay,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn scroll(&mut self) -> &mut ScrollTracker {
        &mut self.scroll
    }

    pub fn history(&mut self) -> &mut InputHistory {
        &mut self.history
    }
}
