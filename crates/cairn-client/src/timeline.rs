use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cairn_types::models::Message;

use crate::error::ClientError;

/// The logged-in user, as announced by the gateway's `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub message: Message,
    /// Locally predicted and not yet confirmed by the server.
    pub tentative: bool,
}

/// What [`Timeline::apply_remote`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// Took the place of the outstanding tentative entry at this index.
    Replaced(usize),
    Appended,
    /// Already shown.
    Ignored,
}

/// The local message list plus at most one tentative entry.
///
/// Every method is a single `&mut self` transition, so a renderer reading
/// [`Timeline::entries`] never sees a half-applied merge.
#[derive(Debug, Clone)]
pub struct Timeline {
    me: Identity,
    entries: Vec<Entry>,
    /// Ids of confirmed entries. Placeholders are never listed here.
    known: HashSet<Uuid>,
    /// Placeholder id of the outstanding send.
    pending: Option<Uuid>,
}

impl Timeline {
    pub fn new(me: Identity) -> Self {
        Self {
            me,
            entries: Vec::new(),
            known: HashSet::new(),
            pending: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.me
    }

    /// Replace everything with a fresh full fetch. Drops any tentative entry.
    pub fn load(&mut self, messages: Vec<Message>) {
        self.entries.clear();
        self.known.clear();
        self.pending = None;

        for message in messages {
            if self.known.insert(message.id) {
                self.entries.push(Entry {
                    message,
                    tentative: false,
                });
            }
        }
    }

    /// Append a tentative entry for `content` and return its placeholder id.
    pub fn begin_send(
        &mut self,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, ClientError> {
        if self.pending.is_some() {
            return Err(ClientError::SendInFlight);
        }

        let placeholder = Uuid::new_v4();
        self.entries.push(Entry {
            message: Message {
                id: placeholder,
                content: content.into(),
                author_id: self.me.user_id,
                author_name: self.me.username.clone(),
                outcome: None,
                created_at: now,
            },
            tentative: true,
        });
        self.pending = Some(placeholder);
        Ok(placeholder)
    }

    /// Merge a canonical message from the stream or a create response.
    ///
    /// Known ids are ignored. A self-authored message takes over the
    /// outstanding tentative entry in place; anything else is appended.
    pub fn apply_remote(&mut self, message: Message) -> Merge {
        if self.known.contains(&message.id) {
            return Merge::Ignored;
        }
        self.known.insert(message.id);

        if message.author_id == self.me.user_id {
            if let Some(index) = self.take_pending() {
                self.entries[index] = Entry {
                    message,
                    tentative: false,
                };
                return Merge::Replaced(index);
            }
        }

        self.entries.push(Entry {
            message,
            tentative: false,
        });
        Merge::Appended
    }

    /// The create call answered. Same rules as a stream delivery, so
    /// whichever of the two arrives second is ignored.
    pub fn confirm(&mut self, message: Message) -> Merge {
        self.apply_remote(message)
    }

    /// Revert the tentative entry after a failed create.
    pub fn abort_send(&mut self) -> Option<Message> {
        let index = self.take_pending()?;
        Some(self.entries.remove(index).message)
    }

    pub fn is_sending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take_pending(&mut self) -> Option<usize> {
        let placeholder = self.pending.take()?;
        self.entries
            .iter()
            .position(|entry| entry.tentative && entry.message.id == placeholder)
    }
}
