//! Auto-scroll policy for the message list.

/// How close to the bottom, in pixels, still counts as "following" the list.
pub const NEAR_BOTTOM_PX: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    ScrollToBottom,
    /// Leave the viewport alone and show the new-message marker.
    ShowNewMessages,
    /// Nothing to do.
    Stay,
}

#[derive(Debug, Clone)]
pub struct ScrollTracker {
    near_bottom: bool,
    unseen: bool,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollTracker {
    /// Starts pinned to the bottom.
    pub fn new() -> Self {
        Self {
            near_bottom: true,
            unseen: false,
        }
    }

    /// Record the viewport position after the user scrolls.
    pub fn on_scroll(&mut self, scroll_top: f64, viewport_height: f64, content_height: f64) {
        let distance = content_height - (scroll_top + viewport_height);
        self.near_bottom = distance <= NEAR_BOTTOM_PX;
        if self.near_bottom {
            self.unseen = false;
        }
    }

    /// An entry was appended to the list.
    pub fn on_append(&mut self) -> ScrollAction {
        if self.near_bottom {
            ScrollAction::ScrollToBottom
        } else {
            self.unseen = true;
            ScrollAction::ShowNewMessages
        }
    }

    /// The user picked the new-message marker, or sent something.
    pub fn jump_to_latest(&mut self) -> ScrollAction {
        self.unseen = false;
        self.near_bottom = true;
        ScrollAction::ScrollToBottom
    }

    pub fn is_near_bottom(&self) -> bool {
        self.near_bottom
    }

    pub fn has_new_messages(&self) -> bool {
        self.unseen
    }
}
