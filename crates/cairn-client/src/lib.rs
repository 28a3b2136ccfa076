//! Client side of a cairn chat: talking to the server and keeping a local,
//! render-ready view of the message list.
//!
//! [`Timeline`] owns reconciliation between locally predicted sends and
//! what the server confirms. [`ChatSession`] ties it to a [`MessageGateway`]
//! and the scroll and input-history helpers a UI needs.

pub mod error;
pub mod gateway;
pub mod history;
pub mod scroll;
pub mod session;
pub mod stream;
pub mod timeline;

pub use error::ClientError;
pub use gateway::{HttpGateway, MessageGateway};
pub use history::InputHistory;
pub use scroll::{NEAR_BOTTOM_PX, ScrollAction, ScrollTracker};
pub use session::{ChatSession, PendingSend};
pub use stream::EventStream;
pub use timeline::{Entry, Identity, Merge, Timeline};
