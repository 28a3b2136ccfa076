pub mod bus;
pub mod connection;
pub mod subscription;

pub use bus::EventBus;
pub use subscription::Subscription;
