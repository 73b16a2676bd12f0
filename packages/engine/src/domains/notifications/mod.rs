//! Subscription bookmarks and notification fan-out.

pub mod dispatcher;
pub mod models;

pub use dispatcher::NotificationDispatcher;
pub use models::Subscription;
