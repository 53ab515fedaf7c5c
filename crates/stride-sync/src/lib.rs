pub mod backend;
pub mod directory;
pub mod dispatcher;
pub mod engine;
pub mod notify;
pub mod reactions;
pub mod unread;

#[cfg(test)]
mod testutil;

pub use backend::Backend;
pub use dispatcher::{FeedState, FeedTransport};
pub use engine::SyncEngine;
pub use notify::{Notification, NotificationSink};
