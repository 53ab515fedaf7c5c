pub mod error;
pub mod events;
pub mod models;

pub use error::SyncError;
