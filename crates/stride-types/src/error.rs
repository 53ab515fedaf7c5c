use thiserror::Error;

/// Failure taxonomy of the sync engine. Each variant has a distinct
/// recovery policy:
///
/// - `BackendUnavailable` — recovered locally by serving the cached
///   directory, surfaced only as a stale/offline indicator.
/// - `BackendRejected` — surfaced to the initiating caller so optimistic
///   UI changes can be reverted.
/// - `CacheFault` — always logged and swallowed; never fails live reads.
/// - `SubscriptionDropped` — recovered by automatic resubscription.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend rejected request: {0}")]
    BackendRejected(String),

    #[error("cache fault: {0}")]
    CacheFault(String),

    #[error("subscription dropped: {0}")]
    SubscriptionDropped(String),
}
