use tokio_util::sync::CancellationToken;

/// Capability shared by every stage component that waits on external systems.
///
/// Cancelling is synchronous and idempotent: it only flips the component's
/// token, and in-flight waits observe it on their own.
pub trait Cancellable: Send + Sync {
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

impl Cancellable for CancellationToken {
    fn cancel(&self) {
        CancellationToken::cancel(self);
    }

    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}
