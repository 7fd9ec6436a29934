use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Cloneable teardown signal shared by the stream supervisor and every
/// fetch path. Once tripped it stays tripped; fetches that complete after
/// the trip must not mutate the store.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<ShutdownInner>,
}

#[derive(Default)]
struct ShutdownInner {
    tripped: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.inner.tripped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_tripped(&self) -> bool {
        self.inner.tripped.load(Ordering::SeqCst)
    }

    /// Resolves when the signal trips; immediately if it already has.
    pub async fn tripped(&self) {
        //register before the second check, notify_waiters does not wake
        //later registrations
        let notified = self.inner.notify.notified();
        if self.is_tripped() {
            return;
        }
        notified.await;
    }
}
