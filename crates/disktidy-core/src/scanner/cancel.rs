/// Cooperative cancellation.
///
/// A cheap, cloneable handle around a shared atomic flag. Workers poll it at
/// bounded points (before taking a directory, before listing it, before
/// hashing a file); nothing is ever interrupted forcibly.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Non-blocking and idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
