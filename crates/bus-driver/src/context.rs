//! Cooperative cancellation for subscriptions and pushes.
//!
//! Built on a `tokio::sync::watch` flag: the [`CancelHandle`] owns the
//! sender, every [`CancelContext`] clone watches it. Dropping the handle
//! counts as cancellation.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side: flips the flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal every context derived from this handle.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer side, cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct CancelContext {
    rx: watch::Receiver<bool>,
    // Keeps the background context's sender alive.
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl CancelContext {
    /// Fresh cancellable context and its handle.
    #[must_use]
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                rx,
                _keepalive: None,
            },
        )
    }

    /// Context that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the handle cancels or is dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::background()
    }
}
