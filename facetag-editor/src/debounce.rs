//! Reset-on-activity delayed task
//!
//! Each [`Debouncer::schedule`] cancels the previously scheduled action if
//! its delay has not elapsed yet, then arms a new one. Once an action has
//! started running it is never cancelled.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm `action` to run after the idle delay, replacing any armed action
    pub fn schedule<F>(&self, action: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.swap(Some(token.clone())) {
            previous.cancel();
        }

        let delay = self.delay;
        let fired = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Debounced action superseded");
                }
                _ = tokio::time::sleep(delay) => {
                    // Mark as no longer pending; the action itself is not cancellable.
                    fired.cancel();
                    action.await;
                }
            }
        })
    }

    /// Disarm the pending action, returning whether one was armed
    pub fn cancel(&self) -> bool {
        match self.swap(None) {
            Some(token) => {
                let armed = !token.is_cancelled();
                token.cancel();
                armed
            }
            None => false,
        }
    }

    fn swap(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *pending, next)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
