//! Subscription handle returned by the coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Teardown = Box<dyn FnOnce() + Send>;

/// Keeps a collection subscription alive.
///
/// Dropping the handle cancels it. Deliveries that are already in flight
/// when the subscription is cancelled are discarded.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    alive: Arc<AtomicBool>,
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    pub(crate) fn new(alive: Arc<AtomicBool>, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            alive,
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Deregister both listeners. Safe to call any number of times.
    pub fn cancel(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let teardown = self
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cancel_runs_teardown_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let teardown_runs = Arc::clone(&runs);
        let subscription = Subscription::new(Arc::new(AtomicBool::new(true)), move || {
            teardown_runs.fetch_add(1, Ordering::SeqCst);
        });

        subscription.cancel();
        subscription.cancel();
        assert!(!subscription.is_active());
        drop(subscription);

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels() {
        let alive = Arc::new(AtomicBool::new(true));
        let subscription = Subscription::new(Arc::clone(&alive), || {});
        drop(subscription);
        assert!(!alive.load(Ordering::SeqCst));
    }
}
