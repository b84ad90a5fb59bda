use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Write-once stop flag shared by the collector, every worker and whoever
/// handles the interrupt. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Resolves once the flag is set.
    pub async fn stopped(&self) {
        loop {
            // register before checking so a trigger in between is not lost
            let notified = self.inner.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

/// Resolves when `listener` reports an interrupt. If the listener cannot be
/// installed this never resolves, so the run it races against carries on.
pub async fn interrupted<F>(listener: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = listener.await {
        tracing::warn!(error = %e, "cannot listen for interrupts, running without them");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn trigger_is_visible_to_clones() {
        let stop = StopSignal::new();
        let other = stop.clone();
        assert!(!other.is_triggered());
        stop.trigger();
        stop.trigger();
        assert!(other.is_triggered());
    }

    #[tokio::test]
    async fn stopped_resolves_after_trigger() {
        let stop = StopSignal::new();
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move { stop.stopped().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn stopped_returns_immediately_when_already_triggered() {
        let stop = StopSignal::new();
        stop.trigger();
        tokio::time::timeout(Duration::from_millis(100), stop.stopped())
            .await
            .expect("already triggered");
    }

    #[tokio::test]
    async fn interrupted_resolves_on_signal() {
        tokio::time::timeout(Duration::from_millis(100), interrupted(async { Ok(()) }))
            .await
            .expect("signal delivered");
    }

    #[tokio::test]
    async fn failed_listener_never_interrupts() {
        let listener = async { Err(io::Error::new(io::ErrorKind::Other, "no signal handler")) };
        let res = tokio::time::timeout(Duration::from_millis(50), interrupted(listener)).await;
        assert!(res.is_err(), "a failed listener must not end the run");
    }
}
