//! Coalesces bursts of input into a single delayed recomputation.

use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identifies one scheduled recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRecompute(u64);

/// Single-slot debouncer.
///
/// Each `schedule` supersedes the previous token. The timer task only
/// delivers its token; the receiver calls [`InputDebouncer::consume`] so a
/// token that was already in flight when superseded is recognised and
/// ignored.
pub struct InputDebouncer<E> {
    quiet: Duration,
    notify: WeakUnboundedSender<E>,
    make_event: fn(PendingRecompute) -> E,
    generation: u64,
    pending: Option<(PendingRecompute, JoinHandle<()>)>,
}

impl<E: Send + 'static> InputDebouncer<E> {
    pub fn new(
        quiet: Duration,
        notify: WeakUnboundedSender<E>,
        make_event: fn(PendingRecompute) -> E,
    ) -> Self {
        Self {
            quiet,
            notify,
            make_event,
            generation: 0,
            pending: None,
        }
    }

    /// Cancels any outstanding token and schedules a new one.
    pub fn schedule(&mut self) -> PendingRecompute {
        self.cancel();
        self.generation += 1;
        let token = PendingRecompute(self.generation);

        let quiet = self.quiet;
        let notify = self.notify.clone();
        let event = (self.make_event)(token);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // Nothing to notify once the session has shut down
            if let Some(notify) = notify.upgrade() {
                let _ = notify.send(event);
            }
        });
        debug!("Scheduled recompute {:?} in {:?}", token, quiet);
        self.pending = Some((token, handle));
        token
    }

    /// Drops the outstanding token, if any.
    pub fn cancel(&mut self) {
        if let Some((token, handle)) = self.pending.take() {
            handle.abort();
            debug!("Superseded recompute {:?}", token);
        }
    }

    /// Returns true if `token` is the outstanding one, clearing it.
    pub fn consume(&mut self, token: PendingRecompute) -> bool {
        match &self.pending {
            Some((current, _)) if *current == token => {
                self.pending = None;
                true
            }
            _ => {
                debug!("Ignoring stale recompute {:?}", token);
                false
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<E> Drop for InputDebouncer<E> {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_token() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingRecompute>();
        let mut debouncer = InputDebouncer::new(Duration::from_millis(150), tx.downgrade(), |t| t);

        let mut last = debouncer.schedule();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            last = debouncer.schedule();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, last);
        assert!(rx.try_recv().is_err());
        assert!(debouncer.consume(fired));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_fires_before_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingRecompute>();
        let mut debouncer = InputDebouncer::new(Duration::from_millis(150), tx.downgrade(), |t| t);

        debouncer.schedule();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_token_is_rejected_after_reschedule() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingRecompute>();
        let mut debouncer = InputDebouncer::new(Duration::from_millis(150), tx.downgrade(), |t| t);

        let first = debouncer.schedule();
        tokio::time::sleep(Duration::from_millis(200)).await;
        // Delivered but not yet consumed when new input arrives
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered, first);
        let second = debouncer.schedule();

        assert!(!debouncer.consume(delivered));
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let next = rx.recv().await.unwrap();
        assert_eq!(next, second);
        assert!(debouncer.consume(next));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingRecompute>();
        let mut debouncer = InputDebouncer::new(Duration::from_millis(150), tx.downgrade(), |t| t);

        debouncer.schedule();
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.is_pending());
    }
}
