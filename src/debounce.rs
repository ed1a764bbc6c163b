//! Delayed, cancellable invocation for analyze-as-you-type.
//!
//! Every `schedule` supersedes the previous call: a pending call is aborted,
//! and a call that already finished its work only delivers if nothing newer
//! was scheduled in the meantime.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Debouncer<T> {
    idle: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    tx: UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Results of calls that survive arrive on the returned receiver.
    pub fn new(idle: Duration) -> (Self, UnboundedReceiver<T>) {
        let (tx, rx) = unbounded_channel();
        let d = Self {
            idle,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            tx,
        };
        (d, rx)
    }

    /// Run `call` once `idle` has passed without another `schedule` or `cancel`.
    /// `call` is not polled before the idle interval ends.
    pub fn schedule<F>(&mut self, call: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.abort_pending();
        let my_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let idle = self.idle;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            let out = call.await;
            if generation.load(Ordering::SeqCst) == my_gen {
                let _ = tx.send(out);
            } else {
                debug!("Discarding superseded result - generation={}", my_gen);
            }
        }));
    }

    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_pending();
    }

    fn abort_pending(&mut self) {
        if let Some(h) = self.pending.take() {
            h.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(h) = self.pending.take() {
            h.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_delivers() {
        let (mut d, mut rx) = Debouncer::new(Duration::from_millis(1000));
        d.schedule(async { "a" });
        tokio::time::sleep(Duration::from_millis(500)).await;
        d.schedule(async { "b" });
        d.schedule(async { "c" });

        assert_eq!(rx.recv().await, Some("c"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_not_started_before_idle() {
        let started = Arc::new(AtomicUsize::new(0));
        let (mut d, mut rx) = Debouncer::new(Duration::from_millis(1000));
        for _ in 0..3 {
            let started = Arc::clone(&started);
            d.schedule(async move {
                started.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(started.load(Ordering::SeqCst), 0);
        rx.recv().await.unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let (mut d, mut rx) = Debouncer::new(Duration::from_millis(200));
        d.schedule(async { 1u32 });
        d.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        d.schedule(async { 2u32 });
        assert_eq!(rx.recv().await, Some(2));
    }
}
