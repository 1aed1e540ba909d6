//! Bounded notification channel plumbing.
//!
//! Producers block when the channel is full, so a burst of new orders cannot queue an unbounded number of
//! notifications.
use std::{
    future::Future,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::mpsc;

const JOB_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Sends the event, waiting for capacity if the channel is full. If the listener has gone away, the event is
    /// dropped and the failure is logged.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

/// Counts detached jobs so that a shutdown can wait for them to finish.
#[derive(Debug, Clone, Default)]
pub struct InFlightJobs {
    count: Arc<AtomicI64>,
}

impl InFlightJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `job` onto the runtime and tracks it until it completes.
    pub fn spawn<F>(&self, job: F)
    where F: Future<Output = ()> + Send + 'static {
        self.count.fetch_add(1, Ordering::SeqCst);
        let count = Arc::clone(&self.count);
        tokio::spawn(async move {
            job.await;
            count.fetch_sub(1, Ordering::SeqCst);
        });
    }

    pub fn in_flight(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Resolves once every tracked job has completed.
    pub async fn wait_for_completion(&self) {
        while self.in_flight() > 0 {
            debug!("📬️ Waiting for {} jobs to complete", self.in_flight());
            tokio::time::sleep(JOB_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicU64;

    use super::*;

    #[tokio::test]
    async fn producers_share_one_channel() {
        let _ = env_logger::try_init();
        let (sender, mut receiver) = mpsc::channel(1);
        let producer_1 = EventProducer::new(sender);
        let producer_2 = producer_1.clone();
        tokio::spawn(async move {
            for i in 0..5u64 {
                producer_1.publish_event(i * 2 + 1).await;
            }
        });
        tokio::spawn(async move {
            for i in 0..5u64 {
                producer_2.publish_event(i * 2).await;
            }
        });
        let mut total = 0;
        while let Some(v) = receiver.recv().await {
            total += v;
        }
        assert_eq!(total, 45);
    }

    #[tokio::test]
    async fn wait_for_tracked_jobs() {
        let jobs = InFlightJobs::new();
        let done = Arc::new(AtomicU64::new(0));
        for i in 0..4 {
            let done = Arc::clone(&done);
            jobs.spawn(async move {
                tokio::time::sleep(Duration::from_millis(50 * i)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        jobs.wait_for_completion().await;
        assert_eq!(jobs.in_flight(), 0);
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }
}
