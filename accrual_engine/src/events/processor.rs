//! The accrual processor.
//!
//! One long-lived task listens for [`OrderCreatedEvent`]s. Every notification, and every tick of the optional sweep
//! timer, spawns a detached processing cycle, so cycles may overlap. This is safe because an order can only be claimed
//! while it is `REGISTERED`, and claiming it moves it to `PROCESSING` in the same statement.
use std::{future::Future, time::Duration};

use log::*;
use tokio::{
    sync::mpsc,
    time::{Interval, MissedTickBehavior},
};

use super::{EventProducer, InFlightJobs, OrderCreatedEvent};
use crate::{AccrualApi, AccrualError, SqliteDatabase};

pub struct AccrualProcessor {
    api: AccrualApi<SqliteDatabase>,
    listener: mpsc::Receiver<OrderCreatedEvent>,
    sender: mpsc::Sender<OrderCreatedEvent>,
    sweep_interval: Option<Duration>,
}

impl AccrualProcessor {
    /// `buffer_size` bounds the number of pending notifications. If `sweep_interval` is set, a sweep that drains every
    /// registered order runs on that period, starting immediately.
    pub fn new(api: AccrualApi<SqliteDatabase>, buffer_size: usize, sweep_interval: Option<Duration>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size.max(1));
        Self { api, listener, sender, sweep_interval }
    }

    pub fn subscribe(&self) -> EventProducer<OrderCreatedEvent> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until `shutdown` resolves or every producer has been dropped. Then waits for the in-flight cycles to
    /// finish. Cycles are never interrupted mid-transaction.
    pub async fn run<F>(self, shutdown: F)
    where F: Future<Output = ()> {
        let Self { api, mut listener, sender, sweep_interval } = self;
        // Only subscribers keep the channel open from here on
        drop(sender);
        let jobs = InFlightJobs::new();
        let mut sweep = sweep_interval.map(|period| {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer
        });
        tokio::pin!(shutdown);
        info!("⚙️ Accrual processor started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("⚙️ Shutdown signal received");
                    break;
                },
                event = listener.recv() => match event {
                    Some(event) => {
                        trace!("⚙️ Notification received for order {}", event.order.number);
                        let api = api.clone();
                        jobs.spawn(async move {
                            run_cycle(&api).await;
                        });
                    },
                    None => {
                        info!("⚙️ All notification producers have been dropped");
                        break;
                    },
                },
                _ = next_sweep(&mut sweep) => {
                    let api = api.clone();
                    jobs.spawn(async move { sweep_registered_orders(&api).await });
                },
            }
        }
        jobs.wait_for_completion().await;
        info!("⚙️ Accrual processor has shut down");
    }
}

async fn next_sweep(sweep: &mut Option<Interval>) {
    match sweep {
        Some(timer) => {
            timer.tick().await;
        },
        None => std::future::pending().await,
    }
}

/// Advances one registered order. Returns true if an order was processed.
async fn run_cycle(api: &AccrualApi<SqliteDatabase>) -> bool {
    match api.process_next_registered_order().await {
        Ok(order) => {
            info!("⚙️ Order {} processed. Status: {}", order.number, order.status);
            true
        },
        Err(AccrualError::NoRegisteredOrder) => {
            debug!("⚙️ No registered orders to process");
            false
        },
        Err(e) => {
            error!("⚙️ Processing cycle failed. {e}");
            false
        },
    }
}

async fn sweep_registered_orders(api: &AccrualApi<SqliteDatabase>) {
    let mut count = 0;
    while run_cycle(api).await {
        count += 1;
    }
    if count > 0 {
        info!("⚙️ Sweep processed {count} orders");
    }
}
