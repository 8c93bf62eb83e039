//! Background sampling worker.
//!
//! One task owns the [`Collector`] and runs a full cycle per interval.
//! Collaborators talk to it only through [`Monitor`]: control changes go in
//! over a watch channel, results come out as an aggregated snapshot plus a
//! stream of per-metric events.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::system::collector::Collector;
use crate::system::snapshot::{MetricEvent, SystemSnapshot};

pub const DEFAULT_INTERVAL_SECS: u64 = 2;
pub const MIN_INTERVAL_SECS: u64 = 1;
/// How long [`Monitor::shutdown`] waits for the worker before giving up.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Control {
    interval_secs: u64,
    paused: bool,
    quit: bool,
}

pub struct Monitor {
    control: watch::Sender<Control>,
    snapshots: watch::Receiver<Arc<SystemSnapshot>>,
    worker: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Start the worker on the current tokio runtime. The first cycle runs
    /// immediately unless `paused` is set.
    pub fn spawn(
        collector: Collector,
        interval_secs: u64,
        paused: bool,
    ) -> (Self, mpsc::UnboundedReceiver<MetricEvent>) {
        let (control_tx, control_rx) = watch::channel(Control {
            interval_secs: interval_secs.max(MIN_INTERVAL_SECS),
            paused,
            quit: false,
        });
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(SystemSnapshot::default()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let worker = tokio::spawn(run_worker(collector, control_rx, snapshot_tx, events_tx));

        let monitor = Monitor {
            control: control_tx,
            snapshots: snapshot_rx,
            worker: Some(worker),
        };
        (monitor, events_rx)
    }

    pub fn interval_secs(&self) -> u64 {
        self.control.borrow().interval_secs
    }

    /// Change the polling interval. Returns whether the value changed.
    /// Takes effect after the current sleep.
    pub fn set_interval(&self, secs: u64) -> bool {
        let secs = secs.max(MIN_INTERVAL_SECS);
        self.control.send_if_modified(|control| {
            if control.interval_secs == secs {
                return false;
            }
            control.interval_secs = secs;
            true
        })
    }

    pub fn is_paused(&self) -> bool {
        self.control.borrow().paused
    }

    /// Pause or resume sampling. Tick baselines are kept while paused, so
    /// the first cycle after resuming measures from the last sample taken.
    pub fn set_paused(&self, paused: bool) {
        self.control.send_if_modified(|control| {
            let changed = control.paused != paused;
            control.paused = paused;
            changed
        });
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<SystemSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SystemSnapshot>> {
        self.snapshots.clone()
    }

    /// Ask the worker to stop and wait up to [`SHUTDOWN_GRACE`] for it.
    /// Returns `false` if the worker was still running when the wait ended;
    /// it is left to finish on its own.
    pub async fn shutdown(mut self) -> bool {
        self.request_quit();
        let Some(worker) = self.worker.take() else {
            return true;
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, worker).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "sampling worker failed");
                true
            }
            Err(_) => {
                tracing::warn!(grace = ?SHUTDOWN_GRACE, "sampling worker did not stop in time");
                false
            }
        }
    }

    fn request_quit(&self) {
        self.control.send_modify(|control| control.quit = true);
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.request_quit();
        }
    }
}

async fn run_worker(
    mut collector: Collector,
    mut control: watch::Receiver<Control>,
    snapshots: watch::Sender<Arc<SystemSnapshot>>,
    events: mpsc::UnboundedSender<MetricEvent>,
) {
    tracing::info!("sampling worker started");
    loop {
        let current = *control.borrow_and_update();
        if current.quit {
            break;
        }

        if !current.paused {
            let cycle = tokio::task::spawn_blocking(move || {
                let events = collector.run_cycle();
                (collector, events)
            })
            .await;
            let (returned, cycle_events) = match cycle {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "sampling cycle aborted");
                    break;
                }
            };
            collector = returned;
            publish(&snapshots, &events, cycle_events);
        }

        if !sleep_or_quit(&mut control, Duration::from_secs(current.interval_secs)).await {
            break;
        }
    }
    tracing::info!("sampling worker stopped");
}

fn publish(
    snapshots: &watch::Sender<Arc<SystemSnapshot>>,
    events_tx: &mpsc::UnboundedSender<MetricEvent>,
    events: Vec<MetricEvent>,
) {
    snapshots.send_modify(|snapshot| Arc::make_mut(snapshot).apply_cycle(&events));
    for event in events {
        // nobody listening for individual events is fine
        if events_tx.send(event).is_err() {
            break;
        }
    }
}

/// Sleep for `interval` unless a quit request arrives first. Other control
/// changes are picked up at the top of the next loop iteration.
async fn sleep_or_quit(control: &mut watch::Receiver<Control>, interval: Duration) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = control.changed() => {
                if changed.is_err() || control.borrow().quit {
                    return false;
                }
            }
        }
    }
}
