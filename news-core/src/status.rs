use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::event::Event;
use crate::fetch::ApiClient;

/// Backend availability as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    Idle,
    Busy,
}

impl ProcessingState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ProcessingState::Busy)
    }
}

pub struct StatusMonitorHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
    state_rx: watch::Receiver<ProcessingState>,
}

impl StatusMonitorHandle {
    /// Synchronous view of the current busy/idle state.
    pub fn state(&self) -> watch::Receiver<ProcessingState> {
        self.state_rx.clone()
    }

    pub async fn stop(self) -> Result<(), ClientError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(ClientError::from)
    }
}

/// Spawn the busy-signal poller. State flips only on successful polls, with
/// one exception: a failed poll while busy falls open to idle, so a broken
/// status check can never freeze the client in permanent backoff.
pub fn spawn_status_monitor(
    api: ApiClient,
    interval: std::time::Duration,
    event_tx: mpsc::Sender<Event>,
) -> StatusMonitorHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let (state_tx, state_rx) = watch::channel(ProcessingState::Idle);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("status monitor shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let previous = *state_tx.borrow();
                    let next = match api.poll_status().await {
                        Ok(true) => ProcessingState::Busy,
                        Ok(false) => ProcessingState::Idle,
                        Err(err) => {
                            debug!(error = %err, "status poll failed, assuming idle");
                            ProcessingState::Idle
                        }
                    };

                    if next != previous {
                        let _ = state_tx.send(next);
                        let event = match next {
                            ProcessingState::Busy => {
                                info!("backend entered processing state");
                                Event::BusyStateChanged(ProcessingState::Busy)
                            }
                            ProcessingState::Idle => {
                                info!("backend processing completed");
                                Event::BusyStateChanged(ProcessingState::Idle)
                            }
                        };
                        if event_tx.send(event).await.is_err() {
                            debug!("event receiver dropped");
                        }
                    }
                }
            }
        }
    });

    StatusMonitorHandle {
        cancel_tx,
        join,
        state_rx,
    }
}
