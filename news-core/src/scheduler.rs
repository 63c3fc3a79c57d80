use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::controller::{Delivered, FreshnessController};
use crate::error::ClientError;
use crate::event::{Event, SkipReason};
use crate::models::Channel;
use crate::status::ProcessingState;

/// Primary group: the channels the auto-refresh timer owns. Trending and
/// dashboard run on their own slower pollers.
const PRIMARY_CHANNELS: [Channel; 2] = [Channel::Articles, Channel::Latest];

/// Book-keeping for one channel group's refresh cycles. `in_flight` is
/// flipped before the cycle's first suspension point, so a re-entrant
/// trigger can never start an overlapping cycle.
#[derive(Debug, Default)]
struct RefreshCycleState {
    in_flight: bool,
    last_completed_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

impl RefreshCycleState {
    fn complete(&mut self, any_fresh: bool) {
        self.in_flight = false;
        self.last_completed_at = Some(Utc::now());
        if any_fresh {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
    }
}

/// External trigger entry point, handed to the embedding page shell. Fired
/// when the page regains visibility; coalesced against a timer that just
/// fired.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    pub fn visibility_regained(&self) {
        // Dropped when the queue already holds a pending trigger.
        let _ = self.tx.try_send(());
    }
}

pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    joins: Vec<JoinHandle<()>>,
    trigger: TriggerHandle,
}

impl SchedulerHandle {
    pub fn trigger(&self) -> TriggerHandle {
        self.trigger.clone()
    }

    /// Page teardown: cancels every timer so no callback fires against a
    /// torn-down view.
    pub async fn stop(self) -> Result<(), ClientError> {
        let _ = self.cancel_tx.send(());
        for join in self.joins {
            join.await.map_err(ClientError::from)?;
        }
        Ok(())
    }
}

/// Spawn all refresh timers: the primary auto-refresh loop (articles +
/// latest, plus visibility and idle-transition triggers) and one background
/// poller per low-priority channel. Each group enforces its own mutual
/// exclusion; triggers arriving mid-cycle are dropped, never queued.
pub fn spawn_scheduler(
    controller: FreshnessController,
    busy_rx: watch::Receiver<ProcessingState>,
    event_tx: mpsc::Sender<Event>,
    config: ClientConfig,
) -> SchedulerHandle {
    let (cancel_tx, _) = broadcast::channel(1);
    let (trigger_tx, trigger_rx) = mpsc::channel(1);

    let mut joins = Vec::new();
    joins.push(tokio::spawn(primary_loop(
        controller.clone(),
        busy_rx.clone(),
        event_tx.clone(),
        config.clone(),
        trigger_rx,
        cancel_tx.subscribe(),
    )));
    joins.push(tokio::spawn(background_loop(
        controller.clone(),
        Channel::Trending,
        config.trending_poll_interval,
        busy_rx.clone(),
        event_tx.clone(),
        cancel_tx.subscribe(),
    )));
    joins.push(tokio::spawn(background_loop(
        controller,
        Channel::Dashboard,
        config.dashboard_poll_interval,
        busy_rx,
        event_tx,
        cancel_tx.subscribe(),
    )));

    SchedulerHandle {
        cancel_tx,
        joins,
        trigger: TriggerHandle { tx: trigger_tx },
    }
}

/// Auto-refresh loop for the primary group; also services the visibility
/// and idle-transition triggers.
async fn primary_loop(
    controller: FreshnessController,
    mut busy_rx: watch::Receiver<ProcessingState>,
    event_tx: mpsc::Sender<Event>,
    config: ClientConfig,
    mut trigger_rx: mpsc::Receiver<()>,
    mut cancel_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.auto_refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The interval's immediate first tick would double up with the initial
    // load below.
    ticker.reset();

    let mut state = RefreshCycleState::default();
    let (done_tx, mut done_rx) = mpsc::channel::<bool>(1);

    // Initial load covers every channel in parallel, not just the primary
    // group; the background pollers then take their channels over.
    state.in_flight = true;
    let mut last_cycle_start = Some(Instant::now());
    spawn_cycle(&controller, &Channel::ALL, &done_tx);

    loop {
        tokio::select! {
            _ = cancel_rx.recv() => {
                info!("scheduler shutdown requested");
                break;
            }
            any_fresh = done_rx.recv() => {
                let any_fresh = any_fresh.unwrap_or(false);
                state.complete(any_fresh);
                if let Some(at) = state.last_completed_at {
                    debug!(
                        completed_at = %at,
                        fresh = any_fresh,
                        failures = state.consecutive_failures,
                        "primary cycle completed"
                    );
                }
                // Triggers that arrived while in flight are dropped.
                while trigger_rx.try_recv().is_ok() {
                    emit_skip(&event_tx, SkipReason::InFlight).await;
                }
            }
            _ = ticker.tick() => {
                try_start_cycle(
                    &controller, &busy_rx, &event_tx, &config,
                    &mut state, &mut last_cycle_start, &done_tx,
                    "auto-refresh", false,
                ).await;
            }
            trigger = trigger_rx.recv() => {
                if trigger.is_none() {
                    break;
                }
                try_start_cycle(
                    &controller, &busy_rx, &event_tx, &config,
                    &mut state, &mut last_cycle_start, &done_tx,
                    "visibility regained", true,
                ).await;
            }
            changed = busy_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if !busy_rx.borrow_and_update().is_busy() {
                    try_start_cycle(
                        &controller, &busy_rx, &event_tx, &config,
                        &mut state, &mut last_cycle_start, &done_tx,
                        "processing completed", true,
                    ).await;
                }
            }
        }
    }
}

/// Start a primary-group cycle unless in flight, busy, or debounced.
#[allow(clippy::too_many_arguments)]
async fn try_start_cycle(
    controller: &FreshnessController,
    busy_rx: &watch::Receiver<ProcessingState>,
    event_tx: &mpsc::Sender<Event>,
    config: &ClientConfig,
    state: &mut RefreshCycleState,
    last_cycle_start: &mut Option<Instant>,
    done_tx: &mpsc::Sender<bool>,
    reason: &str,
    debounced: bool,
) {
    if state.in_flight {
        debug!(reason, "refresh dropped, cycle in flight");
        emit_skip(event_tx, SkipReason::InFlight).await;
        return;
    }
    if busy_rx.borrow().is_busy() {
        debug!(reason, "refresh skipped, backend busy");
        emit_skip(event_tx, SkipReason::Busy).await;
        return;
    }
    if debounced {
        if let Some(started) = *last_cycle_start {
            if started.elapsed() < config.debounce {
                debug!(reason, "refresh coalesced into recent cycle");
                return;
            }
        }
    }

    debug!(reason, "starting primary refresh cycle");
    state.in_flight = true;
    *last_cycle_start = Some(Instant::now());
    spawn_cycle(controller, &PRIMARY_CHANNELS, done_tx);
}

fn spawn_cycle(
    controller: &FreshnessController,
    channels: &'static [Channel],
    done_tx: &mpsc::Sender<bool>,
) {
    let controller = controller.clone();
    let done_tx = done_tx.clone();
    tokio::spawn(async move {
        let delivered = controller.refresh_group(channels).await;
        let any_fresh = delivered.iter().any(Delivered::is_fresh);
        if done_tx.send(any_fresh).await.is_err() {
            warn!("scheduler dropped before cycle completion");
        }
    });
}

/// Independent long-period poller for one low-priority channel. Runs the
/// refresh inline, so the skipped-tick behavior of the interval is the
/// mutual exclusion: ticks elapsing mid-cycle are simply missed.
async fn background_loop(
    controller: FreshnessController,
    channel: Channel,
    interval: Duration,
    busy_rx: watch::Receiver<ProcessingState>,
    event_tx: mpsc::Sender<Event>,
    mut cancel_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The initial load already fetched this channel.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel_rx.recv() => {
                debug!(channel = %channel, "background poller shutdown");
                break;
            }
            _ = ticker.tick() => {
                if busy_rx.borrow().is_busy() {
                    debug!(channel = %channel, "background poll skipped, backend busy");
                    emit_skip(&event_tx, SkipReason::Busy).await;
                    continue;
                }
                controller.refresh(channel).await;
            }
        }
    }
}

async fn emit_skip(event_tx: &mpsc::Sender<Event>, reason: SkipReason) {
    if event_tx.send(Event::CycleSkipped { reason }).await.is_err() {
        debug!("event receiver dropped");
    }
}
