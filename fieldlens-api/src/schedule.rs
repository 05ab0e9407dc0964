//! # Refresh scheduling
//!
//! Decides *when* the display is recomputed. Two layers:
//!
//! - [`PollPolicy`] — the pure state machine (idle / polling / sleeping with
//!   a self-throttling run counter), testable without a runtime.
//! - [`RefreshScheduler`] — the tokio runner owning the interval timer, the
//!   [`HostEvent`] subscription, and the debounce window for widget
//!   observations. The only persistent background resource in the crate;
//!   teardown is deterministic from any state.
//!
//! The sleep rule exists so a document the user is not editing stops being
//! polled after a bounded number of idle ticks, while real edits (transaction
//! notifications, edit commits, content loads) wake polling instantly.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{POLL_INTERVAL_MIN_SECS, POLL_SLEEP_AFTER_RUNS, WIDGET_DEBOUNCE_MS};
use crate::host::HostEvent;

/// Scheduler lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Polling disabled (interval configured to 0).
    Idle,
    /// Ticking at the configured interval.
    Polling,
    /// Run threshold reached without external activity; waiting for a trigger.
    Sleeping,
}

/// The poll/sleep state machine.
///
/// Each tick increments a run counter; after [`POLL_SLEEP_AFTER_RUNS`]
/// consecutive ticks with no external trigger the policy sleeps. Any external
/// trigger resets the counter and wakes a sleeping policy. The trigger flag
/// is cleared at the start of each tick so the tick itself never counts.
#[derive(Debug)]
pub struct PollPolicy {
    state: PollState,
    runs: u32,
    external_since_tick: bool,
}

impl PollPolicy {
    pub fn new(polling_enabled: bool) -> Self {
        PollPolicy {
            state: if polling_enabled {
                PollState::Polling
            } else {
                PollState::Idle
            },
            runs: 0,
            external_since_tick: false,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Starts a poll tick. Returns false when not in the polling state
    /// (no redraw should run).
    pub fn tick_begin(&mut self) -> bool {
        if self.state != PollState::Polling {
            return false;
        }
        self.external_since_tick = false;
        self.runs += 1;
        true
    }

    /// Finishes a poll tick; transitions to sleeping when the run counter
    /// reaches the threshold and nothing external happened during the span.
    pub fn tick_end(&mut self) {
        if self.state == PollState::Polling
            && self.runs >= POLL_SLEEP_AFTER_RUNS
            && !self.external_since_tick
        {
            self.state = PollState::Sleeping;
            debug!(runs = self.runs, "poll scheduler going to sleep");
        }
    }

    /// Records an external trigger. Returns true when this woke the policy
    /// out of sleep (the runner restarts its timer in that case).
    pub fn external_trigger(&mut self) -> bool {
        self.external_since_tick = true;
        self.runs = 0;
        if self.state == PollState::Sleeping {
            self.state = PollState::Polling;
            debug!("poll scheduler woken by external trigger");
            return true;
        }
        false
    }
}

/// Why a redraw is being requested. Passed to the redraw callback so the
/// controller can update session state first (e.g. the new document id).
#[derive(Debug, Clone)]
pub enum RefreshCause {
    /// Periodic poll tick.
    Poll,
    /// The user navigated to another document.
    DocumentSwitch(String),
    /// An inline edit was saved.
    EditSaved,
    /// Coalesced widget-appearance observations.
    WidgetObserved,
}

/// The async redraw routine invoked by the scheduler.
pub type RedrawFn = Arc<dyn Fn(RefreshCause) -> BoxFuture<'static, ()> + Send + Sync>;

/// Clamps a configured poll interval: 0 disables polling entirely,
/// 1-4 seconds are raised to the 5 second minimum.
pub fn effective_interval(secs: u64) -> Option<Duration> {
    match secs {
        0 => None,
        secs => Some(Duration::from_secs(secs.max(POLL_INTERVAL_MIN_SECS))),
    }
}

/// Owns the poll timer and the host-event subscription.
pub struct RefreshScheduler {
    events_tx: mpsc::UnboundedSender<HostEvent>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Spawns the scheduler task. `interval_secs` follows the settings
    /// contract (0 = disabled, minimum 5). Redraws are executed one at a
    /// time inside the task, never concurrently.
    pub fn spawn(interval_secs: u64, redraw: RedrawFn) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let interval = effective_interval(interval_secs);
        let handle = tokio::spawn(run(interval, events_rx, redraw));
        RefreshScheduler {
            events_tx,
            handle: Some(handle),
        }
    }

    /// Handle for feeding host events into the scheduler. Clone freely.
    pub fn sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.events_tx.clone()
    }

    /// Feeds one host event. Events arriving after shutdown are dropped.
    pub fn notify(&self, event: HostEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Cancels the poll timer and the event subscription, from any state.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("refresh scheduler stopped");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run(
    interval: Option<Duration>,
    mut events_rx: mpsc::UnboundedReceiver<HostEvent>,
    redraw: RedrawFn,
) {
    let mut policy = PollPolicy::new(interval.is_some());
    let period = interval.unwrap_or(Duration::from_secs(3600));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    // Debounce timer for widget observations; armed on demand.
    let debounce = tokio::time::sleep(Duration::from_secs(3600));
    tokio::pin!(debounce);
    let mut debounce_armed = false;

    loop {
        tokio::select! {
            _ = ticker.tick(), if interval.is_some() && policy.state() == PollState::Polling => {
                if policy.tick_begin() {
                    redraw(RefreshCause::Poll).await;
                    policy.tick_end();
                }
            }
            () = &mut debounce, if debounce_armed => {
                debounce_armed = false;
                redraw(RefreshCause::WidgetObserved).await;
            }
            event = events_rx.recv() => {
                let Some(event) = event else {
                    // all senders dropped - host is gone
                    break;
                };
                if event.is_external_trigger() && policy.external_trigger() {
                    // woke from sleep: restart the tick cadence from now
                    ticker = tokio::time::interval_at(
                        tokio::time::Instant::now() + period,
                        period,
                    );
                }
                match event {
                    HostEvent::DocumentSwitched { doc_id } => {
                        redraw(RefreshCause::DocumentSwitch(doc_id)).await;
                    }
                    HostEvent::EditCommitted => {
                        redraw(RefreshCause::EditSaved).await;
                    }
                    HostEvent::WidgetAppeared => {
                        debounce.as_mut().reset(
                            tokio::time::Instant::now()
                                + Duration::from_millis(WIDGET_DEBOUNCE_MS),
                        );
                        debounce_armed = true;
                    }
                    HostEvent::ContentLoaded | HostEvent::Transactions(_) => {
                        // wake/reset only; the next poll tick redraws
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_policy_sleeps_after_threshold() {
        let mut policy = PollPolicy::new(true);
        for _ in 0..POLL_SLEEP_AFTER_RUNS {
            assert!(policy.tick_begin());
            policy.tick_end();
        }
        assert_eq!(policy.state(), PollState::Sleeping);
        // no further ticks run while sleeping
        assert!(!policy.tick_begin());
    }

    #[test]
    fn test_external_trigger_resets_counter() {
        let mut policy = PollPolicy::new(true);
        for _ in 0..POLL_SLEEP_AFTER_RUNS - 1 {
            policy.tick_begin();
            policy.tick_end();
        }
        assert_eq!(policy.state(), PollState::Polling);
        policy.external_trigger();
        assert_eq!(policy.runs(), 0);

        // the span starts over: one more tick is nowhere near sleep
        policy.tick_begin();
        policy.tick_end();
        assert_eq!(policy.state(), PollState::Polling);
    }

    #[test]
    fn test_trigger_during_tick_prevents_sleep() {
        let mut policy = PollPolicy::new(true);
        for _ in 0..POLL_SLEEP_AFTER_RUNS - 1 {
            policy.tick_begin();
            policy.tick_end();
        }
        // trigger lands while the final tick's redraw is in flight
        assert!(policy.tick_begin());
        policy.external_trigger();
        policy.tick_end();
        assert_eq!(policy.state(), PollState::Polling);
    }

    #[test]
    fn test_wake_from_sleep() {
        let mut policy = PollPolicy::new(true);
        for _ in 0..POLL_SLEEP_AFTER_RUNS {
            policy.tick_begin();
            policy.tick_end();
        }
        assert_eq!(policy.state(), PollState::Sleeping);
        assert!(policy.external_trigger());
        assert_eq!(policy.state(), PollState::Polling);
        assert_eq!(policy.runs(), 0);
    }

    #[test]
    fn test_disabled_policy_never_ticks() {
        let mut policy = PollPolicy::new(false);
        assert_eq!(policy.state(), PollState::Idle);
        assert!(!policy.tick_begin());
        // a trigger doesn't enable polling that was never configured
        policy.external_trigger();
        assert_eq!(policy.state(), PollState::Idle);
    }

    #[test]
    fn test_effective_interval_clamp() {
        assert_eq!(effective_interval(0), None);
        assert_eq!(effective_interval(3), Some(Duration::from_secs(5)));
        assert_eq!(effective_interval(5), Some(Duration::from_secs(5)));
        assert_eq!(effective_interval(30), Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_polls_then_sleeps() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let redraw: RedrawFn = Arc::new(move |_cause| {
            let seen = seen.clone();
            Box::pin(async move {
                seen.fetch_add(1, Ordering::SeqCst);
            })
        });
        let scheduler = RefreshScheduler::spawn(5, redraw);

        // well past the sleep threshold; only the first 10 ticks redraw
        tokio::time::sleep(Duration::from_secs(5 * 30)).await;
        assert_eq!(count.load(Ordering::SeqCst), POLL_SLEEP_AFTER_RUNS as usize);

        // an external trigger wakes polling back up
        scheduler.notify(HostEvent::ContentLoaded);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(
            count.load(Ordering::SeqCst),
            POLL_SLEEP_AFTER_RUNS as usize + 1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_debounces_widget_observations() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let redraw: RedrawFn = Arc::new(move |cause| {
            let seen = seen.clone();
            Box::pin(async move {
                if matches!(cause, RefreshCause::WidgetObserved) {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })
        });
        let scheduler = RefreshScheduler::spawn(0, redraw);

        // a burst of observations coalesces into a single redraw
        for _ in 0..5 {
            scheduler.notify(HostEvent::WidgetAppeared);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
