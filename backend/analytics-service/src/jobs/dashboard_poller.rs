//! Dashboard Poller Background Job
//!
//! Keeps the published dashboard views current:
//!
//! 1. Loads the views once at startup
//! 2. Re-reads the collections every poll interval while auto-refresh is on
//!    (the data access layer decides whether that hits the source or the cache)
//! 3. Runs a forced refresh of all collections on request
//!
//! One task runs every cycle, so publications are strictly ordered and each
//! carries a generation one higher than the last. A failed cycle leaves the
//! last good views in place and records the error next to them.

use crate::config::Config;
use crate::metrics;
use crate::services::dashboard::DashboardViews;
use crate::services::data_access::DataAccessLayer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Configuration for the poller
#[derive(Debug, Clone)]
pub struct DashboardPollerConfig {
    pub poll_interval: Duration,
    pub auto_refresh: bool,
    pub top_users_limit: usize,
}

impl From<&Config> for DashboardPollerConfig {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.polling.interval,
            auto_refresh: config.polling.auto_refresh,
            top_users_limit: config.dashboard.top_users_limit,
        }
    }
}

/// What the presentation layer reads
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Last successfully computed views
    pub views: Option<Arc<DashboardViews>>,
    /// Error of the most recent cycle, cleared by the next success
    pub last_error: Option<String>,
    pub failed_cycles: u64,
}

impl DashboardState {
    pub fn generation(&self) -> u64 {
        self.views.as_ref().map(|v| v.generation).unwrap_or(0)
    }

    /// Nothing to show yet and nothing has gone wrong
    pub fn is_loading(&self) -> bool {
        self.views.is_none() && self.last_error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Initial,
    Poll,
    Manual,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::Poll => "poll",
            Trigger::Manual => "manual",
        }
    }
}

/// Control surface for a running poller
///
/// Dropping the handle stops the poller.
pub struct DashboardHandle {
    state: watch::Receiver<DashboardState>,
    refresh: Arc<Notify>,
    auto_refresh: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
}

impl DashboardHandle {
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.clone()
    }

    pub fn current(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Request a forced refresh; requests made while a cycle runs are queued
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn auto_refresh(&self) -> bool {
        *self.auto_refresh.borrow()
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.auto_refresh.send_replace(enabled);
    }

    /// Flip auto-refresh, returning the new setting
    pub fn toggle_auto_refresh(&self) -> bool {
        let enabled = !self.auto_refresh();
        self.set_auto_refresh(enabled);
        enabled
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Start the poller on the current runtime
pub fn spawn_dashboard_poller(
    dal: Arc<DataAccessLayer>,
    config: DashboardPollerConfig,
) -> (DashboardHandle, JoinHandle<()>) {
    let (state_tx, state_rx) = watch::channel(DashboardState::default());
    let (auto_tx, auto_rx) = watch::channel(config.auto_refresh);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh = Arc::new(Notify::new());

    let poller = DashboardPoller {
        dal,
        config,
        state: state_tx,
        generation: 0,
    };
    let task = tokio::spawn(poller.run(Arc::clone(&refresh), auto_rx, shutdown_rx));

    let handle = DashboardHandle {
        state: state_rx,
        refresh,
        auto_refresh: auto_tx,
        shutdown: shutdown_tx,
    };

    (handle, task)
}

struct DashboardPoller {
    dal: Arc<DataAccessLayer>,
    config: DashboardPollerConfig,
    state: watch::Sender<DashboardState>,
    generation: u64,
}

impl DashboardPoller {
    async fn run(
        mut self,
        refresh: Arc<Notify>,
        mut auto_rx: watch::Receiver<bool>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut auto_refresh = *auto_rx.borrow_and_update();

        tracing::info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            auto_refresh,
            top_users_limit = self.config.top_users_limit,
            "Starting dashboard poller"
        );

        self.run_cycle(Trigger::Initial).await;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.reset();

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                changed = auto_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    auto_refresh = *auto_rx.borrow_and_update();
                    if auto_refresh {
                        ticker.reset();
                    }
                    tracing::info!(auto_refresh, "Dashboard auto-refresh toggled");
                }
                _ = refresh.notified() => {
                    self.run_cycle(Trigger::Manual).await;
                }
                _ = ticker.tick(), if auto_refresh => {
                    self.run_cycle(Trigger::Poll).await;
                }
            }
        }

        tracing::info!(generation = self.generation, "Dashboard poller stopped");
    }

    async fn run_cycle(&mut self, trigger: Trigger) {
        let cycle_start = Instant::now();

        let snapshot = match trigger {
            Trigger::Manual => self.dal.refresh_all().await,
            Trigger::Initial | Trigger::Poll => self.dal.snapshot().await,
        };

        match snapshot {
            Ok(snapshot) => {
                self.generation += 1;
                let mut views = DashboardViews::compute(&snapshot, self.config.top_users_limit);
                views.generation = self.generation;
                let views = Arc::new(views);

                self.state.send_modify(|state| {
                    state.views = Some(views);
                    state.last_error = None;
                });

                metrics::record_refresh_cycle(trigger.as_str(), true);
                metrics::set_views_generation(self.generation);

                tracing::info!(
                    trigger = trigger.as_str(),
                    generation = self.generation,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Dashboard views published"
                );
            }
            Err(e) => {
                self.state.send_modify(|state| {
                    state.last_error = Some(e.to_string());
                    state.failed_cycles += 1;
                });

                metrics::record_refresh_cycle(trigger.as_str(), false);

                tracing::warn!(
                    trigger = trigger.as_str(),
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Dashboard refresh cycle failed"
                );
            }
        }
    }
}
