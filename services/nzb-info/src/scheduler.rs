//! Poll scheduler: drives periodic probes of every configured application

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDate};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::adapters::{adapter_for, Adapter};
use crate::config::ApplicationConfig;
use crate::io::HttpClient;
use crate::probe::{self, ProbeResult};
use crate::store::{FailureKind, PollOutcome, StateHandle};

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks an application as being probed; released on drop, including abort
struct InFlightGuard {
    id: String,
    in_flight: InFlight,
}

impl InFlightGuard {
    fn acquire(in_flight: &InFlight, id: &str) -> Option<Self> {
        let mut set = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(id.to_string()) {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            in_flight: Arc::clone(in_flight),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Which applications a tick probed and which it had to skip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub launched: Vec<String>,
    pub skipped: Vec<String>,
}

/// Cloneable handle that wakes the scheduler for an immediate tick
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    notify: Arc<Notify>,
}

impl RefreshTrigger {
    pub fn request(&self) {
        self.notify.notify_one();
    }
}

/// Periodic driver for all application probes
pub struct Scheduler {
    http: Arc<dyn HttpClient>,
    state: StateHandle,
    interval: Duration,
    timeout: Duration,
    in_flight: InFlight,
    next_seq: AtomicU64,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Scheduler {
    pub fn new(
        http: Arc<dyn HttpClient>,
        state: StateHandle,
        interval: Duration,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            http,
            state,
            interval,
            timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            next_seq: AtomicU64::new(0),
            refresh: Arc::new(Notify::new()),
            cancel,
        }
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        RefreshTrigger {
            notify: Arc::clone(&self.refresh),
        }
    }

    /// Probe every application once and wait for all commits
    pub async fn tick(&self) -> TickReport {
        let mut tasks = JoinSet::new();
        let report = self.launch(&mut tasks).await;
        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }
        report
    }

    /// Tick on the configured interval until cancelled
    pub async fn run(&self) {
        tracing::info!(
            "Polling every {:?} (timeout {:?})",
            self.interval,
            self.timeout
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.launch(&mut tasks).await;
                }
                _ = self.refresh.notified() => {
                    tracing::debug!("Refresh requested");
                    self.launch(&mut tasks).await;
                    ticker.reset();
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join_error(joined);
                }
            }
        }

        tasks.abort_all();
        tracing::debug!("Scheduler stopped");
    }

    async fn launch(&self, tasks: &mut JoinSet<()>) -> TickReport {
        let configs = self.state.read().await.configs();
        let mut report = TickReport::default();

        for config in configs {
            let Some(guard) = InFlightGuard::acquire(&self.in_flight, &config.id) else {
                tracing::debug!("Skipping {}: previous probe still in flight", config.id);
                report.skipped.push(config.id);
                continue;
            };

            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
            report.launched.push(config.id.clone());

            let http = Arc::clone(&self.http);
            let state = Arc::clone(&self.state);
            let cancel = self.cancel.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let _guard = guard;
                poll_application(http, state, config, seq, timeout, cancel).await;
            });
        }

        report
    }
}

async fn poll_application(
    http: Arc<dyn HttpClient>,
    state: StateHandle,
    config: ApplicationConfig,
    seq: u64,
    timeout: Duration,
    cancel: CancellationToken,
) {
    let adapter = adapter_for(config.kind);
    let today = Local::now().date_naive();

    let result = tokio::select! {
        result = probe::probe(http.as_ref(), &config, adapter, timeout, today) => result,
        _ = cancel.cancelled() => {
            tracing::debug!("Abandoning probe of {}", config.id);
            return;
        }
    };

    let outcome = outcome_for(result, adapter, today);
    match &outcome {
        PollOutcome::Success(_) => tracing::debug!("Polled {} (seq {})", config.id, seq),
        PollOutcome::Failure { reason, .. } => {
            tracing::debug!("Poll of {} failed (seq {}): {}", config.id, seq, reason)
        }
    }

    if cancel.is_cancelled() {
        return;
    }
    state
        .write()
        .await
        .commit(&config.id, seq, outcome, current_epoch_ms());
}

/// Turn a probe result into a store commit, normalizing successful bodies
pub fn outcome_for(result: ProbeResult, adapter: &dyn Adapter, today: NaiveDate) -> PollOutcome {
    let reason = result.to_string();
    match result {
        ProbeResult::Success(raw) => match adapter.normalize(&raw, today) {
            Ok(normalized) => PollOutcome::Success(normalized),
            Err(e) => PollOutcome::failure(FailureKind::MalformedResponse, e.to_string()),
        },
        ProbeResult::Timeout => PollOutcome::failure(FailureKind::Timeout, reason),
        ProbeResult::AuthFailure(_) => PollOutcome::failure(FailureKind::AuthFailure, reason),
        ProbeResult::Unreachable(_) => PollOutcome::failure(FailureKind::Unreachable, reason),
        ProbeResult::HttpError(_) => PollOutcome::failure(FailureKind::HttpError, reason),
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::warn!("Probe task panicked: {}", e);
        }
    }
}

pub fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
