//! Aggregated application state
//!
//! The store exclusively owns the latest snapshot of every configured
//! application. The scheduler is the only writer; the presentation layer and
//! the remote surface read cloned snapshots through [`StateHandle`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::adapters::{Metrics, Normalized};
use crate::config::{AppKind, ApplicationConfig};

/// Consecutive failures after which a warning is logged
pub const FAILURE_WARNING_THRESHOLD: u32 = 5;

/// Reachability of one application as of its latest poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    Online,
    Offline,
    AuthError,
    Unreachable,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppStatus::Online => "Online",
            AppStatus::Offline => "Offline",
            AppStatus::AuthError => "Auth Error",
            AppStatus::Unreachable => "Unreachable",
        };
        f.write_str(label)
    }
}

/// Why a poll did not produce fresh metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Timeout,
    AuthFailure,
    Unreachable,
    HttpError,
    MalformedResponse,
}

impl FailureKind {
    pub fn status(&self) -> AppStatus {
        match self {
            FailureKind::Timeout | FailureKind::HttpError => AppStatus::Offline,
            FailureKind::AuthFailure => AppStatus::AuthError,
            FailureKind::Unreachable | FailureKind::MalformedResponse => AppStatus::Unreachable,
        }
    }
}

/// Result of one poll as committed to the store
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Success(Normalized),
    Failure { kind: FailureKind, reason: String },
}

impl PollOutcome {
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        PollOutcome::Failure {
            kind,
            reason: reason.into(),
        }
    }
}

/// Latest known state of one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub application_id: String,
    pub kind: AppKind,
    pub status: AppStatus,
    pub fetched_at_epoch_ms: u64,
    pub metrics: Metrics,
    pub last_file: Option<String>,
    pub last_error: Option<String>,
    pub last_success_epoch_ms: Option<u64>,
}

/// Overview row for one configured application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewEntry {
    pub id: String,
    pub kind: AppKind,
    /// Absent until the first poll commits
    pub status: Option<AppStatus>,
}

/// Derived summary over all configured applications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewSnapshot {
    pub entries: Vec<OverviewEntry>,
    pub online: usize,
    pub total: usize,
}

#[derive(Debug)]
struct Slot {
    config: ApplicationConfig,
    snapshot: Option<ApplicationSnapshot>,
    applied_seq: Option<u64>,
    consecutive_failures: u32,
}

impl Slot {
    fn new(config: ApplicationConfig) -> Self {
        Self {
            config,
            snapshot: None,
            applied_seq: None,
            consecutive_failures: 0,
        }
    }
}

/// Owner of every application snapshot
#[derive(Debug, Default)]
pub struct StateStore {
    slots: BTreeMap<String, Slot>,
}

impl StateStore {
    pub fn new(configs: &[ApplicationConfig]) -> Self {
        let mut store = Self::default();
        store.reconcile(configs);
        store
    }

    /// Apply one poll result. Returns false when the commit was ignored
    /// because the id is unknown or a newer commit was already applied.
    pub fn commit(&mut self, id: &str, seq: u64, outcome: PollOutcome, at_ms: u64) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            tracing::debug!("Ignoring commit for unconfigured application {}", id);
            return false;
        };

        if slot.applied_seq.is_some_and(|applied| seq < applied) {
            tracing::debug!(
                "Ignoring stale commit for {} (seq {} < {:?})",
                id,
                seq,
                slot.applied_seq
            );
            return false;
        }
        slot.applied_seq = Some(seq);

        match outcome {
            PollOutcome::Success(normalized) => {
                if slot.consecutive_failures > 0 {
                    tracing::info!(
                        "{} recovered after {} failed polls",
                        id,
                        slot.consecutive_failures
                    );
                }
                slot.consecutive_failures = 0;
                slot.snapshot = Some(ApplicationSnapshot {
                    application_id: id.to_string(),
                    kind: slot.config.kind,
                    status: AppStatus::Online,
                    fetched_at_epoch_ms: at_ms,
                    metrics: normalized.metrics,
                    last_file: normalized.last_file,
                    last_error: None,
                    last_success_epoch_ms: Some(at_ms),
                });
            }
            PollOutcome::Failure { kind, reason } => {
                slot.consecutive_failures += 1;
                if slot.consecutive_failures == FAILURE_WARNING_THRESHOLD {
                    tracing::warn!(
                        "{} has failed {} consecutive polls: {}",
                        id,
                        slot.consecutive_failures,
                        reason
                    );
                }

                let app_kind = slot.config.kind;
                let snapshot = slot.snapshot.get_or_insert_with(|| ApplicationSnapshot {
                    application_id: id.to_string(),
                    kind: app_kind,
                    status: kind.status(),
                    fetched_at_epoch_ms: at_ms,
                    metrics: Metrics::new(),
                    last_file: None,
                    last_error: None,
                    last_success_epoch_ms: None,
                });
                snapshot.status = kind.status();
                snapshot.fetched_at_epoch_ms = at_ms;
                snapshot.last_error = Some(reason);
            }
        }
        true
    }

    pub fn read(&self, id: &str) -> Option<ApplicationSnapshot> {
        self.slots.get(id).and_then(|slot| slot.snapshot.clone())
    }

    pub fn read_all(&self) -> OverviewSnapshot {
        let mut entries: Vec<OverviewEntry> = self
            .slots
            .values()
            .map(|slot| OverviewEntry {
                id: slot.config.id.clone(),
                kind: slot.config.kind,
                status: slot.snapshot.as_ref().map(|s| s.status),
            })
            .collect();
        entries.sort_by_key(|e| e.kind);
        let online = entries
            .iter()
            .filter(|e| e.status == Some(AppStatus::Online))
            .count();
        OverviewSnapshot {
            total: entries.len(),
            online,
            entries,
        }
    }

    /// Replace the configured set, dropping snapshots of removed or disabled apps
    pub fn reconcile(&mut self, configs: &[ApplicationConfig]) {
        let mut incoming: HashMap<&str, &ApplicationConfig> = configs
            .iter()
            .filter(|c| c.enabled)
            .map(|c| (c.id.as_str(), c))
            .collect();

        self.slots.retain(|id, slot| match incoming.remove(id.as_str()) {
            Some(config) if config.kind == slot.config.kind => {
                slot.config = config.clone();
                true
            }
            _ => {
                tracing::debug!("Dropping state for {}", id);
                false
            }
        });

        for (id, config) in incoming {
            self.slots.insert(id.to_string(), Slot::new(config.clone()));
        }
    }

    /// Configured applications in kind order
    pub fn configs(&self) -> Vec<ApplicationConfig> {
        let mut configs: Vec<ApplicationConfig> =
            self.slots.values().map(|s| s.config.clone()).collect();
        configs.sort_by_key(|c| c.kind);
        configs
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn consecutive_failures(&self, id: &str) -> u32 {
        self.slots
            .get(id)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0)
    }
}

/// Thread-safe shared store handle
pub type StateHandle = Arc<RwLock<StateStore>>;

pub fn new_state_handle(configs: &[ApplicationConfig]) -> StateHandle {
    Arc::new(RwLock::new(StateStore::new(configs)))
}
