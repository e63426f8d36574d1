//! Source selection and display mapping
//!
//! [`render`] is a pure function of the store contents and the selected
//! source; it never reads the clock and never fails, so rendering the same
//! inputs twice yields identical payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapters::{fields, MetricValue, Metrics};
use crate::config::{AppKind, ApplicationConfig};
use crate::format;
use crate::store::{AppStatus, ApplicationSnapshot, StateStore};
use crate::NzbInfoError;

pub const OVERVIEW_ID: &str = "overview";
pub const OVERVIEW_NAME: &str = "System Overview";

const WAITING: &str = "Waiting for first update";
const NO_RECENT: &str = "No recent activity";

/// Order in which active queues are promoted to the overview
const PRIORITY: [AppKind; 6] = [
    AppKind::Sabnzbd,
    AppKind::Nzbget,
    AppKind::Sonarr,
    AppKind::Radarr,
    AppKind::Lidarr,
    AppKind::Readarr,
];

/// A view the UI can show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Source {
    Overview,
    Application(String),
}

impl Source {
    pub fn id(&self) -> &str {
        match self {
            Source::Overview => OVERVIEW_ID,
            Source::Application(id) => id,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Selectable entry as offered to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub name: String,
}

/// Currently selected source; defaults to the overview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub current_source: Source,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            current_source: Source::Overview,
        }
    }
}

/// Resolves user-facing source names and owns the selection
#[derive(Debug, Clone)]
pub struct SourceSelector {
    applications: Vec<(String, AppKind)>,
    state: SelectionState,
}

impl SourceSelector {
    pub fn new(configs: &[ApplicationConfig]) -> Self {
        let mut applications: Vec<(String, AppKind)> = configs
            .iter()
            .filter(|c| c.enabled)
            .map(|c| (c.id.clone(), c.kind))
            .collect();
        applications.sort_by_key(|(_, kind)| *kind);
        Self {
            applications,
            state: SelectionState::default(),
        }
    }

    pub fn current(&self) -> &Source {
        &self.state.current_source
    }

    /// Overview first, then every configured application
    pub fn sources(&self) -> Vec<SourceEntry> {
        std::iter::once(SourceEntry {
            id: OVERVIEW_ID.to_string(),
            name: OVERVIEW_NAME.to_string(),
        })
        .chain(self.applications.iter().map(|(id, kind)| SourceEntry {
            id: id.clone(),
            name: kind.display_name().to_string(),
        }))
        .collect()
    }

    /// Match an id, display name or overview alias, ignoring case
    pub fn resolve(&self, source: &str) -> Option<Source> {
        let wanted = source.trim();
        if ["overview", OVERVIEW_NAME]
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(wanted))
        {
            return Some(Source::Overview);
        }
        self.applications
            .iter()
            .find(|(id, kind)| {
                id.eq_ignore_ascii_case(wanted) || kind.display_name().eq_ignore_ascii_case(wanted)
            })
            .map(|(id, _)| Source::Application(id.clone()))
    }

    /// Switch the view; an unknown source leaves the selection untouched
    pub fn select(&mut self, source: &str) -> crate::Result<&Source> {
        let resolved = self
            .resolve(source)
            .ok_or_else(|| NzbInfoError::UnknownSource(source.to_string()))?;
        if resolved != self.state.current_source {
            tracing::info!("Switched view to {}", resolved);
        }
        self.state.current_source = resolved;
        Ok(&self.state.current_source)
    }
}

/// One overview row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub id: String,
    pub name: String,
    pub status: String,
    pub summary: String,
}

/// Everything the UI shows for the selected source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPayload {
    pub source: String,
    pub title: String,
    pub status_line: String,
    pub queue_summary: String,
    pub last_file: String,
    pub entries: Vec<DisplayEntry>,
}

pub fn render(store: &StateStore, source: &Source) -> DisplayPayload {
    match source {
        Source::Overview => render_overview(store),
        Source::Application(id) => render_application(store, id),
    }
}

fn render_overview(store: &StateStore) -> DisplayPayload {
    let configs = store.configs();
    if configs.is_empty() {
        return DisplayPayload {
            source: OVERVIEW_ID.to_string(),
            title: "No Applications".to_string(),
            status_line: "No apps configured".to_string(),
            queue_summary: "Add applications to the configuration".to_string(),
            last_file: NO_RECENT.to_string(),
            entries: Vec::new(),
        };
    }

    let overview = store.read_all();
    let snapshots: Vec<(AppKind, Option<ApplicationSnapshot>)> = configs
        .iter()
        .map(|c| (c.kind, store.read(&c.id)))
        .collect();

    let entries = configs
        .iter()
        .zip(&snapshots)
        .map(|(config, (_, snapshot))| DisplayEntry {
            id: config.id.clone(),
            name: config.kind.display_name().to_string(),
            status: snapshot
                .as_ref()
                .map(|s| s.status.to_string())
                .unwrap_or_else(|| "Pending".to_string()),
            summary: match snapshot {
                Some(s) => summary(config.kind, &s.metrics),
                None => WAITING.to_string(),
            },
        })
        .collect();

    let active = PRIORITY.iter().find_map(|kind| {
        snapshots.iter().find_map(|(k, snapshot)| match snapshot {
            Some(s) if k == kind && s.status == AppStatus::Online && has_active_queue(s) => {
                Some(s)
            }
            _ => None,
        })
    });
    let priority_line = match active {
        Some(s) => format!("{}: {}", s.kind.display_name(), summary(s.kind, &s.metrics)),
        None => "All applications monitored".to_string(),
    };

    // First last-file found in priority order, then kind order
    let priority_file = PRIORITY
        .iter()
        .chain(AppKind::ALL.iter())
        .find_map(|kind| {
            snapshots
                .iter()
                .find(|(k, _)| k == kind)
                .and_then(|(_, s)| s.as_ref())
                .and_then(|s| s.last_file.clone())
        });

    let pending = overview.entries.iter().filter(|e| e.status.is_none()).count();
    let failing = overview.total - overview.online - pending;
    let status_line = match (failing, pending) {
        (0, 0) => "All applications online".to_string(),
        (0, p) => format!("{} waiting for first update", p),
        (f, 0) => format!("{} with errors", f),
        (f, p) => format!("{} with errors, {} waiting for first update", f, p),
    };

    DisplayPayload {
        source: OVERVIEW_ID.to_string(),
        title: format!(
            "NZB Info Manager ({}/{} online)",
            overview.online, overview.total
        ),
        status_line,
        queue_summary: priority_line,
        last_file: priority_file
            .map(|f| format::format_recent_files(&[f]))
            .unwrap_or_else(|| NO_RECENT.to_string()),
        entries,
    }
}

fn render_application(store: &StateStore, id: &str) -> DisplayPayload {
    let Some(config) = store.configs().into_iter().find(|c| c.id == id) else {
        return DisplayPayload {
            source: id.to_string(),
            title: "Application not found".to_string(),
            status_line: "Not configured".to_string(),
            queue_summary: "Check configuration".to_string(),
            last_file: String::new(),
            entries: Vec::new(),
        };
    };

    let title = config.kind.display_name().to_string();
    let Some(snapshot) = store.read(id) else {
        return DisplayPayload {
            source: id.to_string(),
            title,
            status_line: "Pending".to_string(),
            queue_summary: WAITING.to_string(),
            last_file: NO_RECENT.to_string(),
            entries: Vec::new(),
        };
    };

    let status_line = match (&snapshot.status, &snapshot.last_error) {
        (AppStatus::Online, _) => AppStatus::Online.to_string(),
        (status, Some(error)) => format!("{}: {}", status, error),
        (status, None) => status.to_string(),
    };

    DisplayPayload {
        source: id.to_string(),
        title,
        status_line,
        queue_summary: summary(config.kind, &snapshot.metrics),
        last_file: recent_row(&snapshot),
        entries: Vec::new(),
    }
}

fn has_active_queue(snapshot: &ApplicationSnapshot) -> bool {
    matches!(
        snapshot.metrics.get(fields::QUEUE_COUNT),
        Some(MetricValue::Count(n)) if *n > 0
    )
}

fn count(metrics: &Metrics, key: &str) -> Option<u64> {
    match metrics.get(key) {
        Some(MetricValue::Count(n)) => Some(*n),
        _ => None,
    }
}

fn text<'a>(metrics: &'a Metrics, key: &str) -> Option<&'a str> {
    match metrics.get(key) {
        Some(MetricValue::Text(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Primary line for one application, built from whatever metrics are held
fn summary(kind: AppKind, metrics: &Metrics) -> String {
    if metrics.is_empty() {
        return "No data yet".to_string();
    }

    match kind {
        AppKind::Sabnzbd | AppKind::Nzbget => match count(metrics, fields::QUEUE_COUNT) {
            Some(0) => "Queue idle".to_string(),
            Some(n) => {
                let speed = text(metrics, fields::SPEED).unwrap_or("0 B/s");
                let noun = if n == 1 { "item" } else { "items" };
                match text(metrics, fields::ETA) {
                    Some(eta) => format!("Queue: {} {} @ {} ({})", n, noun, speed, eta),
                    None => format!("Queue: {} {} @ {}", n, noun, speed),
                }
            }
            None => match (count(metrics, fields::DOWNLOAD_RATE), text(metrics, fields::SPEED)) {
                (Some(0), _) => "Queue idle".to_string(),
                (_, Some(speed)) => format!("Downloading @ {}", speed),
                _ => "Queue unavailable".to_string(),
            },
        },
        AppKind::Sonarr | AppKind::Radarr | AppKind::Lidarr | AppKind::Readarr => {
            match text(metrics, fields::UPCOMING) {
                Some(next) => format!("Next: {}", next),
                None => "No upcoming releases".to_string(),
            }
        }
        AppKind::Bazarr => match count(metrics, fields::RECENT_COUNT) {
            Some(n) if n > 0 => "Subtitle downloads active".to_string(),
            _ => "Subtitle manager idle".to_string(),
        },
        AppKind::Overseerr => match count(metrics, fields::PENDING_COUNT) {
            Some(0) | None => "No pending requests".to_string(),
            Some(1) => "1 pending request".to_string(),
            Some(n) => format!("{} pending requests", n),
        },
    }
}

fn recent_row(snapshot: &ApplicationSnapshot) -> String {
    match snapshot.metrics.get(fields::RECENT) {
        Some(MetricValue::List(items)) if !items.is_empty() => format::format_recent_files(items),
        _ => match &snapshot.last_file {
            Some(file) => format::format_recent_files(std::slice::from_ref(file)),
            None => NO_RECENT.to_string(),
        },
    }
}
