//! Backend adapters
//!
//! One adapter per application family. An adapter knows which endpoints to
//! request, where the API key goes, and how to turn the response bodies into
//! [`Normalized`] metrics. Adapters never perform I/O; the probe fetches the
//! bodies and hands them over as a [`RawResponse`].

pub mod arr;
pub mod bazarr;
pub mod nzbget;
pub mod overseerr;
pub mod sabnzbd;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AppKind;
use crate::NzbInfoError;

/// Metric keys shared between adapters and the presentation mapper
pub mod fields {
    pub const QUEUE_COUNT: &str = "queue_count";
    pub const SPEED: &str = "speed";
    pub const SIZE_LEFT: &str = "size_left";
    pub const DOWNLOAD_RATE: &str = "download_rate";
    pub const REMAINING_MB: &str = "remaining_mb";
    pub const CURRENT_ITEM: &str = "current_item";
    pub const ETA: &str = "eta";
    pub const RECENT: &str = "recent";
    pub const VERSION: &str = "version";
    pub const UPCOMING: &str = "upcoming";
    pub const UPCOMING_COUNT: &str = "upcoming_count";
    pub const MISSING_COUNT: &str = "missing_count";
    pub const RECENT_COUNT: &str = "recent_count";
    pub const LANGUAGES: &str = "languages";
    pub const MISSING_EPISODES: &str = "missing_episodes";
    pub const MISSING_MOVIES: &str = "missing_movies";
    pub const PENDING_COUNT: &str = "pending_count";
    pub const REQUEST_COUNT: &str = "request_count";
}

/// A single normalized value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{}", n),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

pub type Metrics = BTreeMap<String, MetricValue>;

/// Adapter output: the kind-specific metrics plus the most recent completed item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub metrics: Metrics,
    pub last_file: Option<String>,
}

impl Normalized {
    pub fn count(&mut self, key: &str, value: u64) {
        self.metrics
            .insert(key.to_string(), MetricValue::Count(value));
    }

    pub fn text(&mut self, key: &str, value: impl Into<String>) {
        self.metrics
            .insert(key.to_string(), MetricValue::Text(value.into()));
    }

    pub fn list(&mut self, key: &str, values: Vec<String>) {
        self.metrics.insert(key.to_string(), MetricValue::List(values));
    }
}

/// How a request is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMethod {
    Get,
    /// POST to the path with a JSON-RPC body calling the named method
    JsonRpc(&'static str),
}

/// One HTTP request an adapter needs per poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: &'static str,
    pub method: EndpointMethod,
    /// Path and query relative to the application's base URL, without the API key
    pub path: String,
    /// A failed required endpoint fails the whole probe
    pub required: bool,
}

impl Endpoint {
    pub fn get(name: &'static str, path: impl Into<String>) -> Self {
        Self {
            name,
            method: EndpointMethod::Get,
            path: path.into(),
            required: true,
        }
    }

    pub fn json_rpc(name: &'static str, path: impl Into<String>, method: &'static str) -> Self {
        Self {
            name,
            method: EndpointMethod::JsonRpc(method),
            path: path.into(),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Where the API key is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlacement {
    Query(&'static str),
    Header(&'static str),
    /// HTTP basic auth from the configured username and password
    Basic,
}

/// Response bodies of one probe, keyed by endpoint name
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    bodies: BTreeMap<&'static str, String>,
}

impl RawResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, body: impl Into<String>) -> Self {
        self.insert(name, body);
        self
    }

    pub fn insert(&mut self, name: &'static str, body: impl Into<String>) {
        self.bodies.insert(name, body.into());
    }

    pub fn body(&self, name: &str) -> Option<&str> {
        self.bodies.get(name).map(String::as_str)
    }

    /// Parse a body that must be present and well formed
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> crate::Result<T> {
        let body = self.body(name).ok_or_else(|| {
            NzbInfoError::MalformedResponse(format!("missing {} response", name))
        })?;
        serde_json::from_str(body)
            .map_err(|e| NzbInfoError::MalformedResponse(format!("{}: {}", name, e)))
    }

    /// Parse a body whose absence or damage only drops its metrics
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let body = self.body(name)?;
        match serde_json::from_str(body) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!("Ignoring unparseable {} response: {}", name, e);
                None
            }
        }
    }
}

/// Translator from one application's API to the common snapshot shape
pub trait Adapter: Send + Sync + fmt::Debug {
    fn kind(&self) -> AppKind;

    fn auth(&self) -> AuthPlacement;

    /// Lightweight request used by the connectivity check
    fn health_endpoint(&self) -> Endpoint;

    /// Requests issued on every poll, in order
    fn endpoints(&self, today: NaiveDate) -> Vec<Endpoint>;

    /// Some applications answer a bad key with 200 and an error body
    fn is_auth_error_body(&self, _body: &str) -> bool {
        false
    }

    fn normalize(&self, raw: &RawResponse, today: NaiveDate) -> crate::Result<Normalized>;
}

static SABNZBD: sabnzbd::SabnzbdAdapter = sabnzbd::SabnzbdAdapter;
static NZBGET: nzbget::NzbgetAdapter = nzbget::NzbgetAdapter;
static SONARR: arr::ArrAdapter = arr::ArrAdapter::new(AppKind::Sonarr);
static RADARR: arr::ArrAdapter = arr::ArrAdapter::new(AppKind::Radarr);
static LIDARR: arr::ArrAdapter = arr::ArrAdapter::new(AppKind::Lidarr);
static READARR: arr::ArrAdapter = arr::ArrAdapter::new(AppKind::Readarr);
static BAZARR: bazarr::BazarrAdapter = bazarr::BazarrAdapter;
static OVERSEERR: overseerr::OverseerrAdapter = overseerr::OverseerrAdapter;

/// Dispatch table keyed by application kind
pub fn adapter_for(kind: AppKind) -> &'static dyn Adapter {
    match kind {
        AppKind::Sabnzbd => &SABNZBD,
        AppKind::Nzbget => &NZBGET,
        AppKind::Sonarr => &SONARR,
        AppKind::Radarr => &RADARR,
        AppKind::Lidarr => &LIDARR,
        AppKind::Readarr => &READARR,
        AppKind::Bazarr => &BAZARR,
        AppKind::Overseerr => &OVERSEERR,
    }
}
