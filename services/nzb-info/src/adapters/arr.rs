//! Sonarr, Radarr, Lidarr and Readarr share one API shape

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use super::{fields, Adapter, AuthPlacement, Endpoint, Normalized, RawResponse};
use crate::config::AppKind;
use crate::format;

const CALENDAR_DAYS: i64 = 7;
const UPCOMING_LABEL_LEN: usize = 25;

#[derive(Debug, Deserialize)]
struct SystemStatus {
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CalendarItem {
    monitored: bool,
    has_file: bool,
    title: Option<String>,
    year: Option<u32>,
    series: Option<Series>,
    series_title: Option<String>,
    season_number: Option<u32>,
    episode_number: Option<u32>,
    air_date: Option<String>,
    air_date_utc: Option<String>,
    in_cinemas: Option<String>,
    digital_release: Option<String>,
    physical_release: Option<String>,
    release_date: Option<String>,
    artist: Option<Artist>,
    author: Option<Author>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Series {
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Artist {
    artist_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Author {
    author_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Page {
    total_records: u64,
    records: Vec<HistoryRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HistoryRecord {
    source_title: Option<String>,
}

/// Adapter for the *arr family; the kind picks API version and calendar labels
#[derive(Debug)]
pub struct ArrAdapter {
    kind: AppKind,
}

impl ArrAdapter {
    pub const fn new(kind: AppKind) -> Self {
        Self { kind }
    }

    fn api_prefix(&self) -> &'static str {
        match self.kind {
            AppKind::Sonarr | AppKind::Radarr => "/api/v3",
            _ => "/api/v1",
        }
    }

    fn calendar_includes(&self) -> &'static str {
        match self.kind {
            AppKind::Sonarr => "&includeEpisode=true&includeSeries=true",
            AppKind::Lidarr => "&includeArtist=true",
            AppKind::Readarr => "&includeAuthor=true",
            _ => "",
        }
    }

    fn upcoming_label(&self, item: &CalendarItem, today: NaiveDate) -> String {
        let (title, date) = match self.kind {
            AppKind::Sonarr => {
                let series = item
                    .series
                    .as_ref()
                    .and_then(|s| s.title.clone())
                    .or_else(|| item.series_title.clone())
                    .unwrap_or_else(|| "Unknown Series".to_string());
                (
                    format!(
                        "{} S{:02}E{:02}",
                        series,
                        item.season_number.unwrap_or(0),
                        item.episode_number.unwrap_or(0)
                    ),
                    item.air_date.as_ref().or(item.air_date_utc.as_ref()),
                )
            }
            AppKind::Radarr => {
                let title = item.title.as_deref().unwrap_or("Unknown");
                let label = match item.year {
                    Some(year) => format!("{} ({})", title, year),
                    None => title.to_string(),
                };
                let date = item
                    .in_cinemas
                    .as_ref()
                    .or(item.digital_release.as_ref())
                    .or(item.physical_release.as_ref());
                (label, date)
            }
            AppKind::Lidarr => {
                let artist = item
                    .artist
                    .as_ref()
                    .and_then(|a| a.artist_name.as_deref())
                    .unwrap_or("Unknown Artist");
                let album = item.title.as_deref().unwrap_or("Unknown Album");
                (format!("{} - {}", artist, album), item.release_date.as_ref())
            }
            _ => {
                let author = item
                    .author
                    .as_ref()
                    .and_then(|a| a.author_name.as_deref())
                    .unwrap_or("Unknown Author");
                let book = item.title.as_deref().unwrap_or("Unknown Book");
                (format!("{} - {}", author, book), item.release_date.as_ref())
            }
        };

        let when = date
            .map(|d| format::format_upcoming_date(d, today))
            .unwrap_or_else(|| "Unknown".to_string());
        format!(
            "{} ({})",
            format::smart_truncate(&title, UPCOMING_LABEL_LEN),
            when
        )
    }
}

impl Adapter for ArrAdapter {
    fn kind(&self) -> AppKind {
        self.kind
    }

    fn auth(&self) -> AuthPlacement {
        AuthPlacement::Header("X-Api-Key")
    }

    fn health_endpoint(&self) -> Endpoint {
        Endpoint::get("status", format!("{}/system/status", self.api_prefix()))
    }

    fn endpoints(&self, today: NaiveDate) -> Vec<Endpoint> {
        let prefix = self.api_prefix();
        let end = today + Duration::days(CALENDAR_DAYS);
        vec![
            Endpoint::get("status", format!("{}/system/status", prefix)),
            Endpoint::get(
                "calendar",
                format!(
                    "{}/calendar?start={}&end={}{}",
                    prefix,
                    today.format("%Y-%m-%d"),
                    end.format("%Y-%m-%d"),
                    self.calendar_includes()
                ),
            ),
            Endpoint::get("queue", format!("{}/queue?pageSize=1", prefix)).optional(),
            Endpoint::get("missing", format!("{}/wanted/missing?pageSize=1", prefix)).optional(),
            Endpoint::get(
                "history",
                format!(
                    "{}/history?pageSize=2&sortKey=date&sortDirection=descending",
                    prefix
                ),
            )
            .optional(),
        ]
    }

    fn normalize(&self, raw: &RawResponse, today: NaiveDate) -> crate::Result<Normalized> {
        let status: SystemStatus = raw.required("status")?;
        let calendar: Vec<CalendarItem> = raw.required("calendar")?;
        let mut out = Normalized::default();

        out.text(fields::VERSION, status.version);

        let wanted: Vec<&CalendarItem> = calendar
            .iter()
            .filter(|item| item.monitored && !item.has_file)
            .collect();
        out.count(fields::UPCOMING_COUNT, wanted.len() as u64);
        if let Some(next) = wanted.first() {
            out.text(fields::UPCOMING, self.upcoming_label(next, today));
        }

        if let Some(queue) = raw.optional::<Page>("queue") {
            out.count(fields::QUEUE_COUNT, queue.total_records);
        }
        if let Some(missing) = raw.optional::<Page>("missing") {
            out.count(fields::MISSING_COUNT, missing.total_records);
        }
        if let Some(history) = raw.optional::<Page>("history") {
            let recent: Vec<String> = history
                .records
                .into_iter()
                .take(2)
                .filter_map(|r| r.source_title)
                .filter(|t| !t.is_empty() && t != "Unknown")
                .map(|t| format::clean_file_path(&t))
                .collect();
            out.last_file = recent.first().cloned();
            out.list(fields::RECENT, recent);
        }

        Ok(out)
    }
}
