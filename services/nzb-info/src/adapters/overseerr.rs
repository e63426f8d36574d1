//! Overseerr adapter

use chrono::NaiveDate;
use serde::Deserialize;

use super::{fields, Adapter, AuthPlacement, Endpoint, Normalized, RawResponse};
use crate::config::AppKind;
use crate::format;

/// Overseerr request status code for "pending approval"
const STATUS_PENDING: u64 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestPage {
    #[serde(default)]
    page_info: Option<PageInfo>,
    results: Vec<MediaRequest>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MediaRequest {
    #[serde(default)]
    status: u64,
    #[serde(rename = "type", default)]
    media_type: Option<String>,
    #[serde(default)]
    media: Option<Media>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Media {
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
}

impl MediaRequest {
    fn label(&self) -> String {
        let media = self.media.as_ref();
        if self.media_type.as_deref() == Some("movie") {
            let title = media
                .and_then(|m| m.title.as_deref())
                .unwrap_or("Unknown Movie");
            match media
                .and_then(|m| m.release_date.as_deref())
                .and_then(|d| d.get(..4))
            {
                Some(year) => format!("{} ({})", title, year),
                None => title.to_string(),
            }
        } else {
            media
                .and_then(|m| m.name.as_deref().or(m.title.as_deref()))
                .unwrap_or("Unknown Show")
                .to_string()
        }
    }
}

#[derive(Debug)]
pub struct OverseerrAdapter;

impl Adapter for OverseerrAdapter {
    fn kind(&self) -> AppKind {
        AppKind::Overseerr
    }

    fn auth(&self) -> AuthPlacement {
        AuthPlacement::Header("X-Api-Key")
    }

    fn health_endpoint(&self) -> Endpoint {
        Endpoint::get("status", "/api/v1/status")
    }

    fn endpoints(&self, _today: NaiveDate) -> Vec<Endpoint> {
        vec![Endpoint::get("requests", "/api/v1/request?take=5&sort=added")]
    }

    fn normalize(&self, raw: &RawResponse, _today: NaiveDate) -> crate::Result<Normalized> {
        let page: RequestPage = raw.required("requests")?;
        let mut out = Normalized::default();

        let pending = page
            .results
            .iter()
            .filter(|r| r.status == STATUS_PENDING)
            .count();
        let total = page
            .page_info
            .and_then(|p| p.results)
            .unwrap_or(page.results.len() as u64);
        out.count(fields::PENDING_COUNT, pending as u64);
        out.count(fields::REQUEST_COUNT, total);

        let recent: Vec<String> = page
            .results
            .iter()
            .take(2)
            .map(|r| format::smart_truncate(&r.label(), 30))
            .collect();
        out.last_file = recent.first().cloned();
        out.list(fields::RECENT, recent);

        Ok(out)
    }
}
