//! SABnzbd adapter

use chrono::NaiveDate;
use serde::Deserialize;

use super::{fields, Adapter, AuthPlacement, Endpoint, Normalized, RawResponse};
use crate::config::AppKind;
use crate::format;

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: Queue,
}

#[derive(Debug, Deserialize)]
struct Queue {
    slots: Vec<QueueSlot>,
    speed: String,
    #[serde(default)]
    sizeleft: Option<String>,
    #[serde(default)]
    noofslots: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct QueueSlot {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: History,
}

#[derive(Debug, Deserialize)]
struct History {
    #[serde(default)]
    slots: Vec<HistorySlot>,
}

#[derive(Debug, Deserialize)]
struct HistorySlot {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug)]
pub struct SabnzbdAdapter;

impl Adapter for SabnzbdAdapter {
    fn kind(&self) -> AppKind {
        AppKind::Sabnzbd
    }

    fn auth(&self) -> AuthPlacement {
        AuthPlacement::Query("apikey")
    }

    fn health_endpoint(&self) -> Endpoint {
        Endpoint::get("version", "/api?mode=version&output=json")
    }

    fn endpoints(&self, _today: NaiveDate) -> Vec<Endpoint> {
        vec![
            Endpoint::get("queue", "/api?mode=queue&output=json"),
            Endpoint::get("history", "/api?mode=history&output=json&limit=2").optional(),
        ]
    }

    fn is_auth_error_body(&self, body: &str) -> bool {
        body.contains("API Key Incorrect") || body.contains("API Key Required")
    }

    fn normalize(&self, raw: &RawResponse, _today: NaiveDate) -> crate::Result<Normalized> {
        let QueueResponse { queue } = raw.required("queue")?;
        let mut out = Normalized::default();

        let queue_count = queue.noofslots.unwrap_or(queue.slots.len() as u64);
        out.count(fields::QUEUE_COUNT, queue_count);
        out.text(fields::SPEED, queue.speed.clone());

        if let Some(size_left) = &queue.sizeleft {
            out.text(fields::SIZE_LEFT, size_left.clone());
            if let Some(eta) = format::eta_from_strings(size_left, &queue.speed) {
                out.text(fields::ETA, eta);
            }
        }

        if let Some(current) = queue.slots.first() {
            out.text(
                fields::CURRENT_ITEM,
                current
                    .filename
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
            );
        }

        if let Some(HistoryResponse { history }) = raw.optional("history") {
            let recent: Vec<String> = history
                .slots
                .into_iter()
                .map(|slot| slot.name.unwrap_or_else(|| "Unknown".to_string()))
                .collect();
            out.last_file = recent.first().cloned();
            out.list(fields::RECENT, recent);
        }

        Ok(out)
    }
}
