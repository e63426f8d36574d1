//! NZBGet adapter (JSON-RPC)

use chrono::NaiveDate;
use serde::Deserialize;

use super::{fields, Adapter, AuthPlacement, Endpoint, Normalized, RawResponse};
use crate::config::AppKind;
use crate::format;

const JSONRPC_PATH: &str = "/jsonrpc";

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "DownloadRate")]
    download_rate: f64,
    #[serde(rename = "RemainingSizeMB", default)]
    remaining_size_mb: f64,
}

#[derive(Debug, Deserialize)]
struct Group {
    #[serde(rename = "NZBName", default)]
    nzb_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(rename = "Name", default)]
    name: Option<String>,
}

#[derive(Debug)]
pub struct NzbgetAdapter;

impl Adapter for NzbgetAdapter {
    fn kind(&self) -> AppKind {
        AppKind::Nzbget
    }

    fn auth(&self) -> AuthPlacement {
        AuthPlacement::Basic
    }

    fn health_endpoint(&self) -> Endpoint {
        Endpoint::json_rpc("version", JSONRPC_PATH, "version")
    }

    fn endpoints(&self, _today: NaiveDate) -> Vec<Endpoint> {
        vec![
            Endpoint::json_rpc("status", JSONRPC_PATH, "status"),
            Endpoint::json_rpc("listgroups", JSONRPC_PATH, "listgroups").optional(),
            Endpoint::json_rpc("history", JSONRPC_PATH, "history").optional(),
        ]
    }

    fn normalize(&self, raw: &RawResponse, _today: NaiveDate) -> crate::Result<Normalized> {
        let RpcResponse { result: status } = raw.required::<RpcResponse<Status>>("status")?;
        let mut out = Normalized::default();

        let rate = status.download_rate.max(0.0);
        let speed_mb = rate / 1024.0 / 1024.0;
        out.count(fields::DOWNLOAD_RATE, rate as u64);
        out.text(fields::SPEED, format!("{:.1} MB/s", speed_mb));
        out.count(fields::REMAINING_MB, status.remaining_size_mb.max(0.0) as u64);

        if speed_mb > 0.0 && status.remaining_size_mb > 0.0 {
            out.text(
                fields::ETA,
                format::format_eta_minutes(status.remaining_size_mb / speed_mb / 60.0),
            );
        }

        if let Some(RpcResponse { result: groups }) =
            raw.optional::<RpcResponse<Vec<Group>>>("listgroups")
        {
            out.count(fields::QUEUE_COUNT, groups.len() as u64);
            if let Some(first) = groups.into_iter().next() {
                out.text(
                    fields::CURRENT_ITEM,
                    first.nzb_name.unwrap_or_else(|| "Unknown".to_string()),
                );
            }
        }

        if let Some(RpcResponse { result: history }) =
            raw.optional::<RpcResponse<Vec<HistoryItem>>>("history")
        {
            let recent: Vec<String> = history
                .into_iter()
                .take(2)
                .map(|item| item.name.unwrap_or_else(|| "Unknown".to_string()))
                .collect();
            out.last_file = recent.first().cloned();
            out.list(fields::RECENT, recent);
        }

        Ok(out)
    }
}
