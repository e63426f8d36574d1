//! Remote UI surface: HTML status page and JSON API

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::presentation::{self, DisplayPayload, SourceEntry, SourceSelector};
use crate::scheduler::RefreshTrigger;
use crate::store::StateHandle;

/// Shared handle to the current source selection
pub type SelectionHandle = Arc<RwLock<SourceSelector>>;

/// Router state
#[derive(Clone)]
pub struct RemoteState {
    pub store: StateHandle,
    pub selection: SelectionHandle,
    pub refresh: Option<RefreshTrigger>,
    /// Page auto-refresh cadence, matching the poll interval
    pub refresh_seconds: u64,
}

impl RemoteState {
    pub fn new(store: StateHandle, selection: SelectionHandle, refresh_seconds: u64) -> Self {
        Self {
            store,
            selection,
            refresh: None,
            refresh_seconds,
        }
    }

    pub fn with_refresh(mut self, refresh: RefreshTrigger) -> Self {
        self.refresh = Some(refresh);
        self
    }

    async fn payload(&self) -> DisplayPayload {
        let source = self.selection.read().await.current().clone();
        let store = self.store.read().await;
        presentation::render(&store, &source)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub current: String,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectRequest {
    pub source: String,
}

/// Build the remote axum router
pub fn build_router(state: RemoteState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/display", get(display_handler))
        .route("/api/sources", get(sources_handler))
        .route("/api/source", axum::routing::put(select_handler))
        .route("/api/overview", get(overview_handler))
        .route("/api/applications/{id}", get(application_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn display_handler(State(remote): State<RemoteState>) -> impl IntoResponse {
    Json(remote.payload().await)
}

async fn sources_handler(State(remote): State<RemoteState>) -> impl IntoResponse {
    let selection = remote.selection.read().await;
    Json(SourcesResponse {
        current: selection.current().id().to_string(),
        sources: selection.sources(),
    })
}

async fn select_handler(
    State(remote): State<RemoteState>,
    Json(request): Json<SelectRequest>,
) -> Response {
    let selected = {
        let mut selection = remote.selection.write().await;
        selection.select(&request.source).map(|source| source.clone())
    };

    match selected {
        Ok(source) => {
            tracing::debug!("Remote selected {}", source);
            if let Some(refresh) = &remote.refresh {
                refresh.request();
            }
            Json(remote.payload().await).into_response()
        }
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn overview_handler(State(remote): State<RemoteState>) -> impl IntoResponse {
    Json(remote.store.read().await.read_all())
}

async fn application_handler(
    State(remote): State<RemoteState>,
    Path(id): Path<String>,
) -> Response {
    match remote.store.read().await.read(&id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("No snapshot for {}", id)})),
        )
            .into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn index_handler(State(remote): State<RemoteState>) -> impl IntoResponse {
    let payload = remote.payload().await;
    let (sources, current) = {
        let selection = remote.selection.read().await;
        (selection.sources(), selection.current().id().to_string())
    };

    let options: String = sources
        .iter()
        .map(|s| {
            let selected = if s.id == current { " selected" } else { "" };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape(&s.id),
                selected,
                escape(&s.name)
            )
        })
        .collect();

    let entry_rows: String = payload
        .entries
        .iter()
        .map(|e| {
            let (color, bg) = match e.status.as_str() {
                "Online" => ("#155724", "#d4edda"),
                "Pending" => ("#383d41", "#e2e3e5"),
                _ => ("#721c24", "#f8d7da"),
            };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">
                        <span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>
                    </td>
                    <td style="padding: 0.5rem;">{}</td>
                </tr>"#,
                escape(&e.name),
                color,
                bg,
                escape(&e.status),
                escape(&e.summary)
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="refresh" content="{refresh}">
    <title>NZB Info</title>
    <script>
        function selectSource(source) {{
            fetch('/api/source', {{
                method: 'PUT',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ source: source }})
            }}).then(() => window.location.reload());
        }}
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <select onchange="selectSource(this.value)">{options}</select>
    <h1 id="title">{title}</h1>
    <p id="status-line"><strong>{status_line}</strong></p>
    <p id="queue-summary">{queue_summary}</p>
    <p id="last-file">{last_file}</p>
    <table style="width: 100%; border-collapse: collapse;">
        <tbody id="entries">{entry_rows}</tbody>
    </table>
</body>
</html>"#,
        refresh = remote.refresh_seconds,
        options = options,
        title = escape(&payload.title),
        status_line = escape(&payload.status_line),
        queue_summary = escape(&payload.queue_summary),
        last_file = escape(&payload.last_file),
        entry_rows = entry_rows,
    );

    Html(html)
}
