//! Fake application backends and the steps that script them

use std::collections::HashMap;
use std::time::Duration;

use cucumber::{given, when};
use tokio::sync::RwLock;

use nzb_info::config::AppKind;
use nzb_info::io::{HttpClient, HttpResponse};
use nzb_info::NzbInfoError;

use crate::world::{parse_kinds, NzbInfoWorld};

/// How a fake backend answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Healthy,
    Slow,
    Unresponsive,
    Unauthorized,
    Offline,
    LoginPage,
    Status(u16),
}

impl Behaviour {
    fn parse(name: &str) -> Self {
        match name {
            "healthy" => Behaviour::Healthy,
            "slow" => Behaviour::Slow,
            "unresponsive" => Behaviour::Unresponsive,
            "unauthorized" => Behaviour::Unauthorized,
            "offline" => Behaviour::Offline,
            "behind-a-login-page" => Behaviour::LoginPage,
            other => panic!("unknown backend behaviour '{}'", other),
        }
    }
}

/// One HTTP client standing in for every application, keyed by port
#[derive(Debug, Default)]
pub struct FakeBackends {
    behaviours: RwLock<HashMap<u16, Behaviour>>,
    pub requests: RwLock<Vec<String>>,
}

impl FakeBackends {
    pub async fn set(&self, kind: AppKind, behaviour: Behaviour) {
        self.behaviours
            .write()
            .await
            .insert(kind.default_port(), behaviour);
    }

    async fn respond(&self, url: &str, rpc_method: Option<&str>) -> nzb_info::Result<HttpResponse> {
        self.requests.write().await.push(url.to_string());

        let behaviour = self
            .behaviours
            .read()
            .await
            .get(&port_of(url))
            .copied()
            .unwrap_or(Behaviour::Healthy);

        match behaviour {
            Behaviour::Healthy => Ok(healthy_response(url, rpc_method)),
            Behaviour::Slow => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(healthy_response(url, rpc_method))
            }
            Behaviour::Unresponsive => Err(NzbInfoError::Timeout(format!("GET {} timed out", url))),
            Behaviour::Unauthorized => Ok(HttpResponse::json(401, "Unauthorized")),
            Behaviour::Offline => Err(NzbInfoError::Unreachable(format!(
                "GET {} failed: connection refused",
                url
            ))),
            Behaviour::LoginPage => Ok(HttpResponse {
                status: 200,
                body: "<html><body><form>Login</form></body></html>".to_string(),
                content_type: Some("text/html; charset=utf-8".to_string()),
            }),
            Behaviour::Status(code) => Ok(HttpResponse::json(code, "error")),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeBackends {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> nzb_info::Result<HttpResponse> {
        self.respond(url, None).await
    }

    async fn post_json(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> nzb_info::Result<HttpResponse> {
        self.respond(url, body["method"].as_str()).await
    }
}

fn port_of(url: &str) -> u16 {
    let authority = url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("");
    authority
        .rsplit(':')
        .next()
        .and_then(|port| port.parse().ok())
        .unwrap_or(0)
}

fn healthy_response(url: &str, rpc_method: Option<&str>) -> HttpResponse {
    if let Some(method) = rpc_method {
        let body = match method {
            "status" => r#"{"result": {"DownloadRate": 2202009, "RemainingSizeMB": 500}}"#,
            "listgroups" => r#"{"result": [{"NZBName": "Linux.ISO.2024"}]}"#,
            "history" => r#"{"result": [{"Name": "Finished.Show.S01E01"}]}"#,
            _ => r#"{"result": "21.1"}"#,
        };
        return HttpResponse::json(200, body);
    }

    let body = if url.contains("mode=queue") {
        r#"{"queue": {"speed": "2.1 MB/s", "sizeleft": "252 MB", "noofslots": 3,
            "slots": [{"filename": "Show.S01E01"}, {"filename": "Show.S01E02"}, {"filename": "Movie.2024"}]}}"#
    } else if url.contains("mode=history") {
        r#"{"history": {"slots": [{"name": "Finished.Show.S01E01"}]}}"#
    } else if url.contains("mode=version") {
        r#"{"version": "4.2.3"}"#
    } else if url.contains("/api/v1/request") {
        r#"{"pageInfo": {"results": 7}, "results": [
            {"status": 1, "type": "movie", "media": {"title": "Dune", "releaseDate": "2021-10-22"}},
            {"status": 2, "type": "tv", "media": {"name": "Shogun"}}]}"#
    } else if url.contains("/api/system/status") {
        r#"{"data": {"bazarr_version": "1.4.2"}}"#
    } else if url.contains("/system/status") || url.contains("/api/v1/status") {
        r#"{"version": "4.0.2"}"#
    } else if url.contains("/calendar") {
        r#"[{"monitored": true, "hasFile": false, "seasonNumber": 1, "episodeNumber": 2,
             "title": "Dune", "year": 2021, "series": {"title": "Severance"},
             "artist": {"artistName": "Band"}, "author": {"authorName": "Writer"}}]"#
    } else if url.contains("/episodes/history") {
        r#"{"data": [{"seriesTitle": "Severance", "episodeTitle": "Hello", "language": {"name": "English"}}]}"#
    } else if url.contains("/movies/history") {
        r#"{"data": []}"#
    } else if url.contains("/badges") {
        r#"{"episodes": 2, "movies": 1}"#
    } else if url.contains("/wanted/missing") {
        r#"{"totalRecords": 4, "records": []}"#
    } else if url.contains("/queue") {
        r#"{"totalRecords": 1, "records": []}"#
    } else if url.contains("/history") {
        r#"{"totalRecords": 1, "records": [{"sourceTitle": "/tvshows/Severance/Severance.S01E01.mkv"}]}"#
    } else {
        return HttpResponse::json(404, "not found");
    };
    HttpResponse::json(200, body)
}

// --- Given/When steps ---

#[given(expr = "the configured applications {string}")]
fn configured_applications(world: &mut NzbInfoWorld, list: String) {
    for kind in parse_kinds(&list) {
        world.configure(kind);
    }
}

#[given(expr = "the {word} backend is {word}")]
#[when(expr = "the {word} backend is {word}")]
async fn backend_is(world: &mut NzbInfoWorld, kind: String, behaviour: String) {
    let kind = parse_kinds(&kind)[0];
    world.backends.set(kind, Behaviour::parse(&behaviour)).await;
}

#[given(expr = "the {word} backend answers with HTTP {int}")]
#[when(expr = "the {word} backend answers with HTTP {int}")]
async fn backend_answers_with(world: &mut NzbInfoWorld, kind: String, code: u16) {
    let kind = parse_kinds(&kind)[0];
    world.backends.set(kind, Behaviour::Status(code)).await;
}

#[given(expr = "a probe timeout of {int} milliseconds")]
fn probe_timeout(world: &mut NzbInfoWorld, millis: u64) {
    world.probe_timeout = Some(Duration::from_millis(millis));
}
