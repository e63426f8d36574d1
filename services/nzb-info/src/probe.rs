//! Connection probe
//!
//! Issues an adapter's requests against one application and classifies the
//! outcome. The probe owns URL construction (scheme, port, base path) and
//! credential placement so adapters only ever see response bodies.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;

use crate::adapters::{Adapter, AuthPlacement, Endpoint, EndpointMethod, RawResponse};
use crate::config::ApplicationConfig;
use crate::io::{HttpClient, HttpResponse};
use crate::NzbInfoError;

/// Outcome of probing one application
#[derive(Debug, Clone)]
pub enum ProbeResult {
    Success(RawResponse),
    Timeout,
    AuthFailure(u16),
    Unreachable(String),
    HttpError(u16),
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success(_))
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Success(_) => f.write_str("OK"),
            ProbeResult::Timeout => f.write_str("Connection timed out"),
            ProbeResult::AuthFailure(code) => write!(f, "Authentication failed (HTTP {})", code),
            ProbeResult::Unreachable(reason) => write!(f, "Unreachable: {}", reason),
            ProbeResult::HttpError(code) => write!(f, "HTTP error {}", code),
        }
    }
}

/// Fetch every endpoint the adapter needs, bounded by `timeout` overall
pub async fn probe(
    http: &dyn HttpClient,
    config: &ApplicationConfig,
    adapter: &dyn Adapter,
    timeout: Duration,
    today: NaiveDate,
) -> ProbeResult {
    let endpoints = adapter.endpoints(today);
    match tokio::time::timeout(timeout, fetch_all(http, config, adapter, &endpoints)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!("Probe of {} exceeded {:?}", config.id, timeout);
            ProbeResult::Timeout
        }
    }
}

/// Single request against the adapter's health endpoint
pub async fn check(
    http: &dyn HttpClient,
    config: &ApplicationConfig,
    adapter: &dyn Adapter,
    timeout: Duration,
) -> ProbeResult {
    let endpoint = adapter.health_endpoint();
    let request = fetch(http, config, adapter, &endpoint);
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(body)) => ProbeResult::Success(RawResponse::new().with(endpoint.name, body)),
        Ok(Err(failure)) => failure,
        Err(_) => ProbeResult::Timeout,
    }
}

async fn fetch_all(
    http: &dyn HttpClient,
    config: &ApplicationConfig,
    adapter: &dyn Adapter,
    endpoints: &[Endpoint],
) -> ProbeResult {
    let mut raw = RawResponse::new();
    for endpoint in endpoints {
        match fetch(http, config, adapter, endpoint).await {
            Ok(body) => raw.insert(endpoint.name, body),
            Err(failure) if endpoint.required => {
                tracing::debug!("{} {} failed: {}", config.id, endpoint.name, failure);
                return failure;
            }
            Err(failure) => {
                tracing::debug!(
                    "{} optional {} skipped: {}",
                    config.id,
                    endpoint.name,
                    failure
                );
            }
        }
    }
    ProbeResult::Success(raw)
}

async fn fetch(
    http: &dyn HttpClient,
    config: &ApplicationConfig,
    adapter: &dyn Adapter,
    endpoint: &Endpoint,
) -> std::result::Result<String, ProbeResult> {
    let url = build_url(config, adapter.auth(), &endpoint.path);
    let owned_headers = auth_headers(config, adapter.auth());
    let headers: Vec<(&str, &str)> = owned_headers
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();

    let response = match endpoint.method {
        EndpointMethod::Get => http.get(&url, &headers).await,
        EndpointMethod::JsonRpc(method) => {
            let body = serde_json::json!({"method": method, "params": [], "id": 1});
            http.post_json(&url, &headers, &body).await
        }
    };

    match response {
        Ok(response) => classify_response(adapter, response),
        Err(NzbInfoError::Timeout(_)) => Err(ProbeResult::Timeout),
        Err(e) => Err(ProbeResult::Unreachable(e.to_string())),
    }
}

fn classify_response(
    adapter: &dyn Adapter,
    response: HttpResponse,
) -> std::result::Result<String, ProbeResult> {
    match response.status {
        401 | 403 => Err(ProbeResult::AuthFailure(response.status)),
        200..=299 if response.is_html() => Err(ProbeResult::AuthFailure(response.status)),
        200..=299 if adapter.is_auth_error_body(&response.body) => {
            Err(ProbeResult::AuthFailure(response.status))
        }
        200..=299 => Ok(response.body),
        code => Err(ProbeResult::HttpError(code)),
    }
}

/// Base URL plus path, with the API key appended when it travels in the query
pub fn build_url(config: &ApplicationConfig, auth: AuthPlacement, path: &str) -> String {
    let mut url = config.base_url();
    if !path.starts_with('/') {
        url.push('/');
    }
    url.push_str(path);

    if let AuthPlacement::Query(param) = auth {
        if !config.api_key.is_empty() {
            match reqwest::Url::parse(&url) {
                Ok(mut parsed) => {
                    parsed.query_pairs_mut().append_pair(param, &config.api_key);
                    return parsed.to_string();
                }
                Err(e) => tracing::warn!("Cannot parse {}: {}", config.base_url(), e),
            }
        }
    }
    url
}

fn auth_headers(config: &ApplicationConfig, auth: AuthPlacement) -> Vec<(&'static str, String)> {
    match auth {
        AuthPlacement::Header(name) if !config.api_key.is_empty() => {
            vec![(name, config.api_key.clone())]
        }
        AuthPlacement::Basic => match &config.username {
            Some(username) if !username.is_empty() => {
                let password = config.password.as_deref().unwrap_or("");
                let token = STANDARD.encode(format!("{}:{}", username, password));
                vec![("Authorization", format!("Basic {}", token))]
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
