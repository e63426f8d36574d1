//! NZB Info - Usenet and media-manager status aggregation service
//!
//! Polls SABnzbd, NZBGet, the *arr applications, Bazarr and Overseerr,
//! keeps the latest status of each, and serves a selectable summary view.

pub mod adapters;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod presentation;
pub mod probe;
pub mod remote;
pub mod scheduler;
pub mod store;

pub use config::{load_config, Config};
pub use error::{NzbInfoError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::adapters::adapter_for;
use crate::config::ApplicationConfig;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::presentation::SourceSelector;
use crate::probe::ProbeResult;
use crate::remote::{RemoteState, SelectionHandle};
use crate::scheduler::{RefreshTrigger, Scheduler};
use crate::store::StateHandle;

/// Builder for configuring and constructing an [`NzbInfo`] service
pub struct NzbInfoBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    cancel: Option<CancellationToken>,
}

impl NzbInfoBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            cancel: None,
        }
    }

    /// Use this HTTP client instead of the reqwest default
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Use an external cancellation token; no ctrl-c handler is installed
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn build(self) -> Result<NzbInfo> {
        let mut config = self.config;
        config.validate()?;

        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new(config.timeout())));
        let handle_signals = self.cancel.is_none();
        let cancel = self.cancel.unwrap_or_default();

        let applications = config.application_configs();
        for app in &applications {
            tracing::debug!("Configured {:?}", app);
        }

        let state = store::new_state_handle(&applications);
        let selection: SelectionHandle =
            Arc::new(RwLock::new(SourceSelector::new(&applications)));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&http),
            Arc::clone(&state),
            config.refresh_interval(),
            config.timeout(),
            cancel.clone(),
        ));

        Ok(NzbInfo {
            config,
            applications,
            http,
            state,
            selection,
            scheduler,
            cancel,
            handle_signals,
        })
    }
}

/// A configured service, ready to start
pub struct NzbInfo {
    config: Config,
    applications: Vec<ApplicationConfig>,
    http: Arc<dyn HttpClient>,
    state: StateHandle,
    selection: SelectionHandle,
    scheduler: Arc<Scheduler>,
    cancel: CancellationToken,
    handle_signals: bool,
}

impl std::fmt::Debug for NzbInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NzbInfo")
            .field("applications", &self.applications)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl NzbInfo {
    pub fn applications(&self) -> &[ApplicationConfig] {
        &self.applications
    }

    pub fn state(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    pub fn selection(&self) -> SelectionHandle {
        Arc::clone(&self.selection)
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.scheduler.refresh_trigger()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Router for the remote surface, bound to this service's state
    pub fn router(&self) -> axum::Router {
        remote::build_router(self.remote_state())
    }

    fn remote_state(&self) -> RemoteState {
        RemoteState::new(
            Arc::clone(&self.state),
            Arc::clone(&self.selection),
            self.config.refresh_interval,
        )
        .with_refresh(self.scheduler.refresh_trigger())
    }

    /// Hit every application's health endpoint once
    pub async fn check(&self) -> Vec<(String, ProbeResult)> {
        let mut tasks = JoinSet::new();
        for (index, app) in self.applications.iter().enumerate() {
            let http = Arc::clone(&self.http);
            let app = app.clone();
            let timeout = self.config.timeout();
            tasks.spawn(async move {
                let result = probe::check(http.as_ref(), &app, adapter_for(app.kind), timeout).await;
                (index, app.id, result)
            });
        }

        let mut results = Vec::with_capacity(self.applications.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) => tracing::warn!("Connectivity check task failed: {}", e),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, id, result)| (id, result))
            .collect()
    }

    /// Run until cancelled: poll on the configured interval and serve the
    /// remote surface when enabled
    pub async fn start(self) -> Result<()> {
        if self.handle_signals {
            let cancel_for_signal = self.cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Shutdown signal received");
                        cancel_for_signal.cancel();
                    }
                    Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
                }
            });
        }

        if self.config.server.enabled {
            let port = self.config.server.port;
            let router = self.router();
            let cancel_for_server = self.cancel.clone();

            tokio::spawn(async move {
                let addr = SocketAddr::from(([0, 0, 0, 0], port));
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::error!(
                            "Failed to bind remote UI to port {}: {}. Continuing without it.",
                            port,
                            e
                        );
                        return;
                    }
                };
                tracing::info!("Remote UI listening on http://{}", addr);

                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_server.cancelled().await;
                    })
                    .await
                    .ok();

                tracing::debug!("Remote UI stopped");
            });
        }

        tracing::info!(
            "NZB Info started with {} application(s)",
            self.applications.len()
        );

        self.scheduler.run().await;

        tracing::info!("NZB Info stopped");
        Ok(())
    }
}
