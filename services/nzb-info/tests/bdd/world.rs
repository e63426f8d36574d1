//! BDD test world for the nzb-info service

use std::sync::Arc;
use std::time::Duration;

use cucumber::World;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use nzb_info::config::{AppKind, ApplicationSettings, Config};
use nzb_info::io::HttpClient;
use nzb_info::presentation::SourceSelector;
use nzb_info::remote::SelectionHandle;
use nzb_info::scheduler::Scheduler;
use nzb_info::store::{self, StateHandle};

use crate::steps::backend_steps::FakeBackends;

#[derive(Debug, Default, World)]
pub struct NzbInfoWorld {
    pub config: Config,
    pub backends: Arc<FakeBackends>,
    pub probe_timeout: Option<Duration>,

    // Polling
    pub state: Option<StateHandle>,
    pub scheduler: Option<Arc<Scheduler>>,
    pub tick_elapsed: Option<Duration>,

    // Selection
    pub selection: Option<SelectionHandle>,
    pub selection_error: Option<nzb_info::NzbInfoError>,

    // Remote surface
    pub response_status: Option<u16>,
    pub response_body: Option<serde_json::Value>,

    // Lifecycle
    pub cancel: Option<CancellationToken>,
    pub build_succeeded: Option<bool>,
    pub start_succeeded: Option<bool>,
}

impl NzbInfoWorld {
    pub fn configure(&mut self, kind: AppKind) {
        let settings = ApplicationSettings {
            host: "nas".to_string(),
            api_key: "test-key".to_string(),
            username: (kind == AppKind::Nzbget).then(|| "nzbget".to_string()),
            ..ApplicationSettings::default()
        };
        self.config.applications.insert(kind, settings);
    }

    /// Lazily wire the store, selection and scheduler against the fake backends
    pub fn scheduler(&mut self) -> Arc<Scheduler> {
        if let Some(scheduler) = &self.scheduler {
            return Arc::clone(scheduler);
        }

        let applications = self.config.application_configs();
        let state = store::new_state_handle(&applications);
        let http: Arc<dyn HttpClient> = self.backends.clone();
        let scheduler = Arc::new(Scheduler::new(
            http,
            Arc::clone(&state),
            Duration::from_secs(3600),
            self.probe_timeout.unwrap_or(Duration::from_secs(1)),
            CancellationToken::new(),
        ));

        self.selection = Some(Arc::new(RwLock::new(SourceSelector::new(&applications))));
        self.state = Some(state);
        self.scheduler = Some(Arc::clone(&scheduler));
        scheduler
    }

    /// The store of a running service if one was started, otherwise the
    /// lazily wired one
    pub fn state(&mut self) -> StateHandle {
        if let Some(state) = &self.state {
            return Arc::clone(state);
        }
        self.scheduler();
        Arc::clone(self.state.as_ref().expect("state is wired with the scheduler"))
    }

    pub fn selection(&mut self) -> SelectionHandle {
        if let Some(selection) = &self.selection {
            return Arc::clone(selection);
        }
        self.scheduler();
        Arc::clone(
            self.selection
                .as_ref()
                .expect("selection is wired with the scheduler"),
        )
    }
}

/// Parse a comma separated list of application kinds
pub fn parse_kinds(list: &str) -> Vec<AppKind> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            AppKind::ALL
                .into_iter()
                .find(|kind| kind.as_str() == name)
                .unwrap_or_else(|| panic!("unknown application kind '{}'", name))
        })
        .collect()
}
