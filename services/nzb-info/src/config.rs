//! Configuration types for the nzb-info service

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lowest accepted polling interval, in seconds
pub const MIN_REFRESH_INTERVAL_SECONDS: u64 = 10;

/// The application types the service knows how to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    Sabnzbd,
    Nzbget,
    Sonarr,
    Radarr,
    Lidarr,
    Readarr,
    Bazarr,
    Overseerr,
}

impl AppKind {
    pub const ALL: [AppKind; 8] = [
        AppKind::Sabnzbd,
        AppKind::Nzbget,
        AppKind::Sonarr,
        AppKind::Radarr,
        AppKind::Lidarr,
        AppKind::Readarr,
        AppKind::Bazarr,
        AppKind::Overseerr,
    ];

    /// Configuration key and default application id
    pub fn as_str(&self) -> &'static str {
        match self {
            AppKind::Sabnzbd => "sabnzbd",
            AppKind::Nzbget => "nzbget",
            AppKind::Sonarr => "sonarr",
            AppKind::Radarr => "radarr",
            AppKind::Lidarr => "lidarr",
            AppKind::Readarr => "readarr",
            AppKind::Bazarr => "bazarr",
            AppKind::Overseerr => "overseerr",
        }
    }

    /// Name shown on the remote
    pub fn display_name(&self) -> &'static str {
        match self {
            AppKind::Sabnzbd => "SABnzbd",
            AppKind::Nzbget => "NZBget",
            AppKind::Sonarr => "Sonarr",
            AppKind::Radarr => "Radarr",
            AppKind::Lidarr => "Lidarr",
            AppKind::Readarr => "Readarr",
            AppKind::Bazarr => "Bazarr",
            AppKind::Overseerr => "Overseerr",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            AppKind::Sabnzbd => 8080,
            AppKind::Nzbget => 6789,
            AppKind::Sonarr => 8989,
            AppKind::Radarr => 7878,
            AppKind::Lidarr => 8686,
            AppKind::Readarr => 8787,
            AppKind::Bazarr => 6767,
            AppKind::Overseerr => 5055,
        }
    }

    /// Whether the application authenticates with an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, AppKind::Nzbget)
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub applications: BTreeMap<AppKind, ApplicationSettings>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            applications: BTreeMap::new(),
            refresh_interval: default_refresh_interval(),
            timeout: default_timeout(),
            server: ServerConfig::default(),
        }
    }
}

/// Settings for one application as written in `config.json`
#[derive(Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub url_base: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for ApplicationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationSettings")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("url_base", &self.url_base)
            .finish()
    }
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::new(),
            port: None,
            api_key: String::new(),
            ssl: false,
            url_base: String::new(),
            username: None,
            password: None,
        }
    }
}

/// Remote UI server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_server_port(),
        }
    }
}

/// Resolved, immutable configuration of one enabled application
#[derive(Clone, PartialEq, Eq)]
pub struct ApplicationConfig {
    pub id: String,
    pub kind: AppKind,
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub use_ssl: bool,
    pub url_base: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ApplicationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("base_url", &self.base_url())
            .finish()
    }
}

impl ApplicationConfig {
    pub fn new(kind: AppKind, host: &str) -> Self {
        Self {
            id: kind.as_str().to_string(),
            kind,
            enabled: true,
            host: host.to_string(),
            port: kind.default_port(),
            api_key: String::new(),
            use_ssl: false,
            url_base: None,
            username: None,
            password: None,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = api_key.to_string();
        self
    }

    /// Scheme, host, port and the optional reverse-proxy prefix, without a trailing slash
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let mut url = format!("{}://{}:{}", scheme, self.host, self.port);
        if let Some(base) = &self.url_base {
            let base = base.trim_matches('/');
            if !base.is_empty() {
                url.push('/');
                url.push_str(base);
            }
        }
        url
    }
}

impl Config {
    /// Enabled applications in kind order
    pub fn application_configs(&self) -> Vec<ApplicationConfig> {
        self.applications
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(kind, settings)| ApplicationConfig {
                id: kind.as_str().to_string(),
                kind: *kind,
                enabled: settings.enabled,
                host: settings.host.trim().to_string(),
                port: settings.port.unwrap_or_else(|| kind.default_port()),
                api_key: settings.api_key.trim().to_string(),
                use_ssl: settings.ssl,
                url_base: Some(settings.url_base.trim().to_string()).filter(|s| !s.is_empty()),
                username: settings.username.clone().filter(|s| !s.is_empty()),
                password: settings.password.clone(),
            })
            .collect()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Check the configuration, raising the interval to its floor and
    /// clamping the probe timeout to the interval
    pub fn validate(&mut self) -> crate::Result<()> {
        if self.refresh_interval < MIN_REFRESH_INTERVAL_SECONDS {
            tracing::warn!(
                "refresh_interval {}s is below the minimum, using {}s",
                self.refresh_interval,
                MIN_REFRESH_INTERVAL_SECONDS
            );
            self.refresh_interval = MIN_REFRESH_INTERVAL_SECONDS;
        }

        if self.timeout == 0 {
            return Err(crate::NzbInfoError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        if self.timeout > self.refresh_interval {
            tracing::warn!(
                "timeout {}s exceeds refresh_interval {}s, clamping",
                self.timeout,
                self.refresh_interval
            );
            self.timeout = self.refresh_interval;
        }

        for (kind, settings) in self.applications.iter().filter(|(_, s)| s.enabled) {
            if settings.host.trim().is_empty() {
                return Err(crate::NzbInfoError::Config(format!(
                    "{} is enabled but has no host",
                    kind.as_str()
                )));
            }
            if kind.requires_api_key() && settings.api_key.trim().is_empty() {
                tracing::warn!("{} is enabled without an API key", kind.as_str());
            }
        }

        Ok(())
    }
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_server_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::NzbInfoError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    tracing::debug!(
        "Loaded {} application(s) from {:?}",
        config.applications.len(),
        path
    );
    Ok(config)
}
