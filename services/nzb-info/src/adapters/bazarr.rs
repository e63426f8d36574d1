//! Bazarr adapter

use chrono::NaiveDate;
use serde::Deserialize;

use super::{fields, Adapter, AuthPlacement, Endpoint, Normalized, RawResponse};
use crate::config::AppKind;
use crate::format;

const RECENT_LIMIT: usize = 2;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HistoryPage {
    data: Vec<HistoryEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HistoryEntry {
    series_title: Option<String>,
    episode_title: Option<String>,
    title: Option<String>,
    language: Option<Language>,
}

/// Bazarr reports languages either as a bare code or as an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Language {
    Code(String),
    Named { name: String },
}

impl Language {
    fn name(&self) -> &str {
        match self {
            Language::Code(code) => code,
            Language::Named { name } => name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Badges {
    episodes: u64,
    movies: u64,
}

impl HistoryEntry {
    fn episode_label(&self) -> String {
        let series = self.series_title.as_deref().unwrap_or("Unknown");
        match self.episode_title.as_deref() {
            Some(episode) if !episode.is_empty() => format!("{} - {}", series, episode),
            _ => series.to_string(),
        }
    }

    fn movie_label(&self) -> String {
        self.title.clone().unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug)]
pub struct BazarrAdapter;

impl Adapter for BazarrAdapter {
    fn kind(&self) -> AppKind {
        AppKind::Bazarr
    }

    fn auth(&self) -> AuthPlacement {
        AuthPlacement::Header("X-API-KEY")
    }

    fn health_endpoint(&self) -> Endpoint {
        Endpoint::get("status", "/api/system/status")
    }

    fn endpoints(&self, _today: NaiveDate) -> Vec<Endpoint> {
        vec![
            Endpoint::get("status", "/api/system/status"),
            Endpoint::get("episodes", "/api/episodes/history?length=3").optional(),
            Endpoint::get("movies", "/api/movies/history?length=3").optional(),
            Endpoint::get("badges", "/api/badges").optional(),
        ]
    }

    fn normalize(&self, raw: &RawResponse, _today: NaiveDate) -> crate::Result<Normalized> {
        let status: serde_json::Value = raw.required("status")?;
        if !status.is_object() {
            return Err(crate::NzbInfoError::MalformedResponse(
                "status: expected a JSON object".to_string(),
            ));
        }
        let mut out = Normalized::default();

        let episodes = raw.optional::<HistoryPage>("episodes").unwrap_or_default();
        let movies = raw.optional::<HistoryPage>("movies").unwrap_or_default();

        let mut recent: Vec<String> = Vec::new();
        let mut languages: Vec<String> = Vec::new();
        let mut remember_language = |entry: &HistoryEntry| {
            if let Some(language) = &entry.language {
                let name = language.name().to_string();
                if !name.is_empty() && !languages.contains(&name) {
                    languages.push(name);
                }
            }
        };

        for entry in episodes.data.iter().take(RECENT_LIMIT) {
            recent.push(entry.episode_label());
            remember_language(entry);
        }
        for entry in movies.data.iter() {
            if recent.len() >= RECENT_LIMIT {
                break;
            }
            recent.push(entry.movie_label());
            remember_language(entry);
        }

        let recent: Vec<String> = recent
            .iter()
            .map(|label| format::smart_truncate(label, 30))
            .collect();
        out.count(fields::RECENT_COUNT, recent.len() as u64);
        if !languages.is_empty() {
            out.list(fields::LANGUAGES, languages);
        }
        out.last_file = recent.first().cloned();
        out.list(fields::RECENT, recent);

        if let Some(badges) = raw.optional::<Badges>("badges") {
            out.count(fields::MISSING_EPISODES, badges.episodes);
            out.count(fields::MISSING_MOVIES, badges.movies);
        }

        Ok(out)
    }
}
