use std::time::Duration;

use axum::{
    Json,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EngineError, LaunchOptions, Readiness, VisualizationEngine};
use crate::session::{HandlerSet, SessionId};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct FetchEngineConfig {
    /// Upper bound for downloading one profile. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for FetchEngineConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_FETCH_TIMEOUT),
            user_agent: concat!("profmux/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Engine that downloads the profile once and serves it back.
///
/// Each session exposes `/` (an index page), `/raw` (the profile as fetched)
/// and `/summary` (a JSON description).
#[derive(Debug, Clone)]
pub struct FetchEngine {
    client: reqwest::Client,
    config: FetchEngineConfig,
}

impl FetchEngine {
    pub fn new(config: FetchEngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, EngineError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub session_id: SessionId,
    pub profile: String,
    pub source_url: String,
    pub size_bytes: usize,
    pub fetched_at: DateTime<Utc>,
}

impl VisualizationEngine for FetchEngine {
    async fn launch(
        &self,
        options: LaunchOptions,
        readiness: Readiness,
    ) -> Result<(), EngineError> {
        let profile = self.fetch(&options.source_url).await?;
        tracing::debug!(size = profile.len(), "profile fetched");
        if readiness.is_abandoned() {
            return Err(EngineError::Abandoned);
        }
        let summary = ProfileSummary {
            session_id: options.session_id,
            profile: options.profile,
            source_url: options.source_url,
            size_bytes: profile.len(),
            fetched_at: Utc::now(),
        };
        readiness.ready(handlers(summary, profile))
    }
}

fn handlers(summary: ProfileSummary, profile: Bytes) -> HandlerSet {
    let index = Html(index_page(&summary));
    let disposition = format!("attachment; filename=\"{}.pb.gz\"", summary.profile);
    HandlerSet::new()
        .with("/", get(move || async move { index }))
        .with(
            "/raw",
            get(move || async move {
                (
                    [
                        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    profile,
                )
                    .into_response()
            }),
        )
        .with("/summary", get(move || async move { Json(summary) }))
}

fn index_page(summary: &ProfileSummary) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{profile} profile #{id}</title></head>\n<body>\n\
         <h1>{profile}</h1>\n\
         <p>Fetched from <code>{source}</code> at {fetched_at} ({size} bytes).</p>\n\
         <ul>\n<li><a href=\"raw\">download profile</a></li>\n\
         <li><a href=\"summary\">summary</a></li>\n</ul>\n</body>\n</html>\n",
        profile = escape(&summary.profile),
        id = summary.session_id,
        source = escape(&summary.source_url),
        fetched_at = summary.fetched_at.to_rfc3339(),
        size = summary.size_bytes,
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
