#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::{Router, body::Body, extract::Request, http::Uri, response::Response, routing::get};
use profmux::{EngineError, HandlerSet, LaunchOptions, Readiness, VisualizationEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Profile names with special meaning to [`FakeEngine`].
pub const BROKEN_PROFILE: &str = "broken";
pub const SILENT_PROFILE: &str = "silent";
pub const LONG_LIVED_PROFILE: &str = "long";
pub const STALLED_PROFILE: &str = "stalled";

/// Engine that serves canned pages naming the session they belong to.
///
/// * `broken` fails with an error naming the source URL
/// * `silent` returns without ever becoming ready
/// * `long` stays running after readiness until its task is aborted
/// * `stalled` never finishes starting up
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    launched: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct StopGuard(Arc<AtomicUsize>);

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl VisualizationEngine for FakeEngine {
    async fn launch(&self, options: LaunchOptions, readiness: Readiness) -> Result<(), EngineError> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        match options.profile.as_str() {
            BROKEN_PROFILE => {
                return Err(EngineError::other(format!(
                    "failed to fetch {}: connection refused",
                    options.source_url
                )));
            }
            SILENT_PROFILE => return Ok(()),
            _ => {}
        }
        let guard = StopGuard(self.stopped.clone());
        if options.profile == STALLED_PROFILE {
            std::future::pending::<()>().await;
        }
        let long_lived = options.profile == LONG_LIVED_PROFILE;
        readiness.ready(session_pages(&options))?;
        if long_lived {
            std::future::pending::<()>().await;
        }
        drop(guard);
        Ok(())
    }
}

fn session_pages(options: &LaunchOptions) -> HandlerSet {
    let root = format!("root of {} at {}", options.source_url, options.ui_base);
    let data = format!("data of session {}", options.session_id);
    HandlerSet::new()
        .with("/", get(move || async move { root }))
        .with("/data", get(move || async move { data }))
        .with(
            "/echo",
            get(|uri: Uri| async move { uri.to_string() }),
        )
}

/// Stand-in for handlers shared by every session.
pub fn fallback() -> Router {
    Router::new().fallback(|request: Request| async move {
        format!("fallback {}", request.uri().path())
    })
}

pub async fn body_text(response: Response) -> anyhow::Result<String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn request(uri: &str) -> Request {
    axum::http::Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}
