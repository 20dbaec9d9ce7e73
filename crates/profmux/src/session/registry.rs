use std::{collections::HashMap, convert::Infallible, sync::Arc};

use axum::{
    Router,
    extract::Request,
    http::{Uri, uri::PathAndQuery},
    response::Response,
};
use tokio::sync::RwLock;
use tokio_util::task::AbortOnDropHandle;
use tower::ServiceExt;
use tracing::Instrument;

use super::{BindingKey, HandlerSet, SessionId, SessionIdAllocator, profile_url};
use crate::{
    engine::{EngineError, LaunchOptions, Readiness, VisualizationEngine},
    error::MuxError,
};

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Public path prefix the router is mounted under, used to tell engines
    /// where their UI lives.
    pub ui_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ui_prefix: "/pprof".to_string(),
        }
    }
}

struct Session {
    binding: BindingKey,
    handlers: Arc<HandlerSet>,
    /// Dropping the session stops its engine.
    engine_task: AbortOnDropHandle<Result<(), EngineError>>,
}

type SessionTable = RwLock<HashMap<SessionId, Session>>;

/// Owns every live session and the engine that starts new ones.
pub struct SessionRegistry<E> {
    engine: Arc<E>,
    ids: SessionIdAllocator,
    sessions: SessionTable,
    fallback: Router,
    config: RegistryConfig,
}

impl<E: VisualizationEngine> SessionRegistry<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, RegistryConfig::default())
    }

    pub fn with_config(engine: E, config: RegistryConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            ids: SessionIdAllocator::new(),
            sessions: Default::default(),
            fallback: Router::new(),
            config,
        }
    }

    /// Handler for sub-paths a session does not serve itself.
    pub fn with_fallback(mut self, fallback: Router) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start a session for `profile` on `host_and_port` and return its id once
    /// the engine is ready.
    pub async fn create(&self, host_and_port: &str, profile: &str) -> Result<SessionId, MuxError> {
        let id = self.ids.next();
        let binding = BindingKey::new(host_and_port, profile);
        let options = LaunchOptions {
            session_id: id,
            profile: profile.to_owned(),
            source_url: profile_url(host_and_port, profile),
            ui_base: format!(
                "{}/{host_and_port}/{profile}/{id}/",
                self.config.ui_prefix.trim_end_matches('/')
            ),
        };
        tracing::info!(%id, %binding, source_url = %options.source_url, "starting session");

        let (readiness, ready_rx) = Readiness::channel();
        let engine = self.engine.clone();
        // aborted if this future is dropped before the session is stored
        let launch = AbortOnDropHandle::new(tokio::spawn(
            async move {
                let result = engine.launch(options, readiness).await;
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "engine stopped with error");
                }
                result
            }
            .instrument(tracing::info_span!("session", %id, %binding)),
        ));

        let handlers = match ready_rx.await {
            Ok(handlers) => handlers,
            Err(_) => {
                // readiness was dropped, so the launch has finished one way or another
                let error = match launch.await {
                    Ok(Ok(())) => EngineError::ExitedBeforeReady,
                    Ok(Err(e)) => e,
                    Err(e) => EngineError::Task(e),
                };
                tracing::warn!(%id, %binding, error = %error, "session failed to start");
                return Err(error.into());
            }
        };

        let session = Session {
            binding,
            handlers: Arc::new(handlers),
            engine_task: launch,
        };
        self.sessions.write().await.insert(id, session);
        tracing::info!(%id, "session ready");
        Ok(id)
    }

    /// Remove the session `id`, provided it is bound to `host_and_port` and
    /// `profile`.
    pub async fn delete(
        &self,
        id: SessionId,
        host_and_port: &str,
        profile: &str,
    ) -> Result<(), MuxError> {
        let binding = BindingKey::new(host_and_port, profile);
        let session = {
            let mut sessions = self.sessions.write().await;
            let bound = match sessions.get(&id) {
                Some(session) => session.binding == binding,
                None => return Err(MuxError::NotRunning { id }),
            };
            if !bound {
                return Err(MuxError::NotBound { id, binding });
            }
            sessions.remove(&id)
        };
        if let Some(session) = session {
            session.engine_task.abort();
            tracing::info!(%id, binding = %session.binding, "session deleted");
        }
        Ok(())
    }

    /// Dispatch `request` to the handler registered for `sub_path` in session
    /// `id`, or to the fallback handler if the session has none for it.
    pub async fn serve(
        &self,
        id: SessionId,
        host_and_port: &str,
        profile: &str,
        sub_path: &str,
        mut request: Request,
    ) -> Result<Response, MuxError> {
        let binding = BindingKey::new(host_and_port, profile);
        let handlers = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(&id).ok_or(MuxError::NotRunning { id })?;
            if session.binding != binding {
                return Err(MuxError::NotBound { id, binding });
            }
            session.handlers.clone()
        };

        rebase(&mut request, sub_path);
        let response = match handlers.get(sub_path) {
            Some(handler) => {
                tracing::debug!(%id, sub_path, "dispatching to session handler");
                handler.clone().oneshot(request).await
            }
            None => {
                tracing::debug!(%id, sub_path, "dispatching to fallback handler");
                self.fallback.clone().oneshot(request).await
            }
        };
        Ok(response.unwrap_or_else(|e: Infallible| match e {}))
    }

    pub async fn is_running(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop every session and stop their engines.
    pub async fn shutdown(&self) {
        let sessions = std::mem::take(&mut *self.sessions.write().await);
        for (id, session) in sessions {
            session.engine_task.abort();
            tracing::debug!(%id, "session stopped on shutdown");
        }
    }
}

/// Point the request at the session-relative path, keeping its query.
fn rebase(request: &mut Request, sub_path: &str) {
    let path = format!("/{}", sub_path.trim_start_matches('/'));
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };
    let Ok(path_and_query) = path_and_query.parse::<PathAndQuery>() else {
        return;
    };
    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    if let Ok(uri) = Uri::from_parts(parts) {
        *request.uri_mut() = uri;
    }
}
