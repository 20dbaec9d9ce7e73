use std::{io, net::SocketAddr, sync::Arc};

use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    engine::VisualizationEngine,
    router::router,
    session::{RegistryConfig, SessionRegistry},
};

pub const DEFAULT_PREFIX: &str = "/pprof";

#[derive(Debug, Clone)]
pub struct ProfMuxConfig {
    pub bind: SocketAddr,
    /// Path prefix all session routes are mounted under.
    pub prefix: String,
    /// Serves session sub-paths no engine handler claims, e.g. shared
    /// assets or the operator's own diagnostics.
    pub fallback: Router,
    pub ct: CancellationToken,
}

impl ProfMuxConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            prefix: DEFAULT_PREFIX.to_string(),
            fallback: Router::new(),
            ct: CancellationToken::new(),
        }
    }
}

pub struct ProfMuxServer<E> {
    pub config: ProfMuxConfig,
    registry: Arc<SessionRegistry<E>>,
}

impl<E: VisualizationEngine> ProfMuxServer<E> {
    pub async fn serve(bind: SocketAddr, engine: E) -> io::Result<Self> {
        Self::serve_with_config(ProfMuxConfig::new(bind), engine).await
    }

    pub async fn serve_with_config(mut config: ProfMuxConfig, engine: E) -> io::Result<Self> {
        let listener = tokio::net::TcpListener::bind(config.bind).await?;
        // port 0 resolves to the actual port here
        config.bind = listener.local_addr()?;
        let (server, app) = Self::new(config, engine);
        let ct = server.config.ct.child_token();
        let registry = server.registry.clone();
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            ct.cancelled().await;
            tracing::info!("profmux server cancelled");
        });
        tokio::spawn(
            async move {
                if let Err(e) = serve.await {
                    tracing::error!(error = %e, "profmux server shutdown with error");
                }
                registry.shutdown().await;
            }
            .instrument(tracing::info_span!("profmux-server", bind_address = %server.config.bind)),
        );
        Ok(server)
    }

    /// Build the registry and the application router without binding a
    /// listener.
    pub fn new(config: ProfMuxConfig, engine: E) -> (Self, Router) {
        let registry = Arc::new(
            SessionRegistry::with_config(
                engine,
                RegistryConfig {
                    ui_prefix: normalize_prefix(&config.prefix),
                },
            )
            .with_fallback(config.fallback.clone()),
        );
        let app = mount(&config.prefix, router(registry.clone()));
        (Self { config, registry }, app)
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<E>> {
        &self.registry
    }

    pub fn cancel(&self) {
        self.config.ct.cancel();
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("/{prefix}")
    }
}

fn mount(prefix: &str, routes: Router) -> Router {
    let prefix = normalize_prefix(prefix);
    if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    }
}
