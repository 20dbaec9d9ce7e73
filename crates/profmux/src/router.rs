use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
    routing::any,
};
use serde::Deserialize;

use crate::{
    engine::VisualizationEngine,
    error::MuxError,
    session::{SessionId, SessionRegistry},
};

#[derive(Debug, Deserialize)]
struct TargetPath {
    host_and_port: String,
    profile: String,
}

#[derive(Debug, Deserialize)]
struct SessionPath {
    host_and_port: String,
    profile: String,
    pid: String,
    rest: Option<String>,
}

fn parse_pid(raw: &str) -> Result<SessionId, MuxError> {
    raw.parse().map_err(|_| MuxError::invalid_identifier(raw))
}

async fn create_handler<E: VisualizationEngine>(
    State(registry): State<Arc<SessionRegistry<E>>>,
    Path(TargetPath {
        host_and_port,
        profile,
    }): Path<TargetPath>,
) -> Result<String, MuxError> {
    let id = registry.create(&host_and_port, &profile).await?;
    Ok(id.to_string())
}

async fn delete_handler<E: VisualizationEngine>(
    State(registry): State<Arc<SessionRegistry<E>>>,
    Path(SessionPath {
        host_and_port,
        profile,
        pid,
        ..
    }): Path<SessionPath>,
) -> Result<&'static str, MuxError> {
    let id = parse_pid(&pid)?;
    registry.delete(id, &host_and_port, &profile).await?;
    Ok("OK")
}

async fn serve_handler<E: VisualizationEngine>(
    State(registry): State<Arc<SessionRegistry<E>>>,
    Path(SessionPath {
        host_and_port,
        profile,
        pid,
        rest,
    }): Path<SessionPath>,
    request: Request,
) -> Response {
    let result = match parse_pid(&pid) {
        Ok(id) => {
            let sub_path = rest.unwrap_or_default();
            registry
                .serve(id, &host_and_port, &profile, &sub_path, request)
                .await
        }
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| {
        tracing::debug!(%pid, error = %e, "rejecting session request");
        e.into_response()
    })
}

/// Routes for creating, deleting and browsing sessions, relative to the
/// prefix the caller mounts them under.
///
/// | path | effect |
/// |---|---|
/// | `/{host:port}/{profile}/create` | start a session, respond with its id |
/// | `/{host:port}/{profile}/delete/{pid}` | delete the session, respond `OK` |
/// | `/{host:port}/{profile}/{pid}/` | the session's root page |
/// | `/{host:port}/{profile}/{pid}/{*rest}` | any other session resource |
pub fn router<E: VisualizationEngine>(registry: Arc<SessionRegistry<E>>) -> Router {
    Router::new()
        .route("/{host_and_port}/{profile}/create", any(create_handler::<E>))
        .route(
            "/{host_and_port}/{profile}/delete/{pid}",
            any(delete_handler::<E>),
        )
        .route("/{host_and_port}/{profile}/{pid}/", any(serve_handler::<E>))
        .route(
            "/{host_and_port}/{profile}/{pid}/{*rest}",
            any(serve_handler::<E>),
        )
        .with_state(registry)
}
