use std::{net::SocketAddr, time::Duration};

use axum::{Router, routing::get};
use profmux::{FetchEngine, FetchEngineConfig, ProfMuxServer};
use tokio_util::sync::CancellationToken;

mod common;
use common::init;

const HEAP_PROFILE: &[u8] = b"\x1f\x8b\x08\x00fake-heap-profile";

/// A target exposing pprof endpoints, some of them broken.
async fn spawn_target(ct: CancellationToken) -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/debug/pprof/heap", get(|| async { HEAP_PROFILE }))
        .route(
            "/debug/pprof/profile",
            get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { ct.cancelled().await })
            .await;
    });
    Ok(addr)
}

async fn spawn_mux() -> anyhow::Result<ProfMuxServer<FetchEngine>> {
    let engine = FetchEngine::new(FetchEngineConfig {
        timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    })?;
    Ok(ProfMuxServer::serve("127.0.0.1:0".parse()?, engine).await?)
}

#[tokio::test]
async fn test_fetch_engine_session_round_trip() -> anyhow::Result<()> {
    init().await;
    let ct = CancellationToken::new();
    let target = spawn_target(ct.clone()).await?;
    let mux = spawn_mux().await?;
    let base = format!("http://{}/pprof/{target}/heap", mux.config.bind);
    let client = reqwest::Client::new();

    let id = client
        .get(format!("{base}/create"))
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    assert_eq!(id, "1");

    let index = client.get(format!("{base}/{id}/")).send().await?;
    assert_eq!(index.status(), reqwest::StatusCode::OK);
    let index = index.text().await?;
    assert!(index.contains(&format!("http://{target}/debug/pprof/heap")));

    let raw = client.get(format!("{base}/{id}/raw")).send().await?;
    assert_eq!(
        raw.headers()["content-disposition"],
        "attachment; filename=\"heap.pb.gz\""
    );
    assert_eq!(raw.bytes().await?.as_ref(), HEAP_PROFILE);

    let summary: serde_json::Value = serde_json::from_str(
        &client
            .get(format!("{base}/{id}/summary"))
            .send()
            .await?
            .text()
            .await?,
    )?;
    assert_eq!(summary["session_id"], 1);
    assert_eq!(summary["profile"], "heap");
    assert_eq!(summary["size_bytes"], HEAP_PROFILE.len());

    let deleted = client
        .get(format!("{base}/delete/{id}"))
        .send()
        .await?
        .text()
        .await?;
    assert_eq!(deleted, "OK");
    assert!(!mux.registry().is_running(1.into()).await);

    mux.cancel();
    ct.cancel();
    Ok(())
}

#[tokio::test]
async fn test_fetch_engine_reports_target_errors() -> anyhow::Result<()> {
    init().await;
    let ct = CancellationToken::new();
    let target = spawn_target(ct.clone()).await?;
    let mux = spawn_mux().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "http://{}/pprof/{target}/profile/create",
            mux.config.bind
        ))
        .send()
        .await?;
    assert_eq!(
        response.status(),
        reqwest::StatusCode::INTERNAL_SERVER_ERROR
    );
    let body = response.text().await?;
    assert!(body.contains("503"), "unexpected error body: {body}");
    assert!(mux.registry().is_empty().await);

    mux.cancel();
    ct.cancel();
    Ok(())
}

#[tokio::test]
async fn test_fetch_engine_reports_unreachable_target() -> anyhow::Result<()> {
    init().await;
    // bind and drop to get a port nobody listens on
    let unused = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await?
        .local_addr()?;
    let mux = spawn_mux().await?;

    let response = reqwest::get(format!(
        "http://{}/pprof/{unused}/heap/create",
        mux.config.bind
    ))
    .await?;
    assert_eq!(
        response.status(),
        reqwest::StatusCode::INTERNAL_SERVER_ERROR
    );
    assert!(!response.text().await?.is_empty());
    assert!(mux.registry().is_empty().await);

    mux.cancel();
    Ok(())
}
