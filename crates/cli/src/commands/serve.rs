//! `stepwright serve-report`: serve a results directory over HTTP

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use stepwright_e2e::TestSuiteResult;
use stepwright_report::ResultsWriter;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Results directory written by `stepwright run`
    #[arg(long, default_value = "test-results")]
    pub dir: PathBuf,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1:8090")]
    pub addr: SocketAddr,
}

pub async fn execute(args: ServeArgs) -> anyhow::Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("results directory {} does not exist", args.dir.display());
    }

    info!("Serving {} on http://{}", args.dir.display(), args.addr);

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, router(args.dir)).await?;

    Ok(())
}

/// `/api/results` (suite summary), `/api/scenarios` (every scenario report)
/// and the raw directory for everything else
pub fn router(dir: PathBuf) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/results", get(results_handler))
        .route("/api/scenarios", get(scenarios_handler))
        .fallback_service(ServeDir::new(&dir))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(dir))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stepwright-report"
    }))
}

async fn results_handler(State(dir): State<Arc<PathBuf>>) -> impl IntoResponse {
    let path = dir.join("test-results.json");
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "no results written yet"),
    };

    match serde_json::from_str::<TestSuiteResult>(&content) {
        Ok(suite) => Json(suite).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn scenarios_handler(State(dir): State<Arc<PathBuf>>) -> impl IntoResponse {
    let dir = dir.as_ref().clone();
    match tokio::task::spawn_blocking(move || ResultsWriter::read_all(&dir)).await {
        Ok(Ok(reports)) => Json(reports).into_response(),
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwright_e2e::scenario::write_results;

    async fn spawn(dir: PathBuf) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(dir)).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_results_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let addr = spawn(dir.path().to_path_buf()).await;
        let url = format!("http://{}/api/results", addr);

        let missing = reqwest::get(&url).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        write_results(dir.path(), &TestSuiteResult::from_results(vec![], 5)).unwrap();

        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["total"], 0);
        assert_eq!(body["duration_ms"], 5);

        let raw = reqwest::get(format!("http://{}/test-results.json", addr)).await.unwrap();
        assert!(raw.status().is_success());

        let scenarios: serde_json::Value = reqwest::get(format!("http://{}/api/scenarios", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(scenarios, serde_json::json!([]));
    }
}
