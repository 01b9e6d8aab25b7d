//! Consumer HTTP API: the `/compute` pipeline plus health and metrics

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use calc_obs::{metrics, Logger};
use tokio::net::TcpListener;

pub mod pipeline;

pub use pipeline::{capture_body, ComputePipeline, PipelineContext, PipelineError, BODY_LIMIT, COMPUTE_PATH};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ComputePipeline>,
}

/// Everything except the health and metrics routes goes through the pipeline,
/// so unknown paths are logged too and answered with 404.
pub fn app(logger: Arc<dyn Logger>) -> Router {
    metrics::init();
    let state = AppState { pipeline: Arc::new(ComputePipeline::new(logger)) };

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(render_metrics))
        .fallback(handle)
        .with_state(state)
}

/// Serves until `shutdown` resolves; open connections are allowed to finish.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let (status, body) = match capture_body(body, BODY_LIMIT).await {
        Ok(raw_body) => {
            let mut ctx = PipelineContext::new(method, path, version, headers, raw_body);
            state.pipeline.run(&mut ctx).await;
            (ctx.current_status(), ctx.response_body)
        }
        Err(err) => {
            let ctx = PipelineContext::new(method, path, version, headers, Bytes::new());
            state.pipeline.log_failure(&ctx, &err);
            (err.status(), None)
        }
    };

    metrics::record_response(status.as_u16());
    match body {
        Some(text) => (status, text).into_response(),
        None => status.into_response(),
    }
}

async fn render_metrics() -> Response {
    match metrics::render() {
        Ok((content_type, buffer)) => ([(header::CONTENT_TYPE, content_type)], buffer).into_response(),
        Err(err) => {
            tracing::error!(target: "api", "metrics encoding failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
