//! The `/compute` request chain.
//!
//! Every request walks the same stages in order over one [`PipelineContext`]:
//! request log, compute (only under `/compute`), response log. A body that
//! cannot be captured never reaches the stages; it is logged by
//! [`ComputePipeline::log_failure`] instead.

use std::borrow::Cow;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, StatusCode, Version};
use calc_core::evaluator::{evaluate_string, format_number};
use calc_obs::Logger;

pub const COMPUTE_PATH: &str = "/compute";

/// Largest request body the consumer reads: 100 KiB.
pub const BODY_LIMIT: usize = 100 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request body could not be read: {0}")]
    BodyCapture(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::BodyCapture(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Reads the whole body, failing once it grows past `limit` bytes.
pub async fn capture_body(body: Body, limit: usize) -> Result<Bytes, PipelineError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|err| PipelineError::BodyCapture(err.to_string()))
}

/// Per-request state shared by the stages. Built once the body has been read in full.
#[derive(Debug)]
pub struct PipelineContext {
    pub method: Method,
    /// Request target as received, query included.
    pub path: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub raw_body: Bytes,
    pub status: Option<StatusCode>,
    pub response_body: Option<String>,
}

impl PipelineContext {
    pub fn new(method: Method, path: impl Into<String>, version: Version, headers: HeaderMap, raw_body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            version,
            headers,
            raw_body,
            status: None,
            response_body: None,
        }
    }

    pub fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.path, http_version(self.version))
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_body)
    }

    /// Status as it stands: nothing routed yet means 404.
    pub fn current_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::NOT_FOUND)
    }

    fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }

    fn respond(&mut self, status: StatusCode, body: Option<String>) {
        self.status = Some(status);
        self.response_body = body;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LogRequest,
    Compute,
    LogResponse,
}

pub const STAGES: [Stage; 3] = [Stage::LogRequest, Stage::Compute, Stage::LogResponse];

pub struct ComputePipeline {
    logger: Arc<dyn Logger>,
}

impl ComputePipeline {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    /// Runs every stage in order over `ctx`.
    pub async fn run(&self, ctx: &mut PipelineContext) {
        for stage in STAGES {
            self.run_stage(stage, ctx).await;
        }
    }

    async fn run_stage(&self, stage: Stage, ctx: &mut PipelineContext) {
        match stage {
            Stage::LogRequest => self.log_request(ctx),
            Stage::Compute if is_mounted_at(ctx.route(), COMPUTE_PATH) => compute(ctx).await,
            Stage::Compute => {}
            Stage::LogResponse => self.log_response(ctx),
        }
    }

    fn log_request(&self, ctx: &PipelineContext) {
        self.logger.info(&format!("REQUEST  \"{}\" -     - [{}]", ctx.request_line(), ctx.body_text()));
    }

    fn log_response(&self, ctx: &PipelineContext) {
        self.logger.info(&format!(
            "RESPONSE \"{}\" - {} - [{}]",
            ctx.request_line(),
            ctx.current_status().as_u16(),
            ctx.response_body.as_deref().unwrap_or_default()
        ));
    }

    pub fn log_failure(&self, ctx: &PipelineContext, err: &PipelineError) {
        self.logger.error(&format!("\"{}\" - [{}] - {}", ctx.request_line(), ctx.body_text(), err));
    }
}

async fn compute(ctx: &mut PipelineContext) {
    if ctx.method != Method::POST {
        ctx.respond(StatusCode::METHOD_NOT_ALLOWED, None);
        return;
    }
    let content_type = ctx.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if content_type != Some("text/plain") {
        ctx.respond(StatusCode::NOT_ACCEPTABLE, None);
        return;
    }

    // Invalid UTF-8 sequences decode to U+FFFD.
    let body = ctx.body_text().into_owned();
    let (status, text) = match evaluate_string(&body).await {
        // Echo the expression exactly as sent and append the result: "1 + 2 = " -> "1 + 2 = 3".
        Ok(result) => (StatusCode::OK, format!("{}{}", body, format_number(result))),
        Err(err) => (StatusCode::BAD_REQUEST, format!("Invalid syntax: {}", err)),
    };
    ctx.respond(status, Some(text));
}

/// Prefix mount match: `/compute` covers `/compute`, `/compute/x` and `/compute.x`,
/// ignoring ASCII case.
pub fn is_mounted_at(route: &str, mount: &str) -> bool {
    let Some(head) = route.get(..mount.len()) else { return false };
    if !head.eq_ignore_ascii_case(mount) {
        return false;
    }
    matches!(route[mount.len()..].chars().next(), None | Some('/') | Some('.'))
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}
