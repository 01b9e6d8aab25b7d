//! Single-shot POST client.
//!
//! [`HttpPostClient::post`] validates the descriptor up front and hands back a
//! future; nothing touches the network until it is polled. The future never
//! panics or propagates transport problems by unwinding: every failure is
//! logged and returned as a [`TransportError`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use calc_common::{CalcError, Result, TransportError};
use calc_obs::metrics::{self, Outcome};
use calc_obs::Logger;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use tokio::task::JoinHandle;

pub type PostResult = std::result::Result<PostResponse, TransportError>;

/// One outbound POST: where it goes, extra headers, and the body.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub url: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), ..Self::default() }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Target URL split into the parts a raw socket request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: Url,
    pub host: String,
    pub port: u16,
    pub path_and_query: String,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| CalcError::Config(format!("invalid url `{}`: {}", raw, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CalcError::Config(format!("url `{}` has no host", raw)))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| CalcError::Config(format!("url `{}` has no port and no default for its scheme", raw)))?;
        let mut path_and_query = url.path().to_string();
        if let Some(query) = url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }
        Ok(Self { url, host, port, path_and_query })
    }
}

#[derive(Debug, Clone)]
pub struct PostResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct HttpPostClient {
    http: reqwest::Client,
    logger: Arc<dyn Logger>,
}

impl HttpPostClient {
    pub fn new(logger: Arc<dyn Logger>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| CalcError::Config(format!("cannot build http client: {}", e)))?;
        Ok(Self { http, logger })
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Fails right away if the descriptor has no usable URL or headers.
    /// Otherwise returns the request as a future resolving to the buffered 200 response.
    pub fn post(&self, descriptor: RequestDescriptor) -> Result<impl Future<Output = PostResult> + Send + 'static> {
        let RequestDescriptor { url, headers, body } = descriptor;
        let raw_url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CalcError::Config("Required descriptor property `url` is missing".into()))?;
        let endpoint = Endpoint::parse(&raw_url)?;
        let request = self
            .http
            .post(endpoint.url.clone())
            .headers(header_map(&headers)?)
            .body(body.clone());
        let logger = Arc::clone(&self.logger);

        Ok(async move {
            tracing::debug!(
                target: "producers",
                host = %endpoint.host,
                port = endpoint.port,
                path = %endpoint.path_and_query,
                "dispatching POST"
            );
            let started = Instant::now();
            logger.info(&format!("REQUEST  \"POST {}\" -     - [{}]", raw_url, body));

            let mut response = match request.send().await {
                Ok(response) => response,
                Err(err) => return Err(request_failed(logger.as_ref(), &err)),
            };

            let status = response.status();
            if status != StatusCode::OK {
                // Body is left unread for anything but 200.
                let err = TransportError::Status {
                    code: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                };
                logger.error(&format!("Encountered error response: {}", err));
                metrics::record_request(Outcome::ErrorResponse, None);
                return Err(err);
            }

            let mut buffer = Vec::new();
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => buffer.extend_from_slice(&chunk),
                    Ok(None) => break,
                    Err(err) => return Err(request_failed(logger.as_ref(), &err)),
                }
            }
            let text = String::from_utf8_lossy(&buffer).into_owned();
            let elapsed = started.elapsed();

            // RESPONSE "POST http://localhost:3000/compute" - 200 - [8.42 * 3.68 = 30.9856] 2ms
            logger.info(&format!(
                "RESPONSE \"POST {}\" - {} - [{}] {}ms",
                raw_url,
                status.as_u16(),
                text,
                elapsed.as_millis()
            ));
            metrics::record_request(Outcome::Ok, Some(elapsed));
            Ok(PostResponse { status, headers: response.headers().clone(), body: text, elapsed })
        })
    }

    /// [`post`](Self::post), spawned. Awaiting the handle is optional; dropping it
    /// leaves the request running.
    pub fn dispatch(&self, descriptor: RequestDescriptor) -> Result<JoinHandle<PostResult>> {
        let request = self.post(descriptor)?;
        Ok(tokio::spawn(request))
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CalcError::Config(format!("invalid header name `{}`: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| CalcError::Config(format!("invalid value for header `{}`: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn request_failed(logger: &dyn Logger, err: &reqwest::Error) -> TransportError {
    let message = error_chain(err);
    logger.error(&format!("Encountered problem making request: {}", message));
    metrics::record_request(Outcome::TransportError, None);
    TransportError::Request(message)
}

/// reqwest keeps the interesting part (e.g. "Connection refused") in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
