//! Prometheus counters for both roles, registered lazily in the default registry

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, IntCounterVec, TextEncoder};

static CONSUMER_RESPONSES: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "calc_consumer_responses_total",
        "Responses sent by the compute pipeline",
        &["status"]
    )
    .unwrap()
});
static PRODUCER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "calc_producer_requests_total",
        "Requests issued by the load generator, by outcome",
        &["outcome"]
    )
    .unwrap()
});
static PRODUCER_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    prometheus::register_histogram!("calc_producer_latency_seconds", "Time from dispatch to buffered 200 body").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    ErrorResponse,
    TransportError,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::ErrorResponse => "error_response",
            Outcome::TransportError => "transport_error",
        }
    }
}

pub fn init() {
    let _ = &*CONSUMER_RESPONSES;
    let _ = &*PRODUCER_REQUESTS;
    let _ = &*PRODUCER_LATENCY;
}

pub fn record_response(status: u16) {
    let status = status.to_string();
    CONSUMER_RESPONSES.with_label_values(&[status.as_str()]).inc();
}

pub fn record_request(outcome: Outcome, elapsed: Option<Duration>) {
    PRODUCER_REQUESTS.with_label_values(&[outcome.as_str()]).inc();
    if let Some(elapsed) = elapsed {
        PRODUCER_LATENCY.observe(elapsed.as_secs_f64());
    }
}

pub fn consumer_responses(status: u16) -> u64 {
    let status = status.to_string();
    CONSUMER_RESPONSES.with_label_values(&[status.as_str()]).get()
}

pub fn producer_requests(outcome: Outcome) -> u64 {
    PRODUCER_REQUESTS.with_label_values(&[outcome.as_str()]).get()
}

/// Text exposition of the default registry: `(content type, body)`.
pub fn render() -> prometheus::Result<(String, Vec<u8>)> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_move_and_render() {
        let before = consumer_responses(418);
        record_response(418);
        assert_eq!(consumer_responses(418), before + 1);

        let before = producer_requests(Outcome::TransportError);
        record_request(Outcome::TransportError, None);
        assert_eq!(producer_requests(Outcome::TransportError), before + 1);

        let (content_type, body) = render().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(String::from_utf8(body).unwrap().contains("calc_consumer_responses_total"));
    }
}
