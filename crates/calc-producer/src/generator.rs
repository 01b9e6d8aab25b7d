use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use calc_common::{CalcError, Result};
use calc_core::randomizer::{random_expression, ExpressionShape};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::client::{Endpoint, HttpPostClient, RequestDescriptor};

/// Fixed request rate; one request every `1 / requests_per_second` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSchedule {
    requests_per_second: f64,
}

impl RateSchedule {
    pub fn new(requests_per_second: f64) -> Result<Self> {
        if !(requests_per_second.is_finite() && requests_per_second > 0.0) {
            return Err(CalcError::Config(format!(
                "requests per second must be a positive number, got {}",
                requests_per_second
            )));
        }
        Ok(Self { requests_per_second })
    }

    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.requests_per_second).max(Duration::from_nanos(1))
    }
}

/// Fires random expressions at a target on a fixed schedule until stopped.
///
/// Requests are fire-and-forget: a slow target does not delay the next tick,
/// so in-flight requests pile up without bound.
pub struct LoadGenerator {
    shot: Shot,
    schedule: RateSchedule,
    ticker: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct Shot {
    client: HttpPostClient,
    target_url: String,
    shape: ExpressionShape,
    issued: Arc<AtomicU64>,
}

impl Shot {
    fn fire(&self) {
        let descriptor = RequestDescriptor::new(self.target_url.as_str())
            .header("Content-Type", "text/plain")
            .body(random_expression(&self.shape));
        match self.client.dispatch(descriptor) {
            Ok(_in_flight) => {
                self.issued.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => self.client.logger().error(&format!("Could not issue request: {}", err)),
        }
    }
}

impl LoadGenerator {
    pub fn new(client: HttpPostClient, target_url: impl Into<String>, schedule: RateSchedule) -> Result<Self> {
        let target_url = target_url.into();
        Endpoint::parse(&target_url)?;
        Ok(Self {
            shot: Shot {
                client,
                target_url,
                shape: ExpressionShape::default(),
                issued: Arc::new(AtomicU64::new(0)),
            },
            schedule,
            ticker: None,
        })
    }

    pub fn with_shape(mut self, shape: ExpressionShape) -> Self {
        self.shot.shape = shape;
        self
    }

    /// Issues one request now and then one per interval. Must run inside a tokio
    /// runtime. Calling it while already running does nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.shot.fire();

        let shot = self.shot.clone();
        let period = self.schedule.interval();
        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shot.fire();
            }
        }));
    }

    /// Cancels future ticks only; requests already in flight finish on their own.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn issued(&self) -> u64 {
        self.shot.issued.load(Ordering::Relaxed)
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    pub fn target_url(&self) -> &str {
        &self.shot.target_url
    }
}

impl Drop for LoadGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}
