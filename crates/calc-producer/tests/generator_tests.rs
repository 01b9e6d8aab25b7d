use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{http::HeaderMap, routing::post, Router};
use calc_common::CalcError;
use calc_core::evaluator::evaluate_str;
use calc_obs::MemoryLogger;
use calc_producer::{HttpPostClient, LoadGenerator, RateSchedule};

#[test]
fn schedule_rejects_non_positive_rates() {
    for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(RateSchedule::new(rate), Err(CalcError::Config(_))), "{rate}");
    }
    assert_eq!(RateSchedule::new(10.0).unwrap().interval(), Duration::from_millis(100));
    assert_eq!(RateSchedule::new(4.0).unwrap().interval(), Duration::from_millis(250));
    assert_eq!(RateSchedule::new(0.5).unwrap().interval(), Duration::from_secs(2));
}

#[tokio::test]
async fn generator_needs_a_usable_target() {
    let client = HttpPostClient::new(MemoryLogger::new()).unwrap();
    let schedule = RateSchedule::new(10.0).unwrap();
    assert!(matches!(LoadGenerator::new(client, "nowhere", schedule), Err(CalcError::Config(_))));
}

#[tokio::test]
async fn issues_at_rate_then_stops() {
    let hits = Arc::new(AtomicU64::new(0));
    let bodies: Arc<Mutex<Vec<(Option<String>, String)>>> = Arc::default();
    let (h, b) = (hits.clone(), bodies.clone());
    let app = Router::new().route(
        "/compute",
        post(move |headers: HeaderMap, body: String| {
            let (h, b) = (h.clone(), b.clone());
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                let ct = headers.get("content-type").and_then(|v| v.to_str().ok()).map(String::from);
                b.lock().unwrap().push((ct, body.clone()));
                body
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let client = HttpPostClient::new(MemoryLogger::new()).unwrap();
    let mut generator = LoadGenerator::new(
        client,
        format!("http://{}/compute", addr),
        RateSchedule::new(20.0).unwrap(),
    )
    .unwrap();

    generator.start();
    assert_eq!(generator.issued(), 1, "first request goes out immediately");
    generator.start();
    assert_eq!(generator.issued(), 1, "second start is a no-op");

    tokio::time::sleep(Duration::from_millis(1050)).await;
    assert!(generator.issued() >= 20, "issued {}", generator.issued());

    generator.stop();
    assert!(!generator.is_running());
    let issued = generator.issued();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(generator.issued(), issued);
    generator.stop();

    for _ in 0..100 {
        if hits.load(Ordering::SeqCst) >= issued {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), issued);
    for (content_type, body) in bodies.lock().unwrap().iter() {
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        assert!(evaluate_str(body).is_ok(), "{body:?}");
    }
}
