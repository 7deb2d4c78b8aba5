//! Per-client request budgets on the upload route.

use std::sync::Arc;

use artist_enricher::config::AppConfig;

mod common;

use common::{client, csv_form, start_server, RecordingEnricher};

fn tight_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.rate_limit.upload_limits = vec!["3 per minute".to_string()];
    config
}

#[tokio::test]
async fn test_budget_exhausted_returns_429() {
    let enricher = Arc::new(RecordingEnricher::default());
    let server = start_server(tight_config(), enricher.clone()).await;
    let client = client();

    // Rejected uploads still spend budget.
    for _ in 0..3 {
        let res = client
            .post(server.url())
            .multipart(csv_form("notes.txt", "x"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 303);
    }

    let res = client
        .post(server.url())
        .multipart(csv_form("artists.csv", "Performer 1 Name\nLow\n"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 429);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after >= 1 && retry_after <= 60, "retry-after was {retry_after}");
    let body = res.text().await.unwrap();
    assert!(body.contains("Too many requests. Please try again later."));

    assert!(enricher.calls.lock().unwrap().is_empty());
    assert_eq!(server.leftover_files(), 0);
}

#[tokio::test]
async fn test_denied_requests_stay_denied() {
    let server = start_server(tight_config(), Arc::new(RecordingEnricher::default())).await;
    let client = client();

    for _ in 0..3 {
        client.get(server.url()).send().await.unwrap();
    }
    for _ in 0..5 {
        let res = client.get(server.url()).send().await.unwrap();
        assert_eq!(res.status(), 429);
    }
}

#[tokio::test]
async fn test_health_is_not_limited() {
    let server = start_server(tight_config(), Arc::new(RecordingEnricher::default())).await;
    let client = client();

    for _ in 0..4 {
        client.get(server.url()).send().await.unwrap();
    }

    for _ in 0..10 {
        let res = client
            .get(format!("http://{}/health", server.addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }
}

#[tokio::test]
async fn test_disabled_limiter_admits_everything() {
    let mut config = tight_config();
    config.rate_limit.enabled = false;
    let server = start_server(config, Arc::new(RecordingEnricher::default())).await;
    let client = client();

    for _ in 0..10 {
        let res = client.get(server.url()).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
}

#[tokio::test]
async fn test_reset_restores_budget() {
    let server = start_server(tight_config(), Arc::new(RecordingEnricher::default())).await;
    let client = client();

    for _ in 0..3 {
        client.get(server.url()).send().await.unwrap();
    }
    let res = client.get(server.url()).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(server.rate_limiter.tracked_clients(), 1);

    server.rate_limiter.reset();

    let res = client.get(server.url()).send().await.unwrap();
    assert_eq!(res.status(), 200);
}
