//! End-to-end tests of the demo HTTP API.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

async fn get_json(client: &reqwest::Client, url: &str) -> (StatusCode, Value) {
    let res = client.get(url).send().await.expect("server unreachable");
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_call_stable_service() {
    let server = common::start_server(common::test_config()).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, &server.url("/api/call?service=stable")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "stable");
    assert_eq!(body["state"], "closed");
    assert!(body["result"].as_str().unwrap().starts_with("response from stable"));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_unknown_service_rejected() {
    let server = common::start_server(common::test_config()).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, &server.url("/api/call?service=nope")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown service: nope");
}

#[tokio::test]
async fn test_flaky_service_trips_and_recovers() {
    let server = common::start_server(common::test_config()).await;
    let client = reqwest::Client::new();
    let call = server.url("/api/call?service=flaky");

    // min_requests = 5 failures trip the breaker.
    for i in 0..5 {
        let (status, body) = get_json(&client, &call).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "flaky: internal server error", "call {i}");
    }

    let (status, body) = get_json(&client, &call).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "circuit breaker is open");
    assert_eq!(body["state"], "open");

    // Heal the service, wait out the recovery timeout, probe twice.
    let res = client
        .post(server.url("/api/config"))
        .json(&json!({ "service": "flaky", "fail_rate": 0.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, body) = get_json(&client, &call).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "half-open");

    let (status, body) = get_json(&client, &call).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "closed");
}

#[tokio::test]
async fn test_status_reports_every_breaker() {
    let server = common::start_server(common::test_config()).await;
    let client = reqwest::Client::new();

    get_json(&client, &server.url("/api/call?service=stable")).await;
    get_json(&client, &server.url("/api/call?service=flaky")).await;

    let (status, body) = get_json(&client, &server.url("/api/status")).await;
    assert_eq!(status, StatusCode::OK);

    let stable = &body["stable"];
    assert_eq!(stable["state"], "closed");
    assert_eq!(stable["total_requests"], 1);
    assert_eq!(stable["total_successes"], 1);
    assert_eq!(stable["window_failure_rate"], 0.0);

    let flaky = &body["flaky"];
    assert_eq!(flaky["total_failures"], 1);
    assert_eq!(flaky["window_failure_rate"], 1.0);
    assert!(flaky["last_state_change_secs_ago"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_config_update_validation() {
    let server = common::start_server(common::test_config()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/config"))
        .json(&json!({ "service": "stable", "fail_rate": 1.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url("/api/config"))
        .json(&json!({ "service": "ghost", "fail_rate": 0.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(server.url("/api/config")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_deadline_hits_do_not_trip() {
    let mut config = common::test_config();
    config.call.deadline_ms = 20;
    config.services.push(circuit_guard::config::ServiceConfig {
        min_latency_ms: 5_000,
        max_latency_ms: 5_000,
        ..circuit_guard::config::ServiceConfig::new("slow", 0.0)
    });
    let server = common::start_server(config).await;
    let client = reqwest::Client::new();

    for _ in 0..6 {
        let (status, body) = get_json(&client, &server.url("/api/call?service=slow")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "slow: call cancelled by caller");
        assert_eq!(body["state"], "closed");
    }

    let (_, body) = get_json(&client, &server.url("/api/status")).await;
    assert_eq!(body["slow"]["total_requests"], 6);
    assert_eq!(body["slow"]["total_failures"], 0);
    assert_eq!(body["slow"]["window_failure_rate"], 0.0);
}

#[tokio::test]
async fn test_reload_registers_new_service() {
    let server = common::start_server(common::test_config()).await;
    let client = reqwest::Client::new();

    let mut update = common::test_config();
    update.services.push(common::instant_service("added", 0.0));
    server.config_updates.send(update).unwrap();

    let mut status = StatusCode::BAD_REQUEST;
    for _ in 0..50 {
        status = get_json(&client, &server.url("/api/call?service=added")).await.0;
        if status == StatusCode::OK {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, StatusCode::OK);
}
