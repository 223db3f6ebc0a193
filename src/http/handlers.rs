use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::validation::is_fail_rate;
use crate::http::server::AppState;
use crate::observability::metrics::{self, CallOutcome};
use crate::resilience::{BreakerError, CircuitBreaker, State as BreakerState};
use crate::services;

const DEFAULT_SERVICE: &str = "service-a";

#[derive(Debug, Deserialize)]
pub struct CallParams {
    pub service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub request_id: Uuid,
    pub service: String,
    pub state: BreakerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BreakerStatus {
    pub state: BreakerState,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub window_failure_rate: f64,
    pub last_state_change_secs_ago: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FailRateUpdate {
    pub service: String,
    pub fail_rate: f64,
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// `GET /api/call?service=<name>`: call a simulated service through its breaker.
pub async fn call_service(
    State(state): State<AppState>,
    Query(params): Query<CallParams>,
) -> Response {
    let name = params.service.unwrap_or_else(|| DEFAULT_SERVICE.to_string());
    let Some(profile) = state.services.profile(&name) else {
        return bad_request(format!("unknown service: {name}"));
    };

    let breaker = state.registry.get_or_create(&name);
    let request_id = Uuid::new_v4();
    tracing::debug!(request_id = %request_id, service = %name, "Calling service");

    // Caller-side deadline; calls it cuts short are not held against the breaker.
    let cancel = CancellationToken::new();
    let deadline = {
        let cancel = cancel.clone();
        let after = state.call_deadline;
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            cancel.cancel();
        })
    };

    let service = name.clone();
    let result = breaker
        .call(&cancel, |token| async move {
            services::invoke(&service, profile, token).await
        })
        .await;
    deadline.abort();

    let outcome = match &result {
        Ok(_) => CallOutcome::Success,
        Err(BreakerError::CircuitOpen) => CallOutcome::Rejected,
        Err(_) if cancel.is_cancelled() => CallOutcome::Cancelled,
        Err(_) => CallOutcome::Failure,
    };
    metrics::record_call(&name, outcome);

    let mut body = CallResponse {
        request_id,
        service: name,
        state: breaker.state(),
        result: None,
        error: None,
    };
    match result {
        Ok(value) => {
            body.result = Some(value);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Service call failed");
            body.error = Some(e.to_string());
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// `GET /api/status`: metrics of every registered breaker.
pub async fn status(State(state): State<AppState>) -> Json<BTreeMap<String, BreakerStatus>> {
    let statuses = state
        .registry
        .snapshot_all()
        .into_iter()
        .map(|(name, breaker)| {
            let status = breaker_status(&name, &breaker);
            (name, status)
        })
        .collect();

    Json(statuses)
}

/// Read one breaker's metrics, refreshing its state gauge.
///
/// Transition observers may report out of order, so the gauge is
/// re-synced from the breaker itself whenever status is read.
pub fn breaker_status(name: &str, breaker: &CircuitBreaker) -> BreakerStatus {
    let m = breaker.metrics();
    metrics::record_state(name, m.state);
    BreakerStatus {
        state: m.state,
        total_requests: m.total_requests,
        total_successes: m.total_successes,
        total_failures: m.total_failures,
        window_failure_rate: m.window_failure_rate,
        last_state_change_secs_ago: m.last_state_change.elapsed().as_secs_f64(),
    }
}

/// `POST /api/config`: change a simulated service's failure probability.
pub async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<FailRateUpdate>,
) -> Response {
    if !is_fail_rate(update.fail_rate) {
        return bad_request(format!(
            "fail_rate must be in [0, 1], got {}",
            update.fail_rate
        ));
    }
    if !state.services.set_fail_rate(&update.service, update.fail_rate) {
        return bad_request(format!("unknown service: {}", update.service));
    }

    tracing::info!(service = %update.service, fail_rate = update.fail_rate, "Fail rate updated");
    Json(update).into_response()
}

pub async fn health() -> &'static str {
    "ok"
}
