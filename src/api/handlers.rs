use crate::api::responses::{
    DoorSuccessResponse, ErrorCode, ErrorResponse, HealthStatus, HealthSuccessResponse,
    TelemetrySuccessResponse,
};
use crate::state::AgentState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const EPOCH_FALLBACK: &str = "1970-01-01T00:00:00Z";

/// A JSON body with its status code; errors share one body shape.
pub enum ApiResponse<T> {
    Success { status: StatusCode, body: T },
    Error { status: StatusCode, body: ErrorResponse },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(state): State<Arc<RwLock<AgentState>>>) -> impl IntoResponse {
    build_health_response(&state, SystemTime::now())
}

pub async fn get_door(State(state): State<Arc<RwLock<AgentState>>>) -> impl IntoResponse {
    build_door_response(&state, SystemTime::now())
}

pub async fn get_telemetry(State(state): State<Arc<RwLock<AgentState>>>) -> impl IntoResponse {
    build_telemetry_response(&state, SystemTime::now())
}

fn build_health_response(
    state: &RwLock<AgentState>,
    now: SystemTime,
) -> ApiResponse<HealthSuccessResponse> {
    let Ok(guard) = state.read() else {
        return internal_error("/api/health", "state lock poisoned");
    };
    let link = guard.link().clone();
    let has_door = guard.door().is_some();
    let device_id = guard.device().to_string();
    drop(guard);

    let status = derive_health_status(link.connected, has_door);
    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
    };

    ApiResponse::Success {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            device_id,
            broker_connected: link.connected,
            broker_connections: link.connections,
            broker_failed_attempts: link.failed_attempts,
            last_connected_at: link.last_connected_at.map(format_timestamp),
            timestamp: format_timestamp(now),
        },
    }
}

fn derive_health_status(connected: bool, has_door: bool) -> HealthStatus {
    match (connected, has_door) {
        (true, true) => HealthStatus::Ok,
        (false, false) => HealthStatus::Ko,
        _ => HealthStatus::Degraded,
    }
}

fn build_door_response(
    state: &RwLock<AgentState>,
    now: SystemTime,
) -> ApiResponse<DoorSuccessResponse> {
    let Ok(guard) = state.read() else {
        return internal_error("/api/door", "state lock poisoned");
    };
    let door = guard.door().cloned();
    drop(guard);

    match door {
        Some(door) => ApiResponse::Success {
            status: StatusCode::OK,
            body: DoorSuccessResponse {
                state: door.state,
                distance_cm: door.distance.centimeters(),
                out_of_range: door.distance.is_out_of_range(),
                since: format_timestamp(door.since),
                timestamp: format_timestamp(door.observed_at),
            },
        },
        None => no_data("No door reading available", now),
    }
}

fn build_telemetry_response(
    state: &RwLock<AgentState>,
    now: SystemTime,
) -> ApiResponse<TelemetrySuccessResponse> {
    let Ok(guard) = state.read() else {
        return internal_error("/api/telemetry", "state lock poisoned");
    };
    let telemetry = guard.telemetry().cloned();
    drop(guard);

    match telemetry {
        Some(telemetry) => ApiResponse::Success {
            status: StatusCode::OK,
            body: TelemetrySuccessResponse {
                temperature_celsius: telemetry.temperature_celsius,
                humidity_percent: telemetry.humidity_percent,
                timestamp: format_timestamp(telemetry.timestamp),
            },
        },
        None => no_data("No telemetry reported yet", now),
    }
}

fn no_data<T>(message: &str, now: SystemTime) -> ApiResponse<T> {
    ApiResponse::Error {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: ErrorResponse {
            error_code: ErrorCode::NoData,
            error_message: message.to_string(),
            timestamp: format_timestamp(now),
        },
    }
}

fn internal_error<T>(route: &str, message: &str) -> ApiResponse<T> {
    error!(route, message, "Internal error while handling request");
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: format_timestamp(SystemTime::now()),
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> String {
    OffsetDateTime::from(timestamp)
        .format(&Rfc3339)
        .unwrap_or_else(|err| {
            error!(error = %err, "Failed to format timestamp");
            EPOCH_FALLBACK.to_string()
        })
}
