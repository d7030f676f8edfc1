use crate::api::ServiceState;
use crate::api::responses::{
    AllEstimatesErrorCode, AllEstimatesErrorResponse, AllEstimatesResponse, EstimateErrorCode,
    EstimateErrorResponse, EstimateStatus, EstimateSuccessResponse, EventErrorCode,
    EventErrorResponse, EventSuccessResponse, HealthErrorCode, HealthErrorResponse, HealthStatus,
    HealthSuccessResponse, UnitEstimatesResponse, UnitRegisteredResponse, UnitResponse,
    UnitsErrorCode, UnitsErrorResponse, UnitsSuccessResponse,
};
use crate::estimation::Estimate;
use crate::store::{EventKind, StoreEvent, UnitRecord, UrgencyColor};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub pseudonym: String,
    pub unit: String,
    pub event_type: EventKind,
    #[serde(default)]
    pub urgency_color: Option<UrgencyColor>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub unit: String,
    pub urgency_color: UrgencyColor,
    pub query_time: String,
}

#[derive(Debug, Deserialize)]
pub struct AllEstimatesQuery {
    pub query_time: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUnitRequest {
    pub unit: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

pub enum EstimateResponse {
    Success(EstimateSuccessResponse),
    Error {
        status: StatusCode,
        body: EstimateErrorResponse,
    },
}

impl IntoResponse for EstimateResponse {
    fn into_response(self) -> Response {
        match self {
            EstimateResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            EstimateResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_estimate(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<EstimateRequest>,
) -> impl IntoResponse {
    build_estimate_response(state, request)
}

pub enum EventResponse {
    Success(EventSuccessResponse),
    Error {
        status: StatusCode,
        body: EventErrorResponse,
    },
}

impl IntoResponse for EventResponse {
    fn into_response(self) -> Response {
        match self {
            EventResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            EventResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_event(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<EventRequest>,
) -> impl IntoResponse {
    build_event_response(state, request)
}

pub enum EstimatesResponse {
    Success(AllEstimatesResponse),
    Error {
        status: StatusCode,
        body: AllEstimatesErrorResponse,
    },
}

impl IntoResponse for EstimatesResponse {
    fn into_response(self) -> Response {
        match self {
            EstimatesResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            EstimatesResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_all_estimates(
    State(state): State<Arc<ServiceState>>,
    Query(query): Query<AllEstimatesQuery>,
) -> impl IntoResponse {
    build_all_estimates_response(state, query)
}

pub enum UnitsResponse {
    Success(UnitsSuccessResponse),
    Error {
        status: StatusCode,
        body: UnitsErrorResponse,
    },
}

impl IntoResponse for UnitsResponse {
    fn into_response(self) -> Response {
        match self {
            UnitsResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            UnitsResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_units(State(state): State<Arc<ServiceState>>) -> impl IntoResponse {
    build_units_response(state, SystemTime::now())
}

pub enum RegisterUnitResponse {
    Success(UnitRegisteredResponse),
    Error {
        status: StatusCode,
        body: UnitsErrorResponse,
    },
}

impl IntoResponse for RegisterUnitResponse {
    fn into_response(self) -> Response {
        match self {
            RegisterUnitResponse::Success(body) => {
                (StatusCode::CREATED, Json(body)).into_response()
            }
            RegisterUnitResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn register_unit(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<RegisterUnitRequest>,
) -> impl IntoResponse {
    build_register_unit_response(state, request, SystemTime::now())
}

pub enum HealthResponse {
    Success {
        status: StatusCode,
        body: HealthSuccessResponse,
    },
    Error {
        status: StatusCode,
        body: HealthErrorResponse,
    },
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        match self {
            HealthResponse::Success { status, body } => (status, Json(body)).into_response(),
            HealthResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(state): State<Arc<ServiceState>>) -> impl IntoResponse {
    build_health_response(state, SystemTime::now())
}

fn build_estimate_response(state: Arc<ServiceState>, request: EstimateRequest) -> EstimateResponse {
    let query_time = match parse_timestamp(&request.query_time) {
        Ok(parsed) => parsed,
        Err(_) => {
            return estimate_invalid_timestamp(&request.query_time);
        }
    };

    let estimate = match state
        .estimator()
        .estimate(&request.unit, request.urgency_color, query_time)
    {
        Ok(estimate) => estimate,
        Err(err) => {
            return estimate_internal_error(&format!("estimate computation failed: {err}"));
        }
    };

    let formatted = match format_datetime(query_time) {
        Ok(formatted) => formatted,
        Err(_err) => {
            return estimate_internal_error("timestamp formatting failure");
        }
    };

    let (status, estimated_wait_minutes) = match estimate {
        Estimate::Minutes(minutes) => (EstimateStatus::Ok, Some(minutes)),
        Estimate::OffHours => (EstimateStatus::OffHours, None),
    };

    EstimateResponse::Success(EstimateSuccessResponse {
        unit: request.unit,
        urgency_color: request.urgency_color,
        status,
        estimated_wait_minutes,
        query_time: formatted,
    })
}

fn estimate_invalid_timestamp(raw: &str) -> EstimateResponse {
    warn!(query_time = raw, "Rejected estimate request with unparseable query_time");
    match format_timestamp(SystemTime::now()) {
        Ok(formatted) => EstimateResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: EstimateErrorResponse {
                error_code: EstimateErrorCode::InvalidTimestamp,
                error_message: "Could not parse query_time".to_string(),
                timestamp: formatted,
            },
        },
        Err(_err) => estimate_internal_error("timestamp formatting failure"),
    }
}

fn estimate_internal_error(message: &str) -> EstimateResponse {
    error!(
        message = message,
        "Internal error while handling /api/estimate"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    EstimateResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: EstimateErrorResponse {
            error_code: EstimateErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn build_event_response(state: Arc<ServiceState>, request: EventRequest) -> EventResponse {
    let timestamp = match parse_timestamp(&request.timestamp) {
        Ok(parsed) => parsed,
        Err(_) => {
            return event_invalid_timestamp(&request.timestamp);
        }
    };

    let event = match request.event_type {
        EventKind::Intake => StoreEvent::Intake,
        EventKind::Classification => match request.urgency_color {
            Some(color) => StoreEvent::Classification { color },
            None => {
                return missing_color_response();
            }
        },
    };

    let elapsed_minutes = match state
        .store()
        .ingest_event(&request.pseudonym, &request.unit, event, timestamp)
    {
        Ok(elapsed) => elapsed,
        Err(_) => {
            return event_internal_error("state lock poisoned while ingesting event");
        }
    };

    match format_datetime(timestamp) {
        Ok(formatted) => EventResponse::Success(EventSuccessResponse {
            unit: request.unit,
            event_type: request.event_type,
            elapsed_minutes,
            timestamp: formatted,
        }),
        Err(_err) => event_internal_error("timestamp formatting failure"),
    }
}

fn missing_color_response() -> EventResponse {
    match format_timestamp(SystemTime::now()) {
        Ok(formatted) => EventResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: EventErrorResponse {
                error_code: EventErrorCode::MissingColor,
                error_message: "Classification events require an urgency_color".to_string(),
                timestamp: formatted,
            },
        },
        Err(_err) => event_internal_error("timestamp formatting failure"),
    }
}

fn event_invalid_timestamp(raw: &str) -> EventResponse {
    warn!(timestamp = raw, "Rejected event with unparseable timestamp");
    match format_timestamp(SystemTime::now()) {
        Ok(formatted) => EventResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: EventErrorResponse {
                error_code: EventErrorCode::InvalidTimestamp,
                error_message: "Could not parse timestamp".to_string(),
                timestamp: formatted,
            },
        },
        Err(_err) => event_internal_error("timestamp formatting failure"),
    }
}

fn event_internal_error(message: &str) -> EventResponse {
    error!(
        message = message,
        "Internal error while handling /api/events"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    EventResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: EventErrorResponse {
            error_code: EventErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn build_all_estimates_response(
    state: Arc<ServiceState>,
    query: AllEstimatesQuery,
) -> EstimatesResponse {
    let query_time = match parse_timestamp(&query.query_time) {
        Ok(parsed) => parsed,
        Err(_) => {
            return all_estimates_invalid_timestamp(&query.query_time);
        }
    };

    let units = match state.store().units() {
        Ok(units) => units,
        Err(_) => {
            return all_estimates_internal_error("state lock poisoned while listing units");
        }
    };

    let mut estimates = Vec::with_capacity(units.len());
    for record in &units {
        let mut row = UnitEstimatesResponse {
            unit: record.name.clone(),
            blue: None,
            green: None,
            yellow: None,
            orange: None,
            red: None,
        };
        for color in UrgencyColor::ALL {
            let value = match state.estimator().estimate(&record.name, color, query_time) {
                Ok(Estimate::Minutes(minutes)) => Some(minutes),
                Ok(Estimate::OffHours) => None,
                Err(err) => {
                    return all_estimates_internal_error(&format!(
                        "estimate computation failed: {err}"
                    ));
                }
            };
            match color {
                UrgencyColor::Blue => row.blue = value,
                UrgencyColor::Green => row.green = value,
                UrgencyColor::Yellow => row.yellow = value,
                UrgencyColor::Orange => row.orange = value,
                UrgencyColor::Red => row.red = value,
            }
        }
        estimates.push(row);
    }

    // Shortest green wait first; off-hours rows keep registry order at
    // the end.
    estimates.sort_by(|a, b| match (a.green, b.green) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    match format_datetime(query_time) {
        Ok(formatted) => EstimatesResponse::Success(AllEstimatesResponse {
            estimates,
            query_time: formatted,
        }),
        Err(_err) => all_estimates_internal_error("timestamp formatting failure"),
    }
}

fn all_estimates_invalid_timestamp(raw: &str) -> EstimatesResponse {
    warn!(query_time = raw, "Rejected estimates listing with unparseable query_time");
    match format_timestamp(SystemTime::now()) {
        Ok(formatted) => EstimatesResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: AllEstimatesErrorResponse {
                error_code: AllEstimatesErrorCode::InvalidTimestamp,
                error_message: "Could not parse query_time".to_string(),
                timestamp: formatted,
            },
        },
        Err(_err) => all_estimates_internal_error("timestamp formatting failure"),
    }
}

fn all_estimates_internal_error(message: &str) -> EstimatesResponse {
    error!(
        message = message,
        "Internal error while handling /api/estimates"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    EstimatesResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: AllEstimatesErrorResponse {
            error_code: AllEstimatesErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn build_units_response(state: Arc<ServiceState>, now: SystemTime) -> UnitsResponse {
    let units = match state.store().units() {
        Ok(units) => units,
        Err(_) => {
            return units_internal_error("state lock poisoned while listing units");
        }
    };

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => {
            return units_internal_error("timestamp formatting failure");
        }
    };

    let units = units.into_iter().map(unit_response).collect();
    UnitsResponse::Success(UnitsSuccessResponse { units, timestamp })
}

fn unit_response(record: UnitRecord) -> UnitResponse {
    UnitResponse {
        unit: record.name,
        address: record.address,
        postal_code: record.postal_code,
        latitude: record.latitude,
        longitude: record.longitude,
    }
}

fn build_register_unit_response(
    state: Arc<ServiceState>,
    request: RegisterUnitRequest,
    now: SystemTime,
) -> RegisterUnitResponse {
    let record = UnitRecord {
        name: request.unit.clone(),
        address: request.address,
        postal_code: request.postal_code,
        latitude: request.latitude,
        longitude: request.longitude,
    };

    if state.store().register_unit(record).is_err() {
        return register_unit_internal_error("state lock poisoned while registering unit");
    }

    match format_timestamp(now) {
        Ok(formatted) => RegisterUnitResponse::Success(UnitRegisteredResponse {
            unit: request.unit,
            timestamp: formatted,
        }),
        Err(_err) => register_unit_internal_error("timestamp formatting failure"),
    }
}

fn units_internal_error(message: &str) -> UnitsResponse {
    error!(
        message = message,
        "Internal error while handling /api/units"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    UnitsResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: UnitsErrorResponse {
            error_code: UnitsErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn register_unit_internal_error(message: &str) -> RegisterUnitResponse {
    error!(
        message = message,
        "Internal error while handling /api/units"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    RegisterUnitResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: UnitsErrorResponse {
            error_code: UnitsErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn build_health_response(state: Arc<ServiceState>, now: SystemTime) -> HealthResponse {
    let status = match state.store().units() {
        Ok(_) => HealthStatus::Ok,
        Err(_) => HealthStatus::Ko,
    };

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => {
            return health_internal_error("timestamp formatting failure");
        }
    };

    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok => StatusCode::OK,
    };

    HealthResponse::Success {
        status: status_code,
        body: HealthSuccessResponse { status, timestamp },
    }
}

fn health_internal_error(message: &str) -> HealthResponse {
    error!(
        message = message,
        "Internal error while handling /api/health"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format health error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });

    HealthResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: HealthErrorResponse {
            error_code: HealthErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

/// Accepts RFC 3339; a zoneless ISO 8601 timestamp is assumed to be UTC.
fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(raw, &Rfc3339).or_else(|_| {
        PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(PrimitiveDateTime::assume_utc)
    })
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    format_datetime(OffsetDateTime::from(timestamp))
}

fn format_datetime(datetime: OffsetDateTime) -> Result<String, TimestampError> {
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}
