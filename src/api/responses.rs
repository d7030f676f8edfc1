use serde::Serialize;

use crate::store::{EventKind, UrgencyColor};

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Ok,
    OffHours,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EstimateSuccessResponse {
    pub unit: String,
    pub urgency_color: UrgencyColor,
    pub status: EstimateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_minutes: Option<f64>,
    pub query_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EstimateErrorResponse {
    pub error_code: EstimateErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventSuccessResponse {
    pub unit: String,
    pub event_type: EventKind,
    /// Minutes between intake and classification when this event
    /// completed a pair, otherwise `null`.
    pub elapsed_minutes: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventErrorResponse {
    pub error_code: EventErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

/// Per-unit row of the all-units listing. A `null` estimate means the
/// query time fell outside every configured slot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UnitEstimatesResponse {
    pub unit: String,
    pub blue: Option<f64>,
    pub green: Option<f64>,
    pub yellow: Option<f64>,
    pub orange: Option<f64>,
    pub red: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AllEstimatesResponse {
    pub estimates: Vec<UnitEstimatesResponse>,
    pub query_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AllEstimatesErrorResponse {
    pub error_code: AllEstimatesErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UnitResponse {
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UnitsSuccessResponse {
    pub units: Vec<UnitResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UnitRegisteredResponse {
    pub unit: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UnitsErrorResponse {
    pub error_code: UnitsErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Ko,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthErrorResponse {
    pub error_code: HealthErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimateErrorCode {
    InvalidTimestamp,
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventErrorCode {
    MissingColor,
    InvalidTimestamp,
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllEstimatesErrorCode {
    InvalidTimestamp,
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitsErrorCode {
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthErrorCode {
    InternalError,
}
