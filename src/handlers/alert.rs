use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::{Error, ErrorResponse};
use crate::models::alert::{AcknowledgeRequest, AlertListResponse, AlertResponse, AlertsQuery};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /api/exchange-rate/alerts (privileged)
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertListResponse>, ApiError> {
    let alerts = state
        .alerts
        .list(query.acknowledged)
        .await
        .map_err(Error::into_response_parts)?;

    Ok(Json(AlertListResponse {
        alerts: alerts.into_iter().map(AlertResponse::from).collect(),
    }))
}

/// POST /api/exchange-rate/alerts/{id}/acknowledge (privileged)
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<i32>,
    Json(payload): Json<AcknowledgeRequest>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert = state
        .alerts
        .acknowledge(alert_id, payload.actor.as_deref().unwrap_or("staff"))
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(AlertResponse::from(alert)))
}
