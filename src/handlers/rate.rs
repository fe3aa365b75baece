use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::entities::exchange_rate_snapshots;
use crate::error::{Error, ErrorResponse};
use crate::models::rate::{
    ConvertRequest, CurrentRateQuery, ManualRateRequest, RateAtQuery, RateHistoryQuery,
    RateHistoryResponse, RateRecordResponse, SnapshotRequest,
};
use crate::services::rate_service::{ConversionOutcome, RateStats, RateView};
use crate::services::rate_store::HistoryFilter;
use crate::services::snapshot_service::PinTarget;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /api/exchange-rate?force_fetch=bool
pub async fn get_current_rate(
    State(state): State<AppState>,
    Query(query): Query<CurrentRateQuery>,
) -> Result<Json<RateView>, ApiError> {
    let view = state
        .rates
        .get_current(query.force_fetch)
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(view))
}

/// GET /api/exchange-rate/history
pub async fn get_rate_history(
    State(state): State<AppState>,
    Query(query): Query<RateHistoryQuery>,
) -> Result<Json<RateHistoryResponse>, ApiError> {
    let records = state
        .rates
        .store()
        .history(HistoryFilter {
            start: query.start,
            end: query.end,
            source: query.source,
            fetch_success: query.fetch_success,
            limit: query.limit,
        })
        .await
        .map_err(Error::into_response_parts)?;

    Ok(Json(RateHistoryResponse {
        records: records.into_iter().map(RateRecordResponse::from).collect(),
    }))
}

/// GET /api/exchange-rate/at-timestamp?timestamp=...
pub async fn get_rate_at_timestamp(
    State(state): State<AppState>,
    Query(query): Query<RateAtQuery>,
) -> Result<Json<RateRecordResponse>, ApiError> {
    let record = state
        .rates
        .store()
        .at(query.timestamp)
        .await
        .map_err(Error::into_response_parts)?
        .ok_or_else(|| Error::RateNotFound.into_response_parts())?;
    Ok(Json(RateRecordResponse::from(record)))
}

/// POST /api/exchange-rate/convert
pub async fn convert_currency(
    State(state): State<AppState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<ConversionOutcome>, ApiError> {
    let outcome = state
        .rates
        .convert_amount(
            payload.amount,
            &payload.from_currency,
            &payload.to_currency,
            payload.rate,
        )
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(outcome))
}

/// POST /api/exchange-rate/set-manual (privileged)
pub async fn set_manual_rate(
    State(state): State<AppState>,
    Json(payload): Json<ManualRateRequest>,
) -> Result<Json<RateView>, ApiError> {
    let view = state
        .rates
        .set_manual_rate(payload.rate, payload.actor.as_deref())
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(view))
}

/// POST /api/exchange-rate/refresh (privileged). Bypasses the cache and TTL.
pub async fn refresh_rate(State(state): State<AppState>) -> Result<Json<RateView>, ApiError> {
    let view = state
        .rates
        .get_current(true)
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(view))
}

/// GET /api/exchange-rate/stats
pub async fn get_rate_stats(State(state): State<AppState>) -> Result<Json<RateStats>, ApiError> {
    let stats = state
        .rates
        .stats()
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(stats))
}

/// POST /api/exchange-rate/snapshot, called by the order/payment
/// collaborator when a financial event is finalized.
pub async fn pin_snapshot(
    State(state): State<AppState>,
    Json(payload): Json<SnapshotRequest>,
) -> Result<(StatusCode, Json<exchange_rate_snapshots::Model>), ApiError> {
    let target = match (payload.order_id, payload.payment_id) {
        (Some(order_id), None) => PinTarget::Order(order_id),
        (None, Some(payment_id)) => PinTarget::Payment(payment_id),
        _ => {
            return Err(Error::Validation(
                "exactly one of order_id or payment_id must be set".into(),
            )
            .into_response_parts())
        }
    };

    let snapshot = state
        .snapshots
        .pin(target, payload.amount_usd)
        .await
        .map_err(Error::into_response_parts)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}
