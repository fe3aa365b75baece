use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::{Error, ErrorResponse};
use crate::models::pago_movil::{
    AdminListQuery, BatchStatusUpdateRequest, BatchStatusUpdateResponse, NotesUpdateRequest,
    StatusQuery, StatusUpdateRequest, VerificationListResponse, VerificationResponse,
    VerifyRequest,
};
use crate::services::pago_movil::{NewVerification, VerificationStatus};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// POST /api/pagomovil/verify
pub async fn create_verification(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<VerificationResponse>), ApiError> {
    let record = state
        .pago_movil
        .submit(NewVerification {
            user_id: payload.user_id,
            order_id: payload.order_id,
            sender_id: payload.sender_id,
            sender_phone: payload.sender_phone,
            bank_code: payload.bank_code,
            recipient: payload.recipient,
            amount_ves: payload.amount_ves,
        })
        .await
        .map_err(Error::into_response_parts)?;

    Ok((StatusCode::CREATED, Json(VerificationResponse::from(record))))
}

/// GET /api/pagomovil/status?user_id=...
pub async fn get_verification_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let record = state
        .pago_movil
        .latest_for_user(query.user_id)
        .await
        .map_err(Error::into_response_parts)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!(
                    "no verification requests for user {}",
                    query.user_id
                ))),
            )
        })?;
    Ok(Json(VerificationResponse::from(record)))
}

/// GET /api/pagomovil/admin?status=... (privileged)
pub async fn list_verifications(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<VerificationListResponse>, ApiError> {
    let records = state
        .pago_movil
        .list(query.status)
        .await
        .map_err(Error::into_response_parts)?;

    Ok(Json(VerificationListResponse {
        requests: records
            .into_iter()
            .map(VerificationResponse::from)
            .collect(),
    }))
}

/// PATCH /api/pagomovil/{id}/status (privileged)
pub async fn update_verification_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let to = VerificationStatus::parse_terminal(&payload.status)
        .map_err(Error::into_response_parts)?;

    let record = state
        .pago_movil
        .transition(
            id,
            to,
            payload.actor.as_deref().unwrap_or("staff"),
            payload.notes,
        )
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(VerificationResponse::from(record)))
}

/// PATCH /api/pagomovil/{id}/notes (privileged). Notes stay editable after a
/// request reaches a terminal state; everything else is frozen.
pub async fn update_verification_notes(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<NotesUpdateRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let record = state
        .pago_movil
        .update_notes(id, payload.notes)
        .await
        .map_err(Error::into_response_parts)?;
    Ok(Json(VerificationResponse::from(record)))
}

/// POST /api/pagomovil/batch-status (privileged). Bulk approve/reject with
/// per-item results.
pub async fn batch_update_status(
    State(state): State<AppState>,
    Json(payload): Json<BatchStatusUpdateRequest>,
) -> Result<Json<BatchStatusUpdateResponse>, ApiError> {
    let to = VerificationStatus::parse_terminal(&payload.status)
        .map_err(Error::into_response_parts)?;

    let results = state
        .pago_movil
        .batch_transition(
            &payload.ids,
            to,
            payload.actor.as_deref().unwrap_or("staff"),
            payload.notes,
        )
        .await;
    Ok(Json(BatchStatusUpdateResponse { results }))
}
