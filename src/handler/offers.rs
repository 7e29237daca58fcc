// handler/offers.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::{
        offerdtos::{
            CreateOfferRequest, DeliverWorkRequest, OfferResponseDto, RevisionRequest,
            UpdateOfferRequest, UpdateStatusRequest,
        },
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::offer_service::OfferOutcome,
    AppState,
};

pub fn offer_handler() -> Router {
    Router::new()
        .route("/conversations/:conversation_id/offers", post(create_offer).get(list_offers))
        .route("/offers/:offer_id", get(get_offer).put(update_offer))
        .route("/offers/:offer_id/status", patch(update_status))
        .route("/offers/:offer_id/start", post(start_work))
        .route("/offers/:offer_id/deliver", post(deliver_work))
        .route("/offers/:offer_id/revision", post(request_revision))
        .route("/offers/:offer_id/complete", post(complete_order))
        .route("/offers/:offer_id/cancel", post(cancel_order))
}

fn outcome_response(outcome: OfferOutcome, applied: &str, unchanged: &str) -> Json<ApiResponse<OfferResponseDto>> {
    let message = if outcome.applied { applied } else { unchanged };
    Json(ApiResponse::success(message, OfferResponseDto::from(outcome.offer)))
}

pub async fn create_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<CreateOfferRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .offer_service
        .create_offer(auth.user_id, conversation_id, body)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ApiResponse::success("Job offer created", OfferResponseDto::from(offer))),
    ))
}

pub async fn list_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offers = app_state
        .offer_service
        .list_offers(auth.user_id, conversation_id)
        .await?;

    let offers: Vec<OfferResponseDto> = offers.into_iter().map(OfferResponseDto::from).collect();
    Ok(Json(ApiResponse::success("Job offers retrieved", offers)))
}

pub async fn get_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state.offer_service.get_offer(auth.user_id, offer_id).await?;
    Ok(Json(ApiResponse::success("Job offer retrieved", OfferResponseDto::from(offer))))
}

pub async fn update_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<UpdateOfferRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .offer_service
        .update_offer(auth.user_id, offer_id, body)
        .await?;

    Ok(Json(ApiResponse::success("Job offer updated", OfferResponseDto::from(offer))))
}

pub async fn update_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .offer_service
        .update_status(auth.user_id, offer_id, &body.status)
        .await?;

    Ok(outcome_response(outcome, "Status updated", "Status unchanged"))
}

pub async fn start_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state.offer_service.start_work(auth.user_id, offer_id).await?;
    Ok(outcome_response(outcome, "Work started", "Work already in progress"))
}

pub async fn deliver_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<DeliverWorkRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .offer_service
        .deliver_work(auth.user_id, offer_id, body)
        .await?;

    Ok(outcome_response(outcome, "Work delivered", "Work delivered"))
}

pub async fn request_revision(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<RevisionRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .offer_service
        .request_revision(auth.user_id, offer_id, body)
        .await?;

    Ok(outcome_response(outcome, "Revision requested", "Revision requested"))
}

pub async fn complete_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .escrow_service
        .complete_order(auth.user_id, offer_id)
        .await?;

    Ok(outcome_response(outcome, "Order completed", "Order already completed"))
}

pub async fn cancel_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .escrow_service
        .cancel_order(auth.user_id, offer_id)
        .await?;

    Ok(outcome_response(outcome, "Order cancelled", "Order already cancelled"))
}
