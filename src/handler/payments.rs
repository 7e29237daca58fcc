// handler/payments.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::{
    dtos::{
        paymentdtos::{CallbackAck, CreatePaymentRequest},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub const CALLBACK_SIGNATURE_HEADER: &str = "X-Callback-Signature";

/// Routes that need an authenticated caller.
pub fn payment_handler() -> Router {
    Router::new()
        .route("/", post(create_payment))
        .route("/channels", get(list_channels))
}

pub async fn list_channels(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let channels = app_state.payment_service.list_channels().await?;
    Ok(Json(ApiResponse::success("Payment channels retrieved", channels)))
}

pub async fn create_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .payment_service
        .create_payment(auth.user_id, body)
        .await?;

    Ok(Json(ApiResponse::success("Checkout created", payment)))
}

/// Public gateway callback; authenticity comes from the body signature.
pub async fn payment_callback(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get(CALLBACK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    app_state
        .payment_service
        .handle_callback(signature, &body)
        .await?;

    Ok(Json(CallbackAck { success: true }))
}
