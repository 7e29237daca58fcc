// handler/wallet.rs
use std::sync::Arc;

use axum::{extract::Query, response::IntoResponse, routing::get, Extension, Json, Router};
use validator::Validate;

use crate::{
    dtos::{
        walletdtos::{WalletHistoryQuery, WalletHistoryResponse},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn wallet_handler() -> Router {
    Router::new()
        .route("/summary", get(get_wallet_summary))
        .route("/transactions", get(get_transaction_history))
}

pub async fn get_wallet_summary(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let summary = app_state.wallet_service.summary(auth.user_id).await?;
    Ok(Json(ApiResponse::success("Wallet summary retrieved", summary)))
}

pub async fn get_transaction_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<WalletHistoryQuery>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (page, limit) = (params.page(), params.limit());
    let entries = app_state
        .wallet_service
        .list_transactions(auth.user_id, page, limit)
        .await?;

    Ok(Json(WalletHistoryResponse {
        status: "success".to_string(),
        data: entries,
        page,
        limit,
    }))
}
