// handler/freelancer.rs
use std::sync::Arc;

use axum::{extract::Query, response::IntoResponse, routing::get, Extension, Json, Router};
use validator::Validate;

use crate::{
    dtos::{
        offerdtos::{FreelancerOrdersQuery, FreelancerOrdersResponse, OfferResponseDto, PageMeta},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn freelancer_handler() -> Router {
    Router::new()
        .route("/orders", get(get_orders))
        .route("/dashboard/stats", get(get_dashboard_stats))
}

pub async fn get_orders(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<FreelancerOrdersQuery>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = app_state
        .offer_service
        .freelancer_orders(auth.user_id, params.status(), params.page(), params.limit())
        .await?;

    let meta = PageMeta {
        page: page.page,
        limit: page.limit,
        total_items: page.total_items,
        total_pages: page.total_pages(),
    };

    Ok(Json(FreelancerOrdersResponse {
        status: "success".to_string(),
        data: page.offers.into_iter().map(OfferResponseDto::from).collect(),
        meta,
    }))
}

pub async fn get_dashboard_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.offer_service.dashboard_stats(auth.user_id).await?;
    Ok(Json(ApiResponse::success("Dashboard stats retrieved", stats)))
}
