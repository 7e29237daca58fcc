// routes.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        freelancer::freelancer_handler,
        offers::offer_handler,
        payments::{payment_callback, payment_handler},
        wallet::wallet_handler,
        ws::ws_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // gateway posts here without a token
    let public_payment_routes = Router::new().route("/callback", post(payment_callback));

    let payment_routes = Router::new()
        .merge(payment_handler().layer(middleware::from_fn(auth)))
        .merge(public_payment_routes);

    let api_route = Router::new()
        .route("/healthchecker", get(health_check))
        .merge(offer_handler().layer(middleware::from_fn(auth)))
        .nest("/freelancer", freelancer_handler().layer(middleware::from_fn(auth)))
        .nest("/payments", payment_routes)
        .nest("/wallet", wallet_handler().layer(middleware::from_fn(auth)))
        .nest("/ws", ws_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new().nest("/api", api_route)
}
