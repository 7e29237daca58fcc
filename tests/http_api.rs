mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{callback_body, sign, FakeGateway, GATEWAY_KEY};
use jokiin_escrow::{
    config::Config,
    db::{MarketStore, MemoryStore},
    handler::payments::CALLBACK_SIGNATURE_HEADER,
    models::chatmodels::Conversation,
    routes::create_router,
    service::notification_service::NotificationHub,
    utils::token::create_token,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const JWT_SECRET: &str = "http-test-secret";

struct TestApp {
    router: Router,
    client: Uuid,
    freelancer: Uuid,
    conversation: Uuid,
}

impl TestApp {
    async fn new() -> Self {
        let store = MemoryStore::new();
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();
        store.create_user_account(client, 0).await;
        store.create_user_account(freelancer, 0).await;
        store.create_freelancer_profile(freelancer, 0).await;
        let conversation = Conversation::new(client, freelancer, None);
        let conversation_id = conversation.id;
        store.insert_conversation(conversation).await;

        let shared: Arc<dyn MarketStore> = Arc::new(store);
        let state = AppState::new(
            Config::for_tests(JWT_SECRET, GATEWAY_KEY),
            shared,
            Arc::new(FakeGateway::new()),
            Arc::new(NotificationHub::new(16)),
        );

        TestApp {
            router: create_router(Arc::new(state)),
            client,
            freelancer,
            conversation: conversation_id,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn call(&self, user: Uuid, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = create_token(&user.to_string(), JWT_SECRET.as_bytes(), 60).unwrap();
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn callback(&self, signature: Option<&str>, body: Vec<u8>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/payments/callback")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(CALLBACK_SIGNATURE_HEADER, signature);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn create_offer(&self, price: i64) -> Value {
        let (status, body) = self
            .call(
                self.freelancer,
                Method::POST,
                &format!("/api/conversations/{}/offers", self.conversation),
                Some(json!({ "price": price, "title": "Mobile app icon set", "revision_count": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health_check_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Request::get("/api/healthchecker").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_offer_routes_require_a_token() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            Request::get(format!("/api/conversations/{}/offers", app.conversation))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Request::get(format!("/api/conversations/{}/offers", app.conversation))
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_offer_returns_fee_split() {
    let app = TestApp::new().await;

    let offer = app.create_offer(100_000).await;

    assert_eq!(offer["status"], "pending");
    assert_eq!(offer["platform_fee"], 10_000);
    assert_eq!(offer["net_amount"], 90_000);
    assert_eq!(offer["revisions_left"], 1);

    let (status, body) = app
        .call(
            app.client,
            Method::POST,
            &format!("/api/conversations/{}/offers", app.conversation),
            Some(json!({ "price": 100, "title": "Not allowed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_conflicts_map_to_409() {
    let app = TestApp::new().await;
    let offer = app.create_offer(100_000).await;
    let id = offer["id"].as_str().unwrap();

    let (status, body) = app
        .call(app.client, Method::POST, &format!("/api/offers/{}/complete", id), None)
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "only delivered orders can be completed");
}

#[tokio::test]
async fn test_callback_signature_is_required() {
    let app = TestApp::new().await;
    let body = callback_body("T00001", "INV-ABCD1234", "PAID");

    let (status, _) = app.callback(None, body.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.callback(Some("deadbeef"), body.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // valid signature, unknown reference
    let signature = sign(&body);
    let (status, ack) = app.callback(Some(&signature), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
}

#[tokio::test]
async fn test_order_settles_end_to_end() {
    let app = TestApp::new().await;
    let offer = app.create_offer(100_000).await;
    let id = offer["id"].as_str().unwrap().to_string();

    let (status, checkout) = app
        .call(
            app.client,
            Method::POST,
            "/api/payments",
            Some(json!({ "offer_id": id, "payment_method": "QRIS" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reference = checkout["data"]["reference"].as_str().unwrap();
    let merchant_ref = checkout["data"]["merchant_ref"].as_str().unwrap();
    assert_eq!(checkout["data"]["total_amount"], 101_250);

    let body = callback_body(reference, merchant_ref, "PAID");
    let (status, _) = app.callback(Some(&sign(&body)), body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, started) = app
        .call(app.freelancer, Method::POST, &format!("/api/offers/{}/start", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["data"]["status"], "working");

    let (status, delivered) = app
        .call(
            app.freelancer,
            Method::POST,
            &format!("/api/offers/{}/deliver", id),
            Some(json!({ "work_url": "https://drive.example.com/icons", "files": ["icons.zip"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered["data"]["status"], "delivered");

    let (status, completed) = app
        .call(app.client, Method::POST, &format!("/api/offers/{}/complete", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["data"]["status"], "completed");

    let (status, summary) = app
        .call(app.freelancer, Method::GET, "/api/wallet/summary", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["data"]["freelancer_balance"], 90_000);
    assert_eq!(summary["data"]["total_credits"], 90_000);

    let (status, history) = app
        .call(app.freelancer, Method::GET, "/api/wallet/transactions?page=1&limit=10", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
    assert_eq!(history["data"][0]["type"], "credit");
}

#[tokio::test]
async fn test_wallet_history_rejects_bad_paging() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(app.client, Method::GET, "/api/wallet/transactions?limit=500", None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_freelancer_dashboard_routes() {
    let app = TestApp::new().await;
    let first = app.create_offer(20_000).await;
    let second = app.create_offer(30_000).await;

    let (status, body) = app
        .call(app.freelancer, Method::GET, "/api/freelancer/orders?page=1&limit=1", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], second["id"]);
    assert_eq!(body["meta"]["total_items"], 2);
    assert_eq!(body["meta"]["total_pages"], 2);

    let (status, body) = app
        .call(app.freelancer, Method::GET, "/api/freelancer/orders?status=pending", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 20);
    assert_eq!(body["data"][1]["id"], first["id"]);

    let (status, _) = app
        .call(app.freelancer, Method::GET, "/api/freelancer/orders?status=archived", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(app.freelancer, Method::GET, "/api/freelancer/dashboard/stats", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active_orders"], 2);
    assert_eq!(body["data"]["total_earnings"], 0);

    let (status, _) = app
        .send(Request::get("/api/freelancer/dashboard/stats").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
