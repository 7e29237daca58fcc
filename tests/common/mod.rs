#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use jokiin_escrow::{
    db::{MarketStore, MemoryStore},
    dtos::{
        offerdtos::{CreateOfferRequest, DeliverWorkRequest},
        paymentdtos::CreatePaymentRequest,
    },
    models::{chatmodels::Conversation, offermodels::JobOffer},
    service::{
        error::ServiceError,
        escrow_service::EscrowService,
        notification_service::{EventEmitter, MarketEvent},
        offer_service::OfferService,
        payment_provider::{
            sign_hmac_hex, verify_hmac_hex, CheckoutRequest, CheckoutSession, PaymentChannel,
            PaymentGateway,
        },
        payment_service::{CallbackOutcome, PaymentService},
        wallet_service::WalletService,
    },
};
use serde_json::json;
use uuid::Uuid;

pub const GATEWAY_KEY: &str = "test-private-key";

/// Gateway double: one QRIS channel, sequential references.
pub struct FakeGateway {
    checkouts: AtomicUsize,
    pub fail_checkout: bool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            checkouts: AtomicUsize::new(0),
            fail_checkout: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            checkouts: AtomicUsize::new(0),
            fail_checkout: true,
        }
    }

    pub fn checkout_count(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, ServiceError> {
        Ok(vec![
            PaymentChannel {
                group: "E-Wallet".into(),
                code: "QRIS".into(),
                name: "QRIS".into(),
                fee_flat: 750.0,
                fee_percent: 0.5,
                active: true,
            },
            PaymentChannel {
                group: "Virtual Account".into(),
                code: "OLDVA".into(),
                name: "Retired VA".into(),
                fee_flat: 4000.0,
                fee_percent: 0.0,
                active: false,
            },
        ])
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ServiceError> {
        if self.fail_checkout {
            return Err(ServiceError::gateway("Payment gateway timed out"));
        }
        let n = self.checkouts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CheckoutSession {
            reference: format!("T{:05}", n),
            checkout_url: format!("https://checkout.test/{}", request.merchant_ref),
        })
    }

    fn verify_callback(&self, signature: &str, raw_body: &[u8]) -> bool {
        verify_hmac_hex(GATEWAY_KEY.as_bytes(), raw_body, signature)
    }
}

/// Captures every emitted event in order.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<(Uuid, Uuid, MarketEvent)>>,
}

impl RecordingEmitter {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, event)| event.kind())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, party_a: Uuid, party_b: Uuid, event: MarketEvent) {
        self.events.lock().unwrap().push((party_a, party_b, event));
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub events: Arc<RecordingEmitter>,
    pub gateway: Arc<FakeGateway>,
    pub wallet: WalletService,
    pub offers: OfferService,
    pub escrow: EscrowService,
    pub payments: PaymentService,
    pub client: Uuid,
    pub freelancer: Uuid,
    pub conversation: Uuid,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_gateway(FakeGateway::new()).await
    }

    pub async fn with_gateway(gateway: FakeGateway) -> Self {
        let store = MemoryStore::new();
        let client = Uuid::new_v4();
        let freelancer = Uuid::new_v4();

        store.create_user_account(client, 0).await;
        store.create_user_account(freelancer, 0).await;
        store.create_freelancer_profile(freelancer, 0).await;

        let conversation = Conversation::new(client, freelancer, Some(42));
        let conversation_id = conversation.id;
        store.insert_conversation(conversation).await;

        let shared: Arc<dyn MarketStore> = Arc::new(store.clone());
        let events = Arc::new(RecordingEmitter::default());
        let emitter: Arc<dyn EventEmitter> = events.clone();
        let gateway = Arc::new(gateway);
        let wallet = WalletService::new(shared.clone());

        Harness {
            offers: OfferService::new(shared.clone(), emitter.clone()),
            escrow: EscrowService::new(shared.clone(), wallet.clone(), emitter.clone()),
            payments: PaymentService::new(shared.clone(), gateway.clone(), emitter),
            wallet,
            gateway,
            events,
            store,
            client,
            freelancer,
            conversation: conversation_id,
        }
    }

    pub fn shared_store(&self) -> Arc<dyn MarketStore> {
        Arc::new(self.store.clone())
    }

    pub async fn create_offer(&self, price: i64, revisions: i32) -> JobOffer {
        self.offers
            .create_offer(self.freelancer, self.conversation, offer_request(price, revisions))
            .await
            .unwrap()
    }

    /// Creates an offer and runs it through checkout and a PAID callback.
    pub async fn paid_offer(&self, price: i64, revisions: i32) -> JobOffer {
        let offer = self.create_offer(price, revisions).await;
        let checkout = self
            .payments
            .create_payment(self.client, payment_request(offer.id))
            .await
            .unwrap();

        let body = callback_body(&checkout.reference, &checkout.merchant_ref, "PAID");
        let signature = sign(&body);
        match self.payments.handle_callback(Some(&signature), &body).await.unwrap() {
            CallbackOutcome::OfferPaid(offer) => offer,
            other => panic!("expected the offer to be paid, got {:?}", other),
        }
    }

    pub async fn delivered_offer(&self, price: i64, revisions: i32) -> JobOffer {
        let offer = self.paid_offer(price, revisions).await;
        self.offers
            .deliver_work(self.freelancer, offer.id, delivery())
            .await
            .unwrap()
            .offer
    }

    pub async fn offer(&self, id: Uuid) -> JobOffer {
        self.store.get_offer(id).await.unwrap().unwrap()
    }
}

pub fn offer_request(price: i64, revisions: i32) -> CreateOfferRequest {
    CreateOfferRequest {
        product_id: None,
        price,
        title: "Landing page redesign".to_string(),
        description: "Responsive landing page in three sections".to_string(),
        revision_count: revisions,
        start_date: None,
        delivery_date: None,
        delivery_format: "Figma + HTML".to_string(),
        notes: String::new(),
    }
}

pub fn payment_request(offer_id: Uuid) -> CreatePaymentRequest {
    CreatePaymentRequest {
        offer_id,
        payment_method: "QRIS".to_string(),
        customer_name: Some("Rina".to_string()),
        customer_email: Some("rina@example.com".to_string()),
    }
}

pub fn delivery() -> DeliverWorkRequest {
    DeliverWorkRequest {
        work_url: Some("https://drive.example.com/landing-v1".to_string()),
        files: vec![],
    }
}

pub fn callback_body(reference: &str, merchant_ref: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "reference": reference,
        "merchant_ref": merchant_ref,
        "payment_method": "QRIS",
        "payment_method_code": "QRIS",
        "total_amount": 101250,
        "fee_merchant": 0,
        "fee_customer": 1250,
        "total_fee": 1250,
        "amount_received": 100000,
        "status": status,
        "paid_at": 1767225600,
        "note": null
    }))
    .unwrap()
}

pub fn sign(body: &[u8]) -> String {
    sign_hmac_hex(GATEWAY_KEY.as_bytes(), body).unwrap()
}
