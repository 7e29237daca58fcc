pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::MarketStore;
use service::{
    escrow_service::EscrowService,
    notification_service::{EventEmitter, NotificationHub},
    offer_service::OfferService,
    payment_provider::PaymentGateway,
    payment_service::PaymentService,
    wallet_service::WalletService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub store: Arc<dyn MarketStore>,
    pub hub: Arc<NotificationHub>,
    pub wallet_service: WalletService,
    pub offer_service: OfferService,
    pub escrow_service: EscrowService,
    pub payment_service: PaymentService,
}

impl AppState {
    pub fn new(
        env: Config,
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGateway>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        let events: Arc<dyn EventEmitter> = hub.clone();
        let wallet_service = WalletService::new(store.clone());

        AppState {
            offer_service: OfferService::new(store.clone(), events.clone()),
            escrow_service: EscrowService::new(store.clone(), wallet_service.clone(), events.clone()),
            payment_service: PaymentService::new(store.clone(), gateway, events),
            wallet_service,
            env,
            store,
            hub,
        }
    }
}
