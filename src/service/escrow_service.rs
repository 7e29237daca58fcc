// service/escrow_service.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    error::ServiceError,
    notification_service::{emit_offer_change, EventEmitter},
    offer_service::OfferOutcome,
    wallet_service::WalletService,
};
use crate::{
    db::MarketStore,
    models::{
        chatmodels::{Message, MessageType},
        offermodels::OfferStatus,
    },
};

/// Who asked for a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementTrigger {
    Client(Uuid),
    /// Scheduler sweep; only offers last touched at or before the cutoff settle.
    Automatic { stale_before: DateTime<Utc> },
}

/// Settles offers: completion credits the freelancer, cancellation of a paid
/// offer refunds the client. Every path is lock, check, mutate, commit, emit.
#[derive(Clone)]
pub struct EscrowService {
    store: Arc<dyn MarketStore>,
    wallet: WalletService,
    events: Arc<dyn EventEmitter>,
}

impl EscrowService {
    pub fn new(store: Arc<dyn MarketStore>, wallet: WalletService, events: Arc<dyn EventEmitter>) -> Self {
        Self { store, wallet, events }
    }

    pub async fn complete_order(&self, requester: Uuid, offer_id: Uuid) -> Result<OfferOutcome, ServiceError> {
        self.settle_completion(offer_id, SettlementTrigger::Client(requester))
            .await
    }

    pub async fn auto_complete(
        &self,
        offer_id: Uuid,
        stale_before: DateTime<Utc>,
    ) -> Result<OfferOutcome, ServiceError> {
        self.settle_completion(offer_id, SettlementTrigger::Automatic { stale_before })
            .await
    }

    async fn settle_completion(
        &self,
        offer_id: Uuid,
        trigger: SettlementTrigger,
    ) -> Result<OfferOutcome, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut offer = tx
            .lock_offer(offer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Offer not found"))?;

        if let SettlementTrigger::Client(requester) = trigger {
            if offer.client_id != requester {
                return Err(ServiceError::unauthorized("Only the client can complete this order"));
            }
        }

        if offer.status == OfferStatus::Completed {
            tracing::debug!("Offer {} already completed, nothing to settle", offer.id);
            return Ok(OfferOutcome {
                offer,
                applied: false,
            });
        }
        if offer.status != OfferStatus::Delivered {
            return Err(ServiceError::conflict("only delivered orders can be completed"));
        }

        // re-delivered since the sweep selected it
        if let SettlementTrigger::Automatic { stale_before } = trigger {
            if offer.updated_at > stale_before {
                return Ok(OfferOutcome {
                    offer,
                    applied: false,
                });
            }
        }

        let (sender, description, text) = match trigger {
            SettlementTrigger::Client(requester) => (
                requester,
                format!("Payment for order #{}", offer.order_code),
                format!(
                    "Order #{} was completed by the client. The payment has been released to the freelancer's balance.",
                    offer.order_code
                ),
            ),
            SettlementTrigger::Automatic { .. } => (
                offer.freelancer_id,
                format!("Automatic settlement for order #{}", offer.order_code),
                format!(
                    "Order #{} was completed automatically because the client did not respond within the review window. \
                     The payment has been released to the freelancer's balance.",
                    offer.order_code
                ),
            ),
        };

        offer.status = OfferStatus::Completed;
        offer.updated_at = Utc::now();
        tx.save_offer(&offer).await?;

        self.wallet
            .credit_freelancer(
                tx.as_mut(),
                offer.freelancer_id,
                offer.net_amount,
                Some(offer.id),
                &description,
            )
            .await?;

        let message = Message::new(offer.conversation_id, sender, MessageType::System, text);
        tx.insert_message(&message).await?;
        tx.commit().await?;

        tracing::info!(
            "Offer {} (#{}) completed ({}): credited {} to freelancer {}",
            offer.id,
            offer.order_code,
            match trigger {
                SettlementTrigger::Client(_) => "client",
                SettlementTrigger::Automatic { .. } => "automatic",
            },
            offer.net_amount,
            offer.freelancer_id
        );

        emit_offer_change(self.events.as_ref(), &offer, Some(&message));
        Ok(OfferOutcome {
            offer,
            applied: true,
        })
    }

    pub async fn cancel_order(&self, requester: Uuid, offer_id: Uuid) -> Result<OfferOutcome, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut offer = tx
            .lock_offer(offer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Offer not found"))?;

        if offer.freelancer_id != requester {
            return Err(ServiceError::unauthorized("Only the freelancer can cancel this order"));
        }

        if offer.status == OfferStatus::Cancelled {
            return Ok(OfferOutcome {
                offer,
                applied: false,
            });
        }

        let refunded = match offer.status {
            OfferStatus::Paid => {
                self.wallet
                    .credit_client(
                        tx.as_mut(),
                        offer.client_id,
                        offer.price,
                        Some(offer.id),
                        &format!("Refund for cancelled order #{}", offer.order_code),
                    )
                    .await?;
                true
            }
            OfferStatus::Pending => false,
            _ => {
                return Err(ServiceError::conflict(
                    "only pending or paid orders can be cancelled",
                ))
            }
        };

        offer.status = OfferStatus::Cancelled;
        offer.updated_at = Utc::now();
        tx.save_offer(&offer).await?;

        let mut text = format!("Order #{} was cancelled by the freelancer.", offer.order_code);
        if refunded {
            text.push_str(" The payment has been refunded to the client's balance.");
        }
        let message = Message::new(offer.conversation_id, requester, MessageType::System, text);
        tx.insert_message(&message).await?;
        tx.commit().await?;

        tracing::info!(
            "Offer {} (#{}) cancelled, refunded {}",
            offer.id,
            offer.order_code,
            if refunded { offer.price } else { 0 }
        );

        emit_offer_change(self.events.as_ref(), &offer, Some(&message));
        Ok(OfferOutcome {
            offer,
            applied: true,
        })
    }
}
