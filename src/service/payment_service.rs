// service/payment_service.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{
    error::ServiceError,
    notification_service::{emit_offer_change, EventEmitter},
    payment_provider::{CheckoutRequest, PaymentChannel, PaymentGateway},
};
use crate::{
    db::MarketStore,
    dtos::paymentdtos::{CreatePaymentRequest, CreatePaymentResponse, PaymentCallbackPayload},
    models::{
        chatmodels::{Message, MessageType},
        offermodels::{order_code_from_merchant_ref, JobOffer, OfferStatus},
        paymentmodels::{CallbackUpdate, Transaction, TransactionStatus},
    },
    utils::order_code::is_valid_order_code,
};

#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// No transaction carries this reference; acknowledged and ignored.
    UnknownReference,
    /// Transaction fields updated, offer untouched.
    Recorded(TransactionStatus),
    /// The payment moved the offer from pending to paid.
    OfferPaid(JobOffer),
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn MarketStore>,
    gateway: Arc<dyn PaymentGateway>,
    events: Arc<dyn EventEmitter>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self { store, gateway, events }
    }

    pub async fn list_channels(&self) -> Result<Vec<PaymentChannel>, ServiceError> {
        let channels = self.gateway.payment_channels().await?;
        Ok(channels.into_iter().filter(|c| c.active).collect())
    }

    /// Nothing is written until the gateway confirms the checkout.
    pub async fn create_payment(
        &self,
        requester: Uuid,
        body: CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, ServiceError> {
        body.validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let offer = self
            .store
            .get_offer(body.offer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Offer not found"))?;

        if offer.client_id != requester {
            return Err(ServiceError::unauthorized("Only the client can pay for this offer"));
        }
        if offer.status != OfferStatus::Pending {
            return Err(ServiceError::conflict("Only pending offers can be paid"));
        }

        let channel = self
            .gateway
            .payment_channels()
            .await?
            .into_iter()
            .find(|c| c.active && c.code == body.payment_method)
            .ok_or_else(|| {
                ServiceError::validation(format!("Unknown payment method: {}", body.payment_method))
            })?;

        let fee = channel.fee_for(offer.price);
        let total_amount = offer
            .price
            .checked_add(fee)
            .ok_or_else(|| ServiceError::validation("Payment amount is out of range"))?;
        let merchant_ref = offer.merchant_ref();

        let session = self
            .gateway
            .create_checkout(&CheckoutRequest {
                merchant_ref: merchant_ref.clone(),
                amount: total_amount,
                customer_name: body.customer_name.unwrap_or_else(|| "Client".to_string()),
                customer_email: body.customer_email.unwrap_or_default(),
                item_name: offer.title.clone(),
                method: channel.code.clone(),
            })
            .await?;

        let now = Utc::now();
        let trx = Transaction {
            id: Uuid::new_v4(),
            job_offer_id: offer.id,
            reference: session.reference.clone(),
            merchant_ref: merchant_ref.clone(),
            payment_method: channel.name.clone(),
            payment_method_code: channel.code.clone(),
            total_amount,
            fee_merchant: 0,
            fee_customer: fee,
            total_fee: fee,
            amount_received: 0,
            checkout_url: session.checkout_url.clone(),
            status: TransactionStatus::Unpaid,
            paid_at: None,
            note: String::new(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_transaction(&trx).await?;
        tx.commit().await?;

        tracing::info!(
            "Checkout {} created for offer {} ({}): price {}, fee {}, total {}",
            session.reference,
            offer.id,
            merchant_ref,
            offer.price,
            fee,
            total_amount
        );

        Ok(CreatePaymentResponse {
            checkout_url: session.checkout_url,
            reference: session.reference,
            merchant_ref,
            amount: offer.price,
            fee,
            total_amount,
        })
    }

    /// Verifies and applies a gateway callback. Safe to repeat: fields are
    /// overwritten, and only a pending offer moves to paid.
    pub async fn handle_callback(
        &self,
        signature: Option<&str>,
        raw_body: &[u8],
    ) -> Result<CallbackOutcome, ServiceError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                tracing::warn!("Rejected payment callback without signature");
                ServiceError::validation("Missing callback signature")
            })?;

        if !self.gateway.verify_callback(signature, raw_body) {
            tracing::warn!("Rejected payment callback with invalid signature");
            return Err(ServiceError::validation("Invalid callback signature"));
        }

        let payload: PaymentCallbackPayload = serde_json::from_slice(raw_body)
            .map_err(|e| ServiceError::validation(format!("Invalid callback payload: {}", e)))?;
        let status: TransactionStatus = payload.status.parse().map_err(ServiceError::Validation)?;

        let update = CallbackUpdate {
            reference: payload.reference.clone(),
            status,
            payment_method: payload.payment_method,
            payment_method_code: payload.payment_method_code,
            total_amount: payload.total_amount,
            fee_merchant: payload.fee_merchant,
            fee_customer: payload.fee_customer,
            total_fee: payload.total_fee,
            amount_received: payload.amount_received,
            paid_at: if payload.paid_at > 0 {
                DateTime::<Utc>::from_timestamp(payload.paid_at, 0)
            } else {
                None
            },
            note: payload.note.unwrap_or_default(),
        };

        let mut tx = self.store.begin().await?;

        // lock the offer before touching its transaction row
        let offer = if status == TransactionStatus::Paid {
            let order_code = order_code_from_merchant_ref(&payload.merchant_ref)
                .filter(|code| is_valid_order_code(code))
                .ok_or_else(|| {
                    ServiceError::validation(format!("Invalid merchant reference: {}", payload.merchant_ref))
                })?;
            tx.lock_offer_by_code(order_code).await?
        } else {
            None
        };

        let trx = match tx.update_transaction_from_callback(&update).await? {
            Some(trx) => trx,
            None => {
                tracing::warn!("Payment callback for unknown reference {}", update.reference);
                return Ok(CallbackOutcome::UnknownReference);
            }
        };

        let mut offer = match offer {
            Some(offer) if status == TransactionStatus::Paid => offer,
            _ => {
                tx.commit().await?;
                tracing::info!("Transaction {} recorded as {}", trx.reference, status);
                return Ok(CallbackOutcome::Recorded(status));
            }
        };

        if offer.id != trx.job_offer_id {
            tx.commit().await?;
            tracing::warn!(
                "Transaction {} belongs to offer {}, not {}; offer left unchanged",
                trx.reference,
                trx.job_offer_id,
                offer.id
            );
            return Ok(CallbackOutcome::Recorded(status));
        }

        if offer.status != OfferStatus::Pending {
            tx.commit().await?;
            tracing::warn!(
                "Duplicate paid callback for offer {} (#{}), already {}",
                offer.id,
                offer.order_code,
                offer.status
            );
            return Ok(CallbackOutcome::Recorded(status));
        }

        offer.status = OfferStatus::Paid;
        offer.updated_at = Utc::now();
        tx.save_offer(&offer).await?;

        let message = Message::new(
            offer.conversation_id,
            offer.client_id,
            MessageType::System,
            format!(
                "Payment for order #{} was received. The freelancer can start working.",
                offer.order_code
            ),
        );
        tx.insert_message(&message).await?;
        tx.commit().await?;

        tracing::info!(
            "Offer {} (#{}) paid via {} ({})",
            offer.id,
            offer.order_code,
            trx.reference,
            trx.payment_method_code
        );

        emit_offer_change(self.events.as_ref(), &offer, Some(&message));
        Ok(CallbackOutcome::OfferPaid(offer))
    }
}
