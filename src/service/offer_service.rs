// service/offer_service.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{
    error::ServiceError,
    notification_service::{emit_offer_change, EventEmitter},
};
use crate::{
    db::MarketStore,
    dtos::offerdtos::{CreateOfferRequest, DeliverWorkRequest, RevisionRequest, UpdateOfferRequest},
    models::{
        chatmodels::{Message, MessageType},
        offermodels::{DashboardStats, FeeBreakdown, JobOffer, OfferStatus, MAX_OFFER_PRICE},
    },
    utils::order_code::generate_order_code,
};

const MAX_ORDER_CODE_ATTEMPTS: usize = 10;
const DEFAULT_DELIVERY_DAYS: i64 = 7;

/// Result of a state-changing call. `applied == false` means the offer was
/// already where the caller wanted it and nothing was written.
#[derive(Debug, Clone)]
pub struct OfferOutcome {
    pub offer: JobOffer,
    pub applied: bool,
}

/// One page of a freelancer's orders together with the unpaged count.
#[derive(Debug, Clone)]
pub struct OrdersPage {
    pub offers: Vec<JobOffer>,
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
}

impl OrdersPage {
    pub fn total_pages(&self) -> i64 {
        let limit = i64::from(self.limit.max(1));
        (self.total_items + limit - 1) / limit
    }
}

enum Mutation {
    Unchanged,
    Changed(Option<Message>),
}

/// Owns the offer entity and every transition that moves no money.
#[derive(Clone)]
pub struct OfferService {
    store: Arc<dyn MarketStore>,
    events: Arc<dyn EventEmitter>,
}

impl OfferService {
    pub fn new(store: Arc<dyn MarketStore>, events: Arc<dyn EventEmitter>) -> Self {
        Self { store, events }
    }

    pub async fn create_offer(
        &self,
        requester: Uuid,
        conversation_id: Uuid,
        body: CreateOfferRequest,
    ) -> Result<JobOffer, ServiceError> {
        body.validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        if body.title.trim().is_empty() {
            return Err(ServiceError::validation("Title is required"));
        }
        check_price(body.price)?;

        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation not found"))?;

        if conversation.freelancer_id != requester {
            return Err(ServiceError::unauthorized(
                "Only the freelancer in this conversation can create job offers",
            ));
        }

        let now = Utc::now();
        let start_date = body.start_date.unwrap_or_else(|| now.date_naive());
        let delivery_date = body
            .delivery_date
            .unwrap_or(start_date + Duration::days(DEFAULT_DELIVERY_DAYS));
        if delivery_date < start_date {
            return Err(ServiceError::validation(
                "Delivery date cannot be before the start date",
            ));
        }

        let fees = FeeBreakdown::from_price(body.price);
        let mut offer = JobOffer {
            id: Uuid::new_v4(),
            order_code: String::new(),
            conversation_id,
            freelancer_id: requester,
            client_id: conversation.client_id,
            product_id: body.product_id.or(conversation.product_id),
            price: fees.price,
            platform_fee: fees.platform_fee,
            net_amount: fees.net_amount,
            title: body.title.trim().to_string(),
            description: body.description,
            revision_count: body.revision_count,
            used_revision_count: 0,
            start_date,
            delivery_date,
            delivery_format: body.delivery_format,
            notes: body.notes,
            work_delivery_link: None,
            work_delivery_files: Vec::new(),
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;

        let mut inserted = false;
        for attempt in 1..=MAX_ORDER_CODE_ATTEMPTS {
            offer.order_code = generate_order_code();
            // the unique insert is authoritative, this only skips known codes
            if !self.store.order_code_exists(&offer.order_code).await?
                && tx.insert_offer(&offer).await?
            {
                inserted = true;
                break;
            }
            tracing::warn!("Order code collision on attempt {}: {}", attempt, offer.order_code);
        }
        if !inserted {
            return Err(ServiceError::conflict("Could not allocate a unique order code"));
        }

        let message = Message::new(
            conversation_id,
            requester,
            MessageType::Offer,
            format!("Job offer #{}: {}", offer.order_code, offer.title),
        );
        tx.insert_message(&message).await?;
        tx.commit().await?;

        tracing::info!(
            "Offer {} (#{}) created in conversation {}: price {}, fee {}, net {}",
            offer.id,
            offer.order_code,
            conversation_id,
            offer.price,
            offer.platform_fee,
            offer.net_amount
        );

        emit_offer_change(self.events.as_ref(), &offer, Some(&message));
        Ok(offer)
    }

    pub async fn update_offer(
        &self,
        requester: Uuid,
        offer_id: Uuid,
        body: UpdateOfferRequest,
    ) -> Result<JobOffer, ServiceError> {
        body.validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        if matches!(&body.title, Some(title) if title.trim().is_empty()) {
            return Err(ServiceError::validation("Title is required"));
        }
        if let Some(price) = body.price {
            check_price(price)?;
        }

        let outcome = self
            .mutate_locked(offer_id, |offer| {
                if offer.freelancer_id != requester {
                    return Err(ServiceError::unauthorized(
                        "Only the freelancer who created this offer can update it",
                    ));
                }
                if offer.status != OfferStatus::Pending {
                    return Err(ServiceError::conflict("Only pending offers can be updated"));
                }

                if let Some(price) = body.price {
                    offer.apply_price(price);
                }
                if let Some(title) = body.title {
                    offer.title = title.trim().to_string();
                }
                if let Some(description) = body.description {
                    offer.description = description;
                }
                if let Some(revision_count) = body.revision_count {
                    offer.revision_count = revision_count;
                }
                if let Some(start_date) = body.start_date {
                    offer.start_date = start_date;
                }
                if let Some(delivery_date) = body.delivery_date {
                    offer.delivery_date = delivery_date;
                }
                if let Some(delivery_format) = body.delivery_format {
                    offer.delivery_format = delivery_format;
                }
                if let Some(notes) = body.notes {
                    offer.notes = notes;
                }
                if offer.delivery_date < offer.start_date {
                    return Err(ServiceError::validation(
                        "Delivery date cannot be before the start date",
                    ));
                }

                Ok(Mutation::Changed(None))
            })
            .await?;

        Ok(outcome.offer)
    }

    pub async fn get_offer(&self, requester: Uuid, offer_id: Uuid) -> Result<JobOffer, ServiceError> {
        let offer = self
            .store
            .get_offer(offer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Offer not found"))?;

        if !offer.is_party(requester) {
            return Err(ServiceError::unauthorized("You are not a party to this offer"));
        }
        Ok(offer)
    }

    pub async fn list_offers(
        &self,
        requester: Uuid,
        conversation_id: Uuid,
    ) -> Result<Vec<JobOffer>, ServiceError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation not found"))?;

        if !conversation.is_party(requester) {
            return Err(ServiceError::unauthorized("You are not a party to this conversation"));
        }

        Ok(self.store.list_offers_by_conversation(conversation_id).await?)
    }

    pub async fn freelancer_orders(
        &self,
        requester: Uuid,
        status: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<OrdersPage, ServiceError> {
        let status = status
            .map(str::parse::<OfferStatus>)
            .transpose()
            .map_err(ServiceError::Validation)?;
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (i64::from(page) - 1) * i64::from(limit);

        let total_items = self.store.count_offers_by_freelancer(requester, status).await?;
        let offers = self
            .store
            .list_offers_by_freelancer(requester, status, i64::from(limit), offset)
            .await?;

        tracing::debug!(
            "Freelancer {} orders: {} total, status filter {:?}",
            requester,
            total_items,
            status
        );

        Ok(OrdersPage {
            offers,
            page,
            limit,
            total_items,
        })
    }

    pub async fn dashboard_stats(&self, requester: Uuid) -> Result<DashboardStats, ServiceError> {
        let active_orders = self.store.count_active_offers(requester).await?;
        let summary = self.store.wallet_summary(requester).await?;

        Ok(DashboardStats {
            active_orders,
            total_earnings: summary.total_credits,
        })
    }

    /// Low-level status push. Only the money-neutral `paid -> working` edge is
    /// applied here; edges with side effects belong to their own operations.
    pub async fn update_status(
        &self,
        requester: Uuid,
        offer_id: Uuid,
        status: &str,
    ) -> Result<OfferOutcome, ServiceError> {
        let target: OfferStatus = status.parse().map_err(ServiceError::Validation)?;

        self.mutate_locked(offer_id, |offer| {
            if !offer.is_party(requester) {
                return Err(ServiceError::unauthorized("You are not a party to this offer"));
            }
            if offer.status == target {
                return Ok(Mutation::Unchanged);
            }
            if !offer.status.can_transition_to(target) {
                return Err(ServiceError::conflict(format!(
                    "Cannot move an offer from {} to {}",
                    offer.status, target
                )));
            }

            match (offer.status, target) {
                (OfferStatus::Paid, OfferStatus::Working) => {
                    offer.status = OfferStatus::Working;
                    offer.updated_at = Utc::now();
                    Ok(Mutation::Changed(Some(Message::new(
                        offer.conversation_id,
                        requester,
                        MessageType::System,
                        format!("Order #{} is now in progress.", offer.order_code),
                    ))))
                }
                (from, to) => Err(ServiceError::conflict(format!(
                    "Moving an offer from {} to {} must go through {}",
                    from,
                    to,
                    owning_operation(from, to)
                ))),
            }
        })
        .await
    }

    pub async fn start_work(&self, requester: Uuid, offer_id: Uuid) -> Result<OfferOutcome, ServiceError> {
        self.mutate_locked(offer_id, |offer| {
            if offer.freelancer_id != requester {
                return Err(ServiceError::unauthorized(
                    "Only the assigned freelancer can start work",
                ));
            }
            match offer.status {
                OfferStatus::Working => Ok(Mutation::Unchanged),
                OfferStatus::Paid => {
                    offer.status = OfferStatus::Working;
                    offer.updated_at = Utc::now();
                    Ok(Mutation::Changed(Some(Message::new(
                        offer.conversation_id,
                        requester,
                        MessageType::System,
                        format!("Freelancer started working on order #{}.", offer.order_code),
                    ))))
                }
                _ => Err(ServiceError::conflict("Only paid orders can be started")),
            }
        })
        .await
    }

    pub async fn deliver_work(
        &self,
        requester: Uuid,
        offer_id: Uuid,
        body: DeliverWorkRequest,
    ) -> Result<OfferOutcome, ServiceError> {
        body.validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let work_url = body
            .work_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let files: Vec<String> = body
            .files
            .into_iter()
            .map(|file| file.trim().to_string())
            .filter(|file| !file.is_empty())
            .collect();
        if work_url.is_none() && files.is_empty() {
            return Err(ServiceError::validation(
                "Provide a work link or at least one delivered file",
            ));
        }

        self.mutate_locked(offer_id, |offer| {
            if offer.freelancer_id != requester {
                return Err(ServiceError::unauthorized(
                    "Only the assigned freelancer can deliver work",
                ));
            }
            let is_update = match offer.status {
                OfferStatus::Delivered => true,
                OfferStatus::Paid | OfferStatus::Working => false,
                _ => {
                    return Err(ServiceError::conflict(
                        "Order must be paid, working or delivered to deliver work",
                    ))
                }
            };

            offer.status = OfferStatus::Delivered;
            offer.work_delivery_link = work_url;
            offer.work_delivery_files = files;
            offer.updated_at = Utc::now();

            let text = if is_update {
                "The freelancer has updated the delivered work. Please review the latest version."
            } else {
                "The freelancer has delivered the work for review. The client can request a revision or \
                 complete the order; without a response the order is completed automatically."
            };

            Ok(Mutation::Changed(Some(Message::new(
                offer.conversation_id,
                requester,
                MessageType::Delivery,
                text.to_string(),
            ))))
        })
        .await
    }

    pub async fn request_revision(
        &self,
        requester: Uuid,
        offer_id: Uuid,
        body: RevisionRequest,
    ) -> Result<OfferOutcome, ServiceError> {
        body.validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        let reason = body.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::validation("Revision reason is required"));
        }

        self.mutate_locked(offer_id, |offer| {
            if offer.client_id != requester {
                return Err(ServiceError::unauthorized("Only the client can request revisions"));
            }
            if offer.status != OfferStatus::Delivered {
                return Err(ServiceError::conflict(
                    "Revision can only be requested for delivered work",
                ));
            }
            if offer.used_revision_count >= offer.revision_count {
                return Err(ServiceError::conflict("revision limit reached"));
            }

            offer.used_revision_count += 1;
            offer.status = OfferStatus::Working;
            offer.updated_at = Utc::now();

            Ok(Mutation::Changed(Some(Message::new(
                offer.conversation_id,
                requester,
                MessageType::Revision,
                reason,
            ))))
        })
        .await
    }

    /// Lock, let `mutate` check and change the offer, then persist it with its
    /// message in one unit and emit after commit.
    async fn mutate_locked<F>(&self, offer_id: Uuid, mutate: F) -> Result<OfferOutcome, ServiceError>
    where
        F: FnOnce(&mut JobOffer) -> Result<Mutation, ServiceError> + Send,
    {
        let mut tx = self.store.begin().await?;
        let mut offer = tx
            .lock_offer(offer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Offer not found"))?;
        let previous = offer.status;

        let message = match mutate(&mut offer)? {
            Mutation::Unchanged => {
                return Ok(OfferOutcome {
                    offer,
                    applied: false,
                })
            }
            Mutation::Changed(message) => message,
        };

        tx.save_offer(&offer).await?;
        if let Some(message) = &message {
            tx.insert_message(message).await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Offer {} (#{}) {} -> {}",
            offer.id,
            offer.order_code,
            previous,
            offer.status
        );

        emit_offer_change(self.events.as_ref(), &offer, message.as_ref());
        Ok(OfferOutcome {
            offer,
            applied: true,
        })
    }
}

fn check_price(price: i64) -> Result<(), ServiceError> {
    if !(1..=MAX_OFFER_PRICE).contains(&price) {
        return Err(ServiceError::validation(format!(
            "Price must be between 1 and {}",
            MAX_OFFER_PRICE
        )));
    }
    Ok(())
}

fn owning_operation(from: OfferStatus, to: OfferStatus) -> &'static str {
    match (from, to) {
        (_, OfferStatus::Paid) => "the payment callback",
        (_, OfferStatus::Delivered) => "work delivery",
        (OfferStatus::Delivered, OfferStatus::Working) => "a revision request",
        (_, OfferStatus::Completed) => "order completion",
        (_, OfferStatus::Cancelled) => "order cancellation",
        _ => "its dedicated operation",
    }
}
