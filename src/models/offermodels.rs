// models/offermodels.rs
use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform commission, in percent of the offer price.
pub const PLATFORM_FEE_PERCENT: i64 = 10;

/// Largest accepted offer price. Keeps `price + gateway fee` and balance
/// sums far from `i64::MAX`.
pub const MAX_OFFER_PRICE: i64 = 1_000_000_000_000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "job_offer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Paid,
    Working,
    Delivered,
    Completed,
    Cancelled,
}

impl OfferStatus {
    pub const ALL: [OfferStatus; 6] = [
        OfferStatus::Pending,
        OfferStatus::Paid,
        OfferStatus::Working,
        OfferStatus::Delivered,
        OfferStatus::Completed,
        OfferStatus::Cancelled,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Paid => "paid",
            OfferStatus::Working => "working",
            OfferStatus::Delivered => "delivered",
            OfferStatus::Completed => "completed",
            OfferStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Completed | OfferStatus::Cancelled)
    }

    /// Edges of the offer lifecycle graph. Re-delivery (`delivered -> delivered`)
    /// is the only self-loop.
    pub fn can_transition_to(&self, to: OfferStatus) -> bool {
        use OfferStatus::*;

        matches!(
            (self, to),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Working)
                | (Paid, Delivered)
                | (Paid, Cancelled)
                | (Working, Delivered)
                | (Delivered, Delivered)
                | (Delivered, Working)
                | (Delivered, Completed)
        )
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OfferStatus::ALL
            .into_iter()
            .find(|status| status.to_str() == s)
            .ok_or_else(|| format!("Invalid status: {}", s))
    }
}

/// Counters behind the freelancer dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub active_orders: i64,
    pub total_earnings: i64,
}

/// Price split between the platform and the freelancer. Always derived from
/// the price, never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub price: i64,
    pub platform_fee: i64,
    pub net_amount: i64,
}

impl FeeBreakdown {
    pub fn from_price(price: i64) -> Self {
        // floor(price * pct / 100) without forming the product
        let platform_fee =
            price / 100 * PLATFORM_FEE_PERCENT + price % 100 * PLATFORM_FEE_PERCENT / 100;
        Self {
            price,
            platform_fee,
            net_amount: price - platform_fee,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct JobOffer {
    pub id: Uuid,
    pub order_code: String,
    pub conversation_id: Uuid,
    pub freelancer_id: Uuid,
    pub client_id: Uuid,
    pub product_id: Option<i64>,

    pub price: i64,
    pub platform_fee: i64,
    pub net_amount: i64,

    pub title: String,
    pub description: String,
    pub revision_count: i32,
    pub used_revision_count: i32,

    pub start_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub delivery_format: String,
    pub notes: String,

    pub work_delivery_link: Option<String>,
    pub work_delivery_files: Vec<String>,

    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobOffer {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.freelancer_id == user_id
    }

    pub fn apply_price(&mut self, price: i64) {
        let fees = FeeBreakdown::from_price(price);
        self.price = fees.price;
        self.platform_fee = fees.platform_fee;
        self.net_amount = fees.net_amount;
    }

    pub fn revisions_left(&self) -> i32 {
        (self.revision_count - self.used_revision_count).max(0)
    }

    /// Merchant reference handed to the payment gateway.
    pub fn merchant_ref(&self) -> String {
        format!("{}{}", MERCHANT_REF_PREFIX, self.order_code)
    }
}

pub const MERCHANT_REF_PREFIX: &str = "INV-";

pub fn order_code_from_merchant_ref(merchant_ref: &str) -> Option<&str> {
    merchant_ref
        .strip_prefix(MERCHANT_REF_PREFIX)
        .filter(|code| !code.is_empty())
}
