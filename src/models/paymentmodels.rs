// models/paymentmodels.rs
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Unpaid,
    Paid,
    Failed,
    Expired,
    Refund,
}

impl TransactionStatus {
    pub fn to_str(&self) -> &'static str {
        match self {
            TransactionStatus::Unpaid => "UNPAID",
            TransactionStatus::Paid => "PAID",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Expired => "EXPIRED",
            TransactionStatus::Refund => "REFUND",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(TransactionStatus::Unpaid),
            "PAID" => Ok(TransactionStatus::Paid),
            "FAILED" => Ok(TransactionStatus::Failed),
            "EXPIRED" => Ok(TransactionStatus::Expired),
            "REFUND" => Ok(TransactionStatus::Refund),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// Gateway-side record of one payment attempt. Evidence that money moved,
/// not money itself.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub job_offer_id: Uuid,
    pub reference: String,
    pub merchant_ref: String,
    pub payment_method: String,
    pub payment_method_code: String,
    pub total_amount: i64,
    pub fee_merchant: i64,
    pub fee_customer: i64,
    pub total_fee: i64,
    pub amount_received: i64,
    pub checkout_url: String,
    pub status: TransactionStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a verified gateway callback overwrites on the matching transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackUpdate {
    pub reference: String,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub payment_method_code: String,
    pub total_amount: i64,
    pub fee_merchant: i64,
    pub fee_customer: i64,
    pub total_fee: i64,
    pub amount_received: i64,
    pub paid_at: Option<DateTime<Utc>>,
    pub note: String,
}
