// dtos/paymentdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub offer_id: Uuid,

    #[validate(length(min = 1, max = 50, message = "Payment method is required"))]
    pub payment_method: String,

    #[validate(length(max = 100, message = "Customer name must be at most 100 characters"))]
    pub customer_name: Option<String>,

    #[validate(email(message = "Customer email must be a valid email"))]
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub checkout_url: String,
    pub reference: String,
    pub merchant_ref: String,
    pub amount: i64,
    pub fee: i64,
    pub total_amount: i64,
}

/// Body the gateway posts to the callback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallbackPayload {
    pub reference: String,
    pub merchant_ref: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_method_code: String,
    #[serde(default)]
    pub total_amount: i64,
    #[serde(default)]
    pub fee_merchant: i64,
    #[serde(default)]
    pub fee_customer: i64,
    #[serde(default)]
    pub total_fee: i64,
    #[serde(default)]
    pub amount_received: i64,
    pub status: String,
    /// Unix seconds, 0 when unset.
    #[serde(default)]
    pub paid_at: i64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackAck {
    pub success: bool,
}
