// service/payment_provider.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::error::ServiceError;
use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// A payment method offered by the gateway, fees already normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentChannel {
    pub group: String,
    pub code: String,
    pub name: String,
    pub fee_flat: f64,
    pub fee_percent: f64,
    pub active: bool,
}

impl PaymentChannel {
    /// Customer-side fee for `price`, rounded up to a whole unit.
    pub fn fee_for(&self, price: i64) -> i64 {
        (self.fee_flat + price as f64 * self.fee_percent / 100.0).ceil() as i64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub merchant_ref: String,
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub item_name: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub reference: String,
    pub checkout_url: String,
}

/// The hosted-checkout collaborator: create a checkout and authenticate its
/// asynchronous callbacks.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, ServiceError>;

    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ServiceError>;

    fn verify_callback(&self, signature: &str, raw_body: &[u8]) -> bool;
}

/// Hex HMAC-SHA256 of `data` under `key`.
pub fn sign_hmac_hex(key: &[u8], data: &[u8]) -> Result<String, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ServiceError::gateway(format!("Invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_hmac_hex(key: &[u8], data: &[u8], signature: &str) -> bool {
    match sign_hmac_hex(key, data) {
        Ok(expected) => expected
            .as_bytes()
            .ct_eq(signature.trim().to_ascii_lowercase().as_bytes())
            .into(),
        Err(_) => false,
    }
}

/// Fee components arrive as numbers or numeric strings.
pub fn normalize_fee(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[derive(Debug, Deserialize)]
struct GatewayEnvelope<T> {
    success: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(default)]
    group: String,
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    total_fee: RawFee,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct RawFee {
    #[serde(default)]
    flat: Value,
    #[serde(default)]
    percent: Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckout {
    reference: String,
    checkout_url: String,
}

/// HTTP adapter for the hosted checkout API.
pub struct HostedCheckoutGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    private_key: String,
    merchant_code: String,
    callback_url: String,
    return_url: String,
}

impl HostedCheckoutGateway {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.payment_gateway_timeout_secs))
            .build()
            .map_err(|e| ServiceError::gateway(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.payment_gateway_base_url.trim_end_matches('/').to_string(),
            api_key: config.payment_gateway_api_key.clone(),
            private_key: config.payment_gateway_private_key.clone(),
            merchant_code: config.payment_gateway_merchant_code.clone(),
            callback_url: format!("{}/api/payments/callback", config.app_url.trim_end_matches('/')),
            return_url: format!("{}/orders", config.frontend_url.trim_end_matches('/')),
        })
    }

    fn request_signature(&self, merchant_ref: &str, amount: i64) -> Result<String, ServiceError> {
        let data = format!("{}{}{}", self.merchant_code, merchant_ref, amount);
        sign_hmac_hex(self.private_key.as_bytes(), data.as_bytes())
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let envelope: GatewayEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::gateway(format!("Unreadable gateway response ({}): {}", status, e)))?;

        if !envelope.success {
            return Err(ServiceError::gateway(format!(
                "Gateway rejected request: {}",
                envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| ServiceError::gateway("Gateway response carried no data"))
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::gateway("Payment gateway timed out")
    } else {
        ServiceError::gateway(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/merchant/payment-channel", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let channels: Vec<RawChannel> = Self::read_envelope(response).await?;
        Ok(channels
            .into_iter()
            .map(|raw| PaymentChannel {
                group: raw.group,
                code: raw.code,
                name: raw.name,
                fee_flat: normalize_fee(&raw.total_fee.flat),
                fee_percent: normalize_fee(&raw.total_fee.percent),
                active: raw.active,
            })
            .collect())
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ServiceError> {
        let signature = self.request_signature(&request.merchant_ref, request.amount)?;
        let payload = serde_json::json!({
            "method": request.method,
            "merchant_ref": request.merchant_ref,
            "amount": request.amount,
            "customer_name": request.customer_name,
            "customer_email": request.customer_email,
            "order_items": [{
                "name": request.item_name,
                "price": request.amount,
                "quantity": 1,
            }],
            "callback_url": self.callback_url,
            "return_url": self.return_url,
            "expired_time": (Utc::now() + chrono::Duration::hours(24)).timestamp(),
            "signature": signature,
        });

        let response = self
            .client
            .post(format!("{}/transaction/create", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let checkout: RawCheckout = Self::read_envelope(response).await?;
        Ok(CheckoutSession {
            reference: checkout.reference,
            checkout_url: checkout.checkout_url,
        })
    }

    fn verify_callback(&self, signature: &str, raw_body: &[u8]) -> bool {
        verify_hmac_hex(self.private_key.as_bytes(), raw_body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fee_normalization_accepts_numbers_and_strings() {
        assert_eq!(normalize_fee(&json!(4250)), 4250.0);
        assert_eq!(normalize_fee(&json!("0.7")), 0.7);
        assert_eq!(normalize_fee(&json!(" 2.5 ")), 2.5);
        assert_eq!(normalize_fee(&json!(null)), 0.0);
        assert_eq!(normalize_fee(&json!("n/a")), 0.0);
    }

    #[test]
    fn test_channel_fee_rounds_up() {
        let channel = PaymentChannel {
            group: "E-Wallet".into(),
            code: "QRIS".into(),
            name: "QRIS".into(),
            fee_flat: 750.0,
            fee_percent: 0.5,
            active: true,
        };
        // 750 + 100000 * 0.5% = 1250
        assert_eq!(channel.fee_for(100_000), 1250);
        // 750 + 1234 * 0.5% = 756.17
        assert_eq!(channel.fee_for(1234), 757);
    }

    #[test]
    fn test_signature_verification() {
        let body = br#"{"reference":"T0001","status":"PAID"}"#;
        let signature = sign_hmac_hex(b"private-key", body).unwrap();

        assert!(verify_hmac_hex(b"private-key", body, &signature));
        assert!(verify_hmac_hex(b"private-key", body, &signature.to_uppercase()));
        assert!(!verify_hmac_hex(b"other-key", body, &signature));
        assert!(!verify_hmac_hex(b"private-key", b"{}", &signature));
        assert!(!verify_hmac_hex(b"private-key", body, ""));
    }

    #[test]
    fn test_raw_channel_parses_string_fees() {
        let raw: RawChannel = serde_json::from_value(json!({
            "group": "Virtual Account",
            "code": "BCAVA",
            "name": "BCA Virtual Account",
            "active": true,
            "total_fee": { "flat": "5500", "percent": "0.00" }
        }))
        .unwrap();

        assert_eq!(normalize_fee(&raw.total_fee.flat), 5500.0);
        assert_eq!(normalize_fee(&raw.total_fee.percent), 0.0);
    }
}
