//! Paystack payment gateway client behind a capability trait, so the
//! rest of the system never talks to the provider directly.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha512;

use crate::utils::error::AppError;

const BASE_URL: &str = "https://api.paystack.co";

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        email: &str,
        amount_kobo: i64,
        reference: &str,
        metadata: Value,
    ) -> Result<InitializedTransaction, AppError>;

    /// Returns the gateway's transaction object; its `status` field is
    /// the string the caller dispatches on.
    async fn verify(&self, reference: &str) -> Result<Value, AppError>;
}

pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
        }
    }

    fn require_key(&self) -> Result<&str, AppError> {
        if self.secret_key.is_empty() {
            return Err(AppError::ExternalService(
                "PAYSTACK_SECRET_KEY not configured".to_string(),
            ));
        }
        Ok(&self.secret_key)
    }

    /// Paystack wraps every response in {status, message, data}.
    fn unwrap_envelope(body: Value) -> Result<Value, AppError> {
        let ok = body.get("status").and_then(Value::as_bool).unwrap_or(false);
        if !ok {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Paystack request failed");
            return Err(AppError::ExternalService(message.to_string()));
        }
        body.get("data")
            .cloned()
            .ok_or_else(|| AppError::ExternalService("Paystack response missing data".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        email: &str,
        amount_kobo: i64,
        reference: &str,
        metadata: Value,
    ) -> Result<InitializedTransaction, AppError> {
        let key = self.require_key()?;

        let response = self
            .http
            .post(format!("{BASE_URL}/transaction/initialize"))
            .bearer_auth(key)
            .json(&json!({
                "email": email,
                "amount": amount_kobo,
                "reference": reference,
                "metadata": metadata,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Paystack init failed: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Paystack init failed: {e}")))?;

        let data = Self::unwrap_envelope(body)?;
        serde_json::from_value(data)
            .map_err(|e| AppError::ExternalService(format!("Malformed Paystack response: {e}")))
    }

    async fn verify(&self, reference: &str) -> Result<Value, AppError> {
        let key = self.require_key()?;

        let response = self
            .http
            .get(format!("{BASE_URL}/transaction/verify/{reference}"))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Paystack verify failed: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Paystack verify failed: {e}")))?;

        Self::unwrap_envelope(body)
    }
}

/// Webhook signature: HMAC-SHA512 of the raw request body with the
/// secret key, hex-encoded. Must pass before the payload is trusted.
pub fn verify_webhook_signature(secret_key: &str, raw_body: &[u8], signature: &str) -> bool {
    if secret_key.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret_key.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}
