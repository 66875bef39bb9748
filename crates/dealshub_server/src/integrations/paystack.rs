//! Paystack transaction initialize/verify client.

use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{IntegrationError, IntegrationResult, http_client};

const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const PAYSTACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Paystack-style gateway; amounts are in major units.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a transaction and returns the provider's `data` object.
    async fn initialize(&self, email: &str, amount: f64) -> IntegrationResult<Value>;

    /// Returns the provider's verification payload unchanged.
    async fn verify(&self, reference: &str) -> IntegrationResult<Value>;
}

/// Converts a major-unit amount to integer minor units (kobo, cents).
pub fn to_minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let minor = (amount * 100.0).round();
    if minor > i64::MAX as f64 {
        return None;
    }
    Some(minor as i64)
}

pub struct PaystackGateway {
    client: Client,
    secret_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct InitializeResponse {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

impl PaystackGateway {
    pub fn new(secret_key: String) -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(PAYSTACK_TIMEOUT)?,
            secret_key,
            base_url: PAYSTACK_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, email: &str, amount: f64) -> IntegrationResult<Value> {
        let minor = to_minor_units(amount)
            .ok_or_else(|| IntegrationError::Rejected("amount must be positive".to_string()))?;
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "email": email, "amount": minor }))
            .send()
            .await?;
        let body: InitializeResponse =
            response
                .json()
                .await
                .map_err(|err| IntegrationError::Decode {
                    service: "paystack",
                    message: err.to_string(),
                })?;
        if !body.status {
            return Err(IntegrationError::Rejected(body.message));
        }
        info!("event=payment_initialize module=payments status=ok");
        Ok(body.data)
    }

    async fn verify(&self, reference: &str) -> IntegrationResult<Value> {
        let response = self
            .client
            .get(format!(
                "{}/transaction/verify/{}",
                self.base_url,
                urlencoding::encode(reference)
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|err| IntegrationError::Decode {
                service: "paystack",
                message: err.to_string(),
            })?;
        info!("event=payment_verify module=payments status=ok");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::to_minor_units;

    #[test]
    fn amounts_convert_to_minor_units() {
        assert_eq!(to_minor_units(2500.0), Some(250_000));
        assert_eq!(to_minor_units(19.99), Some(1999));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert_eq!(to_minor_units(0.0), None);
        assert_eq!(to_minor_units(-3.0), None);
        assert_eq!(to_minor_units(f64::NAN), None);
    }
}
