//! `/api/paystack` handlers.

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/initialize", post(initialize))
        .route("/verify/{reference}", get(verify))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InitializeRequest {
    pub email: Option<String>,
    /// Major currency units, as a number or numeric string.
    pub amount: Option<Value>,
}

impl InitializeRequest {
    fn validate(self) -> ApiResult<(String, f64)> {
        let missing = || ApiError::BadRequest("Email and amount are required".to_string());
        let email = self
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or_else(missing)?;
        let amount = match self.amount {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(missing)?;
        Ok((email, amount))
    }
}

async fn initialize(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<InitializeRequest>,
) -> ApiResult<Json<Value>> {
    let (email, amount) = request.validate()?;
    let data = state
        .integrations
        .payments()?
        .initialize(&email, amount)
        .await?;
    Ok(Json(json!({
        "status": true,
        "message": "Transaction initialized",
        "data": data,
    })))
}

async fn verify(
    State(state): State<SharedState>,
    ApiPath(reference): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let data = state.integrations.payments()?.verify(&reference).await?;
    Ok(Json(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_numbers_and_numeric_strings() {
        let request: InitializeRequest =
            serde_json::from_value(json!({ "email": "a@b.co", "amount": "2500.5" })).unwrap();
        assert_eq!(request.validate().unwrap(), ("a@b.co".to_string(), 2500.5));
        let request: InitializeRequest =
            serde_json::from_value(json!({ "email": "a@b.co", "amount": 10 })).unwrap();
        assert_eq!(request.validate().unwrap().1, 10.0);
    }

    #[test]
    fn missing_email_or_amount_is_rejected() {
        let request: InitializeRequest = serde_json::from_value(json!({ "amount": 10 })).unwrap();
        assert!(request.validate().is_err());
        let request: InitializeRequest =
            serde_json::from_value(json!({ "email": "a@b.co", "amount": "lots" })).unwrap();
        assert!(request.validate().is_err());
    }
}
