//! Third-party service clients behind object-safe traits.
//!
//! # Responsibility
//! - Keep vendor HTTP APIs out of route handlers.
//! - Let tests swap every upstream for an in-process fake.
//!
//! # Invariants
//! - Clients never log secrets, tokens or email bodies.
//! - Every outbound request carries a bounded timeout.

pub mod analyzer;
pub mod google;
pub mod media;
pub mod paystack;
pub mod resend;

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;

pub use analyzer::{HttpPageAnalyzer, PageAnalyzer, PagePreview};
pub use google::{GoogleOAuth, OAuthProvider};
pub use media::{CloudinaryHost, MediaHost, MediaKind, MediaUpload, upload_with_fallback};
pub use paystack::{PaymentGateway, PaystackGateway};
pub use resend::{Mailer, ResendMailer};

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("failed to send HTTP request: {0}")]
    Transport(String),

    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("unexpected response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// Upstream refused the request for a caller-side reason.
    #[error("{0}")]
    Rejected(String),

    #[error("upload timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(error: reqwest::Error) -> Self {
        IntegrationError::Transport(error.to_string())
    }
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;

/// Builds a client with a whole-request timeout.
pub fn http_client(timeout: Duration) -> IntegrationResult<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Fails on non-success statuses without reading the body into logs.
pub(crate) fn ensure_success(
    service: &'static str,
    response: Response,
) -> IntegrationResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(IntegrationError::Status {
        service,
        status: status.as_u16(),
    })
}
