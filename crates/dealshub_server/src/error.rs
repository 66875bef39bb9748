//! HTTP error type and the mapping from domain errors to status codes.
//!
//! # Invariants
//! - Every error renders as a `{message}` JSON body.
//! - 500 and 502 details are logged, never returned to the caller.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dealshub_core::auth::SessionError;
use dealshub_core::repo::group_deal_repo::GroupDealRepoError;
use dealshub_core::service::auth_service::AuthServiceError;
use dealshub_core::{
    CommentServiceError, DealServiceError, GroupDealServiceError, RepoError, ServiceError,
    ValidationError,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::integrations::IntegrationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    #[error("{0} is not configured")]
    Unavailable(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(details) => {
                error!("event=http_error module=http status=error code=500 error={details}");
                "Server error".to_string()
            }
            Self::Upstream(details) => {
                error!("event=http_error module=http status=error code=502 error={details}");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { .. } => Self::NotFound(value.to_string()),
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::Validation(err) => err.into(),
            other @ (RepoError::Db(_) | RepoError::InvalidData(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(err) => err.into(),
            ServiceError::NotFound { .. } => Self::NotFound(value.to_string()),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<DealServiceError> for ApiError {
    fn from(value: DealServiceError) -> Self {
        match value {
            DealServiceError::Validation(err) => err.into(),
            DealServiceError::DealNotFound(_) | DealServiceError::NoDealsForUser(_) => {
                Self::NotFound(value.to_string())
            }
            DealServiceError::StatusUnchanged(_) => Self::Conflict(value.to_string()),
            DealServiceError::Repo(err) => err.into(),
            DealServiceError::InconsistentState(_) => Self::Internal(value.to_string()),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(value: CommentServiceError) -> Self {
        match value {
            CommentServiceError::Validation(err) => err.into(),
            CommentServiceError::NotFound { .. } => Self::NotFound(value.to_string()),
            CommentServiceError::ParentNotInThread(_) => Self::BadRequest(value.to_string()),
            CommentServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<GroupDealRepoError> for ApiError {
    fn from(value: GroupDealRepoError) -> Self {
        match value {
            GroupDealRepoError::NotFound(_) => Self::NotFound(value.to_string()),
            GroupDealRepoError::Slot(_) => Self::Conflict(value.to_string()),
            GroupDealRepoError::Db(_) | GroupDealRepoError::InvalidData(_) => {
                Self::Internal(value.to_string())
            }
        }
    }
}

impl From<GroupDealServiceError> for ApiError {
    fn from(value: GroupDealServiceError) -> Self {
        match value {
            GroupDealServiceError::Validation(err) => err.into(),
            GroupDealServiceError::UserNotFound(_)
            | GroupDealServiceError::VendorNotFound(_)
            | GroupDealServiceError::GroupDealNotFound(_) => Self::NotFound(value.to_string()),
            GroupDealServiceError::Slot(_) => Self::Conflict(value.to_string()),
            GroupDealServiceError::Repo(err) => err.into(),
            GroupDealServiceError::Lookup(err) => err.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::EmptySecret => Self::Internal(value.to_string()),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(value: AuthServiceError) -> Self {
        match value {
            AuthServiceError::Validation(err) => err.into(),
            AuthServiceError::InvalidMagicToken => {
                Self::BadRequest("Invalid or expired link".to_string())
            }
            AuthServiceError::Session(err) => err.into(),
            AuthServiceError::Account(err) => err.into(),
        }
    }
}

impl From<IntegrationError> for ApiError {
    fn from(value: IntegrationError) -> Self {
        match value {
            IntegrationError::Rejected(message) => Self::BadRequest(message),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        Self::BadRequest(value.body_text())
    }
}
