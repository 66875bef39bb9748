//! Marketplace use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the HTTP layer decoupled from storage details.
//! - Own validation that spans more than one record.

pub mod auth_service;
pub mod comment_service;
pub mod coupon_service;
pub mod curated_service;
pub mod deal_service;
pub mod forum_service;
pub mod group_deal_service;
pub mod hero_service;
pub mod order_service;
pub mod trending_service;
pub mod user_service;
pub mod vendor_plan_service;
pub mod vendor_service;

use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error shared by services whose failures are plain CRUD outcomes.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input failed validation.
    Validation(ValidationError),
    /// Addressed record does not exist.
    NotFound { entity: &'static str, id: String },
    /// Write conflicts with existing state.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
