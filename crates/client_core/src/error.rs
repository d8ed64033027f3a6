use shared::{domain::Principal, error::ApiError};
use thiserror::Error;

use crate::{reorder::ReorderError, validation::ValidationError};

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("remote service is not available")]
    Unavailable,
    #[error("remote service rejected the call: {0}")]
    Rejected(ApiError),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected `{got}` reply to {call}")]
    UnexpectedReply {
        call: &'static str,
        got: &'static str,
    },
    #[error("failed to decode service reply: {0}")]
    Decode(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Reorder(#[from] ReorderError),
    #[error("{0} is not offered by this service")]
    Unsupported(&'static str),
    #[error("admin role of the default administrator {0} cannot be removed")]
    ProtectedAdmin(Principal),
    #[error("{0} requires the admin role")]
    AdminOnly(&'static str),
    #[error("cannot {action}: {reason}")]
    FormBlocked {
        action: &'static str,
        reason: &'static str,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
