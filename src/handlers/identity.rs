use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::OwnerId;

// Set by the authenticating edge once it has verified the caller
pub const USER_ID_HEADER: &str = "x-user-id";

/// The verified owner of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User(pub OwnerId);

impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<OwnerId>().ok())
            .filter(|id| *id > 0)
            .map(User)
            .ok_or(AppError::Unauthorized)
    }
}
