use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, models::OwnerId};

/// Header carrying the authenticated owner's opaque token
pub const OWNER_HEADER: &str = "x-owner-id";

/// Extracts the calling owner; requests without one are rejected with 401
///
/// Authentication happens upstream. This only trusts and validates the header
/// the gateway forwards.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or(AppError::Unauthorized)?
            .to_str()
            .map_err(|_| AppError::Unauthorized)?;

        Ok(Owner(OwnerId::parse(token)?))
    }
}
