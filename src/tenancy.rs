//! Explicit tenancy context for request handlers.
//!
//! Handlers that operate on tenancy-scoped data take a [`TenancyId`]
//! argument instead of reading ambient request state.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

pub const TENANCY_HEADER: &str = "x-tenancy-id";

/// Tenancy (laundry business) the request acts on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenancyId(pub Uuid);

impl TenancyId {
    fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(TenancyId)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenancyId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(TENANCY_HEADER)
            .and_then(|h| h.to_str().ok());

        match header.and_then(TenancyId::parse) {
            Some(id) => Ok(id),
            None => {
                tracing::warn!(uri = %parts.uri, "Rejected request without a valid tenancy header");
                Err(AppError::MissingTenancy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_padded_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(TenancyId::parse(&format!(" {} ", id)), Some(TenancyId(id)));
    }

    #[test]
    fn test_parse_rejects_slug() {
        assert_eq!(TenancyId::parse("sparkle-laundry"), None);
        assert_eq!(TenancyId::parse(""), None);
    }
}
