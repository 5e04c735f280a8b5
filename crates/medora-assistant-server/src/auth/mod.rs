pub mod jwt;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::debug;

use crate::utils::error::ApiError;
pub use jwt::{Claims, JwtManager};

/// Clinic identity taken from a valid `Authorization: Bearer` token
#[derive(Debug, Clone)]
pub struct AuthenticatedClinic {
    pub clinic_id: String,
}

impl<S> FromRequestParts<S> for AuthenticatedClinic
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let manager = Arc::<JwtManager>::from_ref(state);
        let claims = manager.validate_token(token).map_err(|e| {
            debug!("Rejected clinic token: {}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthorized("Token has no clinic subject".to_string()));
        }

        Ok(Self {
            clinic_id: claims.sub,
        })
    }
}
