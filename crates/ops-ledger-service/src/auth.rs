//! Authentication extractors.
//!
//! - [`Operator`] - operator authentication via an HS256 session JWT issued
//!   by the console's session layer; the `sub` claim is the opaque actor
//!   identity recorded verbatim on audit entries.
//! - [`ServiceAuth`] - service-to-service authentication via API key, used
//!   by the usage ingest surface.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated operator extracted from a session JWT.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Opaque actor identity (the JWT subject, typically an email).
    pub actor: String,
}

impl FromRequestParts<Arc<AppState>> for Operator {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let secret = state
                .config
                .auth_secret
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            let data = jsonwebtoken::decode::<JwtClaims>(
                token,
                &DecodingKey::from_secret(secret.as_bytes()),
                &Validation::new(Algorithm::HS256),
            )
            .map_err(|_| ApiError::Unauthorized)?;

            Ok(Operator {
                actor: data.claims.sub,
            })
        })
    }
}

/// Service authentication via API key.
///
/// Used by the external consumption system to report usage events.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The reporting service's name.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let api_key = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if api_key != expected_key {
                return Err(ApiError::Unauthorized);
            }

            let service_name = parts
                .headers
                .get("x-service-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}

/// JWT claims for operator session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (operator identity).
    pub sub: String,
    /// Expiration time.
    pub exp: i64,
}
