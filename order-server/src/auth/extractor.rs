//! Actor Extractor
//!
//! Custom extractor for automatically validating JWT tokens and producing
//! the caller [`Actor`].

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{Actor, JwtService};
use crate::core::{ServerError, ServerState};

impl FromRequestParts<ServerState> for Actor {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted (from middleware)
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or(ServerError::Unauthorized)?,
            None => {
                tracing::warn!(uri = ?parts.uri, "Missing authorization header");
                return Err(ServerError::Unauthorized);
            }
        };

        match state.jwt.validate_token(token) {
            Ok(claims) => {
                let actor = Actor::try_from(claims).map_err(|e| {
                    tracing::warn!(error = %e, "Malformed JWT claims");
                    ServerError::Unauthorized
                })?;

                // Store in extensions for potential reuse
                parts.extensions.insert(actor.clone());

                Ok(actor)
            }
            Err(e) => {
                tracing::warn!(error = %e, uri = ?parts.uri, "Token validation failed");
                Err(ServerError::Unauthorized)
            }
        }
    }
}
