//! Shared-secret authorization for inbound requests.
//!
//! Requests must carry the configured API key in the configured header
//! (`x-api-key` by default). The check runs as a middleware so rejected
//! requests never reach a handler.

use axum::{
    extract::{Request, State},
    http::{header::InvalidHeaderName, HeaderName},
    middleware::Next,
    response::Response,
};
use redact::Secret;

use hotelpress_http::AppError;
use hotelpress_kernel::settings::{env_var_name, AuthSettings};

/// Middleware state holding the expected header and secret.
#[derive(Clone)]
pub struct ApiKeyGuard {
    header_name: HeaderName,
    api_key: Option<Secret<String>>,
}

impl ApiKeyGuard {
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, InvalidHeaderName> {
        let header_name = HeaderName::from_bytes(settings.header_name.trim().as_bytes())?;
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty());

        Ok(Self {
            header_name,
            api_key,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    fn check(&self, presented: Option<&[u8]>) -> Result<(), AppError> {
        let Some(expected) = &self.api_key else {
            return Err(AppError::configuration(vec![env_var_name("auth", "api_key")]));
        };

        match presented {
            None => Err(AppError::unauthorized(format!(
                "missing '{}' header",
                self.header_name
            ))),
            Some(presented) if constant_time_eq(presented, expected.expose_secret().as_bytes()) => {
                Ok(())
            }
            Some(_) => Err(AppError::unauthorized(format!(
                "invalid '{}' header",
                self.header_name
            ))),
        }
    }
}

/// Reject the request unless it carries the shared secret.
pub async fn require_api_key(
    State(guard): State<ApiKeyGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(&guard.header_name)
        .map(|value| value.as_bytes());

    if let Err(e) = guard.check(presented) {
        tracing::debug!(
            path = %request.uri().path(),
            header = %guard.header_name,
            "shared-secret check failed"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}

// Length still leaks; content comparison does not short-circuit.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
