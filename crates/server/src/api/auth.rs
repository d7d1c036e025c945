use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use herald_core::HeraldError;

use crate::error::ApiError;

use super::ApiState;

/// Bearer-token middleware for the notification API.
///
/// Rejects missing, malformed, or mismatched `authorization` headers with
/// `unauthenticated`. Neither the configured token nor the presented one is
/// ever logged; only the failure class is.
pub async fn require_bearer(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(header) = header else {
        warn!(failure = "missing_authorization_header", "api call rejected");
        return unauthenticated();
    };

    let Some(presented) = header.strip_prefix("Bearer ") else {
        warn!(failure = "malformed_authorization_header", "api call rejected");
        return unauthenticated();
    };

    if !token_matches(presented, &state.bearer_token) {
        warn!(failure = "token_mismatch", "api call rejected");
        return unauthenticated();
    }

    next.run(request).await
}

/// Constant-time token comparison.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn unauthenticated() -> Response {
    ApiError(HeraldError::Unauthenticated).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret", "Secret"));
        assert!(!token_matches("", "secret"));
        assert!(!token_matches("secret-but-longer", "secret"));
    }
}
