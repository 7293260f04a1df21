//! Filter errors and their translation into HTTP responses.
//!
//! Error responses never echo decision attributes; denial reasons go to
//! logs only.

use std::convert::Infallible;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatehouse_core::AuthorizationError;
use serde_json::json;

/// Error returned by [`AuthorizationFilter`](super::AuthorizationFilter).
#[derive(Debug, thiserror::Error)]
pub enum FilterError<E> {
    /// The gate rejected the request, or could not decide.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// The continuation failed; passed through unchanged.
    #[error(transparent)]
    Inner(E),
}

impl<E> FilterError<E> {
    #[must_use]
    pub fn as_authorization(&self) -> Option<&AuthorizationError> {
        match self {
            Self::Authorization(err) => Some(err),
            Self::Inner(_) => None,
        }
    }
}

impl<E: IntoResponse> IntoResponse for FilterError<E> {
    fn into_response(self) -> Response {
        match self {
            Self::Authorization(err) => authorization_error_response(&err),
            Self::Inner(err) => err.into_response(),
        }
    }
}

/// Maps an [`AuthorizationError`] to its HTTP response.
///
/// - `AccessDenied` -> 403
/// - `NotAuthenticated` -> 401 with `WWW-Authenticate: Bearer`
/// - `Internal` -> 500
#[must_use]
pub fn authorization_error_response(err: &AuthorizationError) -> Response {
    match err {
        AuthorizationError::AccessDenied { .. } => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "access_denied", "message": "Access Denied" })),
        )
            .into_response(),
        AuthorizationError::NotAuthenticated { .. } => {
            let mut response = (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "not_authenticated",
                    "message": "Full authentication is required to access this resource",
                })),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
        AuthorizationError::Internal(source) => {
            tracing::error!(error = %source, "authorization failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal", "message": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

/// Error handler for `axum::error_handling::HandleErrorLayer` placed directly
/// outside the authorization layer.
pub async fn handle_filter_error(err: FilterError<Infallible>) -> Response {
    err.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_is_forbidden() {
        let response = authorization_error_response(&AuthorizationError::AccessDenied {
            reason: Some("missing required authority".to_string()),
        });
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn not_authenticated_is_unauthorized_with_challenge() {
        let response = authorization_error_response(&AuthorizationError::credentials_not_found());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn internal_is_server_error() {
        let response =
            authorization_error_response(&AuthorizationError::from(anyhow::anyhow!("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn handle_filter_error_translates() {
        let response =
            handle_filter_error(FilterError::from(AuthorizationError::access_denied())).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn as_authorization_only_for_gate_errors() {
        let gate: FilterError<std::io::Error> = AuthorizationError::access_denied().into();
        assert!(gate.as_authorization().is_some());
        let inner: FilterError<std::io::Error> =
            FilterError::Inner(std::io::Error::other("downstream"));
        assert!(inner.as_authorization().is_none());
        assert_eq!(inner.to_string(), "downstream");
    }
}
