//! Security-context population.
//!
//! [`AuthenticationLayer`] runs ahead of the authorization gate. It attaches
//! a [`SecurityContext`], a [`RequestAttributes`] bag and a [`DispatchKind`]
//! to every request that lacks them, and, when a [`BearerAuthenticator`] is
//! configured, fills the context from an `Authorization: Bearer` JWT.
//!
//! Failed authentication never rejects the request here. The context stays
//! empty and the gate decides.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use gatehouse_core::{Authentication, DispatchKind, Principal, SecurityContext};
use http::{header, HeaderMap, Request};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::filter::RequestAttributes;

/// Settings for HS256 bearer-token validation.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret used to verify token signatures.
    pub jwt_secret: String,
    /// Expected `iss` claim, if any.
    pub issuer: Option<String>,
    /// Expected `aud` claim, if any.
    pub audience: Option<String>,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_secs: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: None,
            audience: None,
            leeway_secs: 30,
        }
    }
}

/// Claims read from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Errors from extracting or validating a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("authorization header is not a bearer token")]
    MalformedHeader,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

// ---------------------------------------------------------------------------
// BearerAuthenticator
// ---------------------------------------------------------------------------

/// Validates `Authorization: Bearer <jwt>` headers.
pub struct BearerAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl BearerAuthenticator {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        // A configured `iss`/`aud` is only checked when present, so it must
        // also be required.
        let mut required = vec!["exp"];
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
            required.push("aud");
        } else {
            validation.validate_aud = false;
        }
        validation.set_required_spec_claims(&required);
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Authenticates the caller from request headers.
    ///
    /// Returns `Ok(None)` when no `Authorization` header is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is not a bearer token or the token
    /// fails signature or claim validation.
    pub fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Authentication>, AuthenticationError> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|t| !t.is_empty())
            .ok_or(AuthenticationError::MalformedHeader)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let principal = data
            .claims
            .roles
            .into_iter()
            .fold(Principal::new(data.claims.sub), Principal::with_role);
        Ok(Some(Authentication::authenticated(principal)))
    }
}

// ---------------------------------------------------------------------------
// AuthenticationLayer
// ---------------------------------------------------------------------------

/// Tower layer that prepares requests for the authorization gate.
#[derive(Clone, Default)]
pub struct AuthenticationLayer {
    authenticator: Option<Arc<BearerAuthenticator>>,
}

impl AuthenticationLayer {
    /// A layer that only attaches empty per-request state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that also authenticates bearer tokens.
    #[must_use]
    pub fn with_bearer(authenticator: BearerAuthenticator) -> Self {
        Self {
            authenticator: Some(Arc::new(authenticator)),
        }
    }
}

impl<S> Layer<S> for AuthenticationLayer {
    type Service = AuthenticationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticationService {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

/// Service wrapper produced by [`AuthenticationLayer`].
#[derive(Clone)]
pub struct AuthenticationService<S> {
    inner: S,
    authenticator: Option<Arc<BearerAuthenticator>>,
}

impl<S, B> Service<Request<B>> for AuthenticationService<S>
where
    S: Service<Request<B>> + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        RequestAttributes::of(&mut request);
        let extensions = request.extensions_mut();
        if extensions.get::<DispatchKind>().is_none() {
            extensions.insert(DispatchKind::Request);
        }
        let context = match extensions.get::<SecurityContext>() {
            Some(existing) => existing.clone(),
            None => {
                let context = SecurityContext::new();
                extensions.insert(context.clone());
                context
            }
        };

        if let Some(authenticator) = &self.authenticator {
            match authenticator.authenticate(request.headers()) {
                Ok(Some(authentication)) => {
                    debug!(principal = %authentication.name(), "bearer token authenticated");
                    context.set_authentication(Some(authentication));
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "bearer authentication failed"),
            }
        }

        Box::pin(self.inner.call(request))
    }
}
