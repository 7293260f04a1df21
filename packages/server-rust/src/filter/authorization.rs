//! Request authorization middleware.
//!
//! Asks an [`AuthorizationManager`] whether the caller may proceed, publishes
//! the decision, and either forwards the request to the inner service or
//! fails with `AccessDenied`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use gatehouse_core::{
    AuthenticationSupplier, AuthorizationError, AuthorizationEventPublisher, AuthorizationManager,
    DispatchKind, NoopEventPublisher, SecurityContext,
};
use http::request::Parts;
use http::Request;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::attributes::{AppliedMarker, RequestAttributes};
use super::config::FilterConfig;
use super::error::FilterError;

// ---------------------------------------------------------------------------
// AuthorizationFilterLayer
// ---------------------------------------------------------------------------

/// Tower layer that gates requests behind an [`AuthorizationManager`].
///
/// The manager inspects the request head (`http::request::Parts`); the body
/// is never touched. Events go to a [`NoopEventPublisher`] unless replaced
/// with [`with_event_publisher`](Self::with_event_publisher).
pub struct AuthorizationFilterLayer<M, P = NoopEventPublisher> {
    manager: Arc<M>,
    publisher: Arc<P>,
    config: Arc<FilterConfig>,
}

impl<M> AuthorizationFilterLayer<M>
where
    M: AuthorizationManager<Parts>,
{
    /// Create a layer with the default [`FilterConfig`].
    #[must_use]
    pub fn new(manager: M) -> Self {
        Self {
            manager: Arc::new(manager),
            publisher: Arc::new(NoopEventPublisher),
            config: Arc::new(FilterConfig::default()),
        }
    }
}

impl<M, P> AuthorizationFilterLayer<M, P> {
    /// Replace the event sink.
    #[must_use]
    pub fn with_event_publisher<Q>(self, publisher: Q) -> AuthorizationFilterLayer<M, Q>
    where
        Q: AuthorizationEventPublisher<Parts>,
    {
        AuthorizationFilterLayer {
            manager: self.manager,
            publisher: Arc::new(publisher),
            config: self.config,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Returns the decision-maker this layer consults.
    #[must_use]
    pub fn authorization_manager(&self) -> &M {
        &self.manager
    }

    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl<M, P> Clone for AuthorizationFilterLayer<M, P> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            publisher: Arc::clone(&self.publisher),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, M, P> Layer<S> for AuthorizationFilterLayer<M, P> {
    type Service = AuthorizationFilter<S, M, P>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationFilter {
            inner,
            manager: Arc::clone(&self.manager),
            publisher: Arc::clone(&self.publisher),
            applied_attribute: Arc::from(self.config.applied_attribute_name()),
            config: Arc::clone(&self.config),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorizationFilter
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`AuthorizationFilterLayer`].
///
/// Holds no per-request state: the "already applied" marker lives in the
/// request's [`RequestAttributes`].
pub struct AuthorizationFilter<S, M, P = NoopEventPublisher> {
    inner: S,
    manager: Arc<M>,
    publisher: Arc<P>,
    config: Arc<FilterConfig>,
    applied_attribute: Arc<str>,
}

impl<S: Clone, M, P> Clone for AuthorizationFilter<S, M, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            manager: Arc::clone(&self.manager),
            publisher: Arc::clone(&self.publisher),
            config: Arc::clone(&self.config),
            applied_attribute: Arc::clone(&self.applied_attribute),
        }
    }
}

impl<S, M, P> AuthorizationFilter<S, M, P> {
    #[must_use]
    pub fn authorization_manager(&self) -> &M {
        &self.manager
    }

    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Whether this request bypasses the check entirely.
    fn bypasses<B>(&self, request: &Request<B>, attributes: &RequestAttributes) -> bool {
        if self.config.observe_once_per_request && attributes.contains(&self.applied_attribute) {
            debug!(filter = %self.config.filter_name, "already applied for this request, forwarding");
            return true;
        }
        let dispatch = dispatch_kind(request);
        if self.config.skips_dispatch(dispatch) {
            debug!(filter = %self.config.filter_name, dispatch = %dispatch, "dispatch not filtered, forwarding");
            return true;
        }
        false
    }
}

impl<S, M, P, B> Service<Request<B>> for AuthorizationFilter<S, M, P>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    M: AuthorizationManager<Parts> + 'static,
    P: AuthorizationEventPublisher<Parts> + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = FilterError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, FilterError<S::Error>>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(FilterError::Inner)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let attributes = RequestAttributes::of(&mut request);

        if self.bypasses(&request, &attributes) {
            let fut = self.inner.call(request);
            return Box::pin(async move { fut.await.map_err(FilterError::Inner) });
        }

        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let marker = AppliedMarker::acquire(attributes, Arc::clone(&self.applied_attribute));
        Box::pin(authorize_and_forward(
            inner,
            Arc::clone(&self.manager),
            Arc::clone(&self.publisher),
            marker,
            self.config.filter_name.clone(),
            request,
        ))
    }
}

/// Checked path: decide, publish, then reject or forward.
///
/// `marker` is held until the continuation completes and dropped on every
/// exit path.
async fn authorize_and_forward<S, M, P, B>(
    mut inner: S,
    manager: Arc<M>,
    publisher: Arc<P>,
    marker: AppliedMarker,
    filter_name: String,
    request: Request<B>,
) -> Result<S::Response, FilterError<S::Error>>
where
    S: Service<Request<B>>,
    M: AuthorizationManager<Parts>,
    P: AuthorizationEventPublisher<Parts>,
{
    let _marker = marker;
    let (parts, body) = request.into_parts();
    let authentication = authentication_supplier(&parts);

    let decision = manager.check(&authentication, &parts).await?;
    publisher.publish(&authentication, &parts, decision.as_ref())?;

    if let Some(decision) = decision.filter(|d| !d.granted) {
        warn!(
            filter = %filter_name,
            method = %parts.method,
            uri = %parts.uri,
            reason = decision.reason.as_deref().unwrap_or(""),
            "access denied"
        );
        return Err(AuthorizationError::AccessDenied {
            reason: decision.reason,
        }
        .into());
    }

    inner
        .call(Request::from_parts(parts, body))
        .await
        .map_err(FilterError::Inner)
}

/// Reads the dispatch kind from the request, treating absence as an initial request.
fn dispatch_kind<B>(request: &Request<B>) -> DispatchKind {
    request
        .extensions()
        .get::<DispatchKind>()
        .copied()
        .unwrap_or_default()
}

/// Builds the lazy identity accessor for the request's security context.
fn authentication_supplier(parts: &Parts) -> AuthenticationSupplier {
    parts
        .extensions
        .get::<SecurityContext>()
        .map_or_else(AuthenticationSupplier::empty, SecurityContext::supplier)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
