//! Request matching and per-route delegation of authorization decisions.
//!
//! Rules are evaluated in registration order; the first matching rule's
//! manager decides. Requests matching no rule go to the fallback manager,
//! which denies unless configured otherwise.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use gatehouse_core::{
    AuthenticationSupplier, AuthorizationDecision, AuthorizationError, AuthorizationManager,
    DenyAll,
};
use http::request::Parts;
use http::Method;
use regex::Regex;
use tracing::trace;

/// A shared, type-erased manager over request heads.
pub type SharedManager = Arc<dyn AuthorizationManager<Parts>>;

// ---------------------------------------------------------------------------
// RequestMatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum PathPattern {
    Any,
    Exact(String),
    /// Matches the prefix itself and anything below it (`/api` matches `/api/x`, not `/apix`).
    Prefix(String),
    Regex(Regex),
}

/// Selects requests by path and, optionally, by method.
#[derive(Debug, Clone)]
pub struct RequestMatcher {
    method: Option<Method>,
    path: PathPattern,
}

impl RequestMatcher {
    /// Matches every request.
    #[must_use]
    pub fn any() -> Self {
        Self {
            method: None,
            path: PathPattern::Any,
        }
    }

    #[must_use]
    pub fn exact(path: impl Into<String>) -> Self {
        Self {
            method: None,
            path: PathPattern::Exact(path.into()),
        }
    }

    /// Matches `prefix` and every path nested beneath it.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.len() > 1 && prefix.ends_with('/') {
            prefix.pop();
        }
        Self {
            method: None,
            path: PathPattern::Prefix(prefix),
        }
    }

    /// Matches paths against a regular expression, anchored at both ends.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            method: None,
            path: PathPattern::Regex(anchored),
        })
    }

    /// Restricts the matcher to a single HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn matches(&self, parts: &Parts) -> bool {
        if self.method.as_ref().is_some_and(|m| *m != parts.method) {
            return false;
        }
        let path = parts.uri.path();
        match &self.path {
            PathPattern::Any => true,
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Prefix(prefix) => {
                prefix == "/"
                    || path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PathPattern::Regex(re) => re.is_match(path),
        }
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(method) = &self.method {
            write!(f, "{method} ")?;
        }
        match &self.path {
            PathPattern::Any => f.write_str("any request"),
            PathPattern::Exact(path) => f.write_str(path),
            PathPattern::Prefix(prefix) => write!(f, "{prefix}/**"),
            PathPattern::Regex(re) => write!(f, "{}", re.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestMatcherDelegatingAuthorizationManager
// ---------------------------------------------------------------------------

/// Routes each request to the manager of the first matching rule.
pub struct RequestMatcherDelegatingAuthorizationManager {
    rules: Vec<(RequestMatcher, SharedManager)>,
    fallback: SharedManager,
}

impl RequestMatcherDelegatingAuthorizationManager {
    #[must_use]
    pub fn builder() -> RequestMatcherDelegatingBuilder {
        RequestMatcherDelegatingBuilder::default()
    }

    /// Number of registered rules, excluding the fallback.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl AuthorizationManager<Parts> for RequestMatcherDelegatingAuthorizationManager {
    async fn check(
        &self,
        authentication: &AuthenticationSupplier,
        parts: &Parts,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError> {
        for (matcher, manager) in &self.rules {
            if matcher.matches(parts) {
                trace!(matcher = %matcher, uri = %parts.uri, "checking authorization");
                return manager.check(authentication, parts).await;
            }
        }
        trace!(uri = %parts.uri, "no rule matched, using fallback");
        self.fallback.check(authentication, parts).await
    }
}

/// Builder for [`RequestMatcherDelegatingAuthorizationManager`].
pub struct RequestMatcherDelegatingBuilder {
    rules: Vec<(RequestMatcher, SharedManager)>,
    fallback: SharedManager,
}

impl Default for RequestMatcherDelegatingBuilder {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Arc::new(DenyAll),
        }
    }
}

impl RequestMatcherDelegatingBuilder {
    /// Appends a rule. Earlier rules take precedence.
    #[must_use]
    pub fn add<M>(mut self, matcher: RequestMatcher, manager: M) -> Self
    where
        M: AuthorizationManager<Parts> + 'static,
    {
        let manager: SharedManager = Arc::new(manager);
        self.rules.push((matcher, manager));
        self
    }

    /// Appends a rule with an already shared manager.
    #[must_use]
    pub fn add_shared(mut self, matcher: RequestMatcher, manager: SharedManager) -> Self {
        self.rules.push((matcher, manager));
        self
    }

    /// Sets the manager for requests no rule matches.
    #[must_use]
    pub fn any_request<M>(mut self, manager: M) -> Self
    where
        M: AuthorizationManager<Parts> + 'static,
    {
        self.fallback = Arc::new(manager);
        self
    }

    #[must_use]
    pub fn build(self) -> RequestMatcherDelegatingAuthorizationManager {
        RequestMatcherDelegatingAuthorizationManager {
            rules: self.rules,
            fallback: self.fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::{
        Authentication, AuthenticatedAuthorizationManager, AuthorityAuthorizationManager,
        PermitAll, Principal, SecurityContext,
    };
    use http::Request;

    use super::*;

    fn parts(method: Method, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn prefix_matches_nested_paths_only() {
        let matcher = RequestMatcher::prefix("/api/");
        assert!(matcher.matches(&parts(Method::GET, "/api")));
        assert!(matcher.matches(&parts(Method::GET, "/api/orders/1")));
        assert!(!matcher.matches(&parts(Method::GET, "/apix")));
        assert!(!matcher.matches(&parts(Method::GET, "/health")));
    }

    #[test]
    fn root_prefix_matches_everything() {
        let matcher = RequestMatcher::prefix("/");
        assert!(matcher.matches(&parts(Method::GET, "/")));
        assert!(matcher.matches(&parts(Method::GET, "/anything")));
    }

    #[test]
    fn exact_ignores_query() {
        let matcher = RequestMatcher::exact("/health/live");
        assert!(matcher.matches(&parts(Method::GET, "/health/live?verbose=1")));
        assert!(!matcher.matches(&parts(Method::GET, "/health/live/x")));
    }

    #[test]
    fn regex_is_anchored() {
        let matcher = RequestMatcher::regex(r"/orders/\d+").unwrap();
        assert!(matcher.matches(&parts(Method::GET, "/orders/42")));
        assert!(!matcher.matches(&parts(Method::GET, "/orders/42/items")));
        assert!(RequestMatcher::regex("(").is_err());
    }

    #[test]
    fn method_restriction() {
        let matcher = RequestMatcher::prefix("/api").with_method(Method::POST);
        assert!(matcher.matches(&parts(Method::POST, "/api/orders")));
        assert!(!matcher.matches(&parts(Method::GET, "/api/orders")));
        assert_eq!(matcher.to_string(), "POST /api/**");
    }

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let manager = RequestMatcherDelegatingAuthorizationManager::builder()
            .add(RequestMatcher::prefix("/public"), PermitAll)
            .add(RequestMatcher::any(), DenyAll)
            .build();
        assert_eq!(manager.len(), 2);
        let supplier = AuthenticationSupplier::empty();

        let public = manager
            .check(&supplier, &parts(Method::GET, "/public/a"))
            .await
            .unwrap()
            .unwrap();
        assert!(public.granted);

        let other = manager
            .check(&supplier, &parts(Method::GET, "/private"))
            .await
            .unwrap()
            .unwrap();
        assert!(!other.granted);
    }

    #[tokio::test]
    async fn unmatched_requests_are_denied_by_default() {
        let manager = RequestMatcherDelegatingAuthorizationManager::builder().build();
        assert!(manager.is_empty());
        let decision = manager
            .check(&AuthenticationSupplier::empty(), &parts(Method::GET, "/x"))
            .await
            .unwrap()
            .unwrap();
        assert!(!decision.granted);
    }

    #[tokio::test]
    async fn fallback_can_be_replaced() {
        let manager = RequestMatcherDelegatingAuthorizationManager::builder()
            .any_request(AuthenticatedAuthorizationManager)
            .build();
        let supplier =
            SecurityContext::with_authentication(Authentication::authenticated(Principal::new("a")))
                .supplier();
        let decision = manager
            .check(&supplier, &parts(Method::GET, "/x"))
            .await
            .unwrap()
            .unwrap();
        assert!(decision.granted);
    }

    #[tokio::test]
    async fn delegate_errors_propagate() {
        let shared: SharedManager = Arc::new(AuthorityAuthorizationManager::has_role("ADMIN"));
        let manager = RequestMatcherDelegatingAuthorizationManager::builder()
            .add_shared(RequestMatcher::prefix("/admin"), shared)
            .build();
        let err = manager
            .check(&AuthenticationSupplier::empty(), &parts(Method::GET, "/admin"))
            .await
            .unwrap_err();
        assert!(err.is_not_authenticated());
    }
}
