//! The route policy served by the `gatehouse` binary.

use gatehouse_core::{
    AuthenticatedAuthorizationManager, AuthorityAuthorizationManager, DenyAll, PermitAll,
};

use crate::matcher::{RequestMatcher, RequestMatcherDelegatingAuthorizationManager};

/// Builds the default route policy:
///
/// | Requests | Rule |
/// |---|---|
/// | `/health/**` | permit all |
/// | `/api/admin/**` | role `ADMIN` |
/// | `/api/**` | any authenticated caller |
/// | anything else | deny |
#[must_use]
pub fn default_policy() -> RequestMatcherDelegatingAuthorizationManager {
    RequestMatcherDelegatingAuthorizationManager::builder()
        .add(RequestMatcher::prefix("/health"), PermitAll)
        .add(
            RequestMatcher::prefix("/api/admin"),
            AuthorityAuthorizationManager::has_role("ADMIN"),
        )
        .add(RequestMatcher::prefix("/api"), AuthenticatedAuthorizationManager)
        .any_request(DenyAll)
        .build()
}

#[cfg(test)]
mod tests {
    use gatehouse_core::{
        Authentication, AuthenticationSupplier, AuthorizationManager, Principal, SecurityContext,
    };
    use http::request::Parts;
    use http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    fn user(roles: &[&str]) -> AuthenticationSupplier {
        let principal = roles
            .iter()
            .fold(Principal::new("u"), |p, role| p.with_role(*role));
        SecurityContext::with_authentication(Authentication::authenticated(principal)).supplier()
    }

    async fn granted(supplier: &AuthenticationSupplier, uri: &str) -> bool {
        default_policy()
            .check(supplier, &parts(uri))
            .await
            .unwrap()
            .is_some_and(|d| d.granted)
    }

    #[tokio::test]
    async fn health_is_public() {
        assert!(granted(&AuthenticationSupplier::empty(), "/health/live").await);
    }

    #[tokio::test]
    async fn api_requires_authentication() {
        assert!(!granted(&AuthenticationSupplier::empty(), "/api/me").await);
        assert!(granted(&user(&[]), "/api/me").await);
    }

    #[tokio::test]
    async fn admin_requires_role() {
        assert!(!granted(&user(&["USER"]), "/api/admin/status").await);
        assert!(granted(&user(&["ADMIN"]), "/api/admin/status").await);
    }

    #[tokio::test]
    async fn unknown_paths_are_denied() {
        assert!(!granted(&user(&["ADMIN"]), "/internal").await);
    }
}
