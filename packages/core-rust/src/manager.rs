//! Authorization decision-makers.
//!
//! - [`PermitAll`] / [`DenyAll`]: fixed decisions
//! - [`AuthenticatedAuthorizationManager`]: any authenticated identity
//! - [`AuthorityAuthorizationManager`]: identity must hold one of a set of authorities
//! - [`FnAuthorizationManager`]: adapts a plain function or closure

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::authentication::{role_authority, AuthenticationSupplier};
use crate::decision::AuthorizationDecision;
use crate::error::AuthorizationError;

/// Decides whether the current identity may proceed with `object`.
///
/// Returning `Ok(None)` abstains; callers treat an abstention as "no
/// objection". Implementations that need the identity call
/// [`AuthenticationSupplier::get`] and propagate its `NotAuthenticated` error.
#[async_trait]
pub trait AuthorizationManager<T: ?Sized + Sync>: Send + Sync {
    async fn check(
        &self,
        authentication: &AuthenticationSupplier,
        object: &T,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError>;

    /// Runs [`check`](Self::check) and turns a denial into an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::AccessDenied`] when the decision is
    /// present and not granted, or any error raised by `check`.
    async fn verify(
        &self,
        authentication: &AuthenticationSupplier,
        object: &T,
    ) -> Result<(), AuthorizationError> {
        match self.check(authentication, object).await? {
            Some(decision) if !decision.granted => Err(AuthorizationError::AccessDenied {
                reason: decision.reason,
            }),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed decisions
// ---------------------------------------------------------------------------

/// Grants every request without looking at the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

#[async_trait]
impl<T: ?Sized + Sync> AuthorizationManager<T> for PermitAll {
    async fn check(
        &self,
        _authentication: &AuthenticationSupplier,
        _object: &T,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError> {
        Ok(Some(AuthorizationDecision::granted()))
    }
}

/// Denies every request without looking at the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl<T: ?Sized + Sync> AuthorizationManager<T> for DenyAll {
    async fn check(
        &self,
        _authentication: &AuthenticationSupplier,
        _object: &T,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError> {
        Ok(Some(AuthorizationDecision::denied().with_reason("deny all")))
    }
}

// ---------------------------------------------------------------------------
// AuthenticatedAuthorizationManager
// ---------------------------------------------------------------------------

/// Grants any caller carrying an authenticated identity.
///
/// An absent identity is a denial here rather than `NotAuthenticated`, so
/// anonymous callers see a regular access-denied outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedAuthorizationManager;

#[async_trait]
impl<T: ?Sized + Sync> AuthorizationManager<T> for AuthenticatedAuthorizationManager {
    async fn check(
        &self,
        authentication: &AuthenticationSupplier,
        _object: &T,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError> {
        let granted = authentication
            .try_get()
            .is_some_and(|auth| auth.authenticated);
        let decision = AuthorizationDecision::new(granted);
        Ok(Some(if granted {
            decision
        } else {
            decision.with_reason("authentication required")
        }))
    }
}

// ---------------------------------------------------------------------------
// AuthorityAuthorizationManager
// ---------------------------------------------------------------------------

/// Grants callers holding at least one of the configured authorities.
#[derive(Debug, Clone)]
pub struct AuthorityAuthorizationManager {
    authorities: BTreeSet<String>,
}

impl AuthorityAuthorizationManager {
    #[must_use]
    pub fn has_authority(authority: impl Into<String>) -> Self {
        Self {
            authorities: BTreeSet::from([authority.into()]),
        }
    }

    #[must_use]
    pub fn has_any_authority<I, A>(authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    /// Requires the role `role`, i.e. the authority `ROLE_{role}`.
    #[must_use]
    pub fn has_role(role: &str) -> Self {
        Self::has_authority(role_authority(role))
    }

    #[must_use]
    pub fn has_any_role(roles: &[&str]) -> Self {
        Self::has_any_authority(roles.iter().map(|role| role_authority(role)))
    }

    #[must_use]
    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }
}

#[async_trait]
impl<T: ?Sized + Sync> AuthorizationManager<T> for AuthorityAuthorizationManager {
    async fn check(
        &self,
        authentication: &AuthenticationSupplier,
        _object: &T,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError> {
        let auth = authentication.get()?;
        let granted =
            auth.authenticated && self.authorities.iter().any(|a| auth.has_authority(a));
        let required = self
            .authorities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let decision = AuthorizationDecision::new(granted).with_attribute("required", required);
        Ok(Some(if granted {
            decision
        } else {
            decision.with_reason("missing required authority")
        }))
    }
}

// ---------------------------------------------------------------------------
// FnAuthorizationManager
// ---------------------------------------------------------------------------

/// Adapts a synchronous function into an [`AuthorizationManager`].
#[derive(Debug, Clone, Copy)]
pub struct FnAuthorizationManager<F>(F);

/// Wraps `f` as an [`AuthorizationManager`].
#[must_use]
pub fn manager_fn<F>(f: F) -> FnAuthorizationManager<F> {
    FnAuthorizationManager(f)
}

#[async_trait]
impl<T, F> AuthorizationManager<T> for FnAuthorizationManager<F>
where
    T: ?Sized + Sync,
    F: Fn(&AuthenticationSupplier, &T) -> Result<Option<AuthorizationDecision>, AuthorizationError>
        + Send
        + Sync,
{
    async fn check(
        &self,
        authentication: &AuthenticationSupplier,
        object: &T,
    ) -> Result<Option<AuthorizationDecision>, AuthorizationError> {
        (self.0)(authentication, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{Authentication, Principal, SecurityContext};

    fn supplier_for(auth: Authentication) -> AuthenticationSupplier {
        SecurityContext::with_authentication(auth).supplier()
    }

    #[tokio::test]
    async fn permit_all_and_deny_all() {
        let supplier = AuthenticationSupplier::empty();
        let granted = PermitAll.check(&supplier, "x").await.unwrap().unwrap();
        assert!(granted.granted);
        let denied = DenyAll.check(&supplier, "x").await.unwrap().unwrap();
        assert!(!denied.granted);
    }

    #[tokio::test]
    async fn authenticated_manager_denies_missing_identity() {
        let decision = AuthenticatedAuthorizationManager
            .check(&AuthenticationSupplier::empty(), "x")
            .await
            .unwrap()
            .unwrap();
        assert!(!decision.granted);
        assert_eq!(decision.reason.as_deref(), Some("authentication required"));
    }

    #[tokio::test]
    async fn authenticated_manager_denies_anonymous() {
        let supplier = supplier_for(Authentication::anonymous("guest"));
        let decision = AuthenticatedAuthorizationManager
            .check(&supplier, "x")
            .await
            .unwrap()
            .unwrap();
        assert!(!decision.granted);
    }

    #[tokio::test]
    async fn authenticated_manager_grants_authenticated() {
        let supplier = supplier_for(Authentication::authenticated(Principal::new("alice")));
        let decision = AuthenticatedAuthorizationManager
            .check(&supplier, "x")
            .await
            .unwrap()
            .unwrap();
        assert!(decision.granted);
    }

    #[tokio::test]
    async fn authority_manager_checks_roles() {
        let manager = AuthorityAuthorizationManager::has_role("ADMIN");
        let admin = supplier_for(Authentication::authenticated(
            Principal::new("alice").with_role("ADMIN"),
        ));
        let user = supplier_for(Authentication::authenticated(
            Principal::new("bob").with_role("USER"),
        ));

        assert!(manager.check(&admin, "x").await.unwrap().unwrap().granted);
        let denied = manager.check(&user, "x").await.unwrap().unwrap();
        assert!(!denied.granted);
        assert_eq!(denied.attributes["required"], "ROLE_ADMIN");
    }

    #[tokio::test]
    async fn authority_manager_requires_identity() {
        let manager = AuthorityAuthorizationManager::has_any_role(&["ADMIN", "OPS"]);
        let err = manager
            .check(&AuthenticationSupplier::empty(), "x")
            .await
            .unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[tokio::test]
    async fn authority_manager_matches_explicit_authority() {
        let manager = AuthorityAuthorizationManager::has_any_authority(["orders:read", "orders:write"]);
        let supplier = supplier_for(
            Authentication::authenticated(Principal::new("svc")).with_authority("orders:read"),
        );
        assert!(manager.check(&supplier, "x").await.unwrap().unwrap().granted);
        assert_eq!(manager.authorities().len(), 2);
    }

    #[tokio::test]
    async fn verify_turns_denial_into_error() {
        let supplier = AuthenticationSupplier::empty();
        let err = DenyAll.verify(&supplier, "x").await.unwrap_err();
        assert!(matches!(
            err,
            AuthorizationError::AccessDenied { reason: Some(ref r) } if r == "deny all"
        ));
        PermitAll.verify(&supplier, "x").await.unwrap();
    }

    #[tokio::test]
    async fn fn_manager_sees_object_and_may_abstain() {
        let manager = manager_fn(|_auth: &AuthenticationSupplier, path: &str| {
            if path.starts_with("/public") {
                Ok(Some(AuthorizationDecision::granted()))
            } else {
                Ok(None)
            }
        });
        let supplier = AuthenticationSupplier::empty();
        assert!(manager.check(&supplier, "/public/a").await.unwrap().is_some());
        assert!(manager.check(&supplier, "/private").await.unwrap().is_none());
        manager.verify(&supplier, "/private").await.unwrap();
    }
}
