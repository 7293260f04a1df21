//! Caller identity and the request-scoped security context that carries it.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::AuthorizationError;

/// Prefix applied to role names when they are turned into authorities.
pub const ROLE_PREFIX: &str = "ROLE_";

/// The authenticated entity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier for the authenticated entity.
    pub id: String,
    /// Roles assigned to this principal for authorization checks.
    pub roles: Vec<String>,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Result of authenticating a caller: who they are and what they hold.
///
/// Roles of the principal are mirrored into `authorities` with the
/// [`ROLE_PREFIX`], so role checks and authority checks share one lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub principal: Principal,
    pub authorities: BTreeSet<String>,
    /// `false` for anonymous or partially-established identities.
    pub authenticated: bool,
}

impl Authentication {
    /// Builds an authenticated identity whose authorities are derived from
    /// the principal's roles.
    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        let authorities = principal.roles.iter().map(|r| role_authority(r)).collect();
        Self {
            principal,
            authorities,
            authenticated: true,
        }
    }

    /// Builds an identity that is known but not authenticated (e.g. anonymous).
    #[must_use]
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            principal: Principal::new(id),
            authorities: BTreeSet::new(),
            authenticated: false,
        }
    }

    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.insert(authority.into());
        self
    }

    /// Identifier of the principal.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.principal.id
    }

    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}

/// Maps a role name to its authority, leaving already-prefixed names alone.
#[must_use]
pub fn role_authority(role: &str) -> String {
    if role.starts_with(ROLE_PREFIX) {
        role.to_string()
    } else {
        format!("{ROLE_PREFIX}{role}")
    }
}

// ---------------------------------------------------------------------------
// SecurityContext
// ---------------------------------------------------------------------------

/// Request-scoped holder of the current [`Authentication`].
///
/// Cloning yields a handle to the same slot, so a stage that authenticates
/// the caller after the context was attached to the request is still seen by
/// every later reader.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    authentication: Arc<RwLock<Option<Arc<Authentication>>>>,
}

impl SecurityContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_authentication(authentication: Authentication) -> Self {
        let context = Self::new();
        context.set_authentication(Some(authentication));
        context
    }

    /// Returns the current authentication, if any.
    #[must_use]
    pub fn authentication(&self) -> Option<Arc<Authentication>> {
        self.authentication.read().clone()
    }

    pub fn set_authentication(&self, authentication: Option<Authentication>) {
        *self.authentication.write() = authentication.map(Arc::new);
    }

    pub fn clear(&self) {
        self.set_authentication(None);
    }

    /// Returns a lazy accessor over this context.
    #[must_use]
    pub fn supplier(&self) -> AuthenticationSupplier {
        AuthenticationSupplier {
            context: Some(self.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthenticationSupplier
// ---------------------------------------------------------------------------

/// Lazily evaluated accessor for the caller's identity.
///
/// Nothing is read until [`get`](Self::get) or [`try_get`](Self::try_get) is
/// called, and each call observes the context as it is at that moment.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationSupplier {
    context: Option<SecurityContext>,
}

impl AuthenticationSupplier {
    /// A supplier with no backing context; every `get` fails.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the current identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::NotAuthenticated`] if no identity is
    /// present at the time of access.
    pub fn get(&self) -> Result<Arc<Authentication>, AuthorizationError> {
        self.try_get()
            .ok_or_else(AuthorizationError::credentials_not_found)
    }

    /// Returns the current identity without treating absence as an error.
    #[must_use]
    pub fn try_get(&self) -> Option<Arc<Authentication>> {
        self.context.as_ref().and_then(SecurityContext::authentication)
    }
}
