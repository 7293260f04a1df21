//! Authorization event sinks.
//!
//! Every non-bypassed check hands its decision to an
//! [`AuthorizationEventPublisher`]. Sinks receive the lazy identity supplier
//! rather than a resolved identity, so a sink that insists on an identity can
//! fail the request with `NotAuthenticated`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::authentication::AuthenticationSupplier;
use crate::decision::AuthorizationDecision;
use crate::error::AuthorizationError;

/// Receives the outcome of each authorization check.
pub trait AuthorizationEventPublisher<T: ?Sized>: Send + Sync {
    /// Publishes the decision reached for `object`.
    ///
    /// # Errors
    ///
    /// Implementations may propagate `NotAuthenticated` from the supplier.
    fn publish(
        &self,
        authentication: &AuthenticationSupplier,
        object: &T,
        decision: Option<&AuthorizationDecision>,
    ) -> Result<(), AuthorizationError>;
}

/// Discards every event. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventPublisher;

impl<T: ?Sized> AuthorizationEventPublisher<T> for NoopEventPublisher {
    fn publish(
        &self,
        _authentication: &AuthenticationSupplier,
        _object: &T,
        _decision: Option<&AuthorizationDecision>,
    ) -> Result<(), AuthorizationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AuthorizationEvent
// ---------------------------------------------------------------------------

/// A published authorization outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationEvent {
    Granted {
        principal: Option<String>,
        decision: AuthorizationDecision,
    },
    Denied {
        principal: Option<String>,
        decision: AuthorizationDecision,
    },
}

impl AuthorizationEvent {
    /// Builds the event for `decision`, resolving the principal if present.
    #[must_use]
    pub fn from_decision(
        authentication: &AuthenticationSupplier,
        decision: &AuthorizationDecision,
    ) -> Self {
        let principal = authentication.try_get().map(|auth| auth.name().to_string());
        let decision = decision.clone();
        if decision.granted {
            Self::Granted {
                principal,
                decision,
            }
        } else {
            Self::Denied {
                principal,
                decision,
            }
        }
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    #[must_use]
    pub fn decision(&self) -> &AuthorizationDecision {
        match self {
            Self::Granted { decision, .. } | Self::Denied { decision, .. } => decision,
        }
    }
}

// ---------------------------------------------------------------------------
// TracingEventPublisher
// ---------------------------------------------------------------------------

/// Logs decisions through `tracing`: grants at debug, denials at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl<T: ?Sized> AuthorizationEventPublisher<T> for TracingEventPublisher {
    fn publish(
        &self,
        authentication: &AuthenticationSupplier,
        _object: &T,
        decision: Option<&AuthorizationDecision>,
    ) -> Result<(), AuthorizationError> {
        let Some(decision) = decision else {
            return Ok(());
        };
        let principal = authentication
            .try_get()
            .map_or_else(|| "<none>".to_string(), |auth| auth.name().to_string());
        let reason = decision.reason.as_deref().unwrap_or("");

        if decision.granted {
            tracing::debug!(principal = %principal, "authorization granted");
        } else {
            tracing::warn!(principal = %principal, reason = reason, "authorization denied");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BroadcastEventPublisher
// ---------------------------------------------------------------------------

/// Fans events out to subscribers over a `tokio::sync::broadcast` channel.
///
/// Denials are always sent; grants only when enabled with
/// [`with_granted_events`](Self::with_granted_events). Abstentions produce no
/// event. Having no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<AuthorizationEvent>,
    publish_granted: bool,
}

impl BroadcastEventPublisher {
    /// Creates a publisher whose channel buffers up to `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self {
            sender,
            publish_granted: false,
        }
    }

    #[must_use]
    pub fn with_granted_events(mut self, publish_granted: bool) -> Self {
        self.publish_granted = publish_granted;
        self
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
        self.sender.subscribe()
    }
}

impl<T: ?Sized> AuthorizationEventPublisher<T> for BroadcastEventPublisher {
    fn publish(
        &self,
        authentication: &AuthenticationSupplier,
        _object: &T,
        decision: Option<&AuthorizationDecision>,
    ) -> Result<(), AuthorizationError> {
        let Some(decision) = decision else {
            return Ok(());
        };
        if decision.granted && !self.publish_granted {
            return Ok(());
        }
        // Ignore send errors -- there may be no subscribers
        let _ = self
            .sender
            .send(AuthorizationEvent::from_decision(authentication, decision));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{Authentication, Principal, SecurityContext};

    #[test]
    fn noop_accepts_everything() {
        let supplier = AuthenticationSupplier::empty();
        NoopEventPublisher
            .publish(&supplier, "x", Some(&AuthorizationDecision::denied()))
            .unwrap();
        NoopEventPublisher.publish(&supplier, "x", None).unwrap();
    }

    #[test]
    fn tracing_publisher_tolerates_missing_identity() {
        let supplier = AuthenticationSupplier::empty();
        TracingEventPublisher
            .publish(&supplier, "x", Some(&AuthorizationDecision::denied()))
            .unwrap();
    }

    #[test]
    fn event_carries_principal_and_decision() {
        let supplier =
            SecurityContext::with_authentication(Authentication::authenticated(Principal::new("alice")))
                .supplier();
        let event = AuthorizationEvent::from_decision(
            &supplier,
            &AuthorizationDecision::denied().with_reason("nope"),
        );
        assert!(event.is_denied());
        assert_eq!(event.decision().reason.as_deref(), Some("nope"));
        assert!(matches!(
            event,
            AuthorizationEvent::Denied { principal: Some(ref p), .. } if p == "alice"
        ));
    }

    #[tokio::test]
    async fn broadcast_sends_denials_only_by_default() {
        let publisher = BroadcastEventPublisher::new(8);
        let mut rx = publisher.subscribe();
        let supplier = AuthenticationSupplier::empty();

        publisher
            .publish(&supplier, "x", Some(&AuthorizationDecision::granted()))
            .unwrap();
        publisher.publish(&supplier, "x", None).unwrap();
        publisher
            .publish(&supplier, "x", Some(&AuthorizationDecision::denied()))
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.is_denied());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_sends_grants_when_enabled() {
        let publisher = BroadcastEventPublisher::new(8).with_granted_events(true);
        let mut rx = publisher.subscribe();
        publisher
            .publish(
                &AuthenticationSupplier::empty(),
                "x",
                Some(&AuthorizationDecision::granted()),
            )
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AuthorizationEvent::Granted { principal: None, .. }));
    }

    #[test]
    fn broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastEventPublisher::new(1);
        publisher
            .publish(
                &AuthenticationSupplier::empty(),
                "x",
                Some(&AuthorizationDecision::denied()),
            )
            .unwrap();
    }
}
