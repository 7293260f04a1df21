use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of a single authorization check.
///
/// Produced fresh for every request; never cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub granted: bool,
    /// Human-readable explanation, suitable for logs.
    pub reason: Option<String>,
    /// Extra facts the decision-maker wants to surface to event sinks.
    /// Uses `BTreeMap` for deterministic ordering in logs.
    pub attributes: BTreeMap<String, String>,
}

impl AuthorizationDecision {
    #[must_use]
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            reason: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn granted() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn denied() -> Self {
        Self::new(false)
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let decision = AuthorizationDecision::denied()
            .with_reason("missing authority")
            .with_attribute("required", "ROLE_ADMIN");
        assert!(!decision.is_granted());
        assert_eq!(decision.reason.as_deref(), Some("missing authority"));
        assert_eq!(decision.attributes["required"], "ROLE_ADMIN");
    }

    #[test]
    fn granted_has_no_reason_by_default() {
        let decision = AuthorizationDecision::granted();
        assert!(decision.is_granted());
        assert!(decision.reason.is_none());
        assert!(decision.attributes.is_empty());
    }
}
