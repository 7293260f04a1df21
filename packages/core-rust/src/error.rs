/// Failures raised while authorizing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    /// The decision-maker rejected the request.
    #[error("access denied")]
    AccessDenied { reason: Option<String> },
    /// An identity was required but none was present.
    #[error("not authenticated: {message}")]
    NotAuthenticated { message: String },
    /// The decision-maker or event sink failed for another reason.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthorizationError {
    #[must_use]
    pub fn access_denied() -> Self {
        Self::AccessDenied { reason: None }
    }

    /// The error raised when the security context holds no identity.
    #[must_use]
    pub fn credentials_not_found() -> Self {
        Self::NotAuthenticated {
            message: "an authentication object was not found in the security context".to_string(),
        }
    }

    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    #[must_use]
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(AuthorizationError::access_denied().to_string(), "access denied");
        assert!(AuthorizationError::credentials_not_found()
            .to_string()
            .starts_with("not authenticated: "));
        let internal = AuthorizationError::from(anyhow::anyhow!("policy store offline"));
        assert_eq!(internal.to_string(), "internal error: policy store offline");
    }

    #[test]
    fn kind_predicates() {
        assert!(AuthorizationError::access_denied().is_access_denied());
        assert!(AuthorizationError::credentials_not_found().is_not_authenticated());
        assert!(!AuthorizationError::access_denied().is_not_authenticated());
    }
}
