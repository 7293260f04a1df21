//! Handlers for routes behind the authorization gate.

use axum::Extension;
use axum::Json;
use gatehouse_core::SecurityContext;
use serde_json::json;

/// Describes the caller as seen by the security context.
///
/// Reached only after the gate granted the request, so an identity is
/// normally present; an anonymous view is returned otherwise.
pub async fn whoami_handler(Extension(context): Extension<SecurityContext>) -> Json<serde_json::Value> {
    match context.authentication() {
        Some(auth) => Json(json!({
            "principal": auth.name(),
            "authenticated": auth.authenticated,
            "authorities": auth.authorities,
        })),
        None => Json(json!({
            "principal": null,
            "authenticated": false,
            "authorities": [],
        })),
    }
}

/// Administrative status, guarded by the `ADMIN` role in the default policy.
pub async fn admin_status_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{Authentication, Principal};

    #[tokio::test]
    async fn whoami_reports_principal_and_authorities() {
        let context = SecurityContext::with_authentication(Authentication::authenticated(
            Principal::new("alice").with_role("ADMIN"),
        ));
        let json = whoami_handler(Extension(context)).await.0;
        assert_eq!(json["principal"], "alice");
        assert_eq!(json["authenticated"], true);
        assert_eq!(json["authorities"][0], "ROLE_ADMIN");
    }

    #[tokio::test]
    async fn whoami_without_identity_is_anonymous() {
        let json = whoami_handler(Extension(SecurityContext::new())).await.0;
        assert!(json["principal"].is_null());
        assert_eq!(json["authenticated"], false);
    }

    #[tokio::test]
    async fn admin_status_is_ok() {
        assert_eq!(admin_status_handler().await.0["status"], "ok");
    }
}
