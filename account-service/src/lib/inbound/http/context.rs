use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use crate::domain::principal::models::Principal;

/// Request-scoped security context.
///
/// The authentication middleware inserts a fresh value into every request's
/// extensions; handlers take it as an extractor. A request that never passed
/// through the middleware extracts as anonymous.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Principal>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// False when anonymous.
    pub fn has_role(&self, role: &str) -> bool {
        self.principal
            .as_ref()
            .is_some_and(|principal| principal.has_role(role))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Require an authenticated principal.
    ///
    /// # Errors
    /// * `Unauthenticated` - No principal on the request
    pub fn require_principal(&self) -> Result<&Principal, AccessDenied> {
        self.principal.as_ref().ok_or(AccessDenied::Unauthenticated)
    }

    /// Require an authenticated principal holding `role`.
    ///
    /// # Errors
    /// * `Unauthenticated` - No principal on the request
    /// * `Forbidden` - Principal lacks the role
    pub fn require_role(&self, role: &str) -> Result<&Principal, AccessDenied> {
        let principal = self.require_principal()?;
        if principal.has_role(role) {
            Ok(principal)
        } else {
            tracing::debug!(principal_id = %principal.id, role, "Role check failed");
            Err(AccessDenied::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Authorization failure raised by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let status = match self {
            AccessDenied::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessDenied::Forbidden => StatusCode::FORBIDDEN,
        };

        (
            status,
            Json(json!({
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}
