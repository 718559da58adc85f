use std::panic::AssertUnwindSafe;
use std::panic::{self};
use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::middleware::{self};
use axum::response::Response;
use axum::Router;
use credentials::Claims;
use credentials::TokenError;
use futures::FutureExt;

use crate::domain::principal::models::Principal;
use crate::inbound::http::context::SecurityContext;
use crate::principal::errors::PrincipalError;
use crate::principal::ports::PrincipalLookup;
use crate::principal::ports::TokenVerifier;

const BEARER_PREFIX: &str = "Bearer ";

/// Result of authenticating one request.
#[derive(Debug)]
pub enum AuthenticationOutcome {
    /// No usable bearer credential on the request.
    NoCredential,
    Verified(Principal),
    Rejected(RejectionReason),
}

/// Why a presented credential did not produce a principal.
#[derive(Debug, thiserror::Error)]
pub enum RejectionReason {
    #[error("Token rejected: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Token verifier panicked")]
    VerifierPanicked,

    #[error("Unknown subject")]
    UnknownSubject,

    #[error("Principal lookup failed: {0}")]
    LookupFailed(#[from] PrincipalError),

    #[error("Principal lookup panicked")]
    LookupPanicked,
}

impl RejectionReason {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RejectionReason::InvalidToken(e) => e.kind(),
            RejectionReason::VerifierPanicked => "verifier_panicked",
            RejectionReason::UnknownSubject => "unknown_subject",
            RejectionReason::LookupFailed(_) => "lookup_failed",
            RejectionReason::LookupPanicked => "lookup_panicked",
        }
    }
}

/// Turns the bearer token on a request into a principal.
///
/// Holds only shared, read-only collaborators, so one instance serves every
/// request.
pub struct AuthenticationInterceptor<TV, PL>
where
    TV: TokenVerifier,
    PL: PrincipalLookup,
{
    verifier: Arc<TV>,
    principals: Arc<PL>,
}

impl<TV, PL> Clone for AuthenticationInterceptor<TV, PL>
where
    TV: TokenVerifier,
    PL: PrincipalLookup,
{
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            principals: Arc::clone(&self.principals),
        }
    }
}

impl<TV, PL> AuthenticationInterceptor<TV, PL>
where
    TV: TokenVerifier,
    PL: PrincipalLookup,
{
    pub fn new(verifier: Arc<TV>, principals: Arc<PL>) -> Self {
        Self {
            verifier,
            principals,
        }
    }

    /// Extract, verify and resolve the request's bearer credential.
    ///
    /// Never fails; every error, including a panic in either collaborator,
    /// becomes `Rejected`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthenticationOutcome {
        let Some(token) = extract_bearer_token(headers) else {
            return AuthenticationOutcome::NoCredential;
        };

        let claims = match self.verify(token) {
            Ok(claims) => claims,
            Err(reason) => return AuthenticationOutcome::Rejected(reason),
        };

        match self.lookup(&claims.sub).await {
            Ok(principal) => AuthenticationOutcome::Verified(principal),
            Err(reason) => AuthenticationOutcome::Rejected(reason),
        }
    }

    fn verify(&self, token: &str) -> Result<Claims, RejectionReason> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.verifier.verify(token))) {
            Ok(result) => Ok(result?),
            Err(_) => Err(RejectionReason::VerifierPanicked),
        }
    }

    async fn lookup(&self, subject: &str) -> Result<Principal, RejectionReason> {
        let lookup = AssertUnwindSafe(self.principals.find_by_subject(subject));
        match lookup.catch_unwind().await {
            Ok(result) => result?.ok_or(RejectionReason::UnknownSubject),
            Err(_) => Err(RejectionReason::LookupPanicked),
        }
    }
}

/// Extract the bearer token from the `Authorization` header.
///
/// The prefix is case-sensitive and the token is returned untrimmed; a blank
/// header or blank token yields `None`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    if value.trim().is_empty() {
        return None;
    }

    let token = value.strip_prefix(BEARER_PREFIX)?;
    if token.trim().is_empty() {
        return None;
    }

    Some(token)
}

/// Middleware that attaches a fresh `SecurityContext` to every request.
///
/// Authentication is fail-open: the request is always forwarded, anonymous
/// when no principal could be established.
pub async fn authenticate<TV, PL>(
    State(interceptor): State<AuthenticationInterceptor<TV, PL>>,
    mut req: Request,
    next: Next,
) -> Response
where
    TV: TokenVerifier,
    PL: PrincipalLookup,
{
    let outcome = {
        let headers = req.headers();
        interceptor.authenticate(headers).await
    };

    let context = match outcome {
        AuthenticationOutcome::NoCredential => SecurityContext::anonymous(),
        AuthenticationOutcome::Verified(principal) => {
            tracing::debug!(principal_id = %principal.id, "Request authenticated");
            SecurityContext::authenticated(principal)
        }
        AuthenticationOutcome::Rejected(reason) => {
            tracing::warn!(reason = reason.kind(), error = %reason, "Authentication rejected");
            SecurityContext::anonymous()
        }
    };

    req.extensions_mut().insert(context);

    next.run(req).await
}

/// Wrap every route of `router` with the authentication middleware.
pub fn with_authentication<S, TV, PL>(
    router: Router<S>,
    interceptor: AuthenticationInterceptor<TV, PL>,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    TV: TokenVerifier,
    PL: PrincipalLookup,
{
    router.layer(middleware::from_fn_with_state(
        interceptor,
        authenticate::<TV, PL>,
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::body::{self};
    use axum::http::HeaderValue;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Extension;
    use chrono::Duration;
    use chrono::Utc;
    use credentials::TokenService;
    use mockall::mock;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::principal::models::EmailAddress;
    use crate::domain::principal::models::PrincipalId;
    use crate::domain::principal::models::Role;
    use crate::domain::principal::models::Username;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    mock! {
        pub TestPrincipalLookup {}

        #[async_trait]
        impl PrincipalLookup for TestPrincipalLookup {
            async fn find_by_subject(&self, subject: &str) -> Result<Option<Principal>, PrincipalError>;
        }
    }

    struct PanickingVerifier;

    impl TokenVerifier for PanickingVerifier {
        fn verify(&self, _token: &str) -> Result<Claims, TokenError> {
            panic!("verifier exploded")
        }
    }

    struct PanickingLookup;

    #[async_trait]
    impl PrincipalLookup for PanickingLookup {
        async fn find_by_subject(&self, _subject: &str) -> Result<Option<Principal>, PrincipalError> {
            panic!("lookup exploded")
        }
    }

    fn principal(username: &str) -> Principal {
        Principal {
            id: PrincipalId::new(),
            username: Username::new(username.to_string()).unwrap(),
            email: EmailAddress::new(format!("{}@example.com", username)).unwrap(),
            roles: vec![Role::user()],
            created_at: Utc::now(),
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(SECRET).unwrap()
    }

    fn token_for(subject: &str) -> String {
        tokens().issue(subject, HashMap::new()).unwrap()
    }

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(authorization).unwrap(),
        );
        headers
    }

    /// Lookup that resolves every subject to a principal of that name.
    fn echo_lookup() -> MockTestPrincipalLookup {
        let mut principals = MockTestPrincipalLookup::new();
        principals
            .expect_find_by_subject()
            .returning(|subject| Ok(Some(principal(subject))));
        principals
    }

    fn interceptor<TV, PL>(verifier: TV, principals: PL) -> AuthenticationInterceptor<TV, PL>
    where
        TV: TokenVerifier,
        PL: PrincipalLookup,
    {
        AuthenticationInterceptor::new(Arc::new(verifier), Arc::new(principals))
    }

    async fn whoami(context: SecurityContext) -> String {
        context
            .principal()
            .map(|principal| principal.username.to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app<TV, PL>(interceptor: AuthenticationInterceptor<TV, PL>) -> Router
    where
        TV: TokenVerifier,
        PL: PrincipalLookup,
    {
        with_authentication(Router::new().route("/whoami", get(whoami)), interceptor)
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }

        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(
            extract_bearer_token(&headers("Bearer   xyz  ")),
            Some("  xyz  ")
        );
        assert_eq!(extract_bearer_token(&headers("bearer abc")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer ")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer    ")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer")), None);
        assert_eq!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer_token(&headers("   ")), None);
        assert_eq!(extract_bearer_token(&headers("")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_outcome_no_credential() {
        let mut principals = MockTestPrincipalLookup::new();
        principals.expect_find_by_subject().times(0);
        let interceptor = interceptor(tokens(), principals);

        let outcome = interceptor.authenticate(&HeaderMap::new()).await;
        assert!(matches!(outcome, AuthenticationOutcome::NoCredential));
    }

    #[tokio::test]
    async fn test_outcome_verified() {
        let mut principals = MockTestPrincipalLookup::new();
        principals
            .expect_find_by_subject()
            .withf(|subject| subject == "alice")
            .times(1)
            .returning(|subject| Ok(Some(principal(subject))));
        let interceptor = interceptor(tokens(), principals);

        let bearer = format!("Bearer {}", token_for("alice"));
        let outcome = interceptor.authenticate(&headers(&bearer)).await;
        match outcome {
            AuthenticationOutcome::Verified(principal) => {
                assert_eq!(principal.username.as_str(), "alice")
            }
            other => panic!("expected Verified, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_outcome_expired_token_skips_lookup() {
        let mut principals = MockTestPrincipalLookup::new();
        principals.expect_find_by_subject().times(0);
        let interceptor = interceptor(tokens(), principals);

        let token = tokens()
            .issue_at("alice", HashMap::new(), Utc::now() - Duration::hours(25))
            .unwrap();
        let outcome = interceptor
            .authenticate(&headers(&format!("Bearer {}", token)))
            .await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::InvalidToken(TokenError::Expired))
        ));
    }

    #[tokio::test]
    async fn test_outcome_bad_signature() {
        let mut principals = MockTestPrincipalLookup::new();
        principals.expect_find_by_subject().times(0);
        let interceptor = interceptor(tokens(), principals);

        let forged = TokenService::new(b"another_secret_key_of_32_bytes_or_more")
            .unwrap()
            .issue("alice", HashMap::new())
            .unwrap();
        let outcome = interceptor
            .authenticate(&headers(&format!("Bearer {}", forged)))
            .await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::InvalidToken(
                TokenError::BadSignature
            ))
        ));
    }

    #[tokio::test]
    async fn test_outcome_untrimmed_token_fails_signature() {
        let mut principals = MockTestPrincipalLookup::new();
        principals.expect_find_by_subject().times(0);
        let interceptor = interceptor(tokens(), principals);

        let bearer = format!("Bearer  {}", token_for("alice"));
        let outcome = interceptor.authenticate(&headers(&bearer)).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::InvalidToken(
                TokenError::BadSignature
            ))
        ));
    }

    #[tokio::test]
    async fn test_outcome_unknown_subject() {
        let mut principals = MockTestPrincipalLookup::new();
        principals
            .expect_find_by_subject()
            .times(1)
            .returning(|_| Ok(None));
        let interceptor = interceptor(tokens(), principals);

        let bearer = format!("Bearer {}", token_for("ghost"));
        let outcome = interceptor.authenticate(&headers(&bearer)).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::UnknownSubject)
        ));
    }

    #[tokio::test]
    async fn test_outcome_lookup_error() {
        let mut principals = MockTestPrincipalLookup::new();
        principals
            .expect_find_by_subject()
            .returning(|_| Err(PrincipalError::StoreUnavailable("timeout".to_string())));
        let interceptor = interceptor(tokens(), principals);

        let bearer = format!("Bearer {}", token_for("alice"));
        let outcome = interceptor.authenticate(&headers(&bearer)).await;
        match outcome {
            AuthenticationOutcome::Rejected(reason) => assert_eq!(reason.kind(), "lookup_failed"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_outcome_verifier_panic() {
        let mut principals = MockTestPrincipalLookup::new();
        principals.expect_find_by_subject().times(0);
        let interceptor = interceptor(PanickingVerifier, principals);

        let outcome = interceptor.authenticate(&headers("Bearer abc")).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::VerifierPanicked)
        ));
    }

    #[tokio::test]
    async fn test_outcome_lookup_panic() {
        let interceptor = interceptor(tokens(), PanickingLookup);

        let bearer = format!("Bearer {}", token_for("alice"));
        let outcome = interceptor.authenticate(&headers(&bearer)).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::LookupPanicked)
        ));
    }

    #[tokio::test]
    async fn test_middleware_authenticates_request() {
        let app = app(interceptor(tokens(), echo_lookup()));

        let bearer = format!("Bearer {}", token_for("alice"));
        let (status, body) = call(app, Some(&bearer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn test_middleware_forwards_without_credential() {
        let app = app(interceptor(tokens(), echo_lookup()));

        let (status, body) = call(app, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_middleware_fails_open_on_invalid_token() {
        let app = app(interceptor(tokens(), echo_lookup()));

        let (status, body) = call(app, Some("Bearer not.a.token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_middleware_fails_open_on_panics() {
        let (status, body) = call(
            app(interceptor(PanickingVerifier, echo_lookup())),
            Some("Bearer abc"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");

        let bearer = format!("Bearer {}", token_for("alice"));
        let (status, body) = call(app(interceptor(tokens(), PanickingLookup)), Some(&bearer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_middleware_replaces_existing_context() {
        let stale = SecurityContext::authenticated(principal("mallory"));
        let app = app(interceptor(tokens(), echo_lookup())).layer(Extension(stale));

        let (_, body) = call(app.clone(), None).await;
        assert_eq!(body, "anonymous");

        let bearer = format!("Bearer {}", token_for("alice"));
        let (_, body) = call(app, Some(&bearer)).await;
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn test_middleware_isolates_concurrent_requests() {
        let app = app(interceptor(tokens(), echo_lookup()));

        let subjects: Vec<Option<String>> = (0..24)
            .map(|i| match i % 3 {
                0 => None,
                1 => Some(format!("user{}", i)),
                _ => Some(format!("member{}", i)),
            })
            .collect();

        let requests = subjects.iter().map(|subject| {
            let app = app.clone();
            let bearer = subject
                .as_ref()
                .map(|name| format!("Bearer {}", token_for(name)));
            async move { call(app, bearer.as_deref()).await }
        });
        let responses = futures::future::join_all(requests).await;

        for (subject, (status, body)) in subjects.iter().zip(responses) {
            assert_eq!(status, StatusCode::OK);
            let expected = subject.as_deref().unwrap_or("anonymous");
            assert_eq!(body, expected);
        }
    }
}
