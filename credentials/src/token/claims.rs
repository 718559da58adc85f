use std::collections::HashMap;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claim key under which role labels are carried.
pub const ROLES_CLAIM: &str = "roles";

/// Registered claims the token service owns or validates. Callers may not
/// supply them as extras.
pub const RESERVED_CLAIMS: &[&str] = &["sub", "iat", "exp", "iss", "aud", "nbf"];

/// Session token claims.
///
/// Subject, issued-at and expiry are always present. Anything else a caller
/// attaches at issuance lands in `extra` and is flattened into the token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (principal identifier)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Additional custom fields (flattened into token)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Create claims for a subject issued at `issued_at` and valid for `validity`.
    pub fn for_subject(
        subject: impl ToString,
        issued_at: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        let expiration = issued_at + validity;

        Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
            iss: None,
            extra: HashMap::new(),
        }
    }

    /// Set issuer.
    pub fn with_issuer(mut self, iss: impl ToString) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// Attach role labels.
    pub fn with_roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let roles: Vec<String> = roles.into_iter().map(|r| r.to_string()).collect();
        self.with_extra(ROLES_CLAIM, roles)
    }

    /// Add a custom field.
    pub fn with_extra(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.extra.insert(key.to_string(), json_value);
        }
        self
    }

    /// Merge a map of custom fields, later keys overwriting earlier ones.
    pub fn with_extras(mut self, extra: HashMap<String, serde_json::Value>) -> Self {
        self.extra.extend(extra);
        self
    }

    /// Role labels carried by the token (empty when none were issued).
    pub fn roles(&self) -> Vec<String> {
        self.extra
            .get(ROLES_CLAIM)
            .and_then(|v| v.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn issued_at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_for_subject() {
        let claims = Claims::for_subject("alice", issued_at(), Duration::hours(24));

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
        assert!(claims.iss.is_none());
        assert!(claims.extra.is_empty());
    }

    #[test]
    fn test_builder_pattern() {
        let claims = Claims::for_subject("alice", issued_at(), Duration::hours(1))
            .with_issuer("accounts")
            .with_roles(["USER", "ADMIN"])
            .with_extra("tenant", "acme");

        assert_eq!(claims.iss, Some("accounts".to_string()));
        assert_eq!(claims.roles(), vec!["USER".to_string(), "ADMIN".to_string()]);
        assert_eq!(claims.extra.get("tenant").unwrap().as_str(), Some("acme"));
    }

    #[test]
    fn test_roles_absent() {
        let claims = Claims::for_subject("alice", issued_at(), Duration::hours(1));
        assert!(claims.roles().is_empty());
    }

    #[test]
    fn test_extra_fields_are_flattened() {
        let claims = Claims::for_subject("alice", issued_at(), Duration::hours(1))
            .with_roles(["USER"]);

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "alice");
        assert_eq!(json["roles"][0], "USER");
        assert!(json.get("iss").is_none());

        let back: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn test_is_expired() {
        let claims = Claims::for_subject("alice", issued_at(), Duration::seconds(1000));
        let exp = claims.exp;

        assert!(!claims.is_expired(exp - 1));
        assert!(!claims.is_expired(exp)); // Exactly at expiration
        assert!(claims.is_expired(exp + 1));
    }
}
