//! Identity record derived from verified claims.

use serde::{Deserialize, Serialize};

use crate::verify::VerifiedToken;
use crate::{Error, Result};

/// Who the caller is, as far as the user pool says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The pool's unique user id (`sub`).
    pub user_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    /// `cognito:groups`, empty when the claim is absent.
    pub groups: Vec<String>,
}

#[derive(Deserialize)]
struct IdentityClaims {
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    groups: Option<Vec<String>>,
}

impl Identity {
    /// Map `sub`, `email`, `username` and `cognito:groups`.
    pub fn from_claims(token: &VerifiedToken) -> Result<Self> {
        let claims = IdentityClaims::deserialize(&token.claims)
            .map_err(|e| Error::MalformedClaims(e.to_string()))?;
        let user_id = claims
            .sub
            .ok_or_else(|| Error::MalformedClaims("missing sub".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email,
            username: claims.username,
            groups: claims.groups.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, Header};
    use serde_json::json;

    fn token(claims: serde_json::Value) -> VerifiedToken {
        VerifiedToken {
            header: Header::new(Algorithm::RS256),
            claims,
        }
    }

    #[test]
    fn maps_all_fields() {
        let id = Identity::from_claims(&token(json!({
            "sub": "u-1",
            "email": "a@example.com",
            "username": "alice",
            "cognito:groups": ["admin", "ops"],
        })))
        .unwrap();
        assert_eq!(
            id,
            Identity {
                user_id: "u-1".to_string(),
                email: Some("a@example.com".to_string()),
                username: Some("alice".to_string()),
                groups: vec!["admin".to_string(), "ops".to_string()],
            }
        );
    }

    #[test]
    fn optional_fields_default() {
        let id = Identity::from_claims(&token(json!({"sub": "u-1"}))).unwrap();
        assert_eq!(id.email, None);
        assert_eq!(id.username, None);
        assert!(id.groups.is_empty());
    }

    #[test]
    fn null_groups_default_to_empty() {
        let id = Identity::from_claims(&token(json!({"sub": "u-1", "cognito:groups": null}))).unwrap();
        assert!(id.groups.is_empty());
    }

    #[test]
    fn missing_sub_is_malformed() {
        let err = Identity::from_claims(&token(json!({"email": "a@example.com"}))).unwrap_err();
        assert!(matches!(err, Error::MalformedClaims(_)));
    }

    #[test]
    fn ill_typed_groups_is_malformed() {
        let err = Identity::from_claims(&token(json!({"sub": "u", "cognito:groups": "admin"})))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedClaims(_)));
    }

    #[test]
    fn serializes_with_snake_case_keys() {
        let id = Identity::from_claims(&token(json!({"sub": "u-1"}))).unwrap();
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            json!({"user_id": "u-1", "email": null, "username": null, "groups": []})
        );
    }
}
