//! RS256 token verification against the user pool's key set.

use crate::jwks::KeyResolver;
use crate::logger::AuthLogger;
use crate::{AuthConfig, Error, Result, VerifyOptions};

use jsonwebtoken::{Algorithm, Header, Validation};
use serde_json::Value;

/// A verified JWT (header + claims).
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// The parsed header.
    pub header: Header,
    /// The decoded claims as JSON.
    pub claims: Value,
}

impl VerifiedToken {
    /// Get a claim by key.
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// Convenience accessor for `sub`.
    pub fn sub(&self) -> Option<&str> {
        self.claim("sub").and_then(Value::as_str)
    }

    /// Convenience accessor for `iss`.
    pub fn iss(&self) -> Option<&str> {
        self.claim("iss").and_then(Value::as_str)
    }

    /// Convenience accessor for `aud`.
    pub fn aud(&self) -> Option<&Value> {
        self.claim("aud")
    }

    /// Convenience accessor for `exp`.
    pub fn exp(&self) -> Option<i64> {
        self.claim("exp").and_then(Value::as_i64)
    }
}

/// Verify `token` with the default options.
pub fn verify_token(
    token: &str,
    config: &AuthConfig,
    resolver: &dyn KeyResolver,
    log: &dyn AuthLogger,
) -> Result<VerifiedToken> {
    verify_token_with(token, config, resolver, VerifyOptions::default(), log)
}

/// Verify `token`: RS256 signature by the key published for its `kid`, exact
/// issuer match, `exp`/`nbf` with no leeway, and audience per `opts`.
pub fn verify_token_with(
    token: &str,
    config: &AuthConfig,
    resolver: &dyn KeyResolver,
    opts: VerifyOptions,
    log: &dyn AuthLogger,
) -> Result<VerifiedToken> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| Error::InvalidToken(format!("failed to decode header: {e}")))?;

    if header.alg != Algorithm::RS256 {
        log.debug(&format!("rejecting token signed with {:?}", header.alg));
        return Err(Error::InvalidToken(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }

    let kid = header
        .kid
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::KeyResolution("token header has no kid".to_string()))?;

    let jwks_url = config.jwks_url();
    log.debug(&format!("resolving signing key {kid} from {jwks_url}"));
    let key = resolver.resolve(&jwks_url, kid)?.decoding_key()?;

    let issuer = config.issuer();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    // A token whose exp is this very second is already expired.
    validation.reject_tokens_expiring_in_less_than = 1;
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp", "iss"]);
    validation.set_issuer(&[issuer.as_str()]);
    match opts.audience.expected(token, &config.user_pool_client_id) {
        Some(aud) => {
            log.debug("checking audience against client id");
            validation.required_spec_claims.insert("aud".to_string());
            validation.set_audience(&[aud]);
        }
        None => validation.validate_aud = false,
    }

    let data = jsonwebtoken::decode::<Value>(token, &key, &validation).map_err(|e| {
        let err = Error::from(e);
        log.debug(&format!("token rejected: {err}"));
        err
    })?;

    log.debug("token verified");
    Ok(VerifiedToken {
        header: data.header,
        claims: data.claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::StaticKeyResolver;
    use crate::logger::NoopLogger;

    fn cfg() -> AuthConfig {
        AuthConfig::new("us-east-1_Pool", "client", "us-east-1")
    }

    #[test]
    fn garbage_is_invalid_token() {
        let resolver = StaticKeyResolver::default();
        let err = verify_token("not-a-jwt", &cfg(), &resolver, &NoopLogger).unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)), "{err:?}");
    }

    #[test]
    fn empty_is_invalid_token() {
        let resolver = StaticKeyResolver::default();
        let err = verify_token("", &cfg(), &resolver, &NoopLogger).unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)), "{err:?}");
    }

    #[test]
    fn non_rs256_header_rejected_before_key_lookup() {
        // {"alg":"HS256","typ":"JWT","kid":"k1"} . {"sub":"x"} . sig
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6ImsxIn0.eyJzdWIiOiJ4In0.c2ln";
        let resolver = StaticKeyResolver::default();
        let err = verify_token(token, &cfg(), &resolver, &NoopLogger).unwrap_err();
        assert!(matches!(err, Error::InvalidToken(ref m) if m.contains("HS256")), "{err:?}");
    }

    #[test]
    fn missing_kid_is_key_resolution() {
        // {"alg":"RS256","typ":"JWT"} . {"sub":"x"} . sig
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiJ4In0.c2ln";
        let resolver = StaticKeyResolver::default();
        let err = verify_token(token, &cfg(), &resolver, &NoopLogger).unwrap_err();
        assert!(matches!(err, Error::KeyResolution(_)), "{err:?}");
    }

    #[test]
    fn accessors_read_claims() {
        let token = VerifiedToken {
            header: Header::new(Algorithm::RS256),
            claims: serde_json::json!({"sub":"abc","iss":"i","aud":"a","exp":10}),
        };
        assert_eq!(token.sub(), Some("abc"));
        assert_eq!(token.iss(), Some("i"));
        assert_eq!(token.aud(), Some(&Value::String("a".to_string())));
        assert_eq!(token.exp(), Some(10));
    }
}
