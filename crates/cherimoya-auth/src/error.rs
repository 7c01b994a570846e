//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// The adapter entry points ([`crate::Authorizer::get_identity`] and
/// [`crate::Authorizer::authorize`]) absorb every variant; the lower-level
/// functions return them so callers can tell failures apart.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound event has no usable bearer token (or no resource to authorize).
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The key set could not be fetched, or it has no key for the token's `kid`.
    #[error("key resolution failed: {0}")]
    KeyResolution(String),

    /// The token's `exp` has passed.
    #[error("token has expired")]
    ExpiredToken,

    /// Signature, issuer, audience, algorithm, or structure check failed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A verified token is missing `sub` or carries ill-typed identity claims.
    #[error("malformed claims: {0}")]
    MalformedClaims(String),

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short, stable label for the error kind, suitable for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedRequest(_) => "malformed_request",
            Error::KeyResolution(_) => "key_resolution",
            Error::ExpiredToken => "expired_token",
            Error::InvalidToken(_) => "invalid_token",
            Error::MalformedClaims(_) => "malformed_claims",
            Error::Config(_) => "config",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Error::ExpiredToken,
            _ => Error::InvalidToken(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    #[test]
    fn expired_signature_maps_to_expired_token() {
        let err: Error = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(err, Error::ExpiredToken));
        assert_eq!(err.kind(), "expired_token");
    }

    #[test]
    fn other_jwt_errors_map_to_invalid_token() {
        for kind in [
            ErrorKind::InvalidSignature,
            ErrorKind::InvalidIssuer,
            ErrorKind::InvalidAudience,
            ErrorKind::ImmatureSignature,
            ErrorKind::InvalidToken,
        ] {
            let err: Error = jsonwebtoken::errors::Error::from(kind).into();
            assert!(matches!(err, Error::InvalidToken(_)), "{err:?}");
        }
    }
}
