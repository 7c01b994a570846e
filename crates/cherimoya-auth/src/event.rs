//! Request adapter: bearer token extraction and the two entry points.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::Identity;
use crate::jwks::KeyResolver;
use crate::logger::AuthLogger;
use crate::policy::AuthorizerResponse;
use crate::verify::{VerifiedToken, verify_token_with};
use crate::{AuthConfig, Error, Result, VerifyOptions};

const AUTHORIZATION_HEADER: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// The parts of an inbound gateway event this crate reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEvent {
    /// Request headers (proxy integrations). Values stay raw JSON; only
    /// `Authorization` is read, and only as a string.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, Value>>,
    /// Token field of `TOKEN` authorizer events.
    #[serde(default)]
    pub authorization_token: Option<String>,
    /// ARN of the method being invoked.
    #[serde(default)]
    pub method_arn: Option<String>,
}

impl AuthEvent {
    /// Event carrying an `Authorization` header.
    pub fn with_authorization_header(value: impl Into<String>) -> Self {
        Self {
            headers: Some(BTreeMap::from([(
                AUTHORIZATION_HEADER.to_string(),
                Value::String(value.into()),
            )])),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn method_arn(mut self, arn: impl Into<String>) -> Self {
        self.method_arn = Some(arn.into());
        self
    }

    /// The raw `Authorization` value. A present header key wins over
    /// `authorizationToken`, even when its value is null or not a string.
    fn authorization(&self) -> Option<&str> {
        match self
            .headers
            .as_ref()
            .and_then(|h| h.get(AUTHORIZATION_HEADER))
        {
            Some(value) => value.as_str(),
            None => self.authorization_token.as_deref(),
        }
    }
}

/// Extract the bearer token: the text after `Bearer ` up to the next space.
pub fn extract_bearer_token(event: &AuthEvent) -> Result<&str> {
    let value = event
        .authorization()
        .ok_or_else(|| Error::MalformedRequest("missing Authorization header".to_string()))?;
    let rest = value.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        Error::MalformedRequest("Authorization is not a Bearer credential".to_string())
    })?;
    match rest.split(' ').next() {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::MalformedRequest("empty bearer token".to_string())),
    }
}

/// Verifies tokens for one user pool and answers the adapter questions.
#[derive(Debug, Clone)]
pub struct Authorizer<R> {
    config: AuthConfig,
    options: VerifyOptions,
    resolver: R,
}

impl<R: KeyResolver> Authorizer<R> {
    pub fn new(config: AuthConfig, resolver: R) -> Self {
        Self {
            config,
            options: VerifyOptions::default(),
            resolver,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Extract and verify the event's token.
    pub fn verify_event(&self, event: &AuthEvent, log: &dyn AuthLogger) -> Result<VerifiedToken> {
        log.debug("extracting bearer token");
        let token = extract_bearer_token(event)?;
        log.debug("verifying bearer token");
        verify_token_with(token, &self.config, &self.resolver, self.options, log)
    }

    /// Like [`Authorizer::get_identity`], but reports why there is no identity.
    pub fn try_get_identity(&self, event: &AuthEvent, log: &dyn AuthLogger) -> Result<Identity> {
        let verified = self.verify_event(event, log)?;
        Identity::from_claims(&verified)
    }

    /// Who is calling; `None` for any missing, invalid or expired token.
    pub fn get_identity(&self, event: &AuthEvent, log: &dyn AuthLogger) -> Option<Identity> {
        match self.try_get_identity(event, log) {
            Ok(identity) => {
                log.debug(&format!("identified user {}", identity.user_id));
                Some(identity)
            }
            Err(err) => {
                log.debug(&format!("no identity ({}): {err}", err.kind()));
                None
            }
        }
    }

    /// Allow or deny the call. Never fails: every error becomes a denial of
    /// the `Unauthorized` principal on the event's `methodArn`.
    pub fn authorize(&self, event: &AuthEvent, log: &dyn AuthLogger) -> AuthorizerResponse {
        let resource = event.method_arn.as_deref().unwrap_or_default();
        match self.allowed_principal(event, log) {
            Ok(principal) => {
                log.debug(&format!("allowing {principal} on {resource}"));
                AuthorizerResponse::allow(principal, resource)
            }
            Err(err) => {
                log.debug(&format!("denying on {resource} ({}): {err}", err.kind()));
                AuthorizerResponse::deny_unauthorized(resource)
            }
        }
    }

    fn allowed_principal(&self, event: &AuthEvent, log: &dyn AuthLogger) -> Result<String> {
        if event.method_arn.is_none() {
            return Err(Error::MalformedRequest("missing methodArn".to_string()));
        }
        let verified = self.verify_event(event, log)?;
        verified
            .sub()
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedClaims("missing sub".to_string()))
    }
}

/// [`Authorizer::get_identity`] with the key set fetched over HTTP.
#[cfg(feature = "fetch-reqwest")]
pub fn get_identity(
    event: &AuthEvent,
    config: &AuthConfig,
    log: &dyn AuthLogger,
) -> Option<Identity> {
    Authorizer::new(config.clone(), crate::jwks::HttpKeyResolver::new()).get_identity(event, log)
}

/// [`Authorizer::authorize`] with the key set fetched over HTTP.
#[cfg(feature = "fetch-reqwest")]
pub fn authorize(event: &AuthEvent, config: &AuthConfig, log: &dyn AuthLogger) -> AuthorizerResponse {
    Authorizer::new(config.clone(), crate::jwks::HttpKeyResolver::new()).authorize(event, log)
}
