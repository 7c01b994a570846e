//! cherimoya-auth
//!
//! Bearer token helpers for serverless handlers behind a user pool.
//! It covers two questions asked once per invocation:
//!
//! - **Who is calling?** ([`Authorizer::get_identity`]) verifies the bearer token and maps
//!   its claims to an [`Identity`], or yields `None`.
//! - **Should this call go through?** ([`Authorizer::authorize`]) verifies the bearer token
//!   and returns the gateway's allow/deny document. It never fails: any error is a denial.
//!
//! Tokens must be RS256-signed by a key published in the pool's JWKS, carry the pool's
//! issuer, and be within `exp`/`nbf`. Keys are fetched on every call unless the `cache`
//! feature's `CachingKeyResolver` is put in front of the fetcher.
//!
//! ## Quick start
//! ```no_run
//! use cherimoya_auth::{AuthConfig, AuthEvent, TracingLogger, authorize};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_env()?;
//! let event: AuthEvent = serde_json::from_str(r#"{
//!     "authorizationToken": "Bearer eyJ...",
//!     "methodArn": "arn:aws:execute-api:eu-west-1:123456789012:abc/prod/GET/items"
//! }"#)?;
//!
//! let response = authorize(&event, &config, &TracingLogger);
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod config;
mod error;
mod event;
mod identity;
mod jwks;
mod logger;
mod policy;
mod verify;

pub use config::{
    AudienceCheck, AuthConfig, ENV_AWS_REGION, ENV_USER_POOL_CLIENT_ID, ENV_USER_POOL_ID,
    VerifyOptions,
};
pub use error::{Error, Result};
#[cfg(feature = "fetch-reqwest")]
pub use event::{authorize, get_identity};
pub use event::{AuthEvent, Authorizer, extract_bearer_token};
pub use identity::Identity;
#[cfg(feature = "cache")]
pub use jwks::CachingKeyResolver;
#[cfg(feature = "fetch-reqwest")]
pub use jwks::HttpKeyResolver;
pub use jwks::{FetchedJwks, Jwk, JwkSet, JwksFetcher, KeyResolver, StaticKeyResolver, select_key};
pub use logger::{AuthLogger, LOG_TARGET, NoopLogger, TracingLogger};
pub use policy::{
    AuthorizerResponse, Effect, INVOKE_ACTION, POLICY_VERSION, PolicyDocument, Statement,
    UNAUTHORIZED_PRINCIPAL, build_policy,
};
pub use verify::{VerifiedToken, verify_token, verify_token_with};
