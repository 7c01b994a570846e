//! User pool configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable holding the user pool id.
pub const ENV_USER_POOL_ID: &str = "USER_POOL_ID";
/// Environment variable holding the app client id.
pub const ENV_USER_POOL_CLIENT_ID: &str = "USER_POOL_CLIENT_ID";
/// Environment variable holding the region (set by the function runtime).
pub const ENV_AWS_REGION: &str = "AWS_REGION";

const JWKS_SUFFIX: &str = "/.well-known/jwks.json";

/// Identifies the user pool whose tokens are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Pool id, e.g. `eu-west-1_AbCdEf123`.
    pub user_pool_id: String,
    /// App client id; the expected `aud` of access tokens.
    pub user_pool_client_id: String,
    /// Region hosting the pool.
    pub aws_region: String,
}

impl AuthConfig {
    pub fn new(
        user_pool_id: impl Into<String>,
        user_pool_client_id: impl Into<String>,
        aws_region: impl Into<String>,
    ) -> Self {
        Self {
            user_pool_id: user_pool_id.into(),
            user_pool_client_id: user_pool_client_id.into(),
            aws_region: aws_region.into(),
        }
    }

    /// The canonical issuer URL, compared verbatim against the `iss` claim.
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.aws_region, self.user_pool_id
        )
    }

    /// The key set URL: always the issuer plus `/.well-known/jwks.json`.
    pub fn jwks_url(&self) -> String {
        format!("{}{JWKS_SUFFIX}", self.issuer())
    }

    /// Load from `USER_POOL_ID`, `USER_POOL_CLIENT_ID` and `AWS_REGION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup (the environment, a map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("missing environment variable {name}")))
        };

        Ok(Self {
            user_pool_id: get(ENV_USER_POOL_ID)?,
            user_pool_client_id: get(ENV_USER_POOL_CLIENT_ID)?,
            aws_region: get(ENV_AWS_REGION)?,
        })
    }

    /// Load from a TOML file with `user_pool_id`, `user_pool_client_id` and `aws_region`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid TOML in {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject empty fields; an empty region or pool id yields a bogus issuer.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("user_pool_id", &self.user_pool_id),
            ("user_pool_client_id", &self.user_pool_client_id),
            ("aws_region", &self.aws_region),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// When the `aud` claim is checked against the app client id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudienceCheck {
    /// Check only when the raw token text contains `access_token`.
    ///
    /// Compatible with existing deployments, but a compact JWT almost never
    /// contains that literal text, so in practice this rarely checks anything.
    #[default]
    AccessTokenHeuristic,
    /// Always require `aud` to equal the client id.
    Always,
    /// Never check `aud`.
    Never,
}

impl AudienceCheck {
    /// The audience to enforce for `token`, if any.
    pub fn expected<'a>(self, token: &str, client_id: &'a str) -> Option<&'a str> {
        match self {
            AudienceCheck::AccessTokenHeuristic if token.contains("access_token") => {
                Some(client_id)
            }
            AudienceCheck::AccessTokenHeuristic | AudienceCheck::Never => None,
            AudienceCheck::Always => Some(client_id),
        }
    }
}

/// Options for token verification beyond the pool identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Audience policy.
    pub audience: AudienceCheck,
}
