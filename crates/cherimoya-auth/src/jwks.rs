//! Signing key resolution from a published JWKS.

use crate::{Error, Result};

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
#[cfg(any(feature = "fetch-reqwest", feature = "cache"))]
use std::time::Duration;

#[cfg(feature = "cache")]
use dashmap::DashMap;
#[cfg(feature = "cache")]
use std::time::Instant;

/// A JWKS (JSON Web Key Set).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JwkSet {
    /// Keys.
    pub keys: Vec<Jwk>,
}

/// Minimal JWK structure; only RSA keys are usable for RS256.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC", ...).
    pub kty: String,

    /// Key id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Public key use.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    /// Algorithm (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    fn is_signing_key(&self) -> bool {
        self.use_.as_deref().is_none_or(|u| u == "sig")
    }

    /// Build an RSA decoding key from the modulus and exponent.
    pub fn decoding_key(&self) -> Result<DecodingKey> {
        if self.kty != "RSA" {
            return Err(Error::KeyResolution(format!(
                "unsupported kty for RS256: {}",
                self.kty
            )));
        }
        let n = self
            .n
            .as_deref()
            .ok_or_else(|| Error::KeyResolution("RSA JWK missing n".to_string()))?;
        let e = self
            .e
            .as_deref()
            .ok_or_else(|| Error::KeyResolution("RSA JWK missing e".to_string()))?;
        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| Error::KeyResolution(format!("invalid RSA components: {err}")))
    }
}

/// Pick the signing key whose `kid` matches.
pub fn select_key(set: &JwkSet, kid: &str) -> Result<Jwk> {
    set.keys
        .iter()
        .find(|k| k.kid.as_deref() == Some(kid) && k.is_signing_key())
        .cloned()
        .ok_or_else(|| Error::KeyResolution(format!("no signing key matches kid {kid}")))
}

/// A key set as fetched, with the freshness hint from the response.
#[derive(Debug, Clone)]
pub struct FetchedJwks {
    /// The parsed key set.
    pub set: JwkSet,
    /// `Cache-Control: max-age`, if the source sent one.
    pub max_age_seconds: Option<u64>,
}

/// Produces the current key set published at a URL.
pub trait JwksFetcher {
    fn fetch(&self, jwks_url: &str) -> Result<FetchedJwks>;
}

/// Resolves the signing key for a token's `kid`.
///
/// Implementations must return the key currently published for `kid`; a
/// cache may only answer from memory while it still holds that key.
pub trait KeyResolver {
    fn resolve(&self, jwks_url: &str, kid: &str) -> Result<Jwk>;
}

impl<R: KeyResolver + ?Sized> KeyResolver for &R {
    fn resolve(&self, jwks_url: &str, kid: &str) -> Result<Jwk> {
        (**self).resolve(jwks_url, kid)
    }
}

/// Resolves against a key set held in memory; the URL is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    set: JwkSet,
}

impl StaticKeyResolver {
    pub fn new(set: JwkSet) -> Self {
        Self { set }
    }

    /// Parse a JWKS document.
    pub fn from_json(json: &str) -> Result<Self> {
        let set = serde_json::from_str(json)
            .map_err(|e| Error::KeyResolution(format!("invalid JWKS JSON: {e}")))?;
        Ok(Self { set })
    }
}

impl JwksFetcher for StaticKeyResolver {
    fn fetch(&self, _jwks_url: &str) -> Result<FetchedJwks> {
        Ok(FetchedJwks {
            set: self.set.clone(),
            max_age_seconds: None,
        })
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(&self, _jwks_url: &str, kid: &str) -> Result<Jwk> {
        select_key(&self.set, kid)
    }
}

/// Fetches the key set over HTTP on every call.
///
/// Uses a blocking client; inside an async runtime call it from a blocking task.
#[cfg(feature = "fetch-reqwest")]
#[derive(Debug, Clone, Default)]
pub struct HttpKeyResolver {
    timeout: Option<Duration>,
}

#[cfg(feature = "fetch-reqwest")]
impl HttpKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each fetch. Without this the invocation timeout is the only limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(feature = "fetch-reqwest")]
impl JwksFetcher for HttpKeyResolver {
    fn fetch(&self, jwks_url: &str) -> Result<FetchedJwks> {
        use reqwest::header;

        let fail = |e: reqwest::Error| Error::KeyResolution(format!("fetch {jwks_url}: {e}"));

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(fail)?;

        let resp = client.get(jwks_url).send().map_err(fail)?;
        if !resp.status().is_success() {
            return Err(Error::KeyResolution(format!(
                "fetch {jwks_url}: status {}",
                resp.status()
            )));
        }

        let max_age_seconds = resp
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_cache_control_max_age);

        let set: JwkSet = resp.json().map_err(fail)?;
        Ok(FetchedJwks {
            set,
            max_age_seconds,
        })
    }
}

#[cfg(feature = "fetch-reqwest")]
impl KeyResolver for HttpKeyResolver {
    fn resolve(&self, jwks_url: &str, kid: &str) -> Result<Jwk> {
        select_key(&self.fetch(jwks_url)?.set, kid)
    }
}

#[cfg(feature = "cache")]
#[derive(Debug, Clone)]
struct CachedJwks {
    expires_at: Instant,
    set: JwkSet,
}

/// Time-bounded key set cache in front of a [`JwksFetcher`].
///
/// The cache belongs to the instance, not the process. A `kid` that is not in
/// the cached set triggers a refetch, so rotated keys are picked up at once.
#[cfg(feature = "cache")]
#[derive(Debug)]
pub struct CachingKeyResolver<F> {
    fetcher: F,
    max_age: Duration,
    entries: DashMap<String, CachedJwks>,
}

#[cfg(feature = "cache")]
impl<F: JwksFetcher> CachingKeyResolver<F> {
    /// Cache for at most `max_age`, less if the source says so.
    pub fn new(fetcher: F, max_age: Duration) -> Self {
        Self {
            fetcher,
            max_age,
            entries: DashMap::new(),
        }
    }

    fn refresh(&self, jwks_url: &str) -> Result<JwkSet> {
        let fetched = self.fetcher.fetch(jwks_url)?;
        let ttl = fetched
            .max_age_seconds
            .map_or(self.max_age, |s| self.max_age.min(Duration::from_secs(s)));
        self.entries.insert(
            jwks_url.to_string(),
            CachedJwks {
                expires_at: Instant::now() + ttl,
                set: fetched.set.clone(),
            },
        );
        Ok(fetched.set)
    }
}

#[cfg(feature = "cache")]
impl<F: JwksFetcher> KeyResolver for CachingKeyResolver<F> {
    fn resolve(&self, jwks_url: &str, kid: &str) -> Result<Jwk> {
        let hit = self
            .entries
            .get(jwks_url)
            .filter(|cached| cached.expires_at > Instant::now())
            .and_then(|cached| select_key(&cached.set, kid).ok());
        if let Some(key) = hit {
            return Ok(key);
        }

        let set = self.refresh(jwks_url)?;
        select_key(&set, kid)
    }
}

#[cfg(any(feature = "fetch-reqwest", test))]
fn parse_cache_control_max_age(cc: &str) -> Option<u64> {
    cc.split(',')
        .filter_map(|part| part.trim().strip_prefix("max-age="))
        .find_map(|rest| rest.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa(kid: &str, use_: Option<&str>) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: Some(kid.to_string()),
            use_: use_.map(str::to_string),
            alg: Some("RS256".to_string()),
            n: Some("0-nBtpeEPeLncUS9dZhFLmJkoNLRQoupCHgxMvo4Ms9Szulzsis3uLdJjqp2-JKoVp9LagjeJOeJWvQf-ItRaYiXFePKO5Ogb5QxhjntAytFAPpqpJvR2fJ9Zhb2wpaKY9gyW6plUUIS7v8ZtYU1KfVa-fgYrlxcra-NNUCaCULi3p7b5XE-VSgLpGCWbGZCg1wFqOZJRdGHrBfrPrARcC8bjE2F8cI9mejHs1eE65p46Wo3h03mAu6BsX92tTuX-fNqtc2zVJKhX4LNoDQMWQjFPvNG_rIGPgIoRftKbE4Juj2BZVKB7X1cD5zE8kLaKm5Qpn5AuiykFC55m_f62Q".to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    #[test]
    fn cache_control_parser() {
        assert_eq!(parse_cache_control_max_age("public, max-age=60"), Some(60));
        assert_eq!(parse_cache_control_max_age("max-age=0"), Some(0));
        assert_eq!(parse_cache_control_max_age("no-store"), None);
    }

    #[test]
    fn selects_by_kid() {
        let set = JwkSet {
            keys: vec![rsa("a", Some("sig")), rsa("b", None)],
        };
        assert_eq!(select_key(&set, "b").unwrap().kid.as_deref(), Some("b"));
        assert!(matches!(select_key(&set, "c"), Err(Error::KeyResolution(_))));
    }

    #[test]
    fn skips_encryption_keys() {
        let set = JwkSet {
            keys: vec![rsa("a", Some("enc"))],
        };
        assert!(matches!(select_key(&set, "a"), Err(Error::KeyResolution(_))));
    }

    #[test]
    fn decoding_key_requires_rsa() {
        let mut jwk = rsa("a", None);
        assert!(jwk.decoding_key().is_ok());
        jwk.kty = "EC".to_string();
        assert!(matches!(jwk.decoding_key(), Err(Error::KeyResolution(_))));
        let mut jwk = rsa("a", None);
        jwk.e = None;
        assert!(matches!(jwk.decoding_key(), Err(Error::KeyResolution(_))));
    }

    #[test]
    fn static_resolver_parses_json() {
        let json = r#"{"keys":[{"kty":"RSA","kid":"k1","use":"sig","alg":"RS256","n":"AQAB","e":"AQAB"}]}"#;
        let resolver = StaticKeyResolver::from_json(json).unwrap();
        assert!(resolver.resolve("ignored", "k1").is_ok());
        assert!(StaticKeyResolver::from_json("not json").is_err());
    }

    #[cfg(feature = "cache")]
    mod cache {
        use super::*;
        use std::cell::{Cell, RefCell};

        struct Counting {
            calls: Cell<usize>,
            set: RefCell<JwkSet>,
        }

        impl JwksFetcher for Counting {
            fn fetch(&self, _jwks_url: &str) -> Result<FetchedJwks> {
                self.calls.set(self.calls.get() + 1);
                Ok(FetchedJwks {
                    set: self.set.borrow().clone(),
                    max_age_seconds: None,
                })
            }
        }

        #[test]
        fn serves_hits_from_memory_and_refetches_on_unknown_kid() {
            let fetcher = Counting {
                calls: Cell::new(0),
                set: RefCell::new(JwkSet {
                    keys: vec![rsa("a", None)],
                }),
            };
            let resolver = CachingKeyResolver::new(fetcher, Duration::from_secs(300));

            resolver.resolve("u", "a").unwrap();
            resolver.resolve("u", "a").unwrap();
            assert_eq!(resolver.fetcher.calls.get(), 1);

            resolver.fetcher.set.borrow_mut().keys.push(rsa("b", None));
            resolver.resolve("u", "b").unwrap();
            assert_eq!(resolver.fetcher.calls.get(), 2);
        }

        #[test]
        fn zero_max_age_always_refetches() {
            let fetcher = Counting {
                calls: Cell::new(0),
                set: RefCell::new(JwkSet {
                    keys: vec![rsa("a", None)],
                }),
            };
            let resolver = CachingKeyResolver::new(fetcher, Duration::ZERO);
            resolver.resolve("u", "a").unwrap();
            resolver.resolve("u", "a").unwrap();
            assert_eq!(resolver.fetcher.calls.get(), 2);
        }
    }
}
