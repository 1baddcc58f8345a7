use silent_guard_domain::{RetryPolicy, MILLIS_PER_HOUR, MILLIS_PER_MINUTE};
use silent_guard_utils::create_random_secret;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const DEFAULT_CHECK_IN_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_CHECK_IN_WINDOW: i64 = 24 * MILLIS_PER_HOUR;

/// How bearer tokens issued by the identity provider are verified
#[derive(Debug, Clone)]
pub enum IdentityProviderKey {
    /// Shared HS256 secret
    Secret(String),
    /// RS256 public key in PEM format
    RsaPem(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    pub idp_key: IdentityProviderKey,
    /// Expected `iss` claim of bearer tokens, if any
    pub idp_issuer: Option<String>,
    /// Base url of the client application that handles the `?confirmation=<token>` link
    pub check_in_base_url: Url,
    /// How long before a deadline the owner is asked to check in. Also the
    /// lifetime of the issued confirmation token.
    pub check_in_window: i64,
    /// How often the trigger evaluator and check in requests jobs run
    pub evaluation_interval: Duration,
    /// Every call to the delivery collaborator is aborted after this duration
    pub delivery_timeout: Duration,
    pub retry_policy: RetryPolicy,
    /// Claims older than this are considered abandoned by a crashed evaluator.
    /// Never shorter than `delivery_timeout`.
    pub claim_timeout: i64,
}

fn env_or_default<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Parses durations on the form `<n>h` or `<n>m` into millis
pub fn parse_window(value: &str) -> Option<i64> {
    let value = value.trim();
    let (number, unit) = if let Some(number) = value.strip_suffix('h') {
        (number, MILLIS_PER_HOUR)
    } else if let Some(number) = value.strip_suffix('m') {
        (number, MILLIS_PER_MINUTE)
    } else {
        return None;
    };
    match number.trim().parse::<i64>() {
        Ok(number) if number > 0 => number.checked_mul(unit),
        _ => None,
    }
}

/// Reads a number of seconds from the environment and converts it to millis
fn millis_from_env(name: &str, default_secs: i64) -> i64 {
    let secs = env_or_default(name, default_secs);
    match secs.checked_mul(1000) {
        Some(millis) => millis,
        None => {
            warn!(
                "The given {}: {} is too large, falling back to the default: {}.",
                name, secs, default_secs
            );
            default_secs * 1000
        }
    }
}

/// A claim must outlive the delivery attempt it guards, otherwise a slow
/// attempt could be taken over by another evaluator and delivered twice.
fn clamp_claim_timeout(claim_timeout: i64, delivery_timeout: Duration) -> i64 {
    let delivery_timeout = i64::try_from(delivery_timeout.as_millis()).unwrap_or(i64::MAX);
    if claim_timeout < delivery_timeout {
        warn!(
            "CLAIM_TIMEOUT_SECS must not be shorter than DELIVERY_TIMEOUT_SECS. Using {} millis.",
            delivery_timeout
        );
        delivery_timeout
    } else {
        claim_timeout
    }
}

fn idp_key_from_env() -> IdentityProviderKey {
    if let Ok(path) = std::env::var("IDP_PUBLIC_KEY_PATH") {
        match std::fs::read(&path) {
            Ok(pem) => {
                info!("Verifying bearer tokens with the RSA public key at {}", path);
                return IdentityProviderKey::RsaPem(pem);
            }
            Err(e) => warn!(
                "Unable to read IDP_PUBLIC_KEY_PATH: {}, error: {:?}. Falling back to a shared secret.",
                path, e
            ),
        }
    }

    match std::env::var("IDP_JWT_SECRET") {
        Ok(secret) => IdentityProviderKey::Secret(secret),
        Err(_) => {
            info!("Did not find IDP_JWT_SECRET environment variable. Going to create one.");
            IdentityProviderKey::Secret(create_random_secret(32))
        }
    }
}

impl Config {
    pub fn new() -> Self {
        let port = env_or_default("PORT", 5000_usize);

        let check_in_base_url = std::env::var("CHECK_IN_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_CHECK_IN_BASE_URL.into());
        let check_in_base_url = match Url::parse(&check_in_base_url) {
            Ok(url) => url,
            Err(_) => {
                warn!(
                    "The given CHECK_IN_BASE_URL: {} is not valid, falling back to the default: {}.",
                    check_in_base_url, DEFAULT_CHECK_IN_BASE_URL
                );
                Url::parse(DEFAULT_CHECK_IN_BASE_URL).expect("Default check in base url to be valid")
            }
        };

        let check_in_window = match std::env::var("CHECK_IN_WINDOW") {
            Ok(window) => parse_window(&window).unwrap_or_else(|| {
                warn!(
                    "Invalid CHECK_IN_WINDOW format: {}. Expected a number followed by 'h' or 'm'.",
                    window
                );
                DEFAULT_CHECK_IN_WINDOW
            }),
            Err(_) => DEFAULT_CHECK_IN_WINDOW,
        };

        let delivery_timeout = Duration::from_secs(env_or_default("DELIVERY_TIMEOUT_SECS", 10));
        let claim_timeout =
            clamp_claim_timeout(millis_from_env("CLAIM_TIMEOUT_SECS", 600), delivery_timeout);

        Self {
            port,
            idp_key: idp_key_from_env(),
            idp_issuer: std::env::var("IDP_ISSUER").ok(),
            check_in_base_url,
            check_in_window,
            evaluation_interval: Duration::from_secs(env_or_default("EVALUATION_INTERVAL_SECS", 60)),
            delivery_timeout,
            retry_policy: RetryPolicy {
                max_attempts: env_or_default("DELIVERY_MAX_ATTEMPTS", 5),
                backoff_millis: millis_from_env("DELIVERY_BACKOFF_SECS", 60),
            },
            claim_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
