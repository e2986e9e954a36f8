//! Process configuration.
//!
//! Command-line flags supply the defaults; environment variables with fixed
//! names override them. Empty environment values count as unset. Malformed
//! values and missing required settings are fatal at startup.

use crate::refresh::MAX_PERIOD;
use crate::utils::minutes;
use clap::ValueEnum;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Environment variables that may override a flag.
const ENV_KEYS: &[&str] = &[
    "API_ADDRESS",
    "CF_CLIENT_ID",
    "CF_CLIENT_SECRET",
    "SKIP_SSL",
    "FREQUENCY",
    "PORT",
    "CACHE_MODE",
    "APP_INFO_API_URL",
    "LOG_LEVEL",
    "SHUTDOWN_TIMEOUT",
];

/// Which cache strategy serves `/rest/apps/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Single owner task rebuilt from the Cloud Foundry API; fetch errors degrade.
    #[default]
    Owner,
    /// Lock-guarded map refreshed from an app info feed; fetch errors are fatal.
    Shared,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheMode::Owner => "owner",
            CacheMode::Shared => "shared",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    Invalid(#[from] Box<figment::Error>),
    #[error("{field} must be set in {mode} cache mode")]
    Missing {
        field: &'static str,
        mode: CacheMode,
    },
    #[error("FREQUENCY must be at least one minute")]
    ZeroFrequency,
    #[error("FREQUENCY must be at most {max} minutes")]
    FrequencyTooLarge { max: u64 },
    #[error("{field} is not a valid URL: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Fully resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub api_address: String,
    pub cf_client_id: String,
    pub cf_client_secret: String,
    #[serde(deserialize_with = "parse_bool")]
    pub skip_ssl: bool,
    /// Refresh interval in minutes.
    pub frequency: u64,
    pub port: u16,
    pub cache_mode: CacheMode,
    pub app_info_api_url: Option<String>,
    pub log_level: String,
    /// Seconds allowed for services to stop.
    pub shutdown_timeout: u64,
}

impl Config {
    /// Layer the environment over `defaults` and validate the result.
    pub fn load(defaults: Config) -> Result<Self, ConfigError> {
        let config: Config = Figment::from(Serialized::defaults(defaults))
            .merge(env_provider())
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings the selected cache mode depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        let max = MAX_PERIOD.as_secs() / 60;
        if self.frequency > max {
            return Err(ConfigError::FrequencyTooLarge { max });
        }

        match self.cache_mode {
            CacheMode::Owner => {
                let required = [
                    ("API_ADDRESS", &self.api_address),
                    ("CF_CLIENT_ID", &self.cf_client_id),
                    ("CF_CLIENT_SECRET", &self.cf_client_secret),
                ];
                for (field, value) in required {
                    if value.trim().is_empty() {
                        return Err(ConfigError::Missing {
                            field,
                            mode: self.cache_mode,
                        });
                    }
                }
                Url::parse(&self.api_address).map_err(|source| ConfigError::InvalidUrl {
                    field: "API_ADDRESS",
                    source,
                })?;
            }
            CacheMode::Shared => {
                let url = self
                    .app_info_api_url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(ConfigError::Missing {
                        field: "APP_INFO_API_URL",
                        mode: self.cache_mode,
                    })?;
                Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
                    field: "APP_INFO_API_URL",
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        minutes(self.frequency)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// The feed URL, once validated for shared mode.
    pub fn app_info_url(&self) -> Option<Url> {
        self.app_info_api_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
    }
}

/// Accepts the boolean spellings `1 t T TRUE true True` and
/// `0 f F FALSE false False`, as well as native booleans.
fn parse_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct LenientBool;

    impl Visitor<'_> for LenientBool {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean (1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False)")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match v {
                "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
                "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
                _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
            }
        }
    }

    deserializer.deserialize_any(LenientBool)
}

/// Known keys only, skipping variables that are set but empty.
fn env_provider() -> Env {
    Env::raw()
        .only(ENV_KEYS)
        .filter(|key| std::env::var(key.as_str()).is_ok_and(|value| !value.is_empty()))
}
