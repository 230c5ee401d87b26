//! Configuration types

use crate::{ConfigError, VitrineError, VitrineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any configured TTL.
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// TTLs and thresholds for the storefront cache.
///
/// A TTL of zero means "never expires", matching the cache's own convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL for keys outside the well-known namespaces.
    pub default_ttl: Duration,
    /// TTL for product listings and single products.
    pub product_ttl: Duration,
    /// TTL for per-customer order summaries.
    pub order_ttl: Duration,
    /// TTL for theme lookups.
    pub theme_ttl: Duration,
    /// Upstream calls slower than this are logged at warn level.
    pub slow_call_threshold: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            product_ttl: Duration::from_secs(60),
            order_ttl: Duration::from_secs(30),
            theme_ttl: Duration::from_secs(600),
            slow_call_threshold: Duration::from_millis(250),
        }
    }
}

impl CacheSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the product TTL.
    pub fn with_product_ttl(mut self, ttl: Duration) -> Self {
        self.product_ttl = ttl;
        self
    }

    /// Set the order summary TTL.
    pub fn with_order_ttl(mut self, ttl: Duration) -> Self {
        self.order_ttl = ttl;
        self
    }

    /// Set the theme TTL.
    pub fn with_theme_ttl(mut self, ttl: Duration) -> Self {
        self.theme_ttl = ttl;
        self
    }

    /// Set the slow-call logging threshold.
    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables (all in milliseconds):
    /// - `VITRINE_CACHE_DEFAULT_TTL_MS` (default: 60000)
    /// - `VITRINE_CACHE_PRODUCT_TTL_MS` (default: 60000)
    /// - `VITRINE_CACHE_ORDER_TTL_MS` (default: 30000)
    /// - `VITRINE_CACHE_THEME_TTL_MS` (default: 600000)
    /// - `VITRINE_SLOW_CALL_MS` (default: 250)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CacheSettings::from_env`], reading values through `lookup`.
    ///
    /// Unparseable values fall back to the default for that field.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            default_ttl: millis("VITRINE_CACHE_DEFAULT_TTL_MS", defaults.default_ttl),
            product_ttl: millis("VITRINE_CACHE_PRODUCT_TTL_MS", defaults.product_ttl),
            order_ttl: millis("VITRINE_CACHE_ORDER_TTL_MS", defaults.order_ttl),
            theme_ttl: millis("VITRINE_CACHE_THEME_TTL_MS", defaults.theme_ttl),
            slow_call_threshold: millis("VITRINE_SLOW_CALL_MS", defaults.slow_call_threshold),
        }
    }

    /// Validate the settings.
    ///
    /// Validates:
    /// - every TTL is at most [`MAX_TTL`]
    /// - slow_call_threshold is positive
    pub fn validate(&self) -> VitrineResult<()> {
        for (field, ttl) in [
            ("default_ttl", self.default_ttl),
            ("product_ttl", self.product_ttl),
            ("order_ttl", self.order_ttl),
            ("theme_ttl", self.theme_ttl),
        ] {
            if ttl > MAX_TTL {
                return Err(VitrineError::Config(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{}ms", ttl.as_millis()),
                    reason: "TTL must not exceed one day".to_string(),
                }));
            }
        }

        if self.slow_call_threshold.is_zero() {
            return Err(VitrineError::Config(ConfigError::InvalidValue {
                field: "slow_call_threshold".to_string(),
                value: format!("{:?}", self.slow_call_threshold),
                reason: "slow_call_threshold must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

/// Output format and filter for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive string, e.g. `"vitrine_storage=debug,info"`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LogSettings {
    /// Create from environment variables with fallback to defaults.
    ///
    /// - `VITRINE_LOG`: filter directives (default: `info`)
    /// - `VITRINE_LOG_JSON`: `true`/`1` for JSON output (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LogSettings::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            filter: lookup("VITRINE_LOG")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.filter),
            json: lookup("VITRINE_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_cache_settings_builder() {
        let settings = CacheSettings::new()
            .with_default_ttl(Duration::from_secs(5))
            .with_product_ttl(Duration::from_secs(120))
            .with_order_ttl(Duration::ZERO)
            .with_theme_ttl(Duration::from_secs(3600))
            .with_slow_call_threshold(Duration::from_millis(50));

        assert_eq!(settings.default_ttl, Duration::from_secs(5));
        assert_eq!(settings.product_ttl, Duration::from_secs(120));
        assert_eq!(settings.order_ttl, Duration::ZERO);
        assert_eq!(settings.theme_ttl, Duration::from_secs(3600));
        assert_eq!(settings.slow_call_threshold, Duration::from_millis(50));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_cache_settings_from_lookup_overrides_and_falls_back() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("VITRINE_CACHE_PRODUCT_TTL_MS", "1500"),
            ("VITRINE_CACHE_ORDER_TTL_MS", "not-a-number"),
        ]));
        let defaults = CacheSettings::default();

        assert_eq!(settings.product_ttl, Duration::from_millis(1500));
        assert_eq!(settings.order_ttl, defaults.order_ttl);
        assert_eq!(settings.theme_ttl, defaults.theme_ttl);
    }

    #[test]
    fn test_cache_settings_rejects_ttl_above_one_day() {
        let settings = CacheSettings::new().with_theme_ttl(MAX_TTL + Duration::from_secs(1));
        match settings.validate() {
            Err(VitrineError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "theme_ttl");
            }
            other => panic!("expected invalid theme_ttl, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_settings_rejects_zero_slow_threshold() {
        let settings = CacheSettings::new().with_slow_call_threshold(Duration::ZERO);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_log_settings_from_lookup() {
        let settings = LogSettings::from_lookup(lookup_from(&[
            ("VITRINE_LOG", "vitrine_storage=debug"),
            ("VITRINE_LOG_JSON", "1"),
        ]));
        assert_eq!(settings.filter, "vitrine_storage=debug");
        assert!(settings.json);

        let defaults = LogSettings::from_lookup(lookup_from(&[("VITRINE_LOG", "  ")]));
        assert_eq!(defaults, LogSettings::default());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
