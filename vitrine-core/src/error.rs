//! Error types for Vitrine operations
//!
//! Every error here is `Clone`: a failed upstream load is handed to every
//! caller that was waiting on the same in-flight cache load.

use thiserror::Error;

/// Failures of the upstream catalog (managed database, auth provider,
/// payments provider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("Upstream {service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },
}

impl CatalogError {
    /// Shorthand for a missing resource.
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Shorthand for an unreachable upstream service.
    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Logging/tracing setup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {reason}")]
    SubscriberInit { reason: String },

    #[error("Metrics error for {metric}: {reason}")]
    Metrics { metric: String, reason: String },
}

/// Master error type for all Vitrine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VitrineError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Result type alias for Vitrine operations.
pub type VitrineResult<T> = Result<T, VitrineError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display_not_found() {
        let err = CatalogError::not_found("product", "mug-42");
        let msg = format!("{}", err);
        assert!(msg.contains("product not found"));
        assert!(msg.contains("mug-42"));
    }

    #[test]
    fn test_catalog_error_display_unavailable() {
        let err = CatalogError::unavailable("postgres", "connection reset");
        assert_eq!(err.to_string(), "Upstream postgres unavailable: connection reset");
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "product_ttl".to_string(),
            value: "90000000ms".to_string(),
            reason: "must not exceed one day".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("product_ttl"));
        assert!(msg.contains("90000000ms"));
        assert!(msg.contains("one day"));
    }

    #[test]
    fn test_vitrine_error_from_variants() {
        let catalog = VitrineError::from(CatalogError::not_found("order", "x"));
        assert!(matches!(catalog, VitrineError::Catalog(_)));

        let config = VitrineError::from(ConfigError::InvalidValue {
            field: "order_ttl".to_string(),
            value: "-1".to_string(),
            reason: "not a duration".to_string(),
        });
        assert!(matches!(config, VitrineError::Config(_)));

        let telemetry = VitrineError::from(TelemetryError::Metrics {
            metric: "vitrine_catalog_calls_total".to_string(),
            reason: "duplicate registration".to_string(),
        });
        assert!(matches!(telemetry, VitrineError::Telemetry(_)));
    }

    #[test]
    fn test_errors_are_cloneable_for_shared_loads() {
        let err = VitrineError::from(CatalogError::unavailable("postgres", "timeout"));
        assert_eq!(err.clone(), err);
    }
}
