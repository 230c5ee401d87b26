//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vitrine_core::{LogSettings, TelemetryError, VitrineResult};

/// Install the global tracing subscriber described by `settings`.
///
/// The filter is validated first, so a bad directive is reported even when a
/// subscriber is already installed. If one is, this is a no-op.
pub fn init_tracing(settings: &LogSettings) -> VitrineResult<()> {
    let filter = EnvFilter::try_new(&settings.filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: settings.filter.clone(),
        reason: e.to_string(),
    })?;

    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let json_layer = settings.json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!settings.json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit {
            reason: e.to_string(),
        })?;

    tracing::info!(filter = %settings.filter, json = settings.json, "Tracing initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::VitrineError;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let settings = LogSettings {
            filter: "vitrine_storage=loudest".to_string(),
            json: false,
        };
        match init_tracing(&settings) {
            Err(VitrineError::Telemetry(TelemetryError::InvalidFilter { filter, .. })) => {
                assert_eq!(filter, "vitrine_storage=loudest");
            }
            other => panic!("expected invalid filter error, got {:?}", other),
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let settings = LogSettings::default();
        assert!(init_tracing(&settings).is_ok());
        assert!(init_tracing(&settings).is_ok());
    }
}
