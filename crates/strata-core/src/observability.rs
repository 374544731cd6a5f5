//! Logging setup and span helpers
//!
//! The orchestrator logs through `tracing`; nothing is printed until a
//! subscriber is installed, either by the embedding application or with
//! [`init_logging`].

use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human readable multi-line logs
    #[default]
    Pretty,
}

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Only the first
/// call has an effect; it is also a no-op when another subscriber was
/// installed beforehand.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}

/// Span for an orchestration operation on one entity
///
/// ```rust
/// use strata_core::observability::orchestration_span;
///
/// let span = orchestration_span("submit", "PIPELINE_by_6_0000");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn orchestration_span(operation: &str, entity_id: &str) -> Span {
    tracing::info_span!("orchestration", op = operation, entity_id = entity_id)
}
