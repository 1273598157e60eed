//! `tracing` subscriber setup
//!
//! The connector and middleware crates emit `tracing` events with structured
//! fields. Applications that do not install their own subscriber can call
//! [`init_tracing`] once at startup.

use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Subscriber settings, loadable with `from_env_prefixed("LOG")`
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "info,mortar=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
            .is_ok(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .is_ok(),
    }
}

/// Event capture for asserting on emitted diagnostics in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod capture {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    /// A recorded event
    #[derive(Debug, Clone)]
    pub struct CapturedEvent {
        /// Event level
        pub level: tracing::Level,
        /// Rendered `message` field
        pub message: String,
        /// Remaining fields rendered as strings
        pub fields: HashMap<String, String>,
    }

    /// Layer recording every event it sees
    #[derive(Debug, Clone, Default)]
    pub struct EventCapture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    impl EventCapture {
        /// Create an empty capture
        pub fn new() -> Self {
            Self::default()
        }

        /// Install as the thread-default subscriber until the guard drops
        pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
            let subscriber = tracing_subscriber::registry().with(self.clone());
            tracing::subscriber::set_default(subscriber)
        }

        /// Events recorded so far
        pub fn events(&self) -> Vec<CapturedEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Events whose message matches exactly
        pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
            self.events()
                .into_iter()
                .filter(|event| event.message == message)
                .collect()
        }
    }

    impl<S> tracing_subscriber::Layer<S> for EventCapture
    where
        S: tracing::Subscriber,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = HashMap::new();
            event.record(&mut FieldVisitor { fields: &mut fields });
            let message = fields.remove("message").unwrap_or_default();

            self.events.lock().unwrap().push(CapturedEvent {
                level: *event.metadata().level(),
                message,
                fields,
            });
        }
    }

    struct FieldVisitor<'a> {
        fields: &'a mut HashMap<String, String>,
    }

    impl<'a> tracing::field::Visit for FieldVisitor<'a> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.fields.insert(field.name().to_string(), format!("{:?}", value));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.fields.insert(field.name().to_string(), value.to_string());
        }

        fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
            self.fields.insert(field.name().to_string(), value.to_string());
        }

        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            self.fields.insert(field.name().to_string(), value.to_string());
        }

        fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::EventCapture;
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.filter, "info,mortar=debug");
        assert_eq!(config.format, LogFormat::Compact);

        let config: LoggingConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_capture_records_fields() {
        let capture = EventCapture::new();
        {
            let _guard = capture.set_default();
            tracing::warn!(attempt = 2, error = "refused", "Retrying database connection");
        }

        let events = capture.with_message("Retrying database connection");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, tracing::Level::WARN);
        assert_eq!(events[0].fields["attempt"], "2");
        assert_eq!(events[0].fields["error"], "refused");
    }
}
