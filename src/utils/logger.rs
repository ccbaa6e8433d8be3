use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Collects event fields as JSON attributes.
#[derive(Default)]
struct AttributeVisitor {
    attributes: Map<String, Value>,
}

impl Visit for AttributeVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.attributes.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.attributes.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.attributes.insert(field.name().to_string(), json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.attributes.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.attributes.insert(field.name().to_string(), json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.attributes
            .insert(field.name().to_string(), json!(format!("{:?}", value)));
    }
}

/// One JSON object per line, laid out after the OpenTelemetry log data model.
#[derive(Clone)]
struct OtelJsonFormatter {
    resource: Value,
}

impl OtelJsonFormatter {
    fn new(config: &LoggingConfig) -> Self {
        OtelJsonFormatter {
            resource: json!({
                "service.name": config.service_name,
                "service.version": config.service_version,
            }),
        }
    }
}

fn severity_number(level: &Level) -> u64 {
    match *level {
        Level::TRACE => 1,
        Level::DEBUG => 5,
        Level::INFO => 9,
        Level::WARN => 13,
        Level::ERROR => 17,
    }
}

impl<S, N> FormatEvent<S, N> for OtelJsonFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let mut visitor = AttributeVisitor::default();
        event.record(&mut visitor);

        let mut attributes = visitor.attributes;
        let body = match attributes.remove("message") {
            Some(Value::String(message)) => message,
            _ => metadata.name().to_string(),
        };
        attributes.insert("code.target".to_string(), json!(metadata.target()));
        if let Some(file) = metadata.file() {
            attributes.insert("code.filepath".to_string(), json!(file));
        }
        if let Some(line) = metadata.line() {
            attributes.insert("code.lineno".to_string(), json!(line));
        }

        let record = json!({
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "severity_text": metadata.level().as_str(),
            "severity_number": severity_number(metadata.level()),
            "body": body,
            "resource": self.resource,
            "attributes": attributes,
        });
        let line = serde_json::to_string(&record).map_err(|_| std::fmt::Error)?;
        writer.write_str(&line)?;
        writer.write_char('\n')
    }
}

/// Parses a `logging.level` value.
pub fn parse_level(level: &str) -> Result<LevelFilter, String> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(format!(
            "Invalid logging.level '{}'. Valid values: trace, debug, info, warn, error",
            other
        )),
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives are layered on top of the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let level = parse_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format.to_lowercase().as_str() {
        "json" => registry
            .with(fmt::layer().event_format(OtelJsonFormatter::new(config)))
            .try_init(),
        // console, and anything unrecognised
        _ => registry.with(fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| format!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level(" debug ").unwrap(), LevelFilter::DEBUG);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn test_severity_numbers_are_ordered() {
        assert!(severity_number(&Level::TRACE) < severity_number(&Level::DEBUG));
        assert!(severity_number(&Level::WARN) < severity_number(&Level::ERROR));
    }
}
