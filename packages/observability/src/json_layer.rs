//! Layer that renders each event as one JSON object per line.

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::redact;
use crate::ObservabilityMode;

#[derive(Serialize)]
struct Line<'a> {
    ts: String,
    level: &'a str,
    service: &'a str,
    pid: u32,
    target: &'a str,
    msg: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    spans: Vec<&'a str>,
}

#[derive(Default)]
struct Collector {
    msg: Option<String>,
    fields: Map<String, Value>,
}

impl Collector {
    fn put(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.msg = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for Collector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.put(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }
}

/// JSONL layer with redaction applied per [`ObservabilityMode`].
pub struct JsonlLayer<W> {
    service: String,
    pid: u32,
    mode: ObservabilityMode,
    writer: W,
}

impl<W> JsonlLayer<W> {
    pub fn new(service: &str, mode: ObservabilityMode, writer: W) -> Self {
        Self {
            service: service.to_string(),
            pid: std::process::id(),
            mode,
            writer,
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut collected = Collector::default();
        event.record(&mut collected);

        let meta = event.metadata();
        let spans: Vec<&str> = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|span| span.name()).collect())
            .unwrap_or_default();

        let line = Line {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: meta.level().as_str(),
            service: &self.service,
            pid: self.pid,
            target: meta.target(),
            msg: collected.msg.unwrap_or_default(),
            fields: redact::apply(self.mode, collected.fields),
            spans,
        };

        if let Ok(json) = serde_json::to_string(&line) {
            let mut writer = self.writer.make_writer();
            let _ = writeln!(writer, "{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(mode: ObservabilityMode, emit: impl FnOnce()) -> Value {
        let sink = Capture::default();
        let subscriber =
            tracing_subscriber::registry().with(JsonlLayer::new("studio-session", mode, sink.clone()));
        tracing::subscriber::with_default(subscriber, emit);

        let text = String::from_utf8(sink.0.lock().clone()).unwrap();
        serde_json::from_str(text.lines().next().unwrap()).unwrap()
    }

    #[test]
    fn test_line_shape() {
        let line = capture(ObservabilityMode::DevVerbose, || {
            let span = tracing::info_span!("refresh_cycle");
            let _guard = span.enter();
            tracing::info!(period_secs = 1320u64, armed = true, "timer armed");
        });

        assert_eq!(line["level"], "INFO");
        assert_eq!(line["service"], "studio-session");
        assert_eq!(line["msg"], "timer armed");
        assert_eq!(line["fields"]["period_secs"], 1320);
        assert_eq!(line["fields"]["armed"], true);
        assert_eq!(line["spans"], serde_json::json!(["refresh_cycle"]));
        assert!(line["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_dev_mode_redacts_tokens() {
        let line = capture(ObservabilityMode::DevVerbose, || {
            tracing::info!(refresh_token = "r-123", user_id = "u-1", "refreshing");
        });

        assert_eq!(line["fields"]["refresh_token"], "[REDACTED]");
        assert_eq!(line["fields"]["user_id"], "u-1");
    }

    #[test]
    fn test_prod_mode_keeps_metadata_only() {
        let line = capture(ObservabilityMode::ProdMetadataOnly, || {
            tracing::warn!(status = 502, email = "a@b.c", "check user failed");
        });

        assert_eq!(line["fields"]["status"], 502);
        assert!(line["fields"].get("email").is_none());
    }

    #[test]
    fn test_fieldless_event_omits_fields() {
        let line = capture(ObservabilityMode::DevVerbose, || {
            tracing::debug!("plain");
        });

        assert!(line.get("fields").is_none());
        assert!(line.get("spans").is_none());
    }
}
