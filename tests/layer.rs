use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing_otlp_sink::builder::{EXCEPTION_MESSAGE, EXCEPTION_TYPE, MESSAGE_TEMPLATE_RENDERINGS, MESSAGE_TEMPLATE_TEXT};
use tracing_otlp_sink::init::LayerConfig;
use tracing_otlp_sink::sink::LogSink;
use tracing_otlp_sink::{IncludedData, SpanId, TraceId, WireLogRecord, WireValue};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[derive(Clone, Default)]
struct CollectingSink {
    records: Arc<Mutex<Vec<WireLogRecord>>>,
}

impl CollectingSink {
    fn take(&self) -> Vec<WireLogRecord> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }
}

#[async_trait]
impl LogSink for CollectingSink {
    async fn send(&self, records: &[WireLogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

fn config() -> LayerConfig {
    LayerConfig {
        flush_interval: Duration::from_millis(10),
        enable_stdout: false,
        ..LayerConfig::default()
    }
}

#[tokio::test]
async fn events_become_records_with_trace_context() {
    let sink = CollectingSink::default();
    let config = LayerConfig {
        included_data: IncludedData::all() - IncludedData::TEMPLATE_BODY,
        ..config()
    };
    let (layer, handle) = config.build_layer(Arc::new(sink.clone()));
    let correlator = Arc::clone(layer.builder().correlator());

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        let request = tracing::info_span!(
            "request",
            trace_id = "4bf92f3577b34da6a3ce929d0e0e4736",
            span_id = "00f067aa0ba902b7"
        );
        let _request = request.enter();
        let query = tracing::info_span!("query");
        let _query = query.enter();

        tracing::info!(Count = 7, message_template = "Value: {Count:000}");
        tracing::debug!("below the minimum level");
    });
    handle.await.unwrap();

    let records = sink.take();
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.severity_text, "Information");
    assert_eq!(record.severity_number, 9);
    assert_eq!(record.body, Some(WireValue::String("Value: 007".to_string())));
    assert_eq!(record.attribute("Count"), Some(&WireValue::Int(7)));
    assert_eq!(
        record.attribute(MESSAGE_TEMPLATE_TEXT).and_then(WireValue::as_str),
        Some("Value: {Count:000}")
    );
    assert_eq!(
        record.attribute(MESSAGE_TEMPLATE_RENDERINGS),
        Some(&WireValue::Array(vec!["007".into()]))
    );
    assert_eq!(record.trace_id, TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").ok());
    assert_eq!(record.span_id, SpanId::from_hex("00f067aa0ba902b7").ok());
    assert!(record.time_unix_nano > 0);

    // Closed spans no longer correlate.
    assert!(correlator.is_empty());
}

#[tokio::test]
async fn plain_messages_and_errors_are_captured() {
    let sink = CollectingSink::default();
    let (layer, handle) = config().build_layer(Arc::new(sink.clone()));

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        let err = "x".parse::<u32>().unwrap_err();
        tracing::error!(error = &err as &(dyn Error + 'static), attempt = 3, "could not parse");
        tracing::warn!(target: "tracing_otlp_sink::export", "internal diagnostics are skipped");
    });
    handle.await.unwrap();

    let records = sink.take();
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.severity_text, "Error");
    assert_eq!(record.body, Some(WireValue::String("could not parse".to_string())));
    assert_eq!(record.attribute("attempt"), Some(&WireValue::Int(3)));
    assert_eq!(record.attribute(EXCEPTION_TYPE).and_then(WireValue::as_str), Some("ParseIntError"));
    assert_eq!(
        record.attribute(EXCEPTION_MESSAGE).and_then(WireValue::as_str),
        Some("invalid digit found in string")
    );
    assert_eq!(record.trace_id, None);
}

#[tokio::test]
async fn full_channel_drops_records() {
    let sink = CollectingSink::default();
    let config = LayerConfig {
        channel_buffer: 16,
        ..config()
    };
    let (layer, handle) = config.build_layer(Arc::new(sink.clone()));
    let dropped = Arc::clone(&layer.dropped_events);
    let enqueued = Arc::clone(&layer.enqueued_events);

    // The current-thread runtime cannot drain the channel while this runs.
    tracing::subscriber::with_default(Registry::default().with(layer), || {
        for i in 0..100 {
            tracing::info!(i, "burst");
        }
    });
    handle.await.unwrap();

    assert_eq!(sink.take().len(), 16);
    assert_eq!(enqueued.load(Ordering::Relaxed), 16);
    assert_eq!(dropped.load(Ordering::Relaxed), 84);
}
