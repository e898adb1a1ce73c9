use crate::builder::LogRecordBuilder;
use crate::correlator::{ScopeId, SpanId, TraceCorrelation, TraceId};
use crate::event::{ExceptionInfo, Level, LogEvent, PropertyValue};
use crate::record::WireLogRecord;
use crate::sink::LogSink;
use crate::template::MessageTemplate;
use chrono::Utc;
use indexmap::IndexMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::field::{Field, Visit};
use tracing::{span, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Events whose target starts with this prefix come from this crate and are
/// never turned into records.
pub const INTERNAL_TARGET: &str = "tracing_otlp_sink";

const MESSAGE_FIELD: &str = "message";
const MESSAGE_TEMPLATE_FIELD: &str = "message_template";
const TRACE_ID_FIELD: &str = "trace_id";
const SPAN_ID_FIELD: &str = "span_id";

const MAX_SEND_ATTEMPTS: u32 = 10;

/// `tracing_subscriber` layer that turns events into OpenTelemetry log
/// records and forwards them to an asynchronous [`LogSink`] via a bounded
/// channel and background task.
///
/// Records are built on the producing thread with a shared
/// [`LogRecordBuilder`]; only finished records cross the channel. Spans that
/// carry `trace_id`/`span_id` fields (hex) register their trace context with
/// the builder's correlator, and child spans inherit it, so events inside
/// them get correlated ids.
pub struct OtlpLogLayer {
    sender: mpsc::Sender<WireLogRecord>,
    builder: LogRecordBuilder,
    min_level: tracing::Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully handed to the background task.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full or the sink kept failing.
    pub dropped_events: Arc<AtomicU64>,
}

impl OtlpLogLayer {
    /// Create a new layer and spawn a background task that pulls records
    /// from a bounded channel and sends them to the provided [`LogSink`] in
    /// batches.
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations. The task flushes
    /// what it holds and exits once the layer is dropped.
    pub fn new(
        sink: Arc<dyn LogSink>,
        builder: LogRecordBuilder,
        min_level: tracing::Level,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<WireLogRecord>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let enqueued_events_bg = Arc::clone(&enqueued_events);
        let dropped_events_bg = Arc::clone(&dropped_events);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(record) => {
                            batch.push(record);
                            enqueued_events_bg.fetch_add(1, Ordering::Relaxed);
                            if batch.len() >= batch_size {
                                send_batch(&*sink, &mut batch, &dropped_events_bg).await;
                            }
                        }
                        None => {
                            if !batch.is_empty() {
                                send_batch(&*sink, &mut batch, &dropped_events_bg).await;
                            }
                            if let Err(e) = sink.flush().await {
                                tracing::warn!(target: "tracing_otlp_sink::export", error = %e, "log sink flush failed");
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            send_batch(&*sink, &mut batch, &dropped_events_bg).await;
                        }
                    }
                }
            }
        });

        (Self {
            sender: tx,
            builder,
            min_level,
            total_events,
            enqueued_events,
            dropped_events,
        }, handle)
    }

    pub fn builder(&self) -> &LogRecordBuilder {
        &self.builder
    }
}

/// Send `batch`, retrying with exponential backoff. After
/// `MAX_SEND_ATTEMPTS` failures the batch is dropped and counted.
async fn send_batch(sink: &dyn LogSink, batch: &mut Vec<WireLogRecord>, dropped: &AtomicU64) {
    let mut backoff = Duration::from_millis(100);
    let max_backoff = Duration::from_secs(10);

    for attempt in 1..=MAX_SEND_ATTEMPTS {
        match sink.send(batch.as_slice()).await {
            Ok(()) => {
                batch.clear();
                return;
            }
            Err(e) if attempt < MAX_SEND_ATTEMPTS => {
                tracing::warn!(
                    target: "tracing_otlp_sink::export",
                    error = %e,
                    attempt,
                    ?backoff,
                    "log sink send failed, retrying"
                );
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
            }
            Err(e) => {
                tracing::error!(
                    target: "tracing_otlp_sink::export",
                    error = %e,
                    records = batch.len(),
                    "log sink send failed, dropping batch"
                );
            }
        }
    }
    dropped.fetch_add(batch.len() as u64, Ordering::Relaxed);
    batch.clear();
}

impl<S> Layer<S> for OtlpLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = TraceContextVisitor::default();
        attrs.record(&mut visitor);

        let correlator = self.builder.correlator();
        let correlation = visitor.correlation().or_else(|| {
            let parent = ctx.span(id)?.parent()?;
            correlator.lookup(ScopeId::from(&parent.id()))
        });
        if let Some(correlation) = correlation {
            correlator.register(ScopeId::from(id), correlation);
        }
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = TraceContextVisitor::default();
        values.record(&mut visitor);
        if let Some(correlation) = visitor.correlation() {
            self.builder.correlator().register(ScopeId::from(id), correlation);
        }
    }

    fn on_close(&self, id: span::Id, _ctx: Context<'_, S>) {
        self.builder.correlator().release(ScopeId::from(&id));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level || meta.target().starts_with(INTERNAL_TARGET) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let scope = ctx.event_span(event).map(|span| ScopeId::from(&span.id()));
        let log_event = visitor.into_log_event(Level::from(*meta.level()), scope);
        let record = self.builder.build(&log_event);

        if self.sender.try_send(record).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "tracing_otlp_sink::layer", "log channel full, dropping log record");
        }
    }
}

/// Collects event fields as template properties, in declaration order.
#[derive(Default)]
struct EventVisitor {
    properties: IndexMap<String, PropertyValue>,
    message: Option<String>,
    template: Option<String>,
    exception: Option<ExceptionInfo>,
}

impl EventVisitor {
    fn into_log_event(self, level: Level, scope: Option<ScopeId>) -> LogEvent {
        let text = self.template.or(self.message).unwrap_or_default();
        LogEvent {
            timestamp: Utc::now(),
            level,
            template: MessageTemplate::parse(&text),
            properties: self.properties,
            exception: self.exception,
            scope,
        }
    }

    fn insert(&mut self, field: &Field, value: PropertyValue) {
        self.properties.insert(field.name().to_string(), value);
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(value.to_string()),
            MESSAGE_TEMPLATE_FIELD => self.template = Some(value.to_string()),
            _ => self.insert(field, PropertyValue::Str(value.to_string())),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, PropertyValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, PropertyValue::U64(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        self.insert(field, PropertyValue::I128(value));
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.insert(field, PropertyValue::U128(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, PropertyValue::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, PropertyValue::Bool(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn Error + 'static)) {
        self.exception = Some(ExceptionInfo::from_dyn_error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{:?}", value);
        match field.name() {
            MESSAGE_FIELD => self.message = Some(text),
            MESSAGE_TEMPLATE_FIELD => self.template = Some(text),
            _ => self.insert(field, PropertyValue::Str(text)),
        }
    }
}

/// Picks `trace_id` and `span_id` out of span fields.
#[derive(Default)]
struct TraceContextVisitor {
    trace_id: Option<TraceId>,
    span_id: Option<SpanId>,
}

impl TraceContextVisitor {
    fn correlation(&self) -> Option<TraceCorrelation> {
        Some(TraceCorrelation::new(self.trace_id?, self.span_id?))
    }
}

impl Visit for TraceContextVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            TRACE_ID_FIELD => self.trace_id = TraceId::from_hex(value).ok(),
            SPAN_ID_FIELD => self.span_id = SpanId::from_hex(value).ok(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if matches!(field.name(), TRACE_ID_FIELD | SPAN_ID_FIELD) {
            let text = format!("{:?}", value);
            self.record_str(field, text.trim_matches('"'));
        }
    }
}
