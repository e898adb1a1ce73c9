use crate::builder::LogRecordBuilder;
use crate::correlator::TraceCorrelator;
use crate::format::Locale;
use crate::layer::OtlpLogLayer;
use crate::policy::IncludedData;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// Controls the internal channel size, the batch size handed to the sink,
/// how often a partial batch is flushed, which events are captured, how
/// records are built, and whether events are also printed to the console
/// through a `fmt` layer.
///
/// **Fields**
/// - `channel_buffer`: maximum number of records queued before new ones are
///   dropped.
/// - `batch_size`: number of records per `LogSink::send` call.
/// - `flush_interval`: maximum time between sends, even for a partial batch.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed alongside the OTLP layer.
/// - `min_level`: least severe level that is captured.
/// - `included_data`: optional record fields, see [`IncludedData`].
/// - `locale`: formatting conventions for rendered messages.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub min_level: tracing::Level,
    pub included_data: IncludedData,
    pub locale: Locale,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
            min_level: tracing::Level::INFO,
            included_data: IncludedData::default(),
            locale: Locale::INVARIANT,
        }
    }
}

impl LayerConfig {
    /// Builder for records produced under this configuration, with a fresh
    /// trace correlator.
    pub fn record_builder(&self) -> LogRecordBuilder {
        LogRecordBuilder::new(self.included_data, self.locale, Arc::new(TraceCorrelator::new()))
    }

    /// Create the layer and spawn its background task without installing
    /// anything globally.
    pub fn build_layer(&self, sink: Arc<dyn LogSink>) -> (OtlpLogLayer, JoinHandle<()>) {
        OtlpLogLayer::new(
            sink,
            self.record_builder(),
            self.min_level,
            self.channel_buffer,
            self.batch_size,
            self.flush_interval,
        )
    }
}

/// Error returned when the global subscriber cannot be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive batches of
///   built records.
/// - `config`: [`LayerConfig`] controlling capture, record building and
///   batching.
///
/// **Returns**
///
/// The handle of the background batching task. Must be called from within
/// a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<JoinHandle<()>, InitError> {
    let (layer, handle) = config.build_layer(sink);

    // The two subscriber shapes have different types, hence two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
