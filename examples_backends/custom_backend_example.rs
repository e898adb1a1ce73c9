use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, info_span};
use tracing_otlp_sink::{init::init_tracing, record::WireLogRecord, sink::LogSink};

/// Example of integrating a completely custom backend by implementing the
/// `LogSink` trait directly. Imagine this forwards to some proprietary
/// collector for which this crate does not provide a built-in sink.
struct MyCollectorSink;

#[async_trait]
impl LogSink for MyCollectorSink {
    async fn send(&self, records: &[WireLogRecord]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Here you would call your own client library for the collector.
        // For the sake of example we just print the records.
        for record in records {
            println!("[my-collector] {:?}", record);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn LogSink> = Arc::new(MyCollectorSink);
    init_tracing(sink)?;

    info!(message_template = "custom sink example started in {Mode} mode", Mode = "demo");

    let span = info_span!(
        "checkout",
        trace_id = "0af7651916cd43dd8448eb211c80319c",
        span_id = "b7ad6b7169203331"
    );
    let _guard = span.enter();
    error!(order_id = 123, "order {{order_id}} failed");

    // Give the background task time to flush.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    Ok(())
}
