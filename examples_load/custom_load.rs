use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::info;

use tracing_otlp_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_otlp_sink::noop_sink::NoopSink;
use tracing_otlp_sink::IncludedData;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(NoopSink);

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        included_data: IncludedData::all(),
        ..LayerConfig::default()
    };

    init_tracing_with_config(sink, layer_config)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        info!(
            message_template = "custom load test {Iteration:000000} took {Elapsed:0.00} ms",
            Iteration = i,
            Elapsed = i as f64 / 7.0
        );
    }

    let elapsed = start.elapsed();
    println!("all fields: built {} records in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
    Ok(())
}
