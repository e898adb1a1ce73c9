use crate::record::WireLogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all records.
///
/// Useful for measuring the cost of building records without any external
/// I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _records: &[WireLogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
