use crate::record::WireLogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches of [`WireLogRecord`]s built by the
/// logging layer.
///
/// Implementations own the transport to a concrete backend (an OTLP
/// collector, stdout, a test buffer). The layer calls `send` from its
/// background task and never awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send one batch of records to the underlying backend.
    ///
    /// **Parameters**
    /// - `records`: fully-populated records, in the order they were
    ///   produced. Never empty.
    ///
    /// **Returns**
    /// - `Ok(())` if the whole batch was accepted by the backend.
    /// - `Err(..)` if the backend failed. The layer treats this as a
    ///   transient failure and retries the batch with backoff.
    async fn send(&self, records: &[WireLogRecord]) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
