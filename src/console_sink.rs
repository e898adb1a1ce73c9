use crate::record::WireLogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::io::Write;

/// Writes each record to stdout as one JSON document per line.
#[derive(Clone, Default)]
pub struct ConsoleSink {
    pretty: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent each document instead of writing JSON lines.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn encode(&self, records: &[WireLogRecord]) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        for record in records {
            if self.pretty {
                serde_json::to_writer_pretty(&mut buf, record)?;
            } else {
                serde_json::to_writer(&mut buf, record)?;
            }
            buf.push(b'\n');
        }
        Ok(buf)
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn send(&self, records: &[WireLogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let buf = self.encode(records)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&buf)?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        std::io::stdout().flush()?;
        Ok(())
    }
}
