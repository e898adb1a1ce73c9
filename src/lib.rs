pub mod event;
pub mod record;
pub mod template;
pub mod format;
pub mod render;
pub mod convert;
pub mod correlator;
pub mod policy;
pub mod builder;

pub mod sink;
pub mod layer;

#[cfg(feature = "console")]
pub mod console_sink;

#[cfg(feature = "otlp-proto")]
pub mod proto;

pub mod env;
pub mod init;
pub mod noop_sink;

pub use builder::{build_log_record, LogRecordBuilder};
pub use correlator::{ScopeId, SpanId, TraceCorrelation, TraceCorrelator, TraceId};
pub use event::{ExceptionInfo, Level, LogEvent, PropertyValue};
pub use format::Locale;
pub use policy::IncludedData;
pub use record::{KeyValue, WireLogRecord, WireValue};
pub use template::MessageTemplate;
