use indexmap::IndexMap;
use serde::Serialize;

use crate::correlator::{SpanId, TraceId};

/// Recursive wire value, mirroring the OTLP `AnyValue` union.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    Empty,
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Array(Vec<WireValue>),
    Map(IndexMap<String, WireValue>),
}

impl WireValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            WireValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[WireValue]> {
        match self {
            WireValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, WireValue>> {
        match self {
            WireValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::String(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::String(s)
    }
}

/// Record attribute. Attribute lists are append-only, so keys may repeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: WireValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<WireValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// OpenTelemetry log record produced from one log event and handed to a
/// [`LogSink`](crate::sink::LogSink).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WireLogRecord {
    pub time_unix_nano: u64,
    pub observed_time_unix_nano: u64,
    pub severity_text: String,
    pub severity_number: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<WireValue>,
    pub attributes: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
}

impl WireLogRecord {
    /// First attribute with the given key.
    pub fn attribute(&self, key: &str) -> Option<&WireValue> {
        self.attributes.iter().find(|kv| kv.key == key).map(|kv| &kv.value)
    }

    pub(crate) fn push_attribute(&mut self, key: impl Into<String>, value: impl Into<WireValue>) {
        self.attributes.push(KeyValue::new(key, value));
    }
}
