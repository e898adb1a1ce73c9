//! Conversion into the `opentelemetry-proto` generated message types, for
//! sinks that speak OTLP/gRPC or OTLP/HTTP protobuf.

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, ArrayValue, KeyValue as ProtoKeyValue, KeyValueList};
use opentelemetry_proto::tonic::logs::v1::LogRecord;

use crate::record::{KeyValue, WireLogRecord, WireValue};

impl From<WireValue> for AnyValue {
    fn from(value: WireValue) -> Self {
        let value = match value {
            WireValue::Empty => None,
            WireValue::String(s) => Some(any_value::Value::StringValue(s)),
            WireValue::Bool(b) => Some(any_value::Value::BoolValue(b)),
            WireValue::Int(i) => Some(any_value::Value::IntValue(i)),
            WireValue::Double(d) => Some(any_value::Value::DoubleValue(d)),
            WireValue::Bytes(b) => Some(any_value::Value::BytesValue(b)),
            WireValue::Array(values) => Some(any_value::Value::ArrayValue(ArrayValue {
                values: values.into_iter().map(AnyValue::from).collect(),
            })),
            WireValue::Map(map) => Some(any_value::Value::KvlistValue(KeyValueList {
                values: map
                    .into_iter()
                    .map(|(key, value)| ProtoKeyValue {
                        key,
                        value: Some(value.into()),
                    })
                    .collect(),
            })),
        };
        AnyValue { value }
    }
}

impl From<KeyValue> for ProtoKeyValue {
    fn from(kv: KeyValue) -> Self {
        ProtoKeyValue {
            key: kv.key,
            value: Some(kv.value.into()),
        }
    }
}

impl From<WireLogRecord> for LogRecord {
    fn from(record: WireLogRecord) -> Self {
        LogRecord {
            time_unix_nano: record.time_unix_nano,
            observed_time_unix_nano: record.observed_time_unix_nano,
            severity_number: record.severity_number,
            severity_text: record.severity_text,
            body: record.body.map(AnyValue::from),
            attributes: record.attributes.into_iter().map(ProtoKeyValue::from).collect(),
            trace_id: record.trace_id.map(|id| id.to_bytes().to_vec()).unwrap_or_default(),
            span_id: record.span_id.map(|id| id.to_bytes().to_vec()).unwrap_or_default(),
            ..Default::default()
        }
    }
}
