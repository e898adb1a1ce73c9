use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::correlator::ScopeId;
use crate::template::MessageTemplate;

/// Severity of a [`LogEvent`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Every level, in ascending order.
    pub const ALL: [Level; 6] = [
        Level::Verbose,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    /// Canonical name, used as the record's severity text.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }

    /// Position on the OpenTelemetry 1-24 severity scale. Each level maps to
    /// the first number of its OTLP range (TRACE, DEBUG, INFO, WARN, ERROR,
    /// FATAL).
    pub fn severity_number(self) -> i32 {
        match self {
            Level::Verbose => 1,
            Level::Debug => 5,
            Level::Information => 9,
            Level::Warning => 13,
            Level::Error => 17,
            Level::Fatal => 21,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Verbose,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Information,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Dynamically-typed value bound to a template property.
#[derive(Clone)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    I128(i128),
    U128(u128),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Sequence(Vec<PropertyValue>),
    /// Key/value pairs in source iteration order. Keys may be any value and
    /// are coerced to strings on conversion.
    Dictionary(Vec<(PropertyValue, PropertyValue)>),
    Structure {
        type_tag: Option<String>,
        fields: Vec<(String, PropertyValue)>,
    },
    /// Anything else; rendered through its `Display` implementation.
    Display(Arc<dyn fmt::Display + Send + Sync>),
}

impl PropertyValue {
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        PropertyValue::Display(Arc::new(value))
    }

    pub fn structure<I, K>(type_tag: Option<&str>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyValue)>,
        K: Into<String>,
    {
        PropertyValue::Structure {
            type_tag: type_tag.map(str::to_string),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn dictionary<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyValue)>,
        K: Into<PropertyValue>,
    {
        PropertyValue::Dictionary(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `true` for values that render as a single token (no nesting).
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            PropertyValue::Sequence(_)
                | PropertyValue::Dictionary(_)
                | PropertyValue::Structure { .. }
        )
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("Null"),
            PropertyValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            PropertyValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            PropertyValue::U64(v) => f.debug_tuple("U64").field(v).finish(),
            PropertyValue::I128(v) => f.debug_tuple("I128").field(v).finish(),
            PropertyValue::U128(v) => f.debug_tuple("U128").field(v).finish(),
            PropertyValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            PropertyValue::Str(v) => f.debug_tuple("Str").field(v).finish(),
            PropertyValue::Bytes(v) => f.debug_tuple("Bytes").field(v).finish(),
            PropertyValue::Timestamp(v) => f.debug_tuple("Timestamp").field(v).finish(),
            PropertyValue::Sequence(v) => f.debug_tuple("Sequence").field(v).finish(),
            PropertyValue::Dictionary(v) => f.debug_tuple("Dictionary").field(v).finish(),
            PropertyValue::Structure { type_tag, fields } => f
                .debug_struct("Structure")
                .field("type_tag", type_tag)
                .field("fields", fields)
                .finish(),
            PropertyValue::Display(v) => f.debug_tuple("Display").field(&v.to_string()).finish(),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    PropertyValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I64,
    i16 => I64,
    i32 => I64,
    i64 => I64,
    u8 => U64,
    u16 => U64,
    u32 => U64,
    u64 => U64,
    i128 => I128,
    u128 => U128,
    f32 => F64,
    f64 => F64,
    String => Str,
    &str => Str,
    Vec<u8> => Bytes,
    DateTime<Utc> => Timestamp,
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        PropertyValue::U64(value as u64)
    }
}

impl From<isize> for PropertyValue {
    fn from(value: isize) -> Self {
        PropertyValue::I64(value as i64)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(values: Vec<PropertyValue>) -> Self {
        PropertyValue::Sequence(values)
    }
}

/// Error attached to a [`LogEvent`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Fully qualified type name of the error.
    pub type_name: String,
    pub message: String,
    /// Full textual representation, including the `source()` chain.
    pub stack_trace: String,
}

impl ExceptionInfo {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }

    /// Capture a concrete error, naming it by its Rust type path.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: Error + 'static,
    {
        Self::capture(std::any::type_name::<E>().to_string(), err)
    }

    /// Capture a type-erased error. The concrete type is not recoverable from
    /// `dyn Error`, so the name is taken from the head of its `Debug` output
    /// (`ParseIntError { .. }` gives `ParseIntError`).
    ///
    /// The result is therefore usually the bare type name, not the fully
    /// qualified path [`ExceptionInfo::from_error`] records, and it is
    /// `error` when the `Debug` output does not start with an identifier.
    /// Errors reaching the layer through `tracing` fields always take this
    /// path.
    pub fn from_dyn_error(err: &(dyn Error + 'static)) -> Self {
        let debug = format!("{:?}", err);
        let head: String = debug
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
            .collect();
        let type_name = if head.is_empty() { "error".to_string() } else { head };
        Self::capture(type_name, err)
    }

    fn capture(type_name: String, err: &(dyn Error + 'static)) -> Self {
        let message = err.to_string();
        let mut stack_trace = format!("{}: {}", type_name, message);
        let mut source = err.source();
        while let Some(cause) = source {
            stack_trace.push_str("\n    caused by: ");
            stack_trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            type_name,
            message,
            stack_trace,
        }
    }
}

/// One structured logging call, as handed to the record builder.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub template: MessageTemplate,
    pub properties: IndexMap<String, PropertyValue>,
    pub exception: Option<ExceptionInfo>,
    /// Trace scope that was current when the event was produced.
    pub scope: Option<ScopeId>,
}

impl LogEvent {
    pub fn new(timestamp: DateTime<Utc>, level: Level, template: MessageTemplate) -> Self {
        Self {
            timestamp,
            level,
            template,
            properties: IndexMap::new(),
            exception: None,
            scope: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_numbers_follow_level_order() {
        let numbers: Vec<i32> = Level::ALL.iter().map(|l| l.severity_number()).collect();
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        assert!(numbers.iter().all(|n| (1..=24).contains(n)));
    }

    #[test]
    fn maps_tracing_levels() {
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Verbose);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warning);
        assert_eq!(Level::from(tracing::Level::ERROR).as_str(), "Error");
    }

    #[derive(Debug)]
    struct Outer(std::num::ParseIntError);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("config value is not a number")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn exception_captures_source_chain() {
        let inner = "x".parse::<i32>().unwrap_err();
        let info = ExceptionInfo::from_error(&Outer(inner));
        assert!(info.type_name.ends_with("Outer"));
        assert_eq!(info.message, "config value is not a number");
        assert!(info.stack_trace.contains("caused by: invalid digit found in string"));
    }

    #[test]
    fn dyn_exception_names_type_from_debug_head() {
        let err = "x".parse::<i32>().unwrap_err();
        let info = ExceptionInfo::from_dyn_error(&err);
        assert_eq!(info.type_name, "ParseIntError");
        assert_ne!(info.type_name, ExceptionInfo::from_error(&err).type_name);
    }

    struct Opaque;

    impl fmt::Debug for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("<opaque>")
        }
    }

    impl fmt::Display for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("opaque failure")
        }
    }

    impl Error for Opaque {}

    #[test]
    fn dyn_exception_without_debug_identifier_is_named_error() {
        let info = ExceptionInfo::from_dyn_error(&Opaque);
        assert_eq!(info.type_name, "error");
        assert_eq!(info.stack_trace, "error: opaque failure");
    }
}
