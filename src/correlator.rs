use dashmap::DashMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::event::LogEvent;

/// Identifier of a trace scope (a span) that was current when an event was
/// produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u64);

impl From<&tracing::span::Id> for ScopeId {
    fn from(id: &tracing::span::Id) -> Self {
        ScopeId(id.into_u64())
    }
}

/// Error returned when parsing a hex trace or span id.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TraceIdParseError {
    #[error("expected {expected} hex digits, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("all-zero ids are invalid")]
    Zero,
}

macro_rules! fixed_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn to_bytes(self) -> [u8; $len] {
                self.0
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn from_hex(s: &str) -> Result<Self, TraceIdParseError> {
                if s.len() != $len * 2 {
                    return Err(TraceIdParseError::Length {
                        expected: $len * 2,
                        actual: s.len(),
                    });
                }
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes)?;
                if bytes.iter().all(|b| *b == 0) {
                    return Err(TraceIdParseError::Zero);
                }
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }
    };
}

fixed_id!(TraceId, 16);
fixed_id!(SpanId, 8);

/// Trace and span identifiers that were active for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceCorrelation {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

impl TraceCorrelation {
    pub fn new(trace_id: TraceId, span_id: SpanId) -> Self {
        Self { trace_id, span_id }
    }
}

const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Resolves the trace context of log events from the scope they carry.
///
/// Live scopes are retained in a concurrent map between `register` and
/// `release`. Each entry stores the trace/span pair as one value, so a
/// lookup either finds the complete pair of that scope or nothing. Once the
/// map holds `capacity` scopes, further scopes are not retained and events
/// produced in them resolve to `None`.
#[derive(Debug)]
pub struct TraceCorrelator {
    scopes: DashMap<ScopeId, TraceCorrelation>,
    capacity: usize,
}

impl Default for TraceCorrelator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TraceCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scopes: DashMap::new(),
            capacity,
        }
    }

    /// Record the trace context of a scope that has just started. Returns
    /// `false` when the scope could not be retained.
    pub fn register(&self, scope: ScopeId, correlation: TraceCorrelation) -> bool {
        if self.scopes.len() >= self.capacity && !self.scopes.contains_key(&scope) {
            tracing::debug!(
                target: "tracing_otlp_sink::correlator",
                capacity = self.capacity,
                "trace scope cache full, scope not retained"
            );
            return false;
        }
        self.scopes.insert(scope, correlation);
        true
    }

    /// Forget a scope that has ended. Scope ids may be reused afterwards.
    pub fn release(&self, scope: ScopeId) {
        self.scopes.remove(&scope);
    }

    /// Look up a retained scope directly.
    pub fn lookup(&self, scope: ScopeId) -> Option<TraceCorrelation> {
        self.scopes.get(&scope).map(|entry| *entry.value())
    }

    /// Trace context that was active when `event` was produced, if any.
    pub fn resolve(&self, event: &LogEvent) -> Option<TraceCorrelation> {
        event.scope.and_then(|scope| self.lookup(scope))
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
