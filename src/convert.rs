//! Conversion of dynamically-typed property values into [`WireValue`]s.
//!
//! Conversion is total. Integers wider than the wire's `i64` are carried as
//! their decimal string, timestamps as RFC 3339 strings, and values with no
//! wire counterpart as their `Display` text.

use indexmap::IndexMap;

use crate::event::PropertyValue;
use crate::format::{self, Locale};
use crate::record::WireValue;
use crate::render;

pub fn to_wire_value(value: &PropertyValue) -> WireValue {
    match value {
        PropertyValue::Null => WireValue::Empty,
        PropertyValue::Bool(b) => WireValue::Bool(*b),
        PropertyValue::I64(i) => WireValue::Int(*i),
        PropertyValue::U64(u) => i64::try_from(*u).map_or_else(|_| WireValue::String(u.to_string()), WireValue::Int),
        PropertyValue::I128(i) => i64::try_from(*i).map_or_else(|_| WireValue::String(i.to_string()), WireValue::Int),
        PropertyValue::U128(u) => i64::try_from(*u).map_or_else(|_| WireValue::String(u.to_string()), WireValue::Int),
        PropertyValue::F64(f) => WireValue::Double(*f),
        PropertyValue::Str(s) => WireValue::String(s.clone()),
        PropertyValue::Bytes(b) => WireValue::Bytes(b.clone()),
        PropertyValue::Timestamp(ts) => WireValue::String(format::rfc3339(ts)),
        PropertyValue::Sequence(items) => WireValue::Array(items.iter().map(to_wire_value).collect()),
        PropertyValue::Dictionary(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key_string(key), to_wire_value(value));
            }
            WireValue::Map(map)
        }
        PropertyValue::Structure { fields, .. } => {
            let mut map = IndexMap::with_capacity(fields.len());
            for (name, value) in fields {
                map.insert(name.clone(), to_wire_value(value));
            }
            WireValue::Map(map)
        }
        PropertyValue::Display(d) => WireValue::String(d.to_string()),
    }
}

/// Dictionary keys are coerced to strings with invariant formatting so that
/// the same key yields the same map entry on every host.
fn key_string(key: &PropertyValue) -> String {
    render::render_value(key, &Locale::INVARIANT)
}
