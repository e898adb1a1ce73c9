use std::sync::Arc;

use crate::convert::to_wire_value;
use crate::correlator::TraceCorrelator;
use crate::event::{ExceptionInfo, LogEvent};
use crate::format::Locale;
use crate::policy::IncludedData;
use crate::record::{WireLogRecord, WireValue};
use crate::render::{render_message, render_token};

pub const EXCEPTION_TYPE: &str = "exception.type";
pub const EXCEPTION_MESSAGE: &str = "exception.message";
pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";
pub const MESSAGE_TEMPLATE_TEXT: &str = "message_template.text";
pub const MESSAGE_TEMPLATE_HASH_MD5: &str = "message_template.hash.md5";
pub const MESSAGE_TEMPLATE_RENDERINGS: &str = "message_template.renderings";

/// Build the wire record for one log event.
///
/// **Parameters**
/// - `event`: the event to convert; never modified.
/// - `locale`: formatting conventions for the rendered message and the
///   per-placeholder renderings.
/// - `policy`: which optional fields and attributes to include.
/// - `correlator`: consulted for trace/span ids when the policy asks for
///   them.
///
/// **Returns**
///
/// A fully populated record. This never fails: values of any shape degrade
/// to their string form, blank bodies and empty exception fields are
/// omitted, and missing trace context leaves the ids unset.
pub fn build_log_record(
    event: &LogEvent,
    locale: &Locale,
    policy: IncludedData,
    correlator: &TraceCorrelator,
) -> WireLogRecord {
    let mut record = WireLogRecord::default();

    for (name, value) in &event.properties {
        record.push_attribute(name.as_str(), to_wire_value(value));
    }

    let nanos = event
        .timestamp
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0);
    record.time_unix_nano = nanos;
    record.observed_time_unix_nano = nanos;

    let body = if policy.contains(IncludedData::TEMPLATE_BODY) {
        event.template.text().to_string()
    } else {
        render_message(&event.template, &event.properties, locale)
    };
    if !body.trim().is_empty() {
        record.body = Some(WireValue::String(body));
    }

    record.severity_text = event.level.as_str().to_string();
    record.severity_number = event.level.severity_number();

    if let Some(exception) = &event.exception {
        push_exception(&mut record, exception);
    }

    push_included_fields(&mut record, event, locale, policy, correlator);
    record
}

fn push_exception(record: &mut WireLogRecord, exception: &ExceptionInfo) {
    record.push_attribute(EXCEPTION_TYPE, exception.type_name.as_str());
    if !exception.message.is_empty() {
        record.push_attribute(EXCEPTION_MESSAGE, exception.message.as_str());
    }
    if !exception.stack_trace.is_empty() {
        record.push_attribute(EXCEPTION_STACKTRACE, exception.stack_trace.as_str());
    }
}

fn push_included_fields(
    record: &mut WireLogRecord,
    event: &LogEvent,
    locale: &Locale,
    policy: IncludedData,
    correlator: &TraceCorrelator,
) {
    if policy.intersects(IncludedData::TRACE_ID_FIELD | IncludedData::SPAN_ID_FIELD) {
        if let Some(correlation) = correlator.resolve(event) {
            if policy.contains(IncludedData::TRACE_ID_FIELD) {
                record.trace_id = Some(correlation.trace_id);
            }
            if policy.contains(IncludedData::SPAN_ID_FIELD) {
                record.span_id = Some(correlation.span_id);
            }
        }
    }

    if policy.contains(IncludedData::MESSAGE_TEMPLATE_TEXT_ATTRIBUTE) {
        record.push_attribute(MESSAGE_TEMPLATE_TEXT, event.template.text());
    }

    if policy.contains(IncludedData::MESSAGE_TEMPLATE_MD5_HASH_ATTRIBUTE) {
        record.push_attribute(MESSAGE_TEMPLATE_HASH_MD5, template_md5(event.template.text()));
    }

    if policy.contains(IncludedData::MESSAGE_TEMPLATE_RENDERINGS_ATTRIBUTE) {
        let mut formatted = event.template.properties().filter(|p| p.format.is_some()).peekable();
        if formatted.peek().is_some() {
            let renderings = formatted
                .map(|token| WireValue::String(render_token(token, &event.properties, locale)))
                .collect();
            record.push_attribute(MESSAGE_TEMPLATE_RENDERINGS, WireValue::Array(renderings));
        }
    }
}

/// Lowercase hex MD5 of the template text. Depends only on the text, so it
/// is stable across calls, hosts and restarts.
pub fn template_md5(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// A configured [`build_log_record`]: policy, locale and correlator fixed
/// once per sink, shared across producer threads.
#[derive(Debug, Clone)]
pub struct LogRecordBuilder {
    policy: IncludedData,
    locale: Locale,
    correlator: Arc<TraceCorrelator>,
}

impl Default for LogRecordBuilder {
    fn default() -> Self {
        Self::new(IncludedData::default(), Locale::INVARIANT, Arc::new(TraceCorrelator::new()))
    }
}

impl LogRecordBuilder {
    pub fn new(policy: IncludedData, locale: Locale, correlator: Arc<TraceCorrelator>) -> Self {
        Self {
            policy,
            locale,
            correlator,
        }
    }

    pub fn policy(&self) -> IncludedData {
        self.policy
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn correlator(&self) -> &Arc<TraceCorrelator> {
        &self.correlator
    }

    pub fn build(&self, event: &LogEvent) -> WireLogRecord {
        build_log_record(event, &self.locale, self.policy, &self.correlator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::{ScopeId, SpanId, TraceCorrelation, TraceId};
    use crate::event::Level;
    use crate::template::MessageTemplate;
    use chrono::{TimeZone, Utc};

    fn event(template: &str) -> LogEvent {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        LogEvent::new(ts, Level::Warning, MessageTemplate::parse(template))
    }

    fn build(event: &LogEvent, policy: IncludedData) -> WireLogRecord {
        build_log_record(event, &Locale::INVARIANT, policy, &TraceCorrelator::new())
    }

    #[test]
    fn minimal_record_has_only_required_fields() {
        let event = event("Disk {Drive} at {Pct}%")
            .with_property("Drive", "C")
            .with_property("Pct", 93);
        let record = build(&event, IncludedData::empty());

        let keys: Vec<&str> = record.attributes.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, ["Drive", "Pct"]);
        assert_eq!(record.time_unix_nano, 1_704_164_645_000_000_000);
        assert_eq!(record.observed_time_unix_nano, record.time_unix_nano);
        assert_eq!(record.severity_text, "Warning");
        assert_eq!(record.severity_number, 13);
        assert_eq!(record.body, Some(WireValue::String("Disk C at 93%".to_string())));
        assert_eq!(record.trace_id, None);
        assert_eq!(record.span_id, None);
    }

    #[test]
    fn template_body_uses_literal_text() {
        let event = event("Disk {Drive}").with_property("Drive", "C");
        let record = build(&event, IncludedData::TEMPLATE_BODY);
        assert_eq!(record.body, Some(WireValue::String("Disk {Drive}".to_string())));
    }

    #[test]
    fn blank_bodies_are_omitted() {
        let blank = event("{Nothing}").with_property("Nothing", "   ");
        assert_eq!(build(&blank, IncludedData::empty()).body, None);
        assert_eq!(build(&event("  "), IncludedData::TEMPLATE_BODY).body, None);
    }

    #[test]
    fn exception_skips_empty_message() {
        let event = event("failed").with_exception(ExceptionInfo::new("io::Error", "", "io::Error at main.rs:3"));
        let record = build(&event, IncludedData::empty());
        let keys: Vec<&str> = record.attributes.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, [EXCEPTION_TYPE, EXCEPTION_STACKTRACE]);
    }

    #[test]
    fn renderings_only_for_formatted_placeholders() {
        let policy = IncludedData::MESSAGE_TEMPLATE_RENDERINGS_ATTRIBUTE;

        let formatted = build(&event("Value: {Count:000}").with_property("Count", 7), policy);
        assert_eq!(
            formatted.attribute(MESSAGE_TEMPLATE_RENDERINGS),
            Some(&WireValue::Array(vec![WireValue::String("007".to_string())]))
        );

        let plain = build(&event("Value: {Count}").with_property("Count", 7), policy);
        assert_eq!(plain.attribute(MESSAGE_TEMPLATE_RENDERINGS), None);
    }

    #[test]
    fn md5_hash_is_hex_of_template_text() {
        let record = build(&event("hello"), IncludedData::MESSAGE_TEMPLATE_MD5_HASH_ATTRIBUTE);
        assert_eq!(
            record.attribute(MESSAGE_TEMPLATE_HASH_MD5).and_then(WireValue::as_str),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
    }

    #[test]
    fn trace_fields_follow_policy_and_correlation() {
        let correlator = TraceCorrelator::new();
        let correlation = TraceCorrelation::new(TraceId::from_bytes([1; 16]), SpanId::from_bytes([2; 8]));
        correlator.register(ScopeId(9), correlation);

        let scoped = event("x").with_scope(ScopeId(9));
        let trace_only = build_log_record(&scoped, &Locale::INVARIANT, IncludedData::TRACE_ID_FIELD, &correlator);
        assert_eq!(trace_only.trace_id, Some(correlation.trace_id));
        assert_eq!(trace_only.span_id, None);

        let unscoped = event("x");
        let both = IncludedData::TRACE_ID_FIELD | IncludedData::SPAN_ID_FIELD;
        let record = build_log_record(&unscoped, &Locale::INVARIANT, both, &correlator);
        assert_eq!((record.trace_id, record.span_id), (None, None));
    }

    #[test]
    fn pre_epoch_timestamps_clamp_to_zero() {
        let mut event = event("old");
        event.timestamp = Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 0).unwrap();
        assert_eq!(build(&event, IncludedData::empty()).time_unix_nano, 0);
    }
}
