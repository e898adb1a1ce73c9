use std::fmt;
use std::str::FromStr;

bitflags::bitflags! {
    /// Optional parts of a [`WireLogRecord`](crate::record::WireLogRecord)
    /// the builder includes. Chosen once per sink and shared by every event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IncludedData: u32 {
        /// Use the template text as the body instead of the rendered message.
        const TEMPLATE_BODY = 1 << 0;
        const TRACE_ID_FIELD = 1 << 1;
        const SPAN_ID_FIELD = 1 << 2;
        /// `message_template.text` attribute.
        const MESSAGE_TEMPLATE_TEXT_ATTRIBUTE = 1 << 3;
        /// `message_template.hash.md5` attribute.
        const MESSAGE_TEMPLATE_MD5_HASH_ATTRIBUTE = 1 << 4;
        /// `message_template.renderings` attribute, for placeholders that
        /// carry a display format.
        const MESSAGE_TEMPLATE_RENDERINGS_ATTRIBUTE = 1 << 5;
    }
}

const NAMES: [(&str, IncludedData); 6] = [
    ("TemplateBody", IncludedData::TEMPLATE_BODY),
    ("TraceIdField", IncludedData::TRACE_ID_FIELD),
    ("SpanIdField", IncludedData::SPAN_ID_FIELD),
    ("MessageTemplateTextAttribute", IncludedData::MESSAGE_TEMPLATE_TEXT_ATTRIBUTE),
    ("MessageTemplateMD5HashAttribute", IncludedData::MESSAGE_TEMPLATE_MD5_HASH_ATTRIBUTE),
    ("MessageTemplateRenderingsAttribute", IncludedData::MESSAGE_TEMPLATE_RENDERINGS_ATTRIBUTE),
];

impl Default for IncludedData {
    fn default() -> Self {
        IncludedData::TRACE_ID_FIELD
            | IncludedData::SPAN_ID_FIELD
            | IncludedData::MESSAGE_TEMPLATE_TEXT_ATTRIBUTE
    }
}

/// Error returned when parsing an [`IncludedData`] list.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown included data flag: {0}")]
pub struct PolicyParseError(pub String);

impl FromStr for IncludedData {
    type Err = PolicyParseError;

    /// Parse flag names separated by `,` or `|`, e.g.
    /// `"TraceIdField | SpanIdField"`. `None` and the empty string yield no
    /// flags. Names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = IncludedData::empty();
        for name in s.split([',', '|']).map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("none") {
                continue;
            }
            let flag = NAMES
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(name))
                .map(|(_, flag)| *flag)
                .ok_or_else(|| PolicyParseError(name.to_string()))?;
            flags |= flag;
        }
        Ok(flags)
    }
}

impl fmt::Display for IncludedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = NAMES.iter().filter(|(_, flag)| self.contains(*flag)).map(|(n, _)| *n);
        match names.next() {
            None => f.write_str("None"),
            Some(first) => {
                f.write_str(first)?;
                for name in names {
                    write!(f, " | {}", name)?;
                }
                Ok(())
            }
        }
    }
}
