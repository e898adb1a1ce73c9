//! Rendering of message templates against their bound properties.

use indexmap::IndexMap;
use std::fmt::Write;

use crate::event::PropertyValue;
use crate::format::{self, Locale};
use crate::template::{Alignment, Capture, MessageTemplate, PropertyToken, Token};

/// Render the full message. Placeholders whose property is not bound are
/// kept as written.
pub fn render_message(
    template: &MessageTemplate,
    properties: &IndexMap<String, PropertyValue>,
    locale: &Locale,
) -> String {
    let mut out = String::with_capacity(template.text().len());
    for token in template.tokens() {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Property(property) => out.push_str(&render_token(property, properties, locale)),
        }
    }
    out
}

/// Render a single placeholder on its own.
pub fn render_token(
    token: &PropertyToken,
    properties: &IndexMap<String, PropertyValue>,
    locale: &Locale,
) -> String {
    let Some(value) = properties.get(&token.name) else {
        return token.raw_text.clone();
    };

    // Structural captures render the value's literal form and stringified
    // ones its plain text; display formats only apply to default captures of
    // scalars.
    let text = match (token.capture, token.format.as_deref()) {
        (Capture::Structure, _) => render_value(value, locale),
        (Capture::Stringify, _) => render_plain(value, locale),
        (_, Some(format)) if value.is_scalar() => {
            format::apply_format(value, format, locale).unwrap_or_else(|| format::scalar_text(value, locale))
        }
        _ => render_value(value, locale),
    };

    match token.alignment {
        Some(alignment) => align(text, alignment),
        None => text,
    }
}

/// Structural text of any value: `[1, "a"]`, `{"k": 1}`, `Tag { a: 1 }`.
/// Strings nested inside composites are quoted; a top-level scalar is not.
pub fn render_value(value: &PropertyValue, locale: &Locale) -> String {
    let mut out = String::new();
    write_value(&mut out, value, locale, true, false);
    out
}

/// Plain text of any value, as for `{$Name}`: like [`render_value`] but
/// strings are never quoted, at any depth.
pub fn render_plain(value: &PropertyValue, locale: &Locale) -> String {
    let mut out = String::new();
    write_value(&mut out, value, locale, false, false);
    out
}

fn write_value(out: &mut String, value: &PropertyValue, locale: &Locale, quoted: bool, nested: bool) {
    match value {
        PropertyValue::Str(s) if quoted && nested => {
            let _ = write!(out, "{:?}", s);
        }
        PropertyValue::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, locale, quoted, true);
            }
            out.push(']');
        }
        PropertyValue::Dictionary(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, key, locale, quoted, true);
                out.push_str(": ");
                write_value(out, value, locale, quoted, true);
            }
            out.push('}');
        }
        PropertyValue::Structure { type_tag, fields } => {
            if let Some(tag) = type_tag {
                out.push_str(tag);
                out.push(' ');
            }
            if fields.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (i, (name, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(": ");
                write_value(out, value, locale, quoted, true);
            }
            out.push_str(" }");
        }
        scalar => out.push_str(&format::scalar_text(scalar, locale)),
    }
}

fn align(text: String, alignment: Alignment) -> String {
    let (width, left) = match alignment {
        Alignment::Left(w) => (w, true),
        Alignment::Right(w) => (w, false),
    };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let pad = " ".repeat(width - len);
    if left {
        text + &pad
    } else {
        pad + &text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: Vec<(&str, PropertyValue)>) -> IndexMap<String, PropertyValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn render(template: &str, properties: &IndexMap<String, PropertyValue>) -> String {
        render_message(&MessageTemplate::parse(template), properties, &Locale::INVARIANT)
    }

    #[test]
    fn substitutes_properties_without_quoting_strings() {
        let properties = props(vec![("User", "alice".into()), ("Count", 3.into())]);
        assert_eq!(render("{User} has {Count} items", &properties), "alice has 3 items");
    }

    #[test]
    fn missing_properties_keep_source_text() {
        let properties = props(vec![("A", 1.into())]);
        assert_eq!(render("{A} and {B,5:000}", &properties), "1 and {B,5:000}");
    }

    #[test]
    fn applies_formats_and_alignment() {
        let properties = props(vec![("Count", 7.into()), ("Name", "ab".into())]);
        assert_eq!(render("Value: {Count:000}", &properties), "Value: 007");
        assert_eq!(render("[{Name,4}] [{Name,-4}]", &properties), "[  ab] [ab  ]");
    }

    #[test]
    fn formats_use_supplied_locale() {
        let properties = props(vec![("Price", 1234.5.into())]);
        let template = MessageTemplate::parse("{Price:N2} / {Price}");
        assert_eq!(render_message(&template, &properties, &Locale::new(num_format::Locale::de)), "1.234,50 / 1234,5");
    }

    #[test]
    fn composites_render_structurally() {
        let properties = props(vec![
            ("Tags", PropertyValue::Sequence(vec!["a".into(), 2.into()])),
            ("Order", PropertyValue::structure(Some("Order"), vec![("id", 1.into()), ("sku", "X".into())])),
            ("Map", PropertyValue::dictionary(vec![("k", PropertyValue::from(true))])),
        ]);
        assert_eq!(
            render("{Tags} {@Order} {Map}", &properties),
            "[\"a\", 2] Order { id: 1, sku: \"X\" } {\"k\": true}"
        );
    }

    #[test]
    fn stringify_capture_renders_plain_text() {
        let properties = props(vec![
            ("Tags", PropertyValue::Sequence(vec!["a".into(), 2.into()])),
            ("Order", PropertyValue::structure(Some("Order"), vec![("sku", "X".into())])),
            ("Count", 7.into()),
        ]);
        assert_eq!(render("{$Tags} / {Tags}", &properties), "[a, 2] / [\"a\", 2]");
        assert_eq!(render("{$Order}", &properties), "Order { sku: X }");
        assert_eq!(render("{$Count:000} {Count:000}", &properties), "7 007");
        assert_eq!(render("[{$Count,3}]", &properties), "[  7]");
    }

    #[test]
    fn structural_capture_ignores_format() {
        let properties = props(vec![("Count", 7.into())]);
        assert_eq!(render("{@Count:000} {Count:000}", &properties), "7 007");
    }

    #[test]
    fn renders_single_token() {
        let template = MessageTemplate::parse("Took {Elapsed:0.0} ms");
        let token = template.properties().next().unwrap();
        let properties = props(vec![("Elapsed", 12.345.into())]);
        assert_eq!(render_token(token, &properties, &Locale::INVARIANT), "12.3");
    }
}
