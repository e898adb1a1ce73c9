//! Message template parsing.
//!
//! Templates are plain text with named placeholders: `{Name}`, optionally
//! prefixed with `@` (capture structure) or `$` (capture as string), and
//! optionally followed by `,alignment` and `:format`. Doubled braces `{{` and
//! `}}` are literal braces. Anything that does not parse as a placeholder is
//! kept as text.

use std::sync::Arc;

/// How a placeholder asks for its value to be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    #[default]
    Default,
    /// `@`: keep the value's structure.
    Structure,
    /// `$`: render the value's plain string form.
    Stringify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left(usize),
    Right(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyToken {
    pub name: String,
    /// Source text of the placeholder, braces included.
    pub raw_text: String,
    pub capture: Capture,
    pub alignment: Option<Alignment>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Property(PropertyToken),
}

/// A parsed message template. Cloning is cheap; the tokens are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: Arc<str>,
    tokens: Arc<[Token]>,
}

impl MessageTemplate {
    pub fn parse(text: &str) -> Self {
        Self {
            text: Arc::from(text),
            tokens: parse_tokens(text).into(),
        }
    }

    /// The template exactly as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyToken> {
        self.tokens.iter().filter_map(|token| match token {
            Token::Property(p) => Some(p),
            Token::Text(_) => None,
        })
    }
}

impl From<&str> for MessageTemplate {
    fn from(text: &str) -> Self {
        MessageTemplate::parse(text)
    }
}

fn parse_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        match c {
            '{' if rest.starts_with("{{") => {
                literal.push('{');
                rest = &rest[2..];
            }
            '}' if rest.starts_with("}}") => {
                literal.push('}');
                rest = &rest[2..];
            }
            '{' => {
                let Some(end) = rest.find('}') else {
                    literal.push_str(rest);
                    break;
                };
                // A nested '{' means this brace opens nothing; keep it as text.
                if let Some(nested) = rest[1..end].find('{') {
                    literal.push_str(&rest[..=nested]);
                    rest = &rest[nested + 1..];
                    continue;
                }
                let raw = &rest[..=end];
                match parse_property(raw) {
                    Some(property) => {
                        if !literal.is_empty() {
                            tokens.push(Token::Text(std::mem::take(&mut literal)));
                        }
                        tokens.push(Token::Property(property));
                    }
                    None => literal.push_str(raw),
                }
                rest = &rest[end + 1..];
            }
            _ => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Text(literal));
    }
    tokens
}

/// Parse `{[@$]Name[,alignment][:format]}`.
fn parse_property(raw: &str) -> Option<PropertyToken> {
    let inner = &raw[1..raw.len() - 1];

    let (capture, inner) = match inner.as_bytes().first() {
        Some(b'@') => (Capture::Structure, &inner[1..]),
        Some(b'$') => (Capture::Stringify, &inner[1..]),
        _ => (Capture::Default, inner),
    };

    let (head, format) = match inner.find(':') {
        Some(i) => (&inner[..i], Some(&inner[i + 1..])),
        None => (inner, None),
    };
    let (name, alignment) = match head.find(',') {
        Some(i) => (&head[..i], Some(parse_alignment(&head[i + 1..])?)),
        None => (head, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    if matches!(format, Some("")) {
        return None;
    }

    Some(PropertyToken {
        name: name.to_string(),
        raw_text: raw.to_string(),
        capture,
        alignment,
        format: format.map(str::to_string),
    })
}

/// Widest padding a placeholder may request; larger widths are clamped.
pub const MAX_ALIGNMENT: usize = 1024;

fn parse_alignment(s: &str) -> Option<Alignment> {
    let (left, digits) = match s.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Digits only, so a parse error means overflow.
    let width = digits.parse::<usize>().map_or(MAX_ALIGNMENT, |w| w.min(MAX_ALIGNMENT));
    Some(if left { Alignment::Left(width) } else { Alignment::Right(width) })
}
