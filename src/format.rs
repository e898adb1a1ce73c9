//! Locale-aware formatting of scalar property values.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};
use num_format::Buffer;
use std::fmt::Write;
use std::str::FromStr;

use crate::event::PropertyValue;

/// Number formatting conventions used when rendering messages, backed by
/// the CLDR data of [`num_format::Locale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    format: num_format::Locale,
}

impl Locale {
    /// Culture-independent formatting; the output never depends on the host.
    pub const INVARIANT: Locale = Locale::new(num_format::Locale::en);

    pub const fn new(format: num_format::Locale) -> Self {
        Self { format }
    }

    pub fn decimal_separator(&self) -> &'static str {
        self.format.decimal()
    }

    pub fn group_separator(&self) -> &'static str {
        self.format.separator()
    }

    /// CLDR name of the underlying locale, e.g. `de` or `en`.
    pub fn name(&self) -> &'static str {
        self.format.name()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::INVARIANT
    }
}

impl From<num_format::Locale> for Locale {
    fn from(format: num_format::Locale) -> Self {
        Locale::new(format)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown locale: {0}")]
pub struct LocaleParseError(pub String);

impl FromStr for Locale {
    type Err = LocaleParseError;

    /// Accepts BCP 47 style tags in any case, with `-` or `_`: `sv-SE`,
    /// `pt_BR`, `de-CH`. A region CLDR has no separate data for falls back to
    /// its language. `invariant` and the empty string give
    /// [`Locale::INVARIANT`].
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let trimmed = tag.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("invariant") {
            return Ok(Locale::INVARIANT);
        }

        let name = cldr_name(trimmed);
        let language = name.split('-').next().unwrap_or_default();
        num_format::Locale::from_name(&name)
            .or_else(|_| num_format::Locale::from_name(language))
            .map(Locale::new)
            .map_err(|_| LocaleParseError(tag.to_string()))
    }
}

/// `pt_br` -> `pt-BR`, `sr-latn` -> `sr-Latn`.
fn cldr_name(tag: &str) -> String {
    tag.split(['-', '_'])
        .enumerate()
        .map(|(i, part)| match (i, part.len()) {
            (0, _) => part.to_ascii_lowercase(),
            (_, 4) => {
                let lower = part.to_ascii_lowercase();
                let mut chars = lower.chars();
                chars
                    .next()
                    .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                    .unwrap_or_default()
            }
            _ => part.to_ascii_uppercase(),
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Apply a display format to a scalar. Returns `None` when the format does
/// not apply to the value, in which case the caller falls back to the
/// default rendering.
pub fn apply_format(value: &PropertyValue, format: &str, locale: &Locale) -> Option<String> {
    match value {
        PropertyValue::Timestamp(ts) => format_timestamp(ts, format),
        PropertyValue::Str(s) => Some(s.clone()),
        _ => Numeric::of(value).and_then(|n| format_number(n, format, locale)),
    }
}

/// Default text of a scalar: numbers use the locale's decimal separator,
/// strings are unquoted.
pub fn scalar_text(value: &PropertyValue, locale: &Locale) -> String {
    match value {
        PropertyValue::Null => "null".to_string(),
        PropertyValue::Bool(b) => b.to_string(),
        PropertyValue::I64(i) => i.to_string(),
        PropertyValue::U64(u) => u.to_string(),
        PropertyValue::I128(i) => i.to_string(),
        PropertyValue::U128(u) => u.to_string(),
        PropertyValue::F64(f) => localize(&f.to_string(), locale),
        PropertyValue::Str(s) => s.clone(),
        PropertyValue::Bytes(b) => hex::encode(b),
        PropertyValue::Timestamp(ts) => rfc3339(ts),
        PropertyValue::Display(d) => d.to_string(),
        PropertyValue::Sequence(_)
        | PropertyValue::Dictionary(_)
        | PropertyValue::Structure { .. } => String::new(),
    }
}

pub(crate) fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn format_timestamp(ts: &DateTime<Utc>, format: &str) -> Option<String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", ts.format(format)).ok()?;
    Some(out)
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn of(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::I64(i) => Some(Numeric::Int(i128::from(*i))),
            PropertyValue::U64(u) => Some(Numeric::Int(i128::from(*u))),
            PropertyValue::I128(i) => Some(Numeric::Int(*i)),
            PropertyValue::U128(u) => i128::try_from(*u).ok().map(Numeric::Int),
            PropertyValue::F64(f) if f.is_finite() => Some(Numeric::Float(*f)),
            _ => None,
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Numeric::Int(i) => i < 0,
            Numeric::Float(f) => f < 0.0,
        }
    }

    /// Absolute value as `(integer digits, fraction digits)` rounded to
    /// `decimals` places. Ties round away from zero (`0.125` -> `0.13`)
    /// while the scaled value is exact in an `f64`; beyond that the
    /// formatter's round-half-to-even applies.
    fn digits(self, decimals: usize) -> (String, String) {
        match self {
            Numeric::Int(i) => (i.unsigned_abs().to_string(), "0".repeat(decimals)),
            Numeric::Float(f) => {
                let fixed = format!("{:.*}", decimals, round_half_away(f.abs(), decimals));
                match fixed.split_once('.') {
                    Some((int, frac)) => (int.to_string(), frac.to_string()),
                    None => (fixed, String::new()),
                }
            }
        }
    }
}

/// Largest integer below which every `f64` integer is exact.
const EXACT_F64_LIMIT: f64 = 9_007_199_254_740_992.0;

fn round_half_away(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let scaled = value * scale;
    if scaled.is_finite() && scaled < EXACT_F64_LIMIT {
        scaled.round() / scale
    } else {
        value
    }
}

const MAX_PRECISION: usize = 64;

fn format_number(n: Numeric, format: &str, locale: &Locale) -> Option<String> {
    let mut chars = format.chars();
    let spec = chars.next()?;
    let precision = chars.as_str();
    let standard = precision.is_empty() || precision.bytes().all(|b| b.is_ascii_digit());

    if standard && spec.is_ascii_alphabetic() {
        let precision = if precision.is_empty() {
            None
        } else {
            // Digits only, so a parse error means overflow.
            Some(precision.parse::<usize>().map_or(MAX_PRECISION, |p| p.min(MAX_PRECISION)))
        };
        return match spec.to_ascii_uppercase() {
            'D' => match n {
                Numeric::Int(i) => {
                    let digits = format!("{:0width$}", i.unsigned_abs(), width = precision.unwrap_or(0));
                    Some(signed(i < 0, digits))
                }
                Numeric::Float(_) => None,
            },
            'F' => Some(fixed(n, precision.unwrap_or(2), false, locale)),
            'N' => Some(fixed(n, precision.unwrap_or(2), true, locale)),
            'P' => {
                let scaled = match n {
                    Numeric::Int(i) => Numeric::Float(i as f64 * 100.0),
                    Numeric::Float(f) => Numeric::Float(f * 100.0),
                };
                Some(format!("{} %", fixed(scaled, precision.unwrap_or(2), true, locale)))
            }
            'X' => match n {
                Numeric::Int(i) if i >= 0 => {
                    let width = precision.unwrap_or(0);
                    Some(if spec == 'X' {
                        format!("{:0width$X}", i, width = width)
                    } else {
                        format!("{:0width$x}", i, width = width)
                    })
                }
                _ => None,
            },
            _ => None,
        };
    }

    custom_pattern(n, format, locale)
}

fn fixed(n: Numeric, decimals: usize, grouped: bool, locale: &Locale) -> String {
    let (int, frac) = n.digits(decimals);
    let int = if grouped { group(&int, locale) } else { int };
    let mut out = int;
    if decimals > 0 {
        out.push_str(locale.decimal_separator());
        out.push_str(&frac);
    }
    signed(n.is_negative() && !is_zero(&out), out)
}

/// Custom patterns such as `000`, `#,##0.00` or `0.0#`. Characters before
/// the first and after the last pattern character are copied verbatim.
fn custom_pattern(n: Numeric, format: &str, locale: &Locale) -> Option<String> {
    let is_pattern = |c: char| matches!(c, '0' | '#' | '.' | ',');
    let start = format.find(is_pattern)?;
    let end = format.rfind(is_pattern)? + 1;
    let (prefix, pattern, suffix) = (&format[..start], &format[start..end], &format[end..]);

    let (int_pattern, frac_pattern) = match pattern.split_once('.') {
        Some((i, f)) => (i, f),
        None => (pattern, ""),
    };
    if !int_pattern.chars().all(|c| matches!(c, '0' | '#' | ','))
        || !frac_pattern.chars().all(|c| matches!(c, '0' | '#'))
    {
        return None;
    }

    let min_int = int_pattern.chars().filter(|c| *c == '0').count();
    let min_frac = frac_pattern.chars().filter(|c| *c == '0').count();
    let max_frac = frac_pattern.len();
    let grouped = int_pattern.contains(',');

    let (mut int, mut frac) = n.digits(max_frac);
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }
    if int == "0" && min_int == 0 {
        int.clear();
    }
    if int.len() < min_int {
        int = format!("{}{}", "0".repeat(min_int - int.len()), int);
    }
    if grouped {
        int = group(&int, locale);
    }

    let mut number = int;
    if !frac.is_empty() {
        number.push_str(locale.decimal_separator());
        number.push_str(&frac);
    }
    let number = signed(n.is_negative() && !is_zero(&number), number);
    Some(format!("{}{}{}", prefix, number, suffix))
}

/// Insert the locale's group separators into a run of integer digits,
/// following its grouping style. Runs of more than 38 digits are left
/// ungrouped.
fn group(digits: &str, locale: &Locale) -> String {
    // The leading 1 carries zero padding through the numeric formatter.
    let Ok(n) = format!("1{}", digits).parse::<u128>() else {
        return digits.to_string();
    };
    let mut buf = Buffer::new();
    buf.write_formatted(&n, &locale.format);
    let grouped = &buf.as_str()[1..];
    grouped
        .strip_prefix(locale.group_separator())
        .unwrap_or(grouped)
        .to_string()
}

fn signed(negative: bool, digits: String) -> String {
    if negative {
        format!("-{}", digits)
    } else {
        digits
    }
}

fn is_zero(digits: &str) -> bool {
    !digits.chars().any(|c| c.is_ascii_digit() && c != '0')
}

fn localize(number: &str, locale: &Locale) -> String {
    match locale.decimal_separator() {
        "." => number.to_string(),
        decimal => number.replace('.', decimal),
    }
}
