//! Label-vector identity.
//!
//! A label vector is encoded into a [`LabelKey`] by length-prefixing each
//! sanitized value (`<byte length>:<value>`). Length prefixes make the encoding
//! injective for any value content, including `:` and digits, so two different
//! vectors can never share a store entry.

use std::fmt;

use crate::utils::errors::{MetricError, Result};

/// Encoded label vector, used as the store key for one series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LabelKey(String);

impl LabelKey {
    /// The key for a metric without labels.
    pub fn empty() -> Self {
        LabelKey(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unicode `General_Category=Cf` (format) ranges: invisible characters such as
/// zero-width spaces, bidi controls and the byte order mark.
const FORMAT_CHAR_RANGES: &[(char, char)] = &[
    ('\u{00AD}', '\u{00AD}'),
    ('\u{0600}', '\u{0605}'),
    ('\u{061C}', '\u{061C}'),
    ('\u{06DD}', '\u{06DD}'),
    ('\u{070F}', '\u{070F}'),
    ('\u{0890}', '\u{0891}'),
    ('\u{08E2}', '\u{08E2}'),
    ('\u{180E}', '\u{180E}'),
    ('\u{200B}', '\u{200F}'),
    ('\u{202A}', '\u{202E}'),
    ('\u{2060}', '\u{2064}'),
    ('\u{2066}', '\u{206F}'),
    ('\u{FEFF}', '\u{FEFF}'),
    ('\u{FFF9}', '\u{FFFB}'),
    ('\u{110BD}', '\u{110BD}'),
    ('\u{110CD}', '\u{110CD}'),
    ('\u{13430}', '\u{1343F}'),
    ('\u{1BCA0}', '\u{1BCA3}'),
    ('\u{1D173}', '\u{1D17A}'),
    ('\u{E0001}', '\u{E0001}'),
    ('\u{E0020}', '\u{E007F}'),
];

fn is_format_char(c: char) -> bool {
    FORMAT_CHAR_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&c))
}

/// Strips non-printable characters (control and format) from a label value.
pub fn sanitize_label_value(value: &str) -> String {
    value
        .chars()
        .filter(|&c| !c.is_control() && !is_format_char(c))
        .collect()
}

/// Encodes a label vector, sanitizing every value first.
pub fn encode<S: AsRef<str>>(label_values: &[S]) -> LabelKey {
    let mut key = String::new();
    for value in label_values {
        let sanitized = sanitize_label_value(value.as_ref());
        key.push_str(&sanitized.len().to_string());
        key.push(':');
        key.push_str(&sanitized);
    }
    LabelKey(key)
}

/// Decodes a key back into `arity` label values.
///
/// `metric` is only used to give context to the error.
pub fn decode(metric: &str, key: &LabelKey, arity: usize) -> Result<Vec<String>> {
    let corrupt = |reason: &'static str| MetricError::CorruptLabelKey {
        metric: metric.to_string(),
        reason,
    };

    let mut values = Vec::with_capacity(arity);
    let mut rest = key.as_str();

    while !rest.is_empty() {
        let colon = rest.find(':').ok_or_else(|| corrupt("missing length separator"))?;
        let len: usize = rest[..colon]
            .parse()
            .map_err(|_| corrupt("length prefix is not a number"))?;
        let body = &rest[colon + 1..];
        if body.len() < len || !body.is_char_boundary(len) {
            return Err(corrupt("length prefix exceeds key"));
        }
        values.push(body[..len].to_string());
        rest = &body[len..];
    }

    if values.len() != arity {
        return Err(corrupt("value count does not match label arity"));
    }
    Ok(values)
}
