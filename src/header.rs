//! Spectrum header metadata.
//!
//! The I/O layer hands over the FITS primary header as a flat key/value
//! mapping. Keys are stored upper-case, as FITS keywords are, so lookups are
//! case-insensitive. Values are kept as delivered; nothing here invents a
//! value for a missing keyword.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecFitError};

/// A single header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// Logical keyword (`SIMPLE = T`).
    Bool(bool),
    /// Numeric keyword. Integers are widened to `f64`.
    Float(f64),
    /// String keyword (`CTYPE1`, `BUNIT`, ...).
    Text(String),
}

impl HeaderValue {
    /// Numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Float(v as f64)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Text(v)
    }
}

/// Header keyword mapping of a loaded spectrum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, HeaderValue>",
    into = "BTreeMap<String, HeaderValue>"
)]
pub struct Header {
    cards: BTreeMap<String, HeaderValue>,
}

impl Header {
    /// Create an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header from a JSON object (`{"CRVAL1": 1.42e9, ...}`).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the header as a JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a keyword.
    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) {
        self.cards.insert(key.to_ascii_uppercase(), value.into());
    }

    /// Raw value of a keyword.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.get(&key.to_ascii_uppercase())
    }

    /// Numeric value of a keyword, `None` if absent or not numeric.
    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    /// String value of a keyword, `None` if absent or not a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    /// Numeric value of a keyword, failing with `InvalidHeader` when it is
    /// missing, not numeric or not finite.
    pub fn require_float(&self, key: &str) -> Result<f64> {
        match self.get(key) {
            None => Err(SpecFitError::InvalidHeader(format!(
                "missing keyword {}",
                key.to_ascii_uppercase()
            ))),
            Some(HeaderValue::Float(v)) if v.is_finite() => Ok(*v),
            Some(other) => Err(SpecFitError::InvalidHeader(format!(
                "keyword {} is not a finite number: {}",
                key.to_ascii_uppercase(),
                other
            ))),
        }
    }

    /// Numeric value of an axis keyword. The axis-suffixed form (`CRPIX1`)
    /// takes precedence over the bare form (`CRPIX`).
    pub fn axis_float(&self, key: &str, axis: usize) -> Result<f64> {
        let suffixed = format!("{}{}", key, axis);
        if self.get(&suffixed).is_some() {
            self.require_float(&suffixed)
        } else if self.get(key).is_some() {
            self.require_float(key)
        } else {
            Err(SpecFitError::InvalidHeader(format!(
                "missing keyword {} (or {})",
                suffixed.to_ascii_uppercase(),
                key.to_ascii_uppercase()
            )))
        }
    }

    /// Whether the keyword is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of keywords.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the header has no keywords.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over keywords in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<BTreeMap<String, HeaderValue>> for Header {
    fn from(map: BTreeMap<String, HeaderValue>) -> Self {
        let cards = map
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
        Self { cards }
    }
}

impl From<Header> for BTreeMap<String, HeaderValue> {
    fn from(header: Header) -> Self {
        header.cards
    }
}
