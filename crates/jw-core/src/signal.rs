//! Signal kinds, values and addresses.
//!
//! A join is addressed by `(kind, address)`: the same address string may
//! name a boolean, a number and a string join at the same time without
//! the three ever colliding.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, CoreResult};

/// The three scalar join kinds a control processor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Digital join.
    Boolean,
    /// Analog join.
    Number,
    /// Serial join.
    String,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Boolean, SignalKind::Number, SignalKind::String];

    /// The "falsy" value a join of this kind holds before anything is written.
    pub fn default_value(self) -> SignalValue {
        match self {
            SignalKind::Boolean => SignalValue::Boolean(false),
            SignalKind::Number => SignalValue::Number(0.0),
            SignalKind::String => SignalValue::String(String::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Boolean => "boolean",
            SignalKind::Number => "number",
            SignalKind::String => "string",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" | "digital" => Ok(SignalKind::Boolean),
            "number" | "analog" => Ok(SignalKind::Number),
            "string" | "serial" => Ok(SignalKind::String),
            _ => Err(CoreError::UnknownKind {
                name: s.to_string(),
            }),
        }
    }
}

/// Current value of one join.
///
/// Serialized untagged, so project files write plain `true`, `42` or
/// `"text"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl SignalValue {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalValue::Boolean(_) => SignalKind::Boolean,
            SignalValue::Number(_) => SignalKind::Number,
            SignalValue::String(_) => SignalKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SignalValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SignalValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// True if this is the default value for its kind.
    pub fn is_default(&self) -> bool {
        *self == self.kind().default_value()
    }

    /// Check that this value belongs to `expected`.
    pub fn expect_kind(&self, expected: SignalKind) -> CoreResult<()> {
        let actual = self.kind();
        if actual == expected {
            Ok(())
        } else {
            Err(CoreError::KindMismatch { expected, actual })
        }
    }

    /// Parse text typed by a person (CLI arguments, scripts) as a value of `kind`.
    ///
    /// Booleans accept `true/false`, `1/0`, `on/off` and `high/low`. Strings
    /// are taken verbatim.
    pub fn parse(kind: SignalKind, input: &str) -> CoreResult<Self> {
        let err = || CoreError::ParseValue {
            kind,
            input: input.to_string(),
        };
        match kind {
            SignalKind::Boolean => match input.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "high" => Ok(SignalValue::Boolean(true)),
                "false" | "0" | "off" | "low" => Ok(SignalValue::Boolean(false)),
                _ => Err(err()),
            },
            SignalKind::Number => input
                .trim()
                .parse::<f64>()
                .map(SignalValue::Number)
                .map_err(|_| err()),
            SignalKind::String => Ok(SignalValue::String(input.to_string())),
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Boolean(b) => write!(f, "{}", b),
            SignalValue::Number(n) => {
                // Analog joins are integral on the wire; print them that way.
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            SignalValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SignalValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for SignalValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SignalValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i64> for SignalValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<String> for SignalValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for SignalValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// String key identifying one join within a kind's namespace.
///
/// Deserializes from a string or an integer, so `address: 5` and
/// `address: "5"` name the same join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.into(),
            Raw::Text(s) => s.into(),
        })
    }
}

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl From<&String> for Address {
    fn from(address: &String) -> Self {
        Self(address.clone())
    }
}

impl From<&Address> for Address {
    fn from(address: &Address) -> Self {
        address.clone()
    }
}

impl From<i64> for Address {
    fn from(join: i64) -> Self {
        Self(join.to_string())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fully qualified join: kind plus address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SignalKey {
    pub kind: SignalKind,
    pub address: Address,
}

impl SignalKey {
    pub fn new(kind: SignalKind, address: impl Into<Address>) -> Self {
        Self {
            kind,
            address: address.into(),
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.address)
    }
}
