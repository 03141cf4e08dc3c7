//! Join specification schema.
//!
//! The serialized shape follows the touch-panel convention:
//!
//! ```yaml
//! { type: boolean, join: { start: 10, end: 13 }, offset: { boolean: 100 }, key: Sources }
//! ```

use serde::{Deserialize, Serialize};

use jw_core::{SignalKind, SignalValue};

/// One element of a join target: a join number (offset applies) or a named
/// address such as a contract or reserved join (never offset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinAtom {
    Number(i64),
    Text(String),
}

impl From<i64> for JoinAtom {
    fn from(join: i64) -> Self {
        Self::Number(join)
    }
}

impl From<&str> for JoinAtom {
    fn from(name: &str) -> Self {
        Self::Text(name.to_string())
    }
}

/// Which join(s) a spec addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinTarget {
    /// One address.
    Single(JoinAtom),
    /// Ordered addresses; values published to the binding follow this order.
    List(Vec<JoinAtom>),
    /// Inclusive run of join numbers.
    Range { start: i64, end: i64 },
}

impl JoinTarget {
    /// True for list and range targets, whose bindings carry a value per address.
    pub fn is_multi(&self) -> bool {
        !matches!(self, JoinTarget::Single(_))
    }
}

/// Per-kind offsets. A kind without an entry is not offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKindOffset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<i64>,
}

impl PerKindOffset {
    pub fn get(&self, kind: SignalKind) -> Option<i64> {
        match kind {
            SignalKind::Boolean => self.boolean,
            SignalKind::Number => self.number,
            SignalKind::String => self.string,
        }
    }
}

/// Amount added to every numeric join of a spec. Used to compose the same
/// spec at several places in a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offset {
    Uniform(i64),
    PerKind(PerKindOffset),
}

/// Informational direction of a join, relative to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    Bidirectional,
}

/// Timing modifiers applied by the binding layer around each publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effects {
    /// Coalesce rapid publishes; only the last one is sent after this quiet period.
    #[serde(default, alias = "debounce", skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    /// After each publish, send the kind's default value once this delay elapses.
    #[serde(
        default,
        alias = "resetAfterMs",
        skip_serializing_if = "Option::is_none"
    )]
    pub reset_after_ms: Option<u64>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.debounce_ms.is_none() && self.reset_after_ms.is_none()
    }
}

/// Mock-only settings carried on a spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockSeed {
    /// Seeds every resolved address when the binding is created against a mock.
    #[serde(default, alias = "initialValue", skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<SignalValue>,
}

/// Declarative description of one or more joins of a single kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSpec {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(rename = "join")]
    pub target: JoinTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    /// Label used in logs and listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<Direction>,
    /// Log every value sent or received through bindings of this spec.
    #[serde(default, skip_serializing_if = "is_false")]
    pub log: bool,
    #[serde(default, skip_serializing_if = "Effects::is_empty")]
    pub effects: Effects,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock: Option<MockSeed>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl JoinSpec {
    /// Create a spec with no offset or metadata.
    pub fn new(kind: SignalKind, target: JoinTarget) -> Self {
        Self {
            kind,
            target,
            offset: None,
            key: None,
            dir: None,
            log: false,
            effects: Effects::default(),
            mock: None,
        }
    }

    /// Spec for one join number.
    pub fn single(kind: SignalKind, join: i64) -> Self {
        Self::new(kind, JoinTarget::Single(JoinAtom::Number(join)))
    }

    /// Spec for one named address.
    pub fn named(kind: SignalKind, name: impl Into<String>) -> Self {
        Self::new(kind, JoinTarget::Single(JoinAtom::Text(name.into())))
    }

    /// Spec for an ordered list of joins.
    pub fn list(kind: SignalKind, joins: impl IntoIterator<Item = JoinAtom>) -> Self {
        Self::new(kind, JoinTarget::List(joins.into_iter().collect()))
    }

    /// Spec for an inclusive range of join numbers.
    pub fn range(kind: SignalKind, start: i64, end: i64) -> Self {
        Self::new(kind, JoinTarget::Range { start, end })
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn with_debounce(mut self, ms: u64) -> Self {
        self.effects.debounce_ms = Some(ms);
        self
    }

    pub fn with_reset_after(mut self, ms: u64) -> Self {
        self.effects.reset_after_ms = Some(ms);
        self
    }

    pub fn with_initial_value(mut self, value: impl Into<SignalValue>) -> Self {
        self.mock = Some(MockSeed {
            initial_value: Some(value.into()),
        });
        self
    }

    pub fn is_multi(&self) -> bool {
        self.target.is_multi()
    }

    pub fn initial_value(&self) -> Option<&SignalValue> {
        self.mock.as_ref().and_then(|m| m.initial_value.as_ref())
    }
}
