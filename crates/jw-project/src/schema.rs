//! Project schema definitions.

use serde::{Deserialize, Serialize};

use jw_core::{Address, SignalKey, SignalKind, SignalValue};
use jw_joins::{JoinError, JoinMap};
use jw_mock::{BusConfig, LogicBlock};

use crate::validate::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub joins: JoinMap,
    #[serde(default)]
    pub mocks: Vec<MockDef>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    #[serde(default)]
    pub script: Vec<StepDef>,
}

/// Names a join either through the join map or directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TargetRef {
    /// Dotted join-map path, e.g. `Audio.Control.Level` or `Sources[2]`.
    Path { path: String },
    Address { kind: SignalKind, address: Address },
}

impl TargetRef {
    pub fn path(path: impl Into<String>) -> Self {
        TargetRef::Path { path: path.into() }
    }

    pub fn address(kind: SignalKind, address: impl Into<Address>) -> Self {
        TargetRef::Address {
            kind,
            address: address.into(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            TargetRef::Path { path } => path.clone(),
            TargetRef::Address { kind, address } => format!("{kind}:{address}"),
        }
    }

    /// Every join this target covers, in resolution order.
    pub fn keys(&self, joins: &JoinMap) -> Result<Vec<SignalKey>, ValidationError> {
        match self {
            TargetRef::Address { kind, address } => Ok(vec![SignalKey::new(*kind, address)]),
            TargetRef::Path { path } => {
                let located = joins.lookup(path).map_err(|e| join_error(path, e))?;
                let kind = located.kind();
                let addresses = located.addresses().map_err(|e| join_error(path, e))?;
                Ok(addresses
                    .into_iter()
                    .map(|address| SignalKey::new(kind, address))
                    .collect())
            }
        }
    }

    /// The single join this target names.
    pub fn key(&self, joins: &JoinMap) -> Result<SignalKey, ValidationError> {
        let mut keys = self.keys(joins)?;
        if keys.len() != 1 {
            return Err(ValidationError::InvalidValue {
                field: self.label(),
                value: format!("{} joins", keys.len()),
                reason: "target must name exactly one join".to_string(),
            });
        }
        Ok(keys.remove(0))
    }
}

fn join_error(path: &str, err: JoinError) -> ValidationError {
    match err {
        JoinError::PathNotFound { .. } => ValidationError::MissingReference {
            id: path.to_string(),
            context: "join map".to_string(),
        },
        other => ValidationError::InvalidJoin {
            path: path.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Mock behavior for one target: a logic block, an initial value, or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MockDef {
    pub target: TargetRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<LogicBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<SignalValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleDef {
    pub trigger: TriggerDef,
    #[serde(default)]
    pub effects: Vec<EffectDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerDef {
    #[serde(flatten)]
    pub target: TargetRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SignalValue>,
    #[serde(default)]
    pub when: Condition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectDef {
    #[serde(flatten)]
    pub target: TargetRef,
    pub compute: Compute,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    Equals(SignalValue),
    NotEquals(SignalValue),
}

impl Condition {
    pub fn holds(&self, value: &SignalValue) -> bool {
        match self {
            Condition::Always => true,
            Condition::Equals(expected) => value == expected,
            Condition::NotEquals(expected) => value != expected,
        }
    }

    /// Value the condition compares against, if any.
    pub fn operand(&self) -> Option<&SignalValue> {
        match self {
            Condition::Always => None,
            Condition::Equals(v) | Condition::NotEquals(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Compute {
    /// Store a constant.
    Set(SignalValue),
    /// Add to the current number.
    Add(f64),
    /// Flip the current boolean.
    Invert,
    /// Store the trigger's value.
    CopyTrigger,
}

impl Compute {
    pub fn apply(&self, trigger: &SignalValue, current: &SignalValue) -> SignalValue {
        match self {
            Compute::Set(v) => v.clone(),
            Compute::Add(delta) => {
                SignalValue::Number(current.as_number().unwrap_or_default() + delta)
            }
            Compute::Invert => SignalValue::Boolean(!current.as_bool().unwrap_or_default()),
            Compute::CopyTrigger => trigger.clone(),
        }
    }

    /// Kind of join this computation can target, given the trigger kind.
    pub fn required_kind(&self, trigger: SignalKind) -> Option<SignalKind> {
        match self {
            Compute::Set(v) => Some(v.kind()),
            Compute::Add(_) => Some(SignalKind::Number),
            Compute::Invert => Some(SignalKind::Boolean),
            Compute::CopyTrigger => Some(trigger),
        }
    }
}

/// One step of a publish script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepDef {
    Publish(TargetValue),
    AdvanceMs(u64),
    Expect(TargetValue),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetValue {
    #[serde(flatten)]
    pub target: TargetRef,
    pub value: SignalValue,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: "Untitled".to_string(),
            bus: BusConfig::default(),
            joins: JoinMap::default(),
            mocks: Vec::new(),
            rules: Vec::new(),
            script: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_and_condition() {
        let t = SignalValue::Boolean(true);
        assert!(Condition::Always.holds(&t));
        assert!(Condition::Equals(true.into()).holds(&t));
        assert!(!Condition::NotEquals(true.into()).holds(&t));

        assert_eq!(
            Compute::Add(2.5).apply(&t, &SignalValue::Number(1.0)),
            SignalValue::Number(3.5)
        );
        assert_eq!(
            Compute::Invert.apply(&t, &SignalValue::Boolean(true)),
            SignalValue::Boolean(false)
        );
        assert_eq!(Compute::CopyTrigger.apply(&t, &SignalValue::Boolean(false)), t);
    }

    #[test]
    fn targets_parse_either_form() {
        let by_path: TargetRef = serde_yaml::from_str("path: Audio.Level").unwrap();
        assert_eq!(by_path, TargetRef::path("Audio.Level"));

        let direct: TargetRef = serde_yaml::from_str("kind: number\naddress: 5").unwrap();
        assert_eq!(direct, TargetRef::address(SignalKind::Number, "5"));
    }

    #[test]
    fn script_steps_parse() {
        let yaml = r#"
- publish: { path: Power, value: true }
- advance_ms: 250
- expect: { kind: string, address: "3", value: "On" }
"#;
        let steps: Vec<StepDef> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1], StepDef::AdvanceMs(250));
        match &steps[2] {
            StepDef::Expect(tv) => {
                assert_eq!(tv.target, TargetRef::address(SignalKind::String, "3"));
                assert_eq!(tv.value, SignalValue::from("On"));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }
}
