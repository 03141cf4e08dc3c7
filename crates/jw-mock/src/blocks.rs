//! Ready-made logic waves for common processor behaviors.
//!
//! Blocks are plain data so projects can declare them in YAML; each one
//! turns into a [`LogicWave`] for the join it is installed on.

use serde::{Deserialize, Serialize};

use jw_core::{Address, SignalKey, SignalKind, SignalValue};

use crate::error::{BusError, BusResult};
use crate::wave::{LogicWave, logic_wave};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogicBlock {
    /// Boolean: a `true` press flips the stored state, a release is ignored.
    Toggle,
    /// Number: limit published values to `[min, max]`.
    Clamp { min: f64, max: f64 },
    /// Boolean: pressing one member releases the others.
    Interlock { members: Vec<Address> },
    /// Boolean: a `true` press adds `delta` to a number join.
    Step {
        target: Address,
        delta: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Any kind: forward every value to a second join of the same kind.
    Mirror { target: Address },
    /// String: store the text reversed.
    Reverse,
}

impl LogicBlock {
    /// Kind of join the block can be installed on; `None` accepts any.
    pub fn kind(&self) -> Option<SignalKind> {
        match self {
            LogicBlock::Toggle | LogicBlock::Interlock { .. } | LogicBlock::Step { .. } => {
                Some(SignalKind::Boolean)
            }
            LogicBlock::Clamp { .. } => Some(SignalKind::Number),
            LogicBlock::Reverse => Some(SignalKind::String),
            LogicBlock::Mirror { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicBlock::Toggle => "toggle",
            LogicBlock::Clamp { .. } => "clamp",
            LogicBlock::Interlock { .. } => "interlock",
            LogicBlock::Step { .. } => "step",
            LogicBlock::Mirror { .. } => "mirror",
            LogicBlock::Reverse => "reverse",
        }
    }

    /// Check the block fits a join of `kind` and its parameters are sane.
    pub fn validate(&self, kind: SignalKind) -> BusResult<()> {
        if let Some(expected) = self.kind() {
            if expected != kind {
                return Err(BusError::InvalidConfig {
                    what: format!(
                        "{} block needs a {expected} join, not {kind}",
                        self.name()
                    ),
                });
            }
        }
        match self {
            LogicBlock::Clamp { min, max } if min.is_nan() || max.is_nan() || min > max => {
                Err(BusError::InvalidConfig {
                    what: format!("clamp range {min}..{max} is empty"),
                })
            }
            LogicBlock::Step {
                min: Some(min),
                max: Some(max),
                ..
            } if min > max => Err(BusError::InvalidConfig {
                what: format!("step min {min} is greater than max {max}"),
            }),
            LogicBlock::Interlock { members } if members.is_empty() => {
                Err(BusError::InvalidConfig {
                    what: "interlock has no members".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Joins this block publishes to when installed on `own`.
    pub fn writes(&self, own: &SignalKey) -> Vec<SignalKey> {
        match self {
            LogicBlock::Interlock { members } => members
                .iter()
                .filter(|m| **m != own.address)
                .map(|m| SignalKey::new(SignalKind::Boolean, m))
                .collect(),
            LogicBlock::Step { target, .. } => vec![SignalKey::new(SignalKind::Number, target)],
            LogicBlock::Mirror { target } => vec![SignalKey::new(own.kind, target)],
            _ => Vec::new(),
        }
    }

    /// Build the wave for a join of `kind`.
    pub fn into_wave(self, kind: SignalKind) -> BusResult<LogicWave> {
        self.validate(kind)?;
        let wave = match self {
            LogicBlock::Toggle => logic_wave(|value, ctx| match value {
                SignalValue::Boolean(true) => {
                    let current = ctx.current().as_bool().unwrap_or_default();
                    Ok(Some(SignalValue::Boolean(!current)))
                }
                _ => Ok(None),
            }),
            LogicBlock::Clamp { min, max } => logic_wave(move |value, ctx| match value {
                SignalValue::Number(n) => Ok(Some(SignalValue::Number(n.clamp(min, max)))),
                other => Err(BusError::wave(
                    ctx.key().clone(),
                    format!("clamp expects a number, got {}", other.kind()),
                )),
            }),
            LogicBlock::Interlock { members } => logic_wave(move |value, ctx| {
                if value.as_bool() == Some(true) {
                    let own = ctx.key().address.clone();
                    for member in members.iter().filter(|m| **m != own) {
                        ctx.write(SignalKind::Boolean, member, false)?;
                    }
                }
                Ok(Some(value))
            }),
            LogicBlock::Step {
                target,
                delta,
                min,
                max,
            } => logic_wave(move |value, ctx| {
                if value.as_bool() == Some(true) {
                    let mut next = ctx.read_number(&target) + delta;
                    if let Some(min) = min {
                        next = next.max(min);
                    }
                    if let Some(max) = max {
                        next = next.min(max);
                    }
                    ctx.write(SignalKind::Number, &target, next)?;
                }
                Ok(Some(value))
            }),
            LogicBlock::Mirror { target } => logic_wave(move |value, ctx| {
                ctx.write(value.kind(), &target, value.clone())?;
                Ok(Some(value))
            }),
            LogicBlock::Reverse => logic_wave(|value, _| {
                Ok(Some(match value {
                    SignalValue::String(s) => SignalValue::String(s.chars().rev().collect()),
                    other => other,
                }))
            }),
        };
        Ok(wave)
    }
}
