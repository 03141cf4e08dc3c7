//! Project validation logic.

use std::collections::HashSet;

use jw_core::{SignalKey, SignalKind, SignalValue};
use jw_joins::resolve;

use crate::schema::{MockDef, Project, RuleDef, StepDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid join '{path}': {reason}")]
    InvalidJoin { path: String, reason: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    if project.bus.max_depth == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "bus.max_depth".to_string(),
            value: "0".to_string(),
            reason: "no publish could ever run".to_string(),
        });
    }

    for entry in project.joins.walk() {
        resolve(entry.spec).map_err(|e| ValidationError::InvalidJoin {
            path: entry.path.clone(),
            reason: e.to_string(),
        })?;
        if let Some(initial) = entry.spec.initial_value() {
            check_kind(&entry.path, entry.spec.kind, initial)?;
        }
    }

    let mut mocked = HashSet::new();
    for mock in &project.mocks {
        for key in validate_mock(project, mock)? {
            if !mocked.insert(key.clone()) {
                return Err(ValidationError::DuplicateId {
                    id: key.to_string(),
                    context: "mocks".to_string(),
                });
            }
        }
    }

    for rule in &project.rules {
        validate_rule(project, rule)?;
    }

    for step in &project.script {
        match step {
            StepDef::Publish(tv) | StepDef::Expect(tv) => {
                let key = tv.target.key(&project.joins)?;
                check_kind(&tv.target.label(), key.kind, &tv.value)?;
            }
            StepDef::AdvanceMs(_) => {}
        }
    }

    Ok(())
}

fn validate_mock(project: &Project, mock: &MockDef) -> Result<Vec<SignalKey>, ValidationError> {
    let keys = mock.target.keys(&project.joins)?;
    let label = mock.target.label();
    for key in &keys {
        if let Some(initial) = &mock.initial {
            check_kind(&label, key.kind, initial)?;
        }
        if let Some(block) = &mock.block {
            block
                .validate(key.kind)
                .map_err(|e| ValidationError::InvalidValue {
                    field: format!("mock '{label}' block"),
                    value: block.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
    }
    Ok(keys)
}

fn validate_rule(project: &Project, rule: &RuleDef) -> Result<(), ValidationError> {
    let trigger = rule.trigger.target.key(&project.joins)?;
    let label = rule.trigger.target.label();

    if let Some(default) = &rule.trigger.default {
        check_kind(&label, trigger.kind, default)?;
    }
    if let Some(operand) = rule.trigger.when.operand() {
        check_kind(&format!("{label} condition"), trigger.kind, operand)?;
    }
    if rule.effects.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("rule on '{label}'"),
            value: "[]".to_string(),
            reason: "a rule needs at least one effect".to_string(),
        });
    }

    for effect in &rule.effects {
        let key = effect.target.key(&project.joins)?;
        let effect_label = effect.target.label();
        if key == trigger {
            return Err(ValidationError::InvalidValue {
                field: format!("rule on '{label}'"),
                value: effect_label,
                reason: "an effect cannot target its own trigger".to_string(),
            });
        }
        if let Some(required) = effect.compute.required_kind(trigger.kind) {
            if required != key.kind {
                return Err(ValidationError::InvalidValue {
                    field: format!("effect '{effect_label}' compute"),
                    value: key.kind.to_string(),
                    reason: format!("computation produces {required} values"),
                });
            }
        }
    }
    Ok(())
}

fn check_kind(field: &str, kind: SignalKind, value: &SignalValue) -> Result<(), ValidationError> {
    if value.kind() == kind {
        return Ok(());
    }
    Err(ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("expected a {kind} value"),
    })
}
