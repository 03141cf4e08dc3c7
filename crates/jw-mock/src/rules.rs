//! Declarative trigger/effect rules.
//!
//! A rule fires after its trigger join's wave has produced the value to
//! store. When the condition holds, every effect computes a new value from
//! the trigger value and the effect join's current value, then publishes it.

use std::fmt;
use std::rc::Rc;

use jw_core::{Address, SignalKey, SignalKind, SignalValue};

use crate::error::BusResult;
use crate::wave::WaveContext;

pub type Condition = Rc<dyn Fn(&SignalValue) -> bool>;

/// `(trigger value, current effect value, context) -> new effect value`
pub type Compute = Rc<dyn Fn(&SignalValue, &SignalValue, &WaveContext<'_>) -> SignalValue>;

pub struct Trigger {
    pub key: SignalKey,
    /// Seeded into the store when the rule is added.
    pub default_value: Option<SignalValue>,
    condition: Condition,
}

impl Trigger {
    pub fn holds(&self, value: &SignalValue) -> bool {
        (self.condition)(value)
    }
}

pub struct Effect {
    pub key: SignalKey,
    compute: Compute,
}

impl Effect {
    pub fn compute(
        &self,
        trigger_value: &SignalValue,
        current: &SignalValue,
        ctx: &WaveContext<'_>,
    ) -> SignalValue {
        (self.compute)(trigger_value, current, ctx)
    }
}

/// One trigger join driving any number of effect joins.
///
/// ```rust
/// use jw_core::{SignalKind, SignalValue};
/// use jw_mock::MockRule;
///
/// // Pressing boolean 10 sets the source name.
/// let rule = MockRule::on(SignalKind::Boolean, "10")
///     .when(|v| v.as_bool() == Some(true))
///     .then(SignalKind::String, "1", |_, _, _| SignalValue::from("HDMI 1"));
/// assert_eq!(rule.effects.len(), 1);
/// ```
pub struct MockRule {
    pub trigger: Trigger,
    pub effects: Vec<Effect>,
}

impl MockRule {
    /// Start a rule that fires on every publish to `(kind, address)`.
    pub fn on(kind: SignalKind, address: impl Into<Address>) -> Self {
        Self {
            trigger: Trigger {
                key: SignalKey::new(kind, address),
                default_value: None,
                condition: Rc::new(|_| true),
            },
            effects: Vec::new(),
        }
    }

    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&SignalValue) -> bool + 'static,
    {
        self.trigger.condition = Rc::new(condition);
        self
    }

    pub fn default_value(mut self, value: impl Into<SignalValue>) -> Self {
        self.trigger.default_value = Some(value.into());
        self
    }

    pub fn then<F>(mut self, kind: SignalKind, address: impl Into<Address>, compute: F) -> Self
    where
        F: Fn(&SignalValue, &SignalValue, &WaveContext<'_>) -> SignalValue + 'static,
    {
        self.effects.push(Effect {
            key: SignalKey::new(kind, address),
            compute: Rc::new(compute),
        });
        self
    }

    /// Run the effects if the condition holds on `value`.
    ///
    /// Effects run in declaration order; the first failing publish stops
    /// the remaining ones.
    pub fn fire(&self, value: &SignalValue, ctx: &WaveContext<'_>) -> BusResult<bool> {
        if !self.trigger.holds(value) {
            return Ok(false);
        }
        for effect in &self.effects {
            let current = ctx.read(effect.key.kind, effect.key.address.clone());
            let next = effect.compute(value, &current, ctx);
            ctx.write(effect.key.kind, effect.key.address.clone(), next)?;
        }
        Ok(true)
    }
}

impl fmt::Debug for MockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let effects: Vec<String> = self.effects.iter().map(|e| e.key.to_string()).collect();
        f.debug_struct("MockRule")
            .field("trigger", &self.trigger.key.to_string())
            .field("default_value", &self.trigger.default_value)
            .field("effects", &effects)
            .finish()
    }
}
