//! Compilation of a [`Project`] into a live mock session.

use indexmap::IndexMap;
use tracing::{debug, info};

use jw_binding::{JoinBinding, Timeline};
use jw_core::{SignalKey, SignalKind, SignalValue};
use jw_mock::{MockBus, MockRule};
use jw_project::schema::{MockDef, Project, RuleDef, TargetRef};

use crate::error::{AppError, AppResult};

/// A bus with the project's mocks and rules installed and one binding per
/// join-map leaf, all sharing one virtual timeline.
pub struct Session {
    project: Project,
    bus: MockBus,
    timeline: Timeline,
    bindings: IndexMap<String, JoinBinding<MockBus>>,
}

/// One row of [`Session::state_table`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StateRow {
    pub key: SignalKey,
    /// Join-map paths bound to this join.
    pub paths: Vec<String>,
    pub value: SignalValue,
}

/// Build a session. Mocks and rules go in first so bindings see seeded
/// values in their replay.
pub fn compile(project: Project) -> AppResult<Session> {
    let bus = MockBus::with_config(project.bus.clone());
    let timeline = Timeline::new();

    for mock in &project.mocks {
        install_mock(&bus, &project, mock)?;
    }
    for rule in &project.rules {
        bus.add_rule(build_rule(&project, rule)?)?;
    }

    let mut bindings = IndexMap::new();
    for entry in project.joins.walk() {
        let binding = JoinBinding::new(bus.clone(), entry.spec.clone(), timeline.clone())?;
        bindings.insert(entry.path, binding);
    }

    info!(
        project = %project.name,
        session = %bus.session(),
        bindings = bindings.len(),
        mocks = project.mocks.len(),
        rules = project.rules.len(),
        "session compiled"
    );
    Ok(Session {
        project,
        bus,
        timeline,
        bindings,
    })
}

fn install_mock(bus: &MockBus, project: &Project, mock: &MockDef) -> AppResult<()> {
    for key in mock.target.keys(&project.joins)? {
        if let Some(block) = &mock.block {
            bus.register_block(key.kind, key.address.clone(), block.clone())?;
        }
        if let Some(initial) = &mock.initial {
            bus.register_mock(key.kind, key.address.clone(), None, Some(initial.clone()))?;
        }
    }
    Ok(())
}

/// Turn a declarative rule into closures over its condition and computations.
pub fn build_rule(project: &Project, def: &RuleDef) -> AppResult<MockRule> {
    let trigger = def.trigger.target.key(&project.joins)?;
    let condition = def.trigger.when.clone();

    let mut rule = MockRule::on(trigger.kind, trigger.address)
        .when(move |value: &SignalValue| condition.holds(value));
    if let Some(default) = &def.trigger.default {
        rule = rule.default_value(default.clone());
    }
    for effect in &def.effects {
        let target = effect.target.key(&project.joins)?;
        let compute = effect.compute.clone();
        rule = rule.then(target.kind, target.address, move |trigger, current, _| {
            compute.apply(trigger, current)
        });
    }
    Ok(rule)
}

impl Session {
    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn bus(&self) -> &MockBus {
        &self.bus
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Binding for a join-map leaf path as listed by `walk`.
    pub fn binding(&self, path: &str) -> Option<&JoinBinding<MockBus>> {
        self.bindings.get(path)
    }

    pub fn binding_paths(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Publish the way a panel would.
    ///
    /// Leaf paths go through their binding and its effects. An index into a
    /// multi-address leaf publishes that one address immediately. Raw
    /// addresses bypass bindings and go straight to the bus.
    pub fn publish(&self, target: &TargetRef, value: SignalValue) -> AppResult<()> {
        let path = match target {
            TargetRef::Address { kind, address } => {
                self.bus.publish(*kind, address.clone(), value)?;
                return Ok(());
            }
            TargetRef::Path { path } => path,
        };

        if let Some(binding) = self.bindings.get(path) {
            binding.publish(value)?;
            return Ok(());
        }

        let located = self.project.joins.lookup(path)?;
        let Some(index) = located.index else {
            return Err(AppError::JoinNotBound(path.clone()));
        };
        let leaf = self
            .project
            .joins
            .walk()
            .into_iter()
            .find(|entry| std::ptr::eq(entry.spec, located.spec))
            .ok_or_else(|| AppError::JoinNotBound(path.clone()))?;
        let binding = self
            .bindings
            .get(&leaf.path)
            .ok_or_else(|| AppError::JoinNotBound(leaf.path.clone()))?;
        debug!(path = %path, leaf = %leaf.path, index, "publishing one address of a multi join");
        binding.publish_index(index, value)?;
        Ok(())
    }

    /// Current bus value of a single-join target.
    pub fn state(&self, target: &TargetRef) -> AppResult<SignalValue> {
        let key = target.key(&self.project.joins)?;
        Ok(self.bus.state_of(&key))
    }

    /// Move the timeline forward, running due debounce and reset timers.
    pub fn advance(&self, ms: u64) -> usize {
        self.timeline.advance_by(ms)
    }

    /// Every join the bus has a value for, labelled with the join-map paths
    /// bound to it.
    pub fn state_table(&self, kind: Option<SignalKind>) -> Vec<StateRow> {
        let mut labels: IndexMap<SignalKey, Vec<String>> = IndexMap::new();
        for (path, binding) in &self.bindings {
            let spec_kind = binding.spec().kind;
            let multi = binding.is_multi();
            for (i, address) in binding.addresses().iter().enumerate() {
                let label = if multi {
                    format!("{path}[{i}]")
                } else {
                    path.clone()
                };
                labels
                    .entry(SignalKey::new(spec_kind, address))
                    .or_default()
                    .push(label);
            }
        }

        self.bus
            .snapshot()
            .into_iter()
            .filter(|(key, _)| kind.is_none_or(|k| key.kind == k))
            .map(|(key, value)| StateRow {
                paths: labels.get(&key).cloned().unwrap_or_default(),
                key,
                value,
            })
            .collect()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("project", &self.project.name)
            .field("bus", &self.bus)
            .field("now", &self.timeline.now())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
