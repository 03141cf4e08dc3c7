//! Static checks that do not make a project invalid.
//!
//! The bus tolerates cascades that loop back on themselves (a nested
//! publish to a join whose wave is already running is stored as given),
//! but such loops are usually a wiring mistake. They are reported here as
//! warnings.

use std::collections::HashMap;
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use jw_core::SignalKey;
use jw_mock::LogicBlock;

use crate::schema::Project;

#[derive(Debug, Clone, PartialEq)]
pub struct LintWarning {
    /// Joins taking part in the loop, sorted.
    pub joins: Vec<SignalKey>,
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.joins.iter().map(ToString::to_string).collect();
        write!(f, "publish cascade loops through {}", names.join(" -> "))
    }
}

#[derive(Default)]
struct CascadeGraph {
    graph: DiGraph<SignalKey, ()>,
    index: HashMap<SignalKey, NodeIndex>,
}

impl CascadeGraph {
    fn node(&mut self, key: &SignalKey) -> NodeIndex {
        if let Some(idx) = self.index.get(key) {
            return *idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.index.insert(key.clone(), idx);
        idx
    }

    fn edge(&mut self, from: &SignalKey, to: &SignalKey) {
        let a = self.node(from);
        let b = self.node(to);
        self.graph.update_edge(a, b, ());
    }
}

/// Find publish loops among blocks and rules.
///
/// Targets that do not resolve are skipped; [`crate::validate_project`]
/// reports those.
pub fn lint_project(project: &Project) -> Vec<LintWarning> {
    let mut cascade = CascadeGraph::default();

    for mock in &project.mocks {
        let Some(block) = &mock.block else { continue };
        // Interlock releases publish `false`, which never presses another member.
        if matches!(block, LogicBlock::Interlock { .. }) {
            continue;
        }
        let Ok(keys) = mock.target.keys(&project.joins) else {
            continue;
        };
        for key in &keys {
            for written in block.writes(key) {
                cascade.edge(key, &written);
            }
        }
    }

    for rule in &project.rules {
        let Ok(trigger) = rule.trigger.target.key(&project.joins) else {
            continue;
        };
        for effect in &rule.effects {
            if let Ok(target) = effect.target.key(&project.joins) {
                cascade.edge(&trigger, &target);
            }
        }
    }

    let graph = &cascade.graph;
    let mut warnings: Vec<LintWarning> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut joins: Vec<SignalKey> = scc.iter().map(|idx| graph[*idx].clone()).collect();
            joins.sort();
            LintWarning { joins }
        })
        .collect();
    warnings.sort_by(|a, b| a.joins.cmp(&b.joins));
    warnings
}
