//! Join maps: a named tree of join specs.
//!
//! Programs keep every join in one nested document:
//!
//! ```yaml
//! Audio:
//!   Control:
//!     Level: { type: number, join: 1, effects: { debounce_ms: 5 } }
//!     Mute: { type: boolean, join: 1 }
//! ManyStrings:
//!   - { type: string, join: 1 }
//!   - { type: string, join: 2 }
//! ```
//!
//! Leaves are addressed by dotted paths (`Audio.Control.Level`). List
//! members and the individual addresses of a multi-address leaf take an
//! index: `ManyStrings[1]` or `ManyStrings.1`. Inside a group every dotted
//! segment is a name, so a group may use keys like `"1"`.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use jw_core::{Address, SignalKind};

use crate::error::{JoinError, JoinResult};
use crate::resolve::{address_count, resolve};
use crate::spec::{Direction, Effects, JoinSpec};

/// One node of a join map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinNode {
    Leaf(JoinSpec),
    List(Vec<JoinSpec>),
    Group(IndexMap<String, JoinNode>),
}

/// Ordered tree of join specs keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinMap {
    root: IndexMap<String, JoinNode>,
}

/// A leaf found while walking a map.
#[derive(Debug, Clone)]
pub struct JoinEntry<'a> {
    pub path: String,
    pub spec: &'a JoinSpec,
}

/// Result of a path lookup: the leaf, and the address index if the path
/// selected one address of a multi-address leaf.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub spec: &'a JoinSpec,
    pub index: Option<usize>,
}

impl Located<'_> {
    pub fn kind(&self) -> SignalKind {
        self.spec.kind
    }

    /// Addresses this location refers to.
    pub fn addresses(&self) -> JoinResult<Vec<Address>> {
        let mut all = resolve(self.spec)?;
        match self.index {
            None => Ok(all),
            Some(i) => Ok(vec![all.swap_remove(i)]),
        }
    }
}

/// One resolved address in a by-kind listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindEntry {
    pub join: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<Direction>,
    #[serde(skip_serializing_if = "Effects::is_empty")]
    pub effects: Effects,
}

#[derive(Debug)]
enum Step {
    Key(String),
    Index(usize),
}

enum Cursor<'a> {
    Group(&'a IndexMap<String, JoinNode>),
    List(&'a [JoinSpec]),
    Leaf(&'a JoinSpec, Option<usize>),
}

impl JoinMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node, replacing any node with the same name.
    pub fn insert(&mut self, name: impl Into<String>, node: JoinNode) -> &mut Self {
        self.root.insert(name.into(), node);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn root(&self) -> &IndexMap<String, JoinNode> {
        &self.root
    }

    /// Every leaf with its path, in document order.
    pub fn walk(&self) -> Vec<JoinEntry<'_>> {
        let mut out = Vec::new();
        walk_group(&self.root, "", &mut out);
        out
    }

    /// Find the leaf (or the single address of a leaf) at `path`.
    pub fn lookup(&self, path: &str) -> JoinResult<Located<'_>> {
        let steps = parse_path(path)?;
        let not_found = || JoinError::PathNotFound {
            path: path.to_string(),
        };

        let mut cursor = Cursor::Group(&self.root);
        for step in steps {
            // A dotted number is a key inside a group and an index elsewhere.
            let step = match (&cursor, step) {
                (Cursor::Group(_), step) => step,
                (_, Step::Key(key)) if key.bytes().all(|b| b.is_ascii_digit()) => {
                    Step::Index(parse_index(path, &key)?)
                }
                (_, step) => step,
            };
            cursor = match (cursor, step) {
                (Cursor::Group(group), Step::Key(key)) => {
                    match group.get(&key).ok_or_else(not_found)? {
                        JoinNode::Leaf(spec) => Cursor::Leaf(spec, None),
                        JoinNode::List(specs) => Cursor::List(specs),
                        JoinNode::Group(children) => Cursor::Group(children),
                    }
                }
                (Cursor::List(specs), Step::Index(i)) => {
                    let spec = specs.get(i).ok_or_else(|| JoinError::IndexOutOfRange {
                        path: path.to_string(),
                        index: i,
                        len: specs.len(),
                    })?;
                    Cursor::Leaf(spec, None)
                }
                (Cursor::Leaf(spec, None), Step::Index(i)) => {
                    let len = address_count(spec)?;
                    if i >= len {
                        return Err(JoinError::IndexOutOfRange {
                            path: path.to_string(),
                            index: i,
                            len,
                        });
                    }
                    Cursor::Leaf(spec, Some(i))
                }
                _ => return Err(not_found()),
            };
        }

        match cursor {
            Cursor::Leaf(spec, index) => Ok(Located { spec, index }),
            _ => Err(not_found()),
        }
    }

    /// All resolved addresses of `kind`, in document order.
    pub fn addresses_of_kind(&self, kind: SignalKind) -> JoinResult<Vec<Address>> {
        let mut out = Vec::new();
        for entry in self.walk() {
            if entry.spec.kind == kind {
                out.extend(resolve(entry.spec)?);
            }
        }
        Ok(out)
    }

    /// Every resolved address grouped by kind, each tagged with its leaf path.
    pub fn by_kind(&self) -> JoinResult<BTreeMap<SignalKind, Vec<KindEntry>>> {
        let mut groups: BTreeMap<SignalKind, Vec<KindEntry>> = BTreeMap::new();
        for JoinEntry { path, spec } in self.walk() {
            for address in resolve(spec)? {
                groups.entry(spec.kind).or_default().push(KindEntry {
                    join: address.into_string(),
                    key: path.clone(),
                    dir: spec.dir,
                    effects: spec.effects,
                });
            }
        }
        Ok(groups)
    }

    /// Pretty JSON of the whole tree.
    pub fn render_tree(&self) -> JoinResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Pretty JSON of [`JoinMap::by_kind`].
    pub fn render_by_kind(&self) -> JoinResult<String> {
        Ok(serde_json::to_string_pretty(&self.by_kind()?)?)
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn walk_group<'a>(
    group: &'a IndexMap<String, JoinNode>,
    prefix: &str,
    out: &mut Vec<JoinEntry<'a>>,
) {
    for (name, node) in group {
        let path = join_path(prefix, name);
        match node {
            JoinNode::Leaf(spec) => out.push(JoinEntry { path, spec }),
            JoinNode::List(specs) => {
                for (i, spec) in specs.iter().enumerate() {
                    out.push(JoinEntry {
                        path: format!("{}[{}]", path, i),
                        spec,
                    });
                }
            }
            JoinNode::Group(children) => walk_group(children, &path, out),
        }
    }
}

fn parse_index(path: &str, text: &str) -> JoinResult<usize> {
    text.parse().map_err(|_| JoinError::InvalidPath {
        path: path.to_string(),
        what: "bad index",
    })
}

fn parse_path(path: &str) -> JoinResult<Vec<Step>> {
    let invalid = |what| JoinError::InvalidPath {
        path: path.to_string(),
        what,
    };
    if path.trim().is_empty() {
        return Err(invalid("path is empty"));
    }

    let mut steps = Vec::new();
    for part in path.split('.') {
        let (head, mut rest) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };

        if head.is_empty() && rest.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if !head.is_empty() {
            steps.push(Step::Key(head.to_string()));
        }

        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
            steps.push(Step::Index(parse_index(path, &rest[1..close])?));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid("unexpected text after ']'"));
            }
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::JoinAtom;

    fn sample() -> JoinMap {
        let mut control = IndexMap::new();
        control.insert(
            "Level".to_string(),
            JoinNode::Leaf(JoinSpec::single(SignalKind::Number, 1).with_debounce(5)),
        );
        control.insert(
            "Mute".to_string(),
            JoinNode::Leaf(JoinSpec::single(SignalKind::Boolean, 1).with_reset_after(100)),
        );
        let mut audio = IndexMap::new();
        audio.insert("Control".to_string(), JoinNode::Group(control));

        let mut map = JoinMap::new();
        map.insert("Audio", JoinNode::Group(audio));
        map.insert(
            "ManyStrings",
            JoinNode::List(vec![
                JoinSpec::single(SignalKind::String, 1),
                JoinSpec::single(SignalKind::String, 2),
            ]),
        );
        map.insert(
            "Sources",
            JoinNode::Leaf(JoinSpec::range(SignalKind::Boolean, 10, 13)),
        );
        map
    }

    #[test]
    fn walk_yields_paths_in_document_order() {
        let map = sample();
        let paths: Vec<String> = map.walk().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                "Audio.Control.Level",
                "Audio.Control.Mute",
                "ManyStrings[0]",
                "ManyStrings[1]",
                "Sources"
            ]
        );
    }

    #[test]
    fn lookup_by_dotted_path() {
        let map = sample();
        let located = map.lookup("Audio.Control.Mute").unwrap();
        assert_eq!(located.kind(), SignalKind::Boolean);
        assert_eq!(located.addresses().unwrap(), vec![Address::from("1")]);
    }

    #[test]
    fn lookup_list_members_both_syntaxes() {
        let map = sample();
        let a = map.lookup("ManyStrings[1]").unwrap();
        let b = map.lookup("ManyStrings.1").unwrap();
        assert_eq!(a.addresses().unwrap(), vec![Address::from("2")]);
        assert_eq!(b.addresses().unwrap(), vec![Address::from("2")]);
    }

    #[test]
    fn numeric_group_keys_are_names() {
        let mut outputs = IndexMap::new();
        outputs.insert(
            "1".to_string(),
            JoinNode::Leaf(JoinSpec::single(SignalKind::String, 41)),
        );
        outputs.insert(
            "2".to_string(),
            JoinNode::Leaf(JoinSpec::range(SignalKind::Boolean, 50, 52)),
        );
        let mut map = sample();
        map.insert("Outputs", JoinNode::Group(outputs));

        let one = map.lookup("Outputs.1").unwrap();
        assert_eq!(one.addresses().unwrap(), vec![Address::from("41")]);
        let two = map.lookup("Outputs.2.1").unwrap();
        assert_eq!(two.index, Some(1));
        assert_eq!(two.addresses().unwrap(), vec![Address::from("51")]);
        assert!(matches!(
            map.lookup("Outputs[1]"),
            Err(JoinError::PathNotFound { .. })
        ));

        assert_eq!(
            map.lookup("ManyStrings.0").unwrap().addresses().unwrap(),
            vec![Address::from("1")]
        );
        assert!(matches!(
            map.lookup("Sources.x"),
            Err(JoinError::PathNotFound { .. })
        ));
    }

    #[test]
    fn lookup_index_into_range_leaf() {
        let map = sample();
        let located = map.lookup("Sources[2]").unwrap();
        assert_eq!(located.index, Some(2));
        assert_eq!(located.addresses().unwrap(), vec![Address::from("12")]);

        let err = map.lookup("Sources[4]").unwrap_err();
        assert!(matches!(err, JoinError::IndexOutOfRange { index: 4, len: 4, .. }));
    }

    #[test]
    fn lookup_rejects_groups_and_unknown_names() {
        let map = sample();
        assert!(matches!(
            map.lookup("Audio.Control"),
            Err(JoinError::PathNotFound { .. })
        ));
        assert!(matches!(
            map.lookup("Audio.Video"),
            Err(JoinError::PathNotFound { .. })
        ));
        assert!(matches!(
            map.lookup("Audio..Level"),
            Err(JoinError::InvalidPath { .. })
        ));
    }

    #[test]
    fn addresses_of_kind_collects_across_tree() {
        let map = sample();
        let digital = map.addresses_of_kind(SignalKind::Boolean).unwrap();
        let names: Vec<&str> = digital.iter().map(Address::as_str).collect();
        assert_eq!(names, vec!["1", "10", "11", "12", "13"]);
    }

    #[test]
    fn by_kind_tags_entries_with_paths() {
        let map = sample();
        let groups = map.by_kind().unwrap();
        let strings = &groups[&SignalKind::String];
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[1].key, "ManyStrings[1]");
        let numbers = &groups[&SignalKind::Number];
        assert_eq!(numbers[0].effects.debounce_ms, Some(5));
    }

    #[test]
    fn render_by_kind_is_json() {
        let map = sample();
        let text = map.render_by_kind().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["boolean"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn empty_list_leaf_fails_listing() {
        let mut map = JoinMap::new();
        map.insert(
            "Broken",
            JoinNode::Leaf(JoinSpec::list(SignalKind::Number, Vec::<JoinAtom>::new())),
        );
        assert!(map.by_kind().is_err());
    }
}
