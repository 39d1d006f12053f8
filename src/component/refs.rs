//! Named element references collected from `ref` attributes.

use indexmap::IndexMap;

use crate::dom::NodeId;

/// One ref: a single element, or every element sharing the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ref {
    One(NodeId),
    Many(Vec<NodeId>),
}

/// Ref mapping, in first-seen order. Fixed once construction finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refs {
    entries: IndexMap<String, Ref>,
}

impl Refs {
    /// Record `node` under a raw `ref` attribute value.
    ///
    /// `[name]` forces list semantics; a repeated name turns into a list.
    pub(crate) fn insert(&mut self, raw: &str, node: NodeId) {
        let forced = raw.contains('[');
        let name: String = raw.chars().filter(|c| !matches!(c, '[' | ']')).collect();
        match self.entries.get_mut(&name) {
            Some(Ref::Many(nodes)) => nodes.push(node),
            Some(entry) => {
                if let Ref::One(first) = *entry {
                    *entry = Ref::Many(vec![first, node]);
                }
            }
            None => {
                let entry = if forced { Ref::Many(vec![node]) } else { Ref::One(node) };
                self.entries.insert(name, entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Ref> {
        self.entries.get(name)
    }

    /// The element for a single ref (first element for a list).
    pub fn one(&self, name: &str) -> Option<NodeId> {
        match self.entries.get(name)? {
            Ref::One(node) => Some(*node),
            Ref::Many(nodes) => nodes.first().copied(),
        }
    }

    /// Every element for `name`; empty if unknown.
    pub fn many(&self, name: &str) -> Vec<NodeId> {
        match self.entries.get(name) {
            Some(Ref::One(node)) => vec![*node],
            Some(Ref::Many(nodes)) => nodes.clone(),
            None => Vec::new(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_names_become_lists() {
        let mut refs = Refs::default();
        refs.insert("items", NodeId(1));
        refs.insert("label", NodeId(2));
        refs.insert("items", NodeId(3));
        refs.insert("items", NodeId(4));
        assert_eq!(refs.get("items"), Some(&Ref::Many(vec![NodeId(1), NodeId(3), NodeId(4)])));
        assert_eq!(refs.get("label"), Some(&Ref::One(NodeId(2))));
        assert_eq!(refs.names().collect::<Vec<_>>(), vec!["items", "label"]);
    }

    #[test]
    fn test_forced_list() {
        let mut refs = Refs::default();
        refs.insert("[items]", NodeId(7));
        assert_eq!(refs.get("items"), Some(&Ref::Many(vec![NodeId(7)])));
        assert_eq!(refs.one("items"), Some(NodeId(7)));
        assert_eq!(refs.many("missing"), Vec::<NodeId>::new());
    }
}
