//! Mind-map tree model.
//!
//! Snapshots are immutable `Arc<Node>` trees. Mutations rebuild only the path from the root to
//! the changed node and share every other subtree with the previous snapshot, so a renderer can
//! detect unchanged subtrees with `Arc::ptr_eq`.

use crate::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Identifier of the root node of a freshly started map.
pub const ROOT_ID: &str = "root";

/// Deepest level (root is level 0) a map may reach, both when editing and when importing.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Arc<Node>>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// A childless root named after the central topic.
    pub fn root(topic: impl Into<String>) -> Self {
        Self::new(ROOT_ID, topic)
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.descendants().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Nodes from `self` down to the node with `id`, both inclusive.
    pub fn path_to(&self, id: &str) -> Option<Vec<&Node>> {
        fn walk<'a>(node: &'a Node, id: &str, out: &mut Vec<&'a Node>) -> bool {
            out.push(node);
            if node.id == id {
                return true;
            }
            for child in &node.children {
                if walk(child, id, out) {
                    return true;
                }
            }
            out.pop();
            false
        }

        let mut out = Vec::new();
        walk(self, id, &mut out).then_some(out)
    }

    /// Names along the root-to-node path, in order.
    pub fn ancestor_names(&self, id: &str) -> Option<Vec<String>> {
        self.path_to(id)
            .map(|path| path.into_iter().map(|n| n.name.clone()).collect())
    }

    /// Pre-order traversal starting at `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.descendants().count()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Maximum depth below `self` (a leaf has depth 0).
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::Serialize)
    }

    /// Parses an exported map.
    ///
    /// The top level must be an object with non-empty string `id` and `name` fields, and ids must
    /// be unique across the whole tree.
    /// Maps up to [`MAX_DEPTH`] levels deep are accepted; serde_json's nesting limit is replaced
    /// by a bracket scan bounded by that depth.
    pub fn from_json_str(text: &str) -> Result<Self> {
        // Each level nests an object inside a `children` array.
        if json_nesting(text) > 2 * MAX_DEPTH + 2 {
            return Err(Error::TooDeep { max: MAX_DEPTH });
        }
        let mut de = serde_json::Deserializer::from_str(text);
        de.disable_recursion_limit();
        let value = Value::deserialize(&mut de).map_err(Error::ImportJson)?;
        de.end().map_err(Error::ImportJson)?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: Value) -> Result<Self> {
        let Some(obj) = value.as_object() else {
            return Err(Error::ImportShape {
                message: "expected a JSON object at the top level".to_string(),
            });
        };
        for field in ["id", "name"] {
            let present = obj
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(Error::ImportShape {
                    message: format!("missing required field `{field}`"),
                });
            }
        }

        let node: Node = serde_json::from_value(value).map_err(Error::ImportJson)?;
        if node.depth() > MAX_DEPTH {
            return Err(Error::TooDeep { max: MAX_DEPTH });
        }
        node.check_unique_ids()?;
        Ok(node)
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for n in self.descendants() {
            if !seen.insert(n.id.as_str()) {
                return Err(Error::DuplicateNodeId { id: n.id.clone() });
            }
        }
        Ok(())
    }
}

// Deepest `{`/`[` nesting in `text`, ignoring brackets inside strings.
fn json_nesting(text: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for b in text.bytes() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| c.as_ref()));
        Some(node)
    }
}

/// Appends `new_node` to the children of `parent_id`.
///
/// Only the root-to-parent path is rebuilt; all other subtrees are shared with `tree`. When
/// `parent_id` does not occur in the tree the input is returned unchanged (same allocation).
pub fn add_child(tree: &Arc<Node>, parent_id: &str, new_node: Node) -> Arc<Node> {
    try_add_child(tree, parent_id, new_node).unwrap_or_else(|_| Arc::clone(tree))
}

/// Like [`add_child`], but reports a missing parent instead of returning the tree unchanged.
pub fn try_add_child(tree: &Arc<Node>, parent_id: &str, new_node: Node) -> Result<Arc<Node>> {
    let mut new_node = Some(new_node);
    rebuild_with_child(tree, parent_id, &mut new_node).ok_or_else(|| Error::ParentNotFound {
        id: parent_id.to_string(),
    })
}

// Returns `Some` only for the nodes on the path to the parent; `new_node` is consumed there.
fn rebuild_with_child(
    node: &Arc<Node>,
    parent_id: &str,
    new_node: &mut Option<Node>,
) -> Option<Arc<Node>> {
    if node.id == parent_id {
        let child = new_node.take()?;
        let mut children = node.children.clone();
        children.push(Arc::new(child));
        return Some(Arc::new(Node {
            id: node.id.clone(),
            name: node.name.clone(),
            children,
        }));
    }

    for (i, child) in node.children.iter().enumerate() {
        if let Some(rebuilt) = rebuild_with_child(child, parent_id, new_node) {
            let mut children = node.children.clone();
            children[i] = rebuilt;
            return Some(Arc::new(Node {
                id: node.id.clone(),
                name: node.name.clone(),
                children,
            }));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arc<Node> {
        Arc::new(Node::root("Climate Change").with_children([
            Node::new("a", "Causes").with_children([Node::new("a1", "Emissions")]),
            Node::new("b", "Effects"),
        ]))
    }

    #[test]
    fn add_child_appends_to_end_of_parent_children() {
        let tree = sample();
        let next = add_child(&tree, "a", Node::new("a2", "Deforestation"));
        let a = next.find("a").unwrap();
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[1].id, "a2");
        assert_eq!(tree.find("a").unwrap().children.len(), 1);
    }

    #[test]
    fn add_child_shares_unrelated_subtrees() {
        let tree = sample();
        let next = add_child(&tree, "a1", Node::new("x", "Coal"));
        assert!(!Arc::ptr_eq(&tree, &next));
        assert!(!Arc::ptr_eq(&tree.children[0], &next.children[0]));
        assert!(Arc::ptr_eq(&tree.children[1], &next.children[1]));
    }

    #[test]
    fn add_child_missing_parent_is_a_no_op() {
        let tree = sample();
        let next = add_child(&tree, "missing", Node::new("x", "X"));
        assert!(Arc::ptr_eq(&tree, &next));
        assert_eq!(*tree, *next);
    }

    #[test]
    fn try_add_child_reports_missing_parent() {
        let err = try_add_child(&sample(), "missing", Node::new("x", "X")).unwrap_err();
        assert!(matches!(err, Error::ParentNotFound { ref id } if id == "missing"));
    }

    #[test]
    fn path_and_ancestor_names() {
        let tree = sample();
        assert_eq!(
            tree.ancestor_names("a1").unwrap(),
            vec!["Climate Change", "Causes", "Emissions"]
        );
        assert_eq!(tree.ancestor_names("root").unwrap(), vec!["Climate Change"]);
        assert!(tree.path_to("zzz").is_none());
    }

    #[test]
    fn descendants_are_pre_order() {
        let ids: Vec<_> = sample().descendants().map(|n| n.id.clone()).collect();
        assert_eq!(ids, ["root", "a", "a1", "b"]);
        assert_eq!(sample().len(), 4);
        assert_eq!(sample().depth(), 2);
    }

    #[test]
    fn json_uses_two_space_indentation() {
        let json = Node::root("Topic").to_json_pretty().unwrap();
        assert_eq!(
            json,
            "{\n  \"id\": \"root\",\n  \"name\": \"Topic\",\n  \"children\": []\n}"
        );
    }

    #[test]
    fn import_accepts_leaves_without_children_field() {
        let node =
            Node::from_json_str(r#"{"id":"root","name":"T","children":[{"id":"1","name":"c"}]}"#)
                .unwrap();
        assert!(node.children[0].is_leaf());
    }

    #[test]
    fn import_rejects_missing_fields() {
        let err = Node::from_json_str(r#"{"foo": 1}"#).unwrap_err();
        assert!(matches!(err, Error::ImportShape { .. }));
        let err = Node::from_json_str(r#"{"id": "root", "name": ""}"#).unwrap_err();
        assert!(matches!(err, Error::ImportShape { .. }));
        let err = Node::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::ImportShape { .. }));
    }

    #[test]
    fn import_rejects_invalid_json_and_duplicate_ids() {
        assert!(matches!(
            Node::from_json_str("{not json").unwrap_err(),
            Error::ImportJson(_)
        ));
        let dup = r#"{"id":"root","name":"T","children":[{"id":"root","name":"again"}]}"#;
        assert!(matches!(
            Node::from_json_str(dup).unwrap_err(),
            Error::DuplicateNodeId { .. }
        ));
    }
}
