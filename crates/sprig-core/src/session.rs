//! Editor session: one map, its history, the current selection and suggestion state.

use crate::history::History;
use crate::id::{IdGenerator, TimestampIdGenerator};
use crate::node::{MAX_DEPTH, Node, try_add_child};
use crate::suggest::{SuggestionError, SuggestionService, normalize_suggestions};
use crate::{Error, Result};
use std::sync::Arc;

/// An immutable tree snapshot as stored in the history.
pub type Snapshot = Arc<Node>;

/// Ticket for one in-flight suggestion fetch.
///
/// Only the most recent ticket for the still-selected node is honoured by
/// [`Session::complete_suggestions`]; late answers to older requests are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub generation: u64,
    pub node_id: String,
    /// Root-to-node names, root first.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub node_id: String,
    pub path: Vec<String>,
}

pub struct Session {
    history: History<Snapshot>,
    selection: Option<Selection>,
    suggestions: Vec<String>,
    loading: bool,
    generation: u64,
    ids: Box<dyn IdGenerator>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_id_generator(TimestampIdGenerator)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("history_len", &self.history.len())
            .field("cursor", &self.history.cursor())
            .field("selection", &self.selection)
            .field("suggestions", &self.suggestions)
            .field("loading", &self.loading)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self {
            history: History::new(),
            selection: None,
            suggestions: Vec::new(),
            loading: false,
            generation: 0,
            ids: Box::new(ids),
        }
    }

    /// Starts a new map whose root is named after `topic`.
    pub fn start(&mut self, topic: &str) -> Result<()> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::EmptyTopic);
        }
        self.history.reset(Arc::new(Node::root(topic)));
        self.clear_transient_state();
        tracing::debug!(topic, "started new mind map");
        Ok(())
    }

    /// Replaces the session content with an exported map. Invalid input leaves the session as is.
    pub fn import_json(&mut self, text: &str) -> Result<()> {
        let root = Node::from_json_str(text)?;
        let nodes = root.len();
        self.history.reset(Arc::new(root));
        self.clear_transient_state();
        tracing::debug!(nodes, "imported mind map");
        Ok(())
    }

    pub fn export_json(&self) -> Result<String> {
        self.current().ok_or(Error::NoMindMap)?.to_json_pretty()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.history.current()
    }

    pub fn history(&self) -> &History<Snapshot> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        let id = &self.selection.as_ref()?.node_id;
        self.current()?.find(id)
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks `id` as selected and opens a suggestion request for it.
    ///
    /// Existing suggestions are cleared and the loading flag is raised until the returned request
    /// is completed.
    pub fn select_node(&mut self, id: &str) -> Result<SuggestionRequest> {
        let root = self.current().ok_or(Error::NoMindMap)?;
        let path = root.ancestor_names(id).ok_or_else(|| Error::NodeNotFound {
            id: id.to_string(),
        })?;

        self.generation += 1;
        self.selection = Some(Selection {
            node_id: id.to_string(),
            path: path.clone(),
        });
        self.suggestions.clear();
        self.loading = true;

        Ok(SuggestionRequest {
            generation: self.generation,
            node_id: id.to_string(),
            path,
        })
    }

    /// Applies the outcome of `request`. Returns `false` when the request is stale.
    pub fn complete_suggestions(
        &mut self,
        request: &SuggestionRequest,
        result: std::result::Result<Vec<String>, SuggestionError>,
    ) -> bool {
        let still_selected = self
            .selection
            .as_ref()
            .is_some_and(|s| s.node_id == request.node_id);
        if request.generation != self.generation || !still_selected {
            tracing::debug!(
                node_id = %request.node_id,
                generation = request.generation,
                current = self.generation,
                "discarding stale suggestions"
            );
            return false;
        }

        self.suggestions = match result {
            Ok(items) => normalize_suggestions(items),
            Err(err) => {
                tracing::warn!(node_id = %request.node_id, "error fetching suggestions: {err}");
                Vec::new()
            }
        };
        self.loading = false;
        true
    }

    /// Selects `id` and waits for `service` to answer.
    pub async fn fetch_suggestions(
        &mut self,
        id: &str,
        service: &dyn SuggestionService,
    ) -> Result<()> {
        let request = self.select_node(id)?;
        let result = service.suggest(&request.path).await;
        self.complete_suggestions(&request, result);
        Ok(())
    }

    /// Appends a node named `name` under `parent_id` and commits the new snapshot.
    ///
    /// Returns the id of the new node. Suggestions are left as they are.
    pub fn add_node(&mut self, parent_id: &str, name: &str) -> Result<String> {
        let root = Arc::clone(self.current().ok_or(Error::NoMindMap)?);
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyNodeName);
        }

        // The path includes the root, so its length is the depth of the new child.
        if root.path_to(parent_id).is_some_and(|path| path.len() > MAX_DEPTH) {
            return Err(Error::TooDeep { max: MAX_DEPTH });
        }

        let id = self.fresh_id(&root);
        let next = try_add_child(&root, parent_id, Node::new(id.clone(), name))?;
        self.history.commit(next);
        tracing::debug!(
            parent_id,
            id = %id,
            cursor = self.history.cursor(),
            "committed new node"
        );
        Ok(id)
    }

    pub fn add_to_selected(&mut self, name: &str) -> Result<String> {
        let parent_id = self
            .selection
            .as_ref()
            .ok_or(Error::NothingSelected)?
            .node_id
            .clone();
        self.add_node(&parent_id, name)
    }

    /// Adds the suggestion at `index` as a child of the selected node.
    pub fn accept_suggestion(&mut self, index: usize) -> Result<String> {
        if self.selection.is_none() {
            return Err(Error::NothingSelected);
        }
        let Some(name) = self.suggestions.get(index).cloned() else {
            return Err(Error::SuggestionIndex {
                index,
                available: self.suggestions.len(),
            });
        };
        self.add_to_selected(&name)
    }

    /// Steps back one snapshot. Returns whether the cursor moved.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        self.history.undo();
        self.clear_transient_state();
        tracing::debug!(cursor = self.history.cursor(), "undo");
        true
    }

    /// Steps forward one snapshot. Returns whether the cursor moved.
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        self.history.redo();
        self.clear_transient_state();
        tracing::debug!(cursor = self.history.cursor(), "redo");
        true
    }

    fn fresh_id(&mut self, root: &Node) -> String {
        loop {
            let id = self.ids.next_id();
            if !id.is_empty() && !root.contains(&id) {
                return id;
            }
        }
    }

    // Selection and suggestions refer to a specific snapshot; bumping the generation also
    // invalidates any fetch still in flight.
    fn clear_transient_state(&mut self) {
        self.selection = None;
        self.suggestions.clear();
        self.loading = false;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIdGenerator;
    use crate::node::ROOT_ID;

    fn session() -> Session {
        let mut s = Session::with_id_generator(SequentialIdGenerator::default());
        s.start("Climate Change").unwrap();
        s
    }

    #[test]
    fn start_rejects_blank_topic_without_touching_state() {
        let mut s = session();
        assert!(matches!(s.start("   "), Err(Error::EmptyTopic)));
        assert_eq!(s.current().unwrap().name, "Climate Change");
    }

    #[test]
    fn select_raises_loading_and_returns_path() {
        let mut s = session();
        let child = s.add_node("root", "Rising Sea Levels").unwrap();
        let req = s.select_node(&child).unwrap();
        assert!(s.is_loading());
        assert_eq!(req.path, ["Climate Change", "Rising Sea Levels"]);
        assert_eq!(s.selected_node().unwrap().name, "Rising Sea Levels");
    }

    #[test]
    fn stale_suggestions_are_discarded() {
        let mut s = session();
        let a = s.add_node("root", "A").unwrap();
        let first = s.select_node("root").unwrap();
        let second = s.select_node(&a).unwrap();

        assert!(!s.complete_suggestions(&first, Ok(vec!["late".into()])));
        assert!(s.suggestions().is_empty());
        assert!(s.is_loading());

        assert!(s.complete_suggestions(&second, Ok(vec!["fresh".into()])));
        assert_eq!(s.suggestions(), ["fresh"]);
        assert!(!s.is_loading());
    }

    #[test]
    fn failed_fetch_yields_empty_list() {
        let mut s = session();
        let req = s.select_node("root").unwrap();
        assert!(s.complete_suggestions(&req, Err(SuggestionError::Request("offline".into()))));
        assert!(s.suggestions().is_empty());
        assert!(!s.is_loading());
    }

    #[test]
    fn add_node_keeps_suggestions() {
        let mut s = session();
        let req = s.select_node("root").unwrap();
        s.complete_suggestions(&req, Ok(vec!["x".into(), "y".into()]));
        s.add_node("root", "Custom").unwrap();
        assert_eq!(s.suggestions(), ["x", "y"]);
        assert!(s.selected().is_some());
    }

    #[test]
    fn accept_suggestion_adds_under_selection() {
        let mut s = session();
        let req = s.select_node("root").unwrap();
        s.complete_suggestions(&req, Ok(vec!["Ice".into(), "Heat".into()]));
        let id = s.accept_suggestion(1).unwrap();
        let root = s.current().unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].id, id);
        assert_eq!(root.children[0].name, "Heat");
        assert!(matches!(
            s.accept_suggestion(7),
            Err(Error::SuggestionIndex {
                index: 7,
                available: 2
            })
        ));
    }

    #[test]
    fn missing_parent_is_reported_and_not_committed() {
        let mut s = session();
        let err = s.add_node("nope", "X").unwrap_err();
        assert!(matches!(err, Error::ParentNotFound { .. }));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn undo_and_redo_clear_selection_and_suggestions() {
        let mut s = session();
        s.add_node("root", "A").unwrap();
        let req = s.select_node("root").unwrap();
        assert!(s.undo());
        assert!(s.selected().is_none());
        assert!(!s.is_loading());
        assert!(!s.complete_suggestions(&req, Ok(vec!["late".into()])));
        assert!(s.suggestions().is_empty());
        assert!(s.redo());
        assert!(!s.redo());
    }

    #[test]
    fn operations_without_map_fail() {
        let mut s = Session::new();
        assert!(matches!(s.export_json(), Err(Error::NoMindMap)));
        assert!(matches!(s.add_node("root", "x"), Err(Error::NoMindMap)));
        assert!(matches!(s.select_node("root"), Err(Error::NoMindMap)));
        assert!(matches!(s.add_to_selected("x"), Err(Error::NothingSelected)));
        assert!(!s.undo());
    }

    #[test]
    fn add_node_stops_at_max_depth() {
        let mut s = session();
        let mut parent = ROOT_ID.to_string();
        for i in 0..MAX_DEPTH {
            parent = s.add_node(&parent, &format!("d{i}")).unwrap();
        }
        assert_eq!(s.current().unwrap().depth(), MAX_DEPTH);
        let cursor = s.history().cursor();
        assert!(matches!(
            s.add_node(&parent, "too deep"),
            Err(Error::TooDeep { max: MAX_DEPTH })
        ));
        assert_eq!(s.history().cursor(), cursor);

        let exported = s.export_json().unwrap();
        let mut other = Session::new();
        other.import_json(&exported).unwrap();
        assert_eq!(other.current(), s.current());
    }

    #[test]
    fn ids_skip_values_already_in_the_tree() {
        let mut s = Session::with_id_generator(SequentialIdGenerator::new("n"));
        s.import_json(r#"{"id":"root","name":"T","children":[{"id":"n1","name":"taken"}]}"#)
            .unwrap();
        let id = s.add_node("root", "next").unwrap();
        assert_eq!(id, "n2");
    }
}
