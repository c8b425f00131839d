//! Boundary to the external suggestion collaborator.
//!
//! A service receives the root-to-node names of the selected node and answers with short
//! candidate child names. The generative-model client itself lives outside this crate.

use futures::future::{self, BoxFuture, FutureExt};

/// Number of suggestions a service is expected to produce.
pub const SUGGESTION_COUNT: usize = 5;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SuggestionError {
    #[error("no suggestion service credential is configured")]
    MissingCredential,
    #[error("suggestion request failed: {0}")]
    Request(String),
    #[error("malformed suggestion response: {0}")]
    MalformedResponse(String),
}

pub trait SuggestionService: Send + Sync {
    fn suggest<'a>(
        &'a self,
        path: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<String>, SuggestionError>>;
}

/// Used when no credential is configured: five fixed placeholder ideas.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderSuggestions;

impl SuggestionService for PlaceholderSuggestions {
    fn suggest<'a>(
        &'a self,
        _path: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<String>, SuggestionError>> {
        let ideas = (1..=SUGGESTION_COUNT)
            .map(|i| format!("Mock Idea {i}"))
            .collect();
        future::ready(Ok(ideas)).boxed()
    }
}

/// Always answers with the same list, whatever the path.
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestions {
    items: Vec<String>,
}

impl StaticSuggestions {
    pub fn new(items: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl SuggestionService for StaticSuggestions {
    fn suggest<'a>(
        &'a self,
        _path: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<String>, SuggestionError>> {
        future::ready(Ok(self.items.clone())).boxed()
    }
}

/// Trims entries, drops empty ones and keeps at most [`SUGGESTION_COUNT`].
pub fn normalize_suggestions(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(SUGGESTION_COUNT)
        .collect()
}
