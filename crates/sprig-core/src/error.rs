pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Please create a mind map first.")]
    NoMindMap,

    #[error("The central topic must not be empty")]
    EmptyTopic,

    #[error("A node name must not be empty")]
    EmptyNodeName,

    #[error("No node is selected")]
    NothingSelected,

    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    #[error("Parent node not found: {id}")]
    ParentNotFound { id: String },

    #[error("Suggestion index {index} is out of range ({available} available)")]
    SuggestionIndex { index: usize, available: usize },

    #[error("Error reading or parsing the file: {0}")]
    ImportJson(serde_json::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(serde_json::Error),

    #[error("Invalid JSON file format: {message}")]
    ImportShape { message: String },

    #[error("A mind map cannot be deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("Invalid JSON file format: duplicate node id {id:?}")]
    DuplicateNodeId { id: String },
}
