#![forbid(unsafe_code)]

//! Mind-map editing core (headless).
//!
//! - [`node`]: immutable, structurally shared tree snapshots
//! - [`history`]: linear undo/redo log
//! - [`session`]: the editor session wiring user actions to tree + history
//! - [`suggest`]: boundary to the external suggestion service
//!
//! Suggestion fetching is runtime-agnostic: the service returns a boxed future that callers can
//! drive with any executor.

pub mod config;
pub mod error;
pub mod history;
pub mod id;
pub mod node;
pub mod session;
pub mod suggest;

pub use config::SprigConfig;
pub use error::{Error, Result};
pub use history::History;
pub use id::{IdGenerator, SequentialIdGenerator, TimestampIdGenerator};
pub use node::{MAX_DEPTH, Node, ROOT_ID, add_child, try_add_child};
pub use session::{Selection, Session, Snapshot, SuggestionRequest};
pub use suggest::{
    PlaceholderSuggestions, SUGGESTION_COUNT, StaticSuggestions, SuggestionError,
    SuggestionService,
};
