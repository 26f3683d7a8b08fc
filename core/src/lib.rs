//! Core of the deck composer: the undoable document store, session
//! persistence, and the agent pipeline that feeds generated content into
//! the document model.

pub mod backend;
pub mod composer;
pub mod config;
pub mod decode;
pub mod deckgen;
pub mod error;
pub mod persist;
pub mod pipeline;
pub mod prompts;
pub mod store;

pub use backend::{Backend, GenerativeBackend, HttpBackend};
pub use composer::{composer_store, ComposerStore};
pub use config::Config;
pub use error::{DeckError, Result};
pub use persist::SessionStore;
pub use pipeline::{AgentPipeline, PipelineRun, PipelineStep};
pub use store::{UndoableAction, UndoableStore, MAX_HISTORY};
