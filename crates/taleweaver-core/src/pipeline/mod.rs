//! Story pipeline components.
//!
//! - **validate**: Upload checks (size limit, magic bytes)
//! - **workspace**: Per-request session directories
//! - **processor**: Orchestrates caption → story → speech

pub mod processor;
pub mod validate;
pub mod workspace;

pub use processor::StoryPipeline;
pub use validate::Validator;
pub use workspace::SessionWorkspace;
