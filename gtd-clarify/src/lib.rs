// Clarify workflow engine
pub mod engine;

// Planned-disposition computation shared by commit and summary
pub mod disposition;

// Debounced stats refresh collaborator
pub mod stats;

// HTTP binding of the persistence boundary
pub mod api;

pub use engine::{ClarifyEngine, WorkflowSnapshot};
