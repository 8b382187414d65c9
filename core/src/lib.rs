pub mod adapter;
pub mod application;
pub mod cli;
pub mod config;
pub mod desktop;
pub mod dispatch;
pub mod engine;
pub mod instance;
pub mod interpreter;
pub mod placeholder;
pub mod search;
pub mod store;
pub mod tagging;
pub mod types;

// Re-export main types
pub use types::*;

// Re-export init API for convenience
pub use application::{initialize, Application, InitBuilder, InitOptions};
pub use engine::{ExecutionEngine, ExecutionError, Outcome};
pub use store::{CommandStore, StoreError};
