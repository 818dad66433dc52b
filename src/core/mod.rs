// Public modules
pub mod config;
pub mod defaults;
pub mod error;
pub mod flags;
pub mod job;
pub mod pipeline;
pub mod process;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
