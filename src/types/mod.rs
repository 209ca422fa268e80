//! Core types for llmux.

pub mod message;
pub mod options;
pub mod usage;

pub use message::*;
pub use options::*;
pub use usage::*;
