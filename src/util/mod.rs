//! Utility modules: call context and retry.

pub mod context;
pub mod retry;
