//! I/O adapters for the push gate.

pub mod config;
pub mod documents;
pub mod git;
pub mod knowledge_store;
pub mod layout;
pub mod probe;
pub mod process;
