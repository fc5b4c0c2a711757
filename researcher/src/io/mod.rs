//! Side-effecting capabilities: config, reasoning, retrieval, storage.

pub mod brain;
pub mod config;
pub mod document_store;
pub mod init;
pub mod process;
pub mod prompt;
pub mod tools;
