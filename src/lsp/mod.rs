//! LSP Protocol Implementation
//!
//! Publishes validation diagnostics for open economy XML documents.

pub mod backend;
pub mod document;
pub mod handlers;
pub mod server;

pub use backend::Backend;
