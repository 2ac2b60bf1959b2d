//! Crate-level tests over real files in temporary workspaces.

mod knowledge_setup;
