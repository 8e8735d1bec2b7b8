//! Shared plumbing for the VibeFlow command line tools

pub mod output;
pub mod settings;
