//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::engine`] and [`crate::core`]
//! layers together for end users.
//!
//! - **Setup Workflow** ([`setup`]) - Builds a configuration from a TOML setup
//!   file or restores one from a snapshot, audits its caches and summarizes it.

pub mod setup;
