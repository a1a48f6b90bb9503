//! # Engine Module
//!
//! The stateful layer: the [`configuration::Configuration`] aggregate that owns
//! particles, templates, groups and the periodic domain, and keeps every derived
//! cache (group selections, cell lists, `cellK` site properties) consistent with
//! primary state after each mutation.
//!
//! ## Architecture
//!
//! - **Configuration** ([`configuration`]) - Particle storage, group selections,
//!   displacement with wrapping, cell-list maintenance and consistency checks
//! - **Setup** ([`config`]) - Settings, the programmatic builder and the TOML setup file
//! - **Transactions** - Trial moves that are restored exactly when rejected
//! - **Persistence** - Snapshot and frame files for saving and reloading state
//! - **Error Handling** ([`error`]) - Engine-level error type wrapping the core errors

pub mod config;
pub mod configuration;
pub mod error;
mod persistence;
mod transaction;

#[cfg(test)]
pub(crate) mod fixtures;
