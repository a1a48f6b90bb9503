//! # partbox
//!
//! Particle configurations for Monte Carlo molecular simulation: particle
//! type templates, periodic domains, group selections and incrementally
//! maintained cell lists.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`ParticleType`, `Particle`,
//!   `Group`, `Select`), periodic geometry (`Domain`, `CellList`), model parameters
//!   and file formats.
//!
//! - **[`engine`]: The Logic Core.** The stateful `Configuration` aggregate. Every
//!   mutation (adding or removing particles, displacing sites, relabeling site types)
//!   updates group selections and cell lists in the same call, and trial moves can be
//!   run as transactions that restore the previous state exactly on rejection.
//!
//! - **[`workflows`]: The Public API.** Builds a configuration from a TOML setup file
//!   or a snapshot, audits it and summarizes it.

pub mod core;
pub mod engine;
pub mod workflows;
