//! # Core Module
//!
//! Stateless building blocks of a particle configuration: templates and
//! instances, periodic geometry, group filters and selections, model
//! parameters, and file formats.
//!
//! ## Architecture
//!
//! - **Particle Representation** ([`models`]) - Particle type templates, unique types and live instances
//! - **Periodic Geometry** ([`domain`]) - Box wrapping, minimum image and uniform cell lists
//! - **Selections** ([`selection`]) - Group filters and ordered particle/site selections
//! - **Model Parameters** ([`params`]) - Per-site-type parameter tables, mixing rules and physical constants
//! - **File I/O** ([`io`]) - Template, frame and snapshot formats
//!
//! Nothing here keeps derived caches in sync on its own; that is the job of
//! [`crate::engine::configuration::Configuration`].

pub mod domain;
pub mod io;
pub mod models;
pub mod params;
pub mod selection;
