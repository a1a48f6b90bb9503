//! # Core Models Module
//!
//! Data structures describing particles: immutable per-type templates, the
//! deduplicated unique-type view used for parameter lookup, and live particle
//! instances with their sites and dynamic properties.
//!
//! ## Key Components
//!
//! - [`properties`] - Ordered named scalar properties shared by sites, bonds and caches
//! - [`site`] - Template sites and instance sites
//! - [`topology`] - Template bonds (two or more sites)
//! - [`particle`] - Particle type descriptors, templates and instances
//! - [`catalog`] - Registry of particle types and their unique types
//! - [`ids`] - Stable particle identifiers and site handles
//!
//! ## Usage
//!
//! ```ignore
//! use partbox::core::models::particle::ParticleTypeDescriptor;
//!
//! let mut lj = ParticleTypeDescriptor::new("lj");
//! let t = lj.add_site_type([("epsilon", 1.0), ("sigma", 1.0)].into_iter().collect());
//! lj.add_site(t, &[0.0, 0.0, 0.0]);
//! ```

pub mod catalog;
pub mod ids;
pub mod particle;
pub mod properties;
pub mod site;
pub mod topology;
