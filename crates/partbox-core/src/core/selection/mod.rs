//! Declarative subsets of the configuration.
//!
//! A [`group::Group`] describes which sites belong to a subset; a
//! [`select::Select`] is the live list of particles and site indices that
//! currently satisfy it.

pub mod group;
pub mod select;
