//! Reading and writing configuration state.
//!
//! Three formats share the [`traits::StateFile`] interface:
//!
//! - [`template`] - TOML particle-type templates
//! - [`frame`] - CSV coordinate frames, one record per site
//! - [`snapshot`] - TOML snapshots of the complete configuration

pub mod frame;
pub mod snapshot;
pub mod template;
pub mod traits;
