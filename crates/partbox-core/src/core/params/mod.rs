//! Site-type model parameters and physical constants.

pub mod constants;
pub mod model;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("The class name \"{name}\" is not recognized")]
    UnrecognizedClass { name: String },
    #[error("Model parameter '{name}' not found")]
    UnknownProperty { name: String },
    #[error("Site type {site_type} is out of range ({num_site_types} site types)")]
    SiteTypeOutOfRange { site_type: usize, num_site_types: usize },
}
