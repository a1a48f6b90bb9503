use super::traits::{StateFile, read_to_string};
use crate::core::models::catalog::CatalogError;
use crate::core::models::particle::ParticleTypeDescriptor;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

/// TOML particle-type template file.
///
/// ```toml
/// [[site-types]]
/// epsilon = 1.0
/// sigma = 1.0
/// cutoff = 3.0
///
/// [[sites]]
/// type = 0
/// position = [0.0, 0.0, 0.0]
/// ```
///
/// Bonds are declared the same way through `[[bond-types]]` and `[[bonds]]`
/// (`type` plus the list of bonded `sites`).
pub struct TemplateFile;

impl TemplateFile {
    /// Loads and validates a template, naming it after `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ParticleTypeDescriptor, TemplateError> {
        let mut descriptor = Self::read_from_path(&path)?;
        descriptor.source = path.as_ref().to_string_lossy().to_string();
        descriptor.validate()?;
        Ok(descriptor)
    }
}

impl StateFile for TemplateFile {
    type Data = ParticleTypeDescriptor;
    type Error = TemplateError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Data, Self::Error> {
        let content = read_to_string(reader)?;
        Ok(toml::from_str(&content)?)
    }

    fn write_to(data: &Self::Data, writer: &mut impl Write) -> Result<(), Self::Error> {
        let content = toml::to_string(data)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }
}
