use super::configuration::Configuration;
use super::error::ConfigurationError;
use crate::core::domain::periodic::Domain;
use crate::core::io::frame::FrameFile;
use crate::core::io::snapshot::CellListSpec;
use crate::core::io::traits::StateFile;
use crate::core::models::particle::ParticleTypeDescriptor;
use crate::core::params::constants::PhysicalConstants;
use crate::core::selection::group::Group;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid setup: {0}")]
    Invalid(String),
}

/// Settings fixed when a configuration is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigurationSettings {
    /// Fold positions into the primary image after every displacement.
    pub wrap: bool,
    pub physical_constants: PhysicalConstants,
}

impl Default for ConfigurationSettings {
    fn default() -> Self {
        Self {
            wrap: true,
            physical_constants: PhysicalConstants::default(),
        }
    }
}

/// Where a particle type comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleTypeSource {
    File(PathBuf),
    Descriptor(ParticleTypeDescriptor),
}

#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    wrap: Option<bool>,
    physical_constants: Option<PhysicalConstants>,
    side_lengths: Option<Vec<f64>>,
    cells: Vec<CellListSpec>,
    particle_types: Vec<ParticleTypeSource>,
    groups: Vec<Group>,
    particles: Vec<(usize, usize)>,
    frame: Option<PathBuf>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = Some(wrap);
        self
    }
    pub fn physical_constants(mut self, constants: PhysicalConstants) -> Self {
        self.physical_constants = Some(constants);
        self
    }
    pub fn side_lengths(mut self, side_lengths: Vec<f64>) -> Self {
        self.side_lengths = Some(side_lengths);
        self
    }
    pub fn cubic_box_length(mut self, length: f64, dimension: usize) -> Self {
        self.side_lengths = Some(vec![length; dimension]);
        self
    }
    pub fn cell_list(mut self, cell_length: f64, group: usize) -> Self {
        self.cells.push(CellListSpec { cell_length, group });
        self
    }
    pub fn particle_type_file(mut self, path: PathBuf) -> Self {
        self.particle_types.push(ParticleTypeSource::File(path));
        self
    }
    pub fn particle_type(mut self, descriptor: ParticleTypeDescriptor) -> Self {
        self.particle_types
            .push(ParticleTypeSource::Descriptor(descriptor));
        self
    }
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }
    pub fn particles(mut self, particle_type: usize, count: usize) -> Self {
        self.particles.push((particle_type, count));
        self
    }
    pub fn frame(mut self, path: PathBuf) -> Self {
        self.frame = Some(path);
        self
    }

    pub fn settings(&self) -> ConfigurationSettings {
        let defaults = ConfigurationSettings::default();
        ConfigurationSettings {
            wrap: self.wrap.unwrap_or(defaults.wrap),
            physical_constants: self
                .physical_constants
                .unwrap_or(defaults.physical_constants),
        }
    }

    /// Builds the configuration: types, then groups, domain and cell lists,
    /// then particles, and finally the optional frame.
    pub fn build(self) -> Result<Configuration, ConfigurationError> {
        if !self.cells.is_empty() && self.side_lengths.is_none() {
            return Err(ConfigError::MissingParameter("side_lengths").into());
        }
        if self.particle_types.is_empty()
            && (!self.groups.is_empty() || !self.particles.is_empty() || self.frame.is_some())
        {
            return Err(ConfigError::MissingParameter("particle_types").into());
        }

        let mut config = Configuration::new(self.settings());
        for source in &self.particle_types {
            match source {
                ParticleTypeSource::File(path) => config.add_particle_type_file(path)?,
                ParticleTypeSource::Descriptor(descriptor) => {
                    config.add_particle_type(descriptor)?
                }
            };
        }
        for group in self.groups {
            config.add_group(group)?;
        }
        if let Some(side_lengths) = &self.side_lengths {
            config.set_domain(Domain::new(side_lengths)?)?;
        }
        for cells in &self.cells {
            config.init_cells(cells.cell_length, cells.group)?;
        }
        for &(particle_type, count) in &self.particles {
            for _ in 0..count {
                config.add_particle_of_type(particle_type)?;
            }
        }
        if let Some(path) = &self.frame {
            let frame = FrameFile::read_from_path(path)?;
            config.load_frame(&frame)?;
        }
        debug!(
            "Built configuration with {} particle types and {} particles",
            config.num_particle_types(),
            config.num_particles()
        );
        Ok(config)
    }
}

fn default_wrap() -> bool {
    true
}

fn default_dimension() -> usize {
    3
}

/// TOML setup file describing a configuration to build.
///
/// ```toml
/// physical-constants = "CODATA2018"
///
/// [domain]
/// cubic-box-length = 7.0
///
/// [[domain.cells]]
/// cell-length = 1.4
///
/// [[particle-types]]
/// path = "water.toml"
///
/// [[groups]]
/// name = "oxygen"
/// site-types = [0]
///
/// [[particles]]
/// particle-type = 0
/// count = 100
/// ```
///
/// Relative paths are resolved against the setup file's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigurationFile {
    #[serde(default = "default_wrap")]
    pub wrap: bool,
    #[serde(default)]
    pub physical_constants: PhysicalConstants,
    #[serde(default)]
    pub domain: Option<DomainSection>,
    #[serde(default)]
    pub particle_types: Vec<ParticleTypeSection>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub particles: Vec<ParticleCount>,
    #[serde(default)]
    pub frame: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DomainSection {
    #[serde(default)]
    pub side_lengths: Option<Vec<f64>>,
    #[serde(default)]
    pub cubic_box_length: Option<f64>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub cells: Vec<CellListSpec>,
}

/// A particle type given either as a template path or inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParticleTypeSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub template: Option<ParticleTypeDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParticleCount {
    pub particle_type: usize,
    pub count: usize,
}

impl ConfigurationFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Translates the file into a builder, resolving relative paths
    /// against `base_dir`.
    pub fn into_builder(self, base_dir: &Path) -> Result<ConfigurationBuilder, ConfigError> {
        let resolve = |path: PathBuf| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        };

        let mut builder = ConfigurationBuilder::new()
            .wrap(self.wrap)
            .physical_constants(self.physical_constants);

        if let Some(domain) = self.domain {
            builder = match (domain.side_lengths, domain.cubic_box_length) {
                (Some(lengths), None) => builder.side_lengths(lengths),
                (None, Some(length)) => builder.cubic_box_length(length, domain.dimension),
                (Some(_), Some(_)) => {
                    return Err(ConfigError::Invalid(
                        "domain sets both side-lengths and cubic-box-length".to_string(),
                    ));
                }
                (None, None) => return Err(ConfigError::MissingParameter("domain.side-lengths")),
            };
            for cells in domain.cells {
                builder = builder.cell_list(cells.cell_length, cells.group);
            }
        }

        for (index, section) in self.particle_types.into_iter().enumerate() {
            builder = match (section.path, section.template) {
                (Some(path), None) => builder.particle_type_file(resolve(path)),
                (None, Some(template)) => {
                    let mut template = template;
                    if template.source.is_empty() {
                        template.source = format!("particle-types[{index}]");
                    }
                    builder.particle_type(template)
                }
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "particle-types[{index}] must set exactly one of path or template"
                    )));
                }
            };
        }
        for group in self.groups {
            builder = builder.group(group);
        }
        for entry in self.particles {
            builder = builder.particles(entry.particle_type, entry.count);
        }
        if let Some(frame) = self.frame {
            builder = builder.frame(resolve(frame));
        }
        Ok(builder)
    }
}
