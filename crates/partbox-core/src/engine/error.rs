use super::config::ConfigError;
use crate::core::domain::periodic::DomainError;
use crate::core::io::frame::FrameError;
use crate::core::io::snapshot::SnapshotError;
use crate::core::io::template::TemplateError;
use crate::core::models::catalog::CatalogError;
use crate::core::models::ids::ParticleId;
use crate::core::params::ParamsError;
use crate::core::selection::group::GroupError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Particle types cannot be added after particles exist")]
    TypesAfterParticles,

    #[error("Must add groups after particle types")]
    GroupBeforeTypes,

    #[error("Particle index {index} is out of range ({num_particles} particles)")]
    ParticleOutOfRange { index: usize, num_particles: usize },

    #[error("Particle {id:?} not found")]
    ParticleNotFound { id: ParticleId },

    #[error("Site {site} is out of range for particle {particle} ({num_sites} sites)")]
    SiteOutOfRange {
        particle: usize,
        site: usize,
        num_sites: usize,
    },

    #[error("Site {site} of particle {particle} is selected more than once")]
    DuplicateSite { particle: usize, site: usize },

    #[error("Particle type {particle_type} is out of range ({num_particle_types} types)")]
    ParticleTypeOutOfRange {
        particle_type: usize,
        num_particle_types: usize,
    },

    #[error("Site type {site_type} is out of range ({num_site_types} site types)")]
    SiteTypeOutOfRange {
        site_type: usize,
        num_site_types: usize,
    },

    #[error("Group {group} is out of range ({num_groups} groups)")]
    GroupOutOfRange { group: usize, num_groups: usize },

    #[error("Group '{name}' not found")]
    GroupNotFound { name: String },

    #[error("Property '{name}' not found on site {site} of particle {particle}")]
    PropertyNotFound {
        name: String,
        particle: usize,
        site: usize,
    },

    #[error("Property '{name}' is reserved for cell-list caches")]
    ReservedProperty { name: String },

    #[error("A domain must be set before {operation}")]
    DomainNotSet { operation: &'static str },

    #[error("Domain dimension {found} does not match configuration dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Expected a selection of exactly one particle, found {found}")]
    NotSingleParticle { found: usize },

    #[error("Particle of type {particle_type} has {expected} sites but {found} positions were given")]
    PositionCount {
        particle_type: usize,
        expected: usize,
        found: usize,
    },

    #[error("Frame particle {index} has type {found} but the configuration has type {expected}")]
    FrameTypeMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Failed to load particle type '{path}': {source}")]
    Template {
        path: String,
        source: TemplateError,
    },

    #[error("Configuration is inconsistent: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
