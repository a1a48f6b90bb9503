use crate::core::models::particle::Particle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("Unrecognized group argument '{keyword}'")]
    UnknownKeyword { keyword: String },
    #[error("Invalid value '{value}' for group argument '{keyword}'")]
    InvalidValue { keyword: String, value: String },
}

/// A declarative filter over particle types and site types.
///
/// Filters are ANDed: a site matches when its particle's type is listed (or
/// no particle types are listed) and its own site type is listed (or no site
/// types are listed). A group with no filters matches every site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    site_types: Vec<usize>,
    #[serde(default)]
    particle_types: Vec<usize>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_site_type(mut self, site_type: usize) -> Self {
        if !self.site_types.contains(&site_type) {
            self.site_types.push(site_type);
        }
        self
    }

    pub fn add_particle_type(mut self, particle_type: usize) -> Self {
        if !self.particle_types.contains(&particle_type) {
            self.particle_types.push(particle_type);
        }
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Builds a group from keyword/value pairs such as
    /// `[("add_site_type", "0"), ("add_particle_type", "1")]`.
    ///
    /// Recognized keywords are `add_site_type`, `add_particle_type` and
    /// `name`. Repeated keywords accumulate.
    pub fn from_args(args: &[(&str, &str)]) -> Result<Self, GroupError> {
        let parse = |keyword: &str, value: &str| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| GroupError::InvalidValue {
                    keyword: keyword.to_string(),
                    value: value.to_string(),
                })
        };
        let mut group = Self::new();
        for &(keyword, value) in args {
            group = match keyword {
                "add_site_type" => group.add_site_type(parse(keyword, value)?),
                "add_particle_type" => group.add_particle_type(parse(keyword, value)?),
                "name" => group.named(value),
                _ => {
                    return Err(GroupError::UnknownKeyword {
                        keyword: keyword.to_string(),
                    });
                }
            };
        }
        Ok(group)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name_if_missing(&mut self, name: &str) {
        if self.name.is_none() {
            self.name = Some(name.to_string());
        }
    }

    /// Whether this group is tagged with `name`.
    pub fn has_property(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn site_types(&self) -> &[usize] {
        &self.site_types
    }

    pub fn particle_types(&self) -> &[usize] {
        &self.particle_types
    }

    pub fn is_universal(&self) -> bool {
        self.site_types.is_empty() && self.particle_types.is_empty()
    }

    pub fn matches_particle_type(&self, particle_type: usize) -> bool {
        self.particle_types.is_empty() || self.particle_types.contains(&particle_type)
    }

    pub fn matches_site_type(&self, site_type: usize) -> bool {
        self.site_types.is_empty() || self.site_types.contains(&site_type)
    }

    /// Indices of the sites of `particle` selected by this group, in site order.
    pub fn site_indices(&self, particle: &Particle) -> Vec<usize> {
        if !self.matches_particle_type(particle.particle_type()) {
            return Vec::new();
        }
        particle
            .sites()
            .iter()
            .enumerate()
            .filter(|(_, site)| self.matches_site_type(site.site_type()))
            .map(|(index, _)| index)
            .collect()
    }

    /// Whether one site of a particle of `particle_type` is selected.
    pub fn matches(&self, particle_type: usize, site_type: usize) -> bool {
        self.matches_particle_type(particle_type) && self.matches_site_type(site_type)
    }
}
