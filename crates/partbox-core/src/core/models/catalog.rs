use super::particle::{ParticleType, ParticleTypeDescriptor};
use super::properties::{PROPERTY_TOLERANCE, Properties};
use super::site::Site;
use super::topology::Bond;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Particle type '{source_name}' was already provided")]
    AlreadyProvided { source_name: String },
    #[error("Invalid particle type template '{source_name}': {message}")]
    InvalidTemplate { source_name: String, message: String },
}

/// Append-only registry of particle types.
///
/// Site and bond types are global across the registry: each new template's
/// local types are numbered after every type registered before it.
#[derive(Debug, Clone, Default)]
pub struct ParticleTypes {
    types: Vec<ParticleType>,
    descriptors: Vec<ParticleTypeDescriptor>,
    site_type_properties: Vec<Properties>,
    bond_type_properties: Vec<Properties>,
}

impl ParticleTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new particle type and returns its index.
    pub fn add(&mut self, descriptor: &ParticleTypeDescriptor) -> Result<usize, CatalogError> {
        if self.types.iter().any(|t| t.source() == descriptor.source) {
            return Err(CatalogError::AlreadyProvided {
                source_name: descriptor.source.clone(),
            });
        }
        let ptype = ParticleType::from_descriptor(
            descriptor,
            self.site_type_properties.len(),
            self.bond_type_properties.len(),
        )?;
        self.site_type_properties
            .extend(descriptor.site_types.iter().cloned());
        self.bond_type_properties
            .extend(descriptor.bond_types.iter().cloned());
        self.types.push(ptype);
        self.descriptors.push(descriptor.clone());
        Ok(self.types.len() - 1)
    }

    pub fn num(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParticleType> {
        self.types.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleType> {
        self.types.iter()
    }

    /// Descriptors in registration order, as they were provided.
    pub fn descriptors(&self) -> &[ParticleTypeDescriptor] {
        &self.descriptors
    }

    pub fn num_site_types(&self) -> usize {
        self.site_type_properties.len()
    }

    pub fn num_bond_types(&self) -> usize {
        self.bond_type_properties.len()
    }

    /// Total number of template sites across all particle types.
    pub fn num_sites(&self) -> usize {
        self.types.iter().map(ParticleType::num_sites).sum()
    }

    pub fn max_sites_in_any_particle(&self) -> usize {
        self.types
            .iter()
            .map(ParticleType::num_sites)
            .max()
            .unwrap_or(0)
    }

    /// Properties declared for a global site type.
    pub fn site_type_properties(&self, site_type: usize) -> Option<&Properties> {
        self.site_type_properties.get(site_type)
    }

    pub fn bond_type_properties(&self, bond_type: usize) -> Option<&Properties> {
        self.bond_type_properties.get(bond_type)
    }

    /// Source name of the particle type at `index`.
    pub fn type_to_source(&self, index: usize) -> Option<&str> {
        self.types.get(index).map(ParticleType::source)
    }
}

/// A particle type reduced to one representative site per site type and one
/// bond per bond type.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueType {
    sites: Vec<Site>,
    bonds: Vec<Bond>,
}

impl UniqueType {
    fn from_particle_type(ptype: &ParticleType) -> Self {
        let mut sites: Vec<Site> = Vec::new();
        for site in ptype.sites() {
            if !sites.iter().any(|s| s.site_type == site.site_type) {
                sites.push(site.clone());
            }
        }
        sites.sort_by_key(|s| s.site_type);
        let mut bonds: Vec<Bond> = Vec::new();
        for bond in ptype.bonds() {
            if !bonds.iter().any(|b| b.bond_type == bond.bond_type) {
                bonds.push(bond.clone());
            }
        }
        bonds.sort_by_key(|b| b.bond_type);
        Self { sites, bonds }
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn site(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn bond(&self, index: usize) -> Option<&Bond> {
        self.bonds.get(index)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }
}

/// Deduplicated view of the particle types, used for model-parameter lookup.
///
/// Entry `i` corresponds to particle type `i`; entries are only ever
/// appended, so indices stay valid for the lifetime of the owner.
#[derive(Debug, Clone, Default)]
pub struct UniqueTypes {
    types: Vec<UniqueType>,
    site_locations: Vec<Option<(usize, usize)>>, // Global site type -> (unique type, site)
    bond_locations: Vec<Option<(usize, usize)>>, // Global bond type -> (unique type, bond)
    equivalent_site_types: Vec<Option<usize>>,
}

impl UniqueTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the unique type of a newly registered particle type.
    pub(crate) fn add(&mut self, ptype: &ParticleType) {
        let type_index = self.types.len();
        self.types.push(UniqueType::from_particle_type(ptype));

        for position in 0..self.types[type_index].sites.len() {
            let site = &self.types[type_index].sites[position];
            let site_type = site.site_type;
            let representative = (0..self.site_locations.len())
                .find(|&other| {
                    self.site(other).is_some_and(|s| {
                        s.properties.is_equal(&site.properties, PROPERTY_TOLERANCE)
                    })
                })
                .unwrap_or(site_type);
            if self.site_locations.len() <= site_type {
                self.site_locations.resize(site_type + 1, None);
                self.equivalent_site_types.resize(site_type + 1, None);
            }
            self.site_locations[site_type] = Some((type_index, position));
            self.equivalent_site_types[site_type] = Some(representative);
        }

        for position in 0..self.types[type_index].bonds.len() {
            let bond_type = self.types[type_index].bonds[position].bond_type;
            if self.bond_locations.len() <= bond_type {
                self.bond_locations.resize(bond_type + 1, None);
            }
            self.bond_locations[bond_type] = Some((type_index, position));
        }
    }

    pub fn num(&self) -> usize {
        self.types.len()
    }

    pub fn get(&self, index: usize) -> Option<&UniqueType> {
        self.types.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniqueType> {
        self.types.iter()
    }

    /// Number of site types used by at least one template site.
    pub fn num_site_types(&self) -> usize {
        self.site_locations.iter().flatten().count()
    }

    pub fn num_sites(&self) -> usize {
        self.types.iter().map(UniqueType::num_sites).sum()
    }

    pub fn num_bond_types(&self) -> usize {
        self.bond_locations.iter().flatten().count()
    }

    /// Representative site of a global site type.
    pub fn site(&self, site_type: usize) -> Option<&Site> {
        let (t, p) = (*self.site_locations.get(site_type)?)?;
        self.types[t].sites.get(p)
    }

    /// Representative bond of a global bond type.
    pub fn bond(&self, bond_type: usize) -> Option<&Bond> {
        let (t, p) = (*self.bond_locations.get(bond_type)?)?;
        self.types[t].bonds.get(p)
    }

    /// Lowest-numbered site type whose property set equals that of `site_type`.
    pub fn equivalent_site_type(&self, site_type: usize) -> Option<usize> {
        self.equivalent_site_types.get(site_type).copied().flatten()
    }
}
