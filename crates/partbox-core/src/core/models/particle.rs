use super::catalog::CatalogError;
use super::properties::Properties;
use super::site::{ParticleSite, Site};
use super::topology::Bond;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Position of a template site as written in a template file (1 to 3 coordinates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSpec {
    #[serde(rename = "type")]
    pub site_type: usize,
    pub position: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BondSpec {
    #[serde(rename = "type")]
    pub bond_type: usize,
    pub sites: Vec<usize>,
}

/// Raw description of a particle type, as produced by a template reader.
///
/// Site and bond types are local to the descriptor (numbered from zero);
/// they are shifted to global type numbers when the descriptor is
/// registered with a catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParticleTypeDescriptor {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub site_types: Vec<Properties>,
    pub sites: Vec<SiteSpec>,
    #[serde(default)]
    pub bond_types: Vec<Properties>,
    #[serde(default)]
    pub bonds: Vec<BondSpec>,
}

impl ParticleTypeDescriptor {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    /// Declares a new local site type and returns its number.
    pub fn add_site_type(&mut self, properties: Properties) -> usize {
        self.site_types.push(properties);
        self.site_types.len() - 1
    }

    pub fn add_site(&mut self, site_type: usize, position: &[f64]) -> &mut Self {
        self.sites.push(SiteSpec {
            site_type,
            position: position.to_vec(),
        });
        self
    }

    /// Declares a new local bond type and returns its number.
    pub fn add_bond_type(&mut self, properties: Properties) -> usize {
        self.bond_types.push(properties);
        self.bond_types.len() - 1
    }

    pub fn add_bond(&mut self, bond_type: usize, sites: &[usize]) -> &mut Self {
        self.bonds.push(BondSpec {
            bond_type,
            sites: sites.to_vec(),
        });
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |message: String| CatalogError::InvalidTemplate {
            source_name: self.source.clone(),
            message,
        };

        if self.sites.is_empty() {
            return Err(invalid("a particle type needs at least one site".to_string()));
        }
        for (index, site) in self.sites.iter().enumerate() {
            if site.site_type >= self.site_types.len() {
                return Err(invalid(format!(
                    "site {index} uses undeclared site type {}",
                    site.site_type
                )));
            }
            if site.position.is_empty() || site.position.len() > 3 {
                return Err(invalid(format!(
                    "site {index} has {} coordinates, expected 1 to 3",
                    site.position.len()
                )));
            }
            if site.position.iter().any(|x| !x.is_finite()) {
                return Err(invalid(format!("site {index} has a non-finite coordinate")));
            }
        }
        for (index, bond) in self.bonds.iter().enumerate() {
            if bond.bond_type >= self.bond_types.len() {
                return Err(invalid(format!(
                    "bond {index} uses undeclared bond type {}",
                    bond.bond_type
                )));
            }
            if bond.sites.len() < 2 {
                return Err(invalid(format!("bond {index} connects fewer than two sites")));
            }
            if let Some(site) = bond.sites.iter().find(|&&s| s >= self.sites.len()) {
                return Err(invalid(format!(
                    "bond {index} references non-existent site {site}"
                )));
            }
            let distinct: HashSet<_> = bond.sites.iter().collect();
            if distinct.len() != bond.sites.len() {
                return Err(invalid(format!("bond {index} repeats a site")));
            }
        }
        Ok(())
    }
}

/// Immutable template shared by every particle of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleType {
    source: String,
    sites: Vec<Site>,
    bonds: Vec<Bond>,
}

impl ParticleType {
    /// Builds a template, shifting local site/bond types by the given offsets.
    pub(crate) fn from_descriptor(
        descriptor: &ParticleTypeDescriptor,
        site_type_offset: usize,
        bond_type_offset: usize,
    ) -> Result<Self, CatalogError> {
        descriptor.validate()?;

        let sites = descriptor
            .sites
            .iter()
            .map(|spec| {
                let mut coords = [0.0; 3];
                coords[..spec.position.len()].copy_from_slice(&spec.position);
                Site::new(
                    spec.site_type + site_type_offset,
                    Point3::from(coords),
                    descriptor.site_types[spec.site_type].clone(),
                )
            })
            .collect();

        let bonds = descriptor
            .bonds
            .iter()
            .map(|spec| {
                Bond::new(
                    spec.bond_type + bond_type_offset,
                    spec.sites.clone(),
                    descriptor.bond_types[spec.bond_type].clone(),
                )
            })
            .collect();

        Ok(Self {
            source: descriptor.source.clone(),
            sites,
            bonds,
        })
    }

    /// Name of the file or descriptor this type was built from.
    pub fn source(&self) -> &str {
        &self.source
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

    /// Returns the two-site bond between `site1` and `site2`, in either order.
    pub fn find_bond(&self, site1: usize, site2: usize) -> Option<&Bond> {
        self.bonds
            .iter()
            .find(|bond| bond.num_sites() == 2 && bond.contains(site1) && bond.contains(site2))
    }

    /// Sites directly bonded to `site`, in bond declaration order.
    pub fn bond_neighbors(&self, site: usize) -> Vec<usize> {
        self.bonds
            .iter()
            .filter(|bond| bond.num_sites() == 2 && bond.contains(site))
            .filter_map(|bond| bond.sites.iter().copied().find(|&other| other != site))
            .collect()
    }

    /// Distinct site types in order of first appearance.
    pub fn site_types(&self) -> Vec<usize> {
        let mut seen = Vec::new();
        for site in &self.sites {
            if !seen.contains(&site.site_type) {
                seen.push(site.site_type);
            }
        }
        seen
    }

    /// Distinct bond types in order of first appearance.
    pub fn bond_types(&self) -> Vec<usize> {
        let mut seen = Vec::new();
        for bond in &self.bonds {
            if !seen.contains(&bond.bond_type) {
                seen.push(bond.bond_type);
            }
        }
        seen
    }

    pub fn num_sites_of_type(&self, site_type: usize) -> usize {
        self.sites.iter().filter(|s| s.site_type == site_type).count()
    }
}

/// A live particle: its type index plus instance sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    particle_type: usize,
    pub(crate) sites: Vec<ParticleSite>,
}

impl Particle {
    /// Instantiates a particle with the template layout as initial positions.
    pub(crate) fn instantiate(particle_type: usize, template: &ParticleType) -> Self {
        let sites = template
            .sites()
            .iter()
            .map(|site| ParticleSite::new(site.site_type, site.position))
            .collect();
        Self {
            particle_type,
            sites,
        }
    }

    pub fn particle_type(&self) -> usize {
        self.particle_type
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn site(&self, index: usize) -> Option<&ParticleSite> {
        self.sites.get(index)
    }

    pub fn sites(&self) -> &[ParticleSite] {
        &self.sites
    }

    pub fn num_sites_of_type(&self, site_type: usize) -> usize {
        self.sites.iter().filter(|s| s.site_type == site_type).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_descriptor(length: usize) -> ParticleTypeDescriptor {
        let mut desc = ParticleTypeDescriptor::new("chain");
        let bead = desc.add_site_type([("epsilon", 1.0), ("sigma", 1.0)].into_iter().collect());
        let spring = desc.add_bond_type([("length", 1.0)].into_iter().collect());
        for i in 0..length {
            desc.add_site(bead, &[i as f64, 0.0, 0.0]);
        }
        for i in 1..length {
            desc.add_bond(spring, &[i - 1, i]);
        }
        desc
    }

    #[test]
    fn from_descriptor_offsets_site_and_bond_types() {
        let ptype = ParticleType::from_descriptor(&chain_descriptor(3), 2, 5).unwrap();
        assert_eq!(ptype.source(), "chain");
        assert!(ptype.sites().iter().all(|s| s.site_type == 2));
        assert!(ptype.bonds().iter().all(|b| b.bond_type == 5));
        assert_eq!(ptype.site(1).unwrap().position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(ptype.site(2).unwrap().property("sigma"), Some(1.0));
    }

    #[test]
    fn short_positions_are_padded_with_zeros() {
        let mut desc = ParticleTypeDescriptor::new("disk");
        let t = desc.add_site_type(Properties::new());
        desc.add_site(t, &[0.5, -0.25]);
        let ptype = ParticleType::from_descriptor(&desc, 0, 0).unwrap();
        assert_eq!(ptype.site(0).unwrap().position, Point3::new(0.5, -0.25, 0.0));
    }

    #[test]
    fn bond_lookup_and_neighbors_follow_declaration_order() {
        let chain = ParticleType::from_descriptor(&chain_descriptor(10), 0, 0).unwrap();
        assert!(chain.find_bond(9, 10).is_none());
        assert_eq!(chain.find_bond(9, 8).unwrap().bond_type, 0);
        assert_eq!(chain.bond_neighbors(9), vec![8]);
        assert_eq!(chain.bond_neighbors(8), vec![7, 9]);
        assert_eq!(chain.bond_neighbors(1), vec![0, 2]);
        assert_eq!(chain.num_bonds(), 9);
    }

    #[test]
    fn validate_rejects_undeclared_site_type() {
        let mut desc = ParticleTypeDescriptor::new("bad");
        desc.add_site(0, &[0.0, 0.0, 0.0]);
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("undeclared site type 0"));
    }

    #[test]
    fn validate_rejects_bond_to_missing_site() {
        let mut desc = chain_descriptor(2);
        desc.add_bond(0, &[1, 2]);
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("non-existent site 2"));
    }

    #[test]
    fn validate_rejects_degenerate_bonds_and_positions() {
        let mut desc = chain_descriptor(2);
        desc.add_bond(0, &[1]);
        assert!(desc.validate().is_err());

        let mut desc = chain_descriptor(2);
        desc.add_bond(0, &[1, 1]);
        assert!(desc.validate().is_err());

        let mut desc = chain_descriptor(1);
        desc.sites[0].position = vec![0.0, 0.0, 0.0, 0.0];
        assert!(desc.validate().is_err());

        assert!(ParticleTypeDescriptor::new("empty").validate().is_err());
    }

    #[test]
    fn instantiate_copies_layout_but_not_bonds() {
        let ptype = ParticleType::from_descriptor(&chain_descriptor(4), 0, 0).unwrap();
        let particle = Particle::instantiate(3, &ptype);
        assert_eq!(particle.particle_type(), 3);
        assert_eq!(particle.num_sites(), 4);
        assert_eq!(particle.num_sites_of_type(0), 4);
        assert_eq!(
            particle.site(3).unwrap().position(),
            &Point3::new(3.0, 0.0, 0.0)
        );
        assert!(particle.site(0).unwrap().properties().is_empty());
    }

    #[test]
    fn site_types_lists_distinct_types_in_order() {
        let mut desc = ParticleTypeDescriptor::new("spce");
        let o = desc.add_site_type([("charge", -0.8476)].into_iter().collect());
        let h = desc.add_site_type([("charge", 0.4238)].into_iter().collect());
        desc.add_site(o, &[0.0, 0.0, 0.0])
            .add_site(h, &[1.0, 0.0, 0.0])
            .add_site(h, &[-0.333313, 0.942816, 0.0]);
        let ptype = ParticleType::from_descriptor(&desc, 0, 0).unwrap();
        assert_eq!(ptype.site_types(), vec![0, 1]);
        assert_eq!(ptype.num_sites_of_type(1), 2);
        assert!(ptype.bond_types().is_empty());
    }
}
