use super::traits::{StateFile, read_to_string};
use crate::core::models::particle::ParticleTypeDescriptor;
use crate::core::models::properties::Properties;
use crate::core::params::constants::PhysicalConstants;
use crate::core::selection::group::Group;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete persisted state of a configuration.
///
/// Only primary state is stored. Cell-list membership, cell caches on sites,
/// group selections and model-parameter tables are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Snapshot {
    pub wrap: bool,
    pub physical_constants: PhysicalConstants,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainSnapshot>,
    #[serde(default)]
    pub particle_types: Vec<ParticleTypeDescriptor>,
    /// User groups, excluding the universal group.
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub particles: Vec<ParticleSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DomainSnapshot {
    pub side_lengths: Vec<f64>,
    #[serde(default)]
    pub cells: Vec<CellListSpec>,
}

/// Definition of one cell list: target cell length and populating group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CellListSpec {
    pub cell_length: f64,
    #[serde(default)]
    pub group: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParticleSnapshot {
    pub particle_type: usize,
    pub sites: Vec<SiteSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SiteSnapshot {
    #[serde(rename = "type")]
    pub site_type: usize,
    pub position: [f64; 3],
    /// Dynamic properties other than cell caches.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// TOML encoding of a [`Snapshot`].
pub struct SnapshotFile;

impl StateFile for SnapshotFile {
    type Data = Snapshot;
    type Error = SnapshotError;

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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let mut lj = ParticleTypeDescriptor::new("lj.toml");
        let t = lj.add_site_type([("epsilon", 1.0), ("sigma", 1.0)].into_iter().collect());
        lj.add_site(t, &[0.0, 0.0, 0.0]);
        Snapshot {
            wrap: false,
            physical_constants: PhysicalConstants::by_name("CODATA2010").unwrap(),
            domain: Some(DomainSnapshot {
                side_lengths: vec![7.0, 7.0, 7.0],
                cells: vec![
                    CellListSpec { cell_length: 1.0, group: 0 },
                    CellListSpec { cell_length: 1.4, group: 1 },
                ],
            }),
            particle_types: vec![lj],
            groups: vec![Group::new().add_site_type(0).named("A")],
            particles: vec![ParticleSnapshot {
                particle_type: 0,
                sites: vec![SiteSnapshot {
                    site_type: 0,
                    position: [-581.0, 83.34, 0.011566],
                    properties: [("tag", 2.0)].into_iter().collect(),
                }],
            }],
        }
    }

    #[test]
    fn snapshot_reads_back_identically() {
        let snapshot = sample();
        let mut buffer = Vec::new();
        SnapshotFile::write_to(&snapshot, &mut buffer).unwrap();
        let back = SnapshotFile::read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let text = "wrap = true\nphysical-constants = \"CODATA2018\"\nenergy = 1.0\n";
        assert!(matches!(
            SnapshotFile::read_from(&mut text.as_bytes()),
            Err(SnapshotError::Toml(_))
        ));
    }

    #[test]
    fn minimal_snapshot_defaults_to_empty_state() {
        let text = "wrap = true\nphysical-constants = \"CODATA2018\"\n";
        let snapshot = SnapshotFile::read_from(&mut text.as_bytes()).unwrap();
        assert!(snapshot.domain.is_none());
        assert!(snapshot.particles.is_empty());
        assert!(snapshot.groups.is_empty());
    }
}
