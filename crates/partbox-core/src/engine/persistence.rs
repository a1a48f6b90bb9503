use super::config::ConfigurationSettings;
use super::configuration::{Configuration, is_cell_label};
use super::error::ConfigurationError;
use crate::core::domain::periodic::Domain;
use crate::core::io::frame::FrameFile;
use crate::core::io::snapshot::{
    CellListSpec, DomainSnapshot, ParticleSnapshot, SiteSnapshot, Snapshot, SnapshotFile,
};
use crate::core::io::traits::StateFile;
use crate::core::models::properties::Properties;
use nalgebra::Point3;
use std::path::Path;
use tracing::{debug, instrument};

impl Configuration {
    /// Captures the primary state: settings, templates, user groups, domain
    /// geometry with cell-list definitions, and every particle.
    ///
    /// Cell caches on sites are left out; they are recomputed on load.
    pub fn to_snapshot(&self) -> Snapshot {
        let domain = self.domain().map(|domain| DomainSnapshot {
            side_lengths: domain.side_lengths().to_vec(),
            cells: domain
                .cells()
                .iter()
                .map(|cells| CellListSpec {
                    cell_length: cells.cell_length(),
                    group: cells.group(),
                })
                .collect(),
        });
        let groups = (1..self.num_groups())
            .filter_map(|index| self.group(index).ok().cloned())
            .collect();
        let particles = self
            .particles()
            .map(|(_, particle)| ParticleSnapshot {
                particle_type: particle.particle_type(),
                sites: particle
                    .sites()
                    .iter()
                    .map(|site| SiteSnapshot {
                        site_type: site.site_type(),
                        position: [site.position().x, site.position().y, site.position().z],
                        properties: site
                            .properties()
                            .iter()
                            .filter(|(name, _)| !is_cell_label(name))
                            .collect::<Properties>(),
                    })
                    .collect(),
            })
            .collect();

        Snapshot {
            wrap: self.is_wrapped(),
            physical_constants: *self.physical_constants(),
            domain,
            particle_types: self.particle_types().descriptors().to_vec(),
            groups,
            particles,
        }
    }

    /// Rebuilds a configuration from a snapshot.
    ///
    /// Group selections, cell lists and `cellK` caches are recomputed from
    /// the restored positions and site types.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot is internally inconsistent (unknown types,
    /// wrong site counts, invalid geometry).
    #[instrument(skip_all, name = "snapshot_restore")]
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, ConfigurationError> {
        let mut config = Self::new(ConfigurationSettings {
            wrap: snapshot.wrap,
            physical_constants: snapshot.physical_constants,
        });
        for descriptor in &snapshot.particle_types {
            config.add_particle_type(descriptor)?;
        }
        for group in &snapshot.groups {
            config.add_group(group.clone())?;
        }
        if let Some(section) = &snapshot.domain {
            config.set_domain(Domain::new(&section.side_lengths)?)?;
            for cells in &section.cells {
                config.init_cells(cells.cell_length, cells.group)?;
            }
        }

        for entry in &snapshot.particles {
            let positions: Vec<Point3<f64>> = entry
                .sites
                .iter()
                .map(|site| Point3::from(site.position))
                .collect();
            let index = config.add_particle_with_positions(entry.particle_type, &positions)?;
            for (s, site) in entry.sites.iter().enumerate() {
                if config.particle(index)?.site(s).map(|current| current.site_type())
                    != Some(site.site_type)
                {
                    config.set_site_type(index, s, site.site_type)?;
                }
                for (name, value) in site.properties.iter() {
                    config.set_site_property(index, s, name, value)?;
                }
            }
        }
        debug!(
            "Restored {} particles of {} types from snapshot",
            config.num_particles(),
            config.num_particle_types()
        );
        Ok(config)
    }

    /// Writes the snapshot of this configuration as TOML.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigurationError> {
        SnapshotFile::write_to_path(&self.to_snapshot(), path)?;
        Ok(())
    }

    /// Reads a TOML snapshot and rebuilds the configuration it describes.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let snapshot = SnapshotFile::read_from_path(path)?;
        Self::from_snapshot(&snapshot)
    }

    /// Writes the current positions as a CSV frame.
    pub fn write_frame<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigurationError> {
        FrameFile::write_to_path(&self.frame(), path)?;
        Ok(())
    }

    /// Reads a CSV frame and applies it with [`Configuration::load_frame`].
    pub fn read_frame<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigurationError> {
        let frame = FrameFile::read_from_path(path)?;
        self.load_frame(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selection::group::Group;
    use crate::engine::fixtures;
    use nalgebra::Vector3;
    use tempfile::tempdir;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-10, "expected {expected}, got {actual}");
    }

    #[test]
    fn snapshot_round_trip_preserves_unwrapped_positions() {
        let mut config = Configuration::default();
        config.add_particle_type(&fixtures::lj()).unwrap();
        config.set_domain(Domain::cubic(5.0, 3).unwrap()).unwrap();
        config.add_particle_of_type(0).unwrap();
        let select = config.select_particle(0).unwrap();
        let step = Vector3::new(-583.0, 83.34, 0.005783);
        config.displace_particles(&select, &step).unwrap();
        config.init_wrap(false);
        config.displace_particles(&select, &step).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("state.toml");
        config.save_snapshot(&path).unwrap();
        let restored = Configuration::load_snapshot(&path).unwrap();

        assert!(!restored.is_wrapped());
        let position = *restored.particle(0).unwrap().site(0).unwrap().position();
        assert_close(position.x, -581.0);
        assert_close(position.y, 81.68);
        assert_close(position.z, 0.011566);
        assert_eq!(restored.frame(), config.frame());
        restored.check().unwrap();
    }

    #[test]
    fn snapshot_rebuilds_groups_and_cells() {
        let mut config = Configuration::default();
        config.add_particle_type(&fixtures::spce()).unwrap();
        let oxygen = config.add_group(Group::new().add_site_type(0).named("O")).unwrap();
        config.set_domain(Domain::cubic(7.0, 3).unwrap()).unwrap();
        config.init_cells(1.0, 0).unwrap();
        config.init_cells(1.4, oxygen).unwrap();
        config.add_particle_of_type(0).unwrap();
        config.add_particle_of_type(0).unwrap();
        let first = config.select_particle(0).unwrap();
        config
            .displace_particles(&first, &Vector3::new(-3.49, -3.49, -3.49))
            .unwrap();
        config.set_site_property(1, 2, "tag", 4.0).unwrap();

        let snapshot = config.to_snapshot();
        assert_eq!(snapshot.groups.len(), 1);
        assert!(
            snapshot.particles[0].sites[0].properties.is_empty(),
            "cell caches are not persisted"
        );

        let restored = Configuration::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.group_index("O").unwrap(), oxygen);
        assert_eq!(restored.group_select(oxygen).unwrap().num_particles(), 2);
        assert_eq!(restored.site_property(0, 2, "cell0").unwrap(), 6.0);
        assert_eq!(restored.site_property(0, 0, "cell1").unwrap(), 0.0);
        assert_eq!(restored.site_property(1, 0, "cell0").unwrap(), 171.0);
        assert_eq!(restored.site_property(1, 2, "tag").unwrap(), 4.0);
        assert_eq!(restored.domain().unwrap().cell_list(1).unwrap().num_sites(), 2);
        restored.check().unwrap();
    }

    #[test]
    fn snapshot_keeps_instance_site_types() {
        let mut config = Configuration::default();
        config.add_particle_type(&fixtures::spce()).unwrap();
        let oxygen = config.add_group(Group::new().add_site_type(0)).unwrap();
        config.add_particle_of_type(0).unwrap();
        config.set_site_type(0, 2, 0).unwrap();

        let restored = Configuration::from_snapshot(&config.to_snapshot()).unwrap();
        assert_eq!(restored.particle(0).unwrap().site(2).unwrap().site_type(), 0);
        assert_eq!(restored.group_select(oxygen).unwrap().num_sites(), 2);
        assert_eq!(restored.physical_constants().name(), "CODATA2018");
    }

    #[test]
    fn frame_files_round_trip_positions() {
        let mut config = Configuration::default();
        config.add_particle_type(&fixtures::spce()).unwrap();
        config.set_domain(Domain::cubic(20.0, 3).unwrap()).unwrap();
        config.add_particle_of_type(0).unwrap();
        let select = config.select_particle(0).unwrap();
        config.displace_particles(&select, &Vector3::new(1.5, -2.0, 0.25)).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.csv");
        config.write_frame(&path).unwrap();

        let mut fresh = Configuration::default();
        fresh.add_particle_type(&fixtures::spce()).unwrap();
        fresh.set_domain(Domain::cubic(20.0, 3).unwrap()).unwrap();
        fresh.read_frame(&path).unwrap();
        assert_eq!(fresh.num_particles(), 1);
        assert_eq!(fresh.frame(), config.frame());
    }
}
