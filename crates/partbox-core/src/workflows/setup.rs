use crate::engine::config::ConfigurationFile;
use crate::engine::configuration::Configuration;
use crate::engine::error::ConfigurationError;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument};

/// A configuration that passed its consistency audit, with its summary.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub configuration: Configuration,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub physical_constants: &'static str,
    pub wrap: bool,
    pub side_lengths: Option<Vec<f64>>,
    pub num_particles: usize,
    pub num_sites: usize,
    pub particle_types: Vec<TypeSummary>,
    pub groups: Vec<GroupSummary>,
    pub cell_lists: Vec<CellListSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSummary {
    pub source: String,
    pub num_sites: usize,
    pub num_particles: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub num_particles: usize,
    pub num_sites: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellListSummary {
    pub label: String,
    pub group: usize,
    pub counts: Vec<usize>,
    pub num_sites: usize,
    pub occupied_cells: usize,
    pub max_sites_per_cell: usize,
}

impl Summary {
    pub fn of(config: &Configuration) -> Self {
        let particle_types = config
            .particle_types()
            .iter()
            .enumerate()
            .map(|(index, ptype)| TypeSummary {
                source: ptype.source().to_string(),
                num_sites: ptype.num_sites(),
                num_particles: config.num_particles_of_type(index),
            })
            .collect();
        let groups = (0..config.num_groups())
            .filter_map(|index| {
                let group = config.group(index).ok()?;
                let select = config.group_select(index).ok()?;
                Some(GroupSummary {
                    name: group.name().unwrap_or_default().to_string(),
                    num_particles: select.num_particles(),
                    num_sites: select.num_sites(),
                })
            })
            .collect();
        let cell_lists = config
            .domain()
            .map(|domain| {
                domain
                    .cells()
                    .iter()
                    .map(|cells| {
                        let occupancy = (0..cells.num_total()).map(|cell| cells.num_sites_in(cell));
                        CellListSummary {
                            label: cells.label().to_string(),
                            group: cells.group(),
                            counts: cells.counts().to_vec(),
                            num_sites: cells.num_sites(),
                            occupied_cells: occupancy.clone().filter(|&n| n > 0).count(),
                            max_sites_per_cell: occupancy.max().unwrap_or(0),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            physical_constants: config.physical_constants().name(),
            wrap: config.is_wrapped(),
            side_lengths: config.domain().map(|d| d.side_lengths().to_vec()),
            num_particles: config.num_particles(),
            num_sites: config.num_sites(),
            particle_types,
            groups,
            cell_lists,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} particles, {} sites (constants {}, wrapping {})",
            self.num_particles,
            self.num_sites,
            self.physical_constants,
            if self.wrap { "on" } else { "off" }
        )?;
        match &self.side_lengths {
            Some(lengths) => writeln!(f, "domain: {lengths:?}")?,
            None => writeln!(f, "domain: none")?,
        }
        for (index, ptype) in self.particle_types.iter().enumerate() {
            writeln!(
                f,
                "type {index} '{}': {} sites x {} particles",
                ptype.source, ptype.num_sites, ptype.num_particles
            )?;
        }
        for (index, group) in self.groups.iter().enumerate() {
            writeln!(
                f,
                "group {index} '{}': {} particles, {} sites",
                group.name, group.num_particles, group.num_sites
            )?;
        }
        for cells in &self.cell_lists {
            writeln!(
                f,
                "{} (group {}): {:?} cells, {} sites in {} cells, at most {} per cell",
                cells.label,
                cells.group,
                cells.counts,
                cells.num_sites,
                cells.occupied_cells,
                cells.max_sites_per_cell
            )?;
        }
        Ok(())
    }
}

/// Builds the configuration described by a TOML setup file.
///
/// Relative paths inside the file are resolved against its directory. The
/// result is audited with [`Configuration::check`] before it is returned.
#[instrument(skip_all, name = "setup_workflow")]
pub fn run(setup_path: &Path) -> Result<SetupReport, ConfigurationError> {
    info!("Loading setup file '{}'", setup_path.display());
    let file = ConfigurationFile::load(setup_path)?;
    let base_dir = setup_path.parent().unwrap_or_else(|| Path::new("."));
    let configuration = file.into_builder(base_dir)?.build()?;
    finish(configuration)
}

/// Restores a configuration from a snapshot file and audits it.
#[instrument(skip_all, name = "restore_workflow")]
pub fn restore(snapshot_path: &Path) -> Result<SetupReport, ConfigurationError> {
    info!("Restoring snapshot '{}'", snapshot_path.display());
    let configuration = Configuration::load_snapshot(snapshot_path)?;
    finish(configuration)
}

fn finish(configuration: Configuration) -> Result<SetupReport, ConfigurationError> {
    configuration.check()?;
    let summary = Summary::of(&configuration);
    info!(
        "Configuration ready: {} particles, {} sites, {} groups",
        summary.num_particles,
        summary.num_sites,
        summary.groups.len()
    );
    Ok(SetupReport {
        configuration,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SETUP: &str = r#"
        [domain]
        cubic-box-length = 7.0

        [[domain.cells]]
        cell-length = 1.0

        [[domain.cells]]
        cell-length = 1.4
        group = 1

        [[particle-types]]
        path = "water.toml"

        [[groups]]
        name = "O"
        site-types = [0]

        [[particles]]
        particle-type = 0
        count = 3
    "#;

    const WATER: &str = r#"
        source = "ignored"
        site-types = [
            { epsilon = 0.650169581, sigma = 3.16555789, cutoff = 10.0, charge = -0.8476 },
            { epsilon = 0.0, sigma = 0.0, cutoff = 10.0, charge = 0.4238 },
        ]
        sites = [
            { type = 0, position = [0.0, 0.0, 0.0] },
            { type = 1, position = [1.0, 0.0, 0.0] },
            { type = 1, position = [-0.333313, 0.942816, 0.0] },
        ]
    "#;

    #[test]
    fn run_builds_and_summarizes_setup() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("water.toml"), WATER).unwrap();
        let setup = dir.path().join("setup.toml");
        fs::write(&setup, SETUP).unwrap();

        let report = run(&setup).unwrap();
        let summary = &report.summary;
        assert_eq!(summary.num_particles, 3);
        assert_eq!(summary.num_sites, 9);
        assert_eq!(summary.particle_types[0].num_particles, 3);
        assert_eq!(summary.groups[1].name, "O");
        assert_eq!(summary.groups[1].num_sites, 3);
        assert_eq!(summary.cell_lists[0].counts, vec![7, 7, 7]);
        assert_eq!(summary.cell_lists[1].num_sites, 3);
        assert_eq!(summary.cell_lists[1].occupied_cells, 1);
        assert_eq!(summary.cell_lists[1].max_sites_per_cell, 3);
        assert!(summary.to_string().contains("cell1 (group 1)"));
    }

    #[test]
    fn restore_reads_saved_snapshot() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("water.toml"), WATER).unwrap();
        let setup = dir.path().join("setup.toml");
        fs::write(&setup, SETUP).unwrap();
        let report = run(&setup).unwrap();

        let snapshot = dir.path().join("state.toml");
        report.configuration.save_snapshot(&snapshot).unwrap();
        let restored = restore(&snapshot).unwrap();
        assert_eq!(restored.summary, report.summary);
    }

    #[test]
    fn run_reports_missing_setup_file() {
        let dir = tempdir().unwrap();
        let err = run(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"), "{err}");
    }
}
