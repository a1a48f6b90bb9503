use super::config::ConfigurationSettings;
use super::error::ConfigurationError;
use crate::core::domain::cells::CellList;
use crate::core::domain::periodic::Domain;
use crate::core::io::frame::{Frame, ParticleFrame};
use crate::core::io::template::TemplateFile;
use crate::core::models::catalog::{ParticleTypes, UniqueTypes};
use crate::core::models::ids::{ParticleId, SiteRef};
use crate::core::models::particle::{Particle, ParticleType, ParticleTypeDescriptor};
use crate::core::models::site::ParticleSite;
use crate::core::params::constants::PhysicalConstants;
use crate::core::params::model::ModelParams;
use crate::core::selection::group::Group;
use crate::core::selection::select::Select;
use nalgebra::{Point3, Vector3};
use rand::Rng;
use slotmap::SlotMap;
use std::path::Path;
use tracing::{debug, instrument, trace, warn};

/// The particles of a simulation, their templates, the periodic domain and
/// every cache derived from them.
///
/// All mutation goes through this type. Each mutating operation validates its
/// input first and brings group selections and cell lists up to date before
/// returning, so derived state never lags behind positions or site types.
///
/// Particles are addressed either by their ordinal index (insertion order of
/// live particles, shifting down on removal) or by a stable [`ParticleId`].
#[derive(Debug, Clone)]
pub struct Configuration {
    settings: ConfigurationSettings,
    particle_types: ParticleTypes,
    unique_types: UniqueTypes,
    model_params: ModelParams,
    domain: Option<Domain>,
    groups: Vec<Group>,
    selects: Vec<Select>,
    particles: SlotMap<ParticleId, Particle>,
    order: Vec<ParticleId>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(ConfigurationSettings::default())
    }
}

impl Configuration {
    /// Creates an empty configuration holding only the universal group `"0"`.
    pub fn new(settings: ConfigurationSettings) -> Self {
        Self {
            settings,
            particle_types: ParticleTypes::new(),
            unique_types: UniqueTypes::new(),
            model_params: ModelParams::new(settings.physical_constants),
            domain: None,
            groups: vec![Group::new().named("0")],
            selects: vec![Select::new()],
            particles: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ConfigurationSettings {
        &self.settings
    }

    pub fn is_wrapped(&self) -> bool {
        self.settings.wrap
    }

    pub fn physical_constants(&self) -> &PhysicalConstants {
        self.model_params.physical_constants()
    }

    // --- Particle types ---

    /// Registers a particle type from a descriptor.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The template to register. Its `source` must be unique.
    ///
    /// # Return
    ///
    /// Returns the index of the new particle type.
    ///
    /// # Errors
    ///
    /// Fails once any particle exists, if the source was already provided,
    /// or if the descriptor is invalid.
    pub fn add_particle_type(
        &mut self,
        descriptor: &ParticleTypeDescriptor,
    ) -> Result<usize, ConfigurationError> {
        if !self.particles.is_empty() {
            return Err(ConfigurationError::TypesAfterParticles);
        }
        let index = self.particle_types.add(descriptor)?;
        let ptype = self
            .particle_types
            .get(index)
            .ok_or_else(|| ConfigurationError::Inconsistent("new particle type missing".into()))?;
        self.unique_types.add(ptype);
        self.model_params
            .update(&self.unique_types, self.particle_types.num_site_types());
        debug!(
            "Registered particle type {} from '{}' with {} sites and {} bonds",
            index,
            ptype.source(),
            ptype.num_sites(),
            ptype.num_bonds()
        );
        Ok(index)
    }

    /// Loads a TOML template from `path` and registers it under that path.
    pub fn add_particle_type_file<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<usize, ConfigurationError> {
        let path = path.as_ref();
        if !self.particles.is_empty() {
            return Err(ConfigurationError::TypesAfterParticles);
        }
        let descriptor = TemplateFile::load(path).map_err(|source| ConfigurationError::Template {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        self.add_particle_type(&descriptor)
    }

    pub fn num_particle_types(&self) -> usize {
        self.particle_types.num()
    }

    pub fn particle_types(&self) -> &ParticleTypes {
        &self.particle_types
    }

    pub fn particle_type(&self, index: usize) -> Result<&ParticleType, ConfigurationError> {
        self.particle_types
            .get(index)
            .ok_or(ConfigurationError::ParticleTypeOutOfRange {
                particle_type: index,
                num_particle_types: self.particle_types.num(),
            })
    }

    /// Source (file path or descriptor name) of a particle type.
    pub fn type_to_source(&self, index: usize) -> Option<&str> {
        self.particle_types.type_to_source(index)
    }

    pub fn num_site_types(&self) -> usize {
        self.particle_types.num_site_types()
    }

    pub fn num_bond_types(&self) -> usize {
        self.particle_types.num_bond_types()
    }

    pub fn unique_types(&self) -> &UniqueTypes {
        &self.unique_types
    }

    pub fn model_params(&self) -> &ModelParams {
        &self.model_params
    }

    pub fn model_params_mut(&mut self) -> &mut ModelParams {
        &mut self.model_params
    }

    // --- Groups ---

    /// Registers a group and materializes its selection over current particles.
    ///
    /// # Arguments
    ///
    /// * `group` - The filter. Unnamed groups are named after their index.
    ///
    /// # Return
    ///
    /// Returns the index of the new group (the universal group is index 0).
    ///
    /// # Errors
    ///
    /// Fails if no particle type exists yet or if the group names a site or
    /// particle type that is not registered.
    pub fn add_group(&mut self, mut group: Group) -> Result<usize, ConfigurationError> {
        if self.particle_types.is_empty() {
            return Err(ConfigurationError::GroupBeforeTypes);
        }
        if let Some(&site_type) = group
            .site_types()
            .iter()
            .find(|&&t| t >= self.num_site_types())
        {
            return Err(ConfigurationError::SiteTypeOutOfRange {
                site_type,
                num_site_types: self.num_site_types(),
            });
        }
        if let Some(&particle_type) = group
            .particle_types()
            .iter()
            .find(|&&t| t >= self.num_particle_types())
        {
            return Err(ConfigurationError::ParticleTypeOutOfRange {
                particle_type,
                num_particle_types: self.num_particle_types(),
            });
        }

        let index = self.groups.len();
        group.set_name_if_missing(&index.to_string());
        let mut select = Select::new();
        for &id in &self.order {
            if let Some(particle) = self.particles.get(id) {
                let sites = group.site_indices(particle);
                if !sites.is_empty() {
                    select.add_particle(id, sites);
                }
            }
        }
        debug!(
            "Added group {} ('{}') selecting {} particles",
            index,
            group.name().unwrap_or_default(),
            select.num_particles()
        );
        self.groups.push(group);
        self.selects.push(select);
        Ok(index)
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, index: usize) -> Result<&Group, ConfigurationError> {
        self.groups
            .get(index)
            .ok_or(ConfigurationError::GroupOutOfRange {
                group: index,
                num_groups: self.groups.len(),
            })
    }

    /// Live selection of a group.
    pub fn group_select(&self, index: usize) -> Result<&Select, ConfigurationError> {
        self.selects
            .get(index)
            .ok_or(ConfigurationError::GroupOutOfRange {
                group: index,
                num_groups: self.groups.len(),
            })
    }

    pub fn group_selects(&self) -> &[Select] {
        &self.selects
    }

    /// Index of the first group tagged with `name`.
    pub fn group_index(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.groups
            .iter()
            .position(|g| g.has_property(name))
            .ok_or_else(|| ConfigurationError::GroupNotFound {
                name: name.to_string(),
            })
    }

    // --- Particles ---

    /// Instantiates a particle at its template layout.
    ///
    /// # Arguments
    ///
    /// * `particle_type` - Index of a registered particle type.
    ///
    /// # Return
    ///
    /// Returns the ordinal index of the new particle.
    ///
    /// # Errors
    ///
    /// Fails if the particle type does not exist.
    pub fn add_particle_of_type(&mut self, particle_type: usize) -> Result<usize, ConfigurationError> {
        let template = self.particle_type(particle_type)?;
        let positions: Vec<Point3<f64>> = template.sites().iter().map(|s| s.position).collect();
        self.add_particle_with_positions(particle_type, &positions)
    }

    /// Instantiates a particle with explicit site positions, in site order.
    ///
    /// Positions are wrapped when wrapping is enabled.
    ///
    /// # Errors
    ///
    /// Fails if the particle type does not exist or the number of positions
    /// differs from its number of sites.
    pub fn add_particle_with_positions(
        &mut self,
        particle_type: usize,
        positions: &[Point3<f64>],
    ) -> Result<usize, ConfigurationError> {
        let template = self.particle_type(particle_type)?;
        if positions.len() != template.num_sites() {
            return Err(ConfigurationError::PositionCount {
                particle_type,
                expected: template.num_sites(),
                found: positions.len(),
            });
        }
        let mut particle = Particle::instantiate(particle_type, template);
        for (site, position) in particle.sites.iter_mut().zip(positions) {
            site.position = self.wrapped_if_enabled(position);
        }
        Ok(self.insert_particle(particle))
    }

    pub fn num_particles(&self) -> usize {
        self.order.len()
    }

    pub fn num_sites(&self) -> usize {
        self.particles.values().map(Particle::num_sites).sum()
    }

    pub fn num_particles_of_type(&self, particle_type: usize) -> usize {
        self.particles
            .values()
            .filter(|p| p.particle_type() == particle_type)
            .count()
    }

    pub fn particle_id(&self, index: usize) -> Result<ParticleId, ConfigurationError> {
        self.order
            .get(index)
            .copied()
            .ok_or(ConfigurationError::ParticleOutOfRange {
                index,
                num_particles: self.order.len(),
            })
    }

    pub fn particle(&self, index: usize) -> Result<&Particle, ConfigurationError> {
        let id = self.particle_id(index)?;
        self.particles
            .get(id)
            .ok_or(ConfigurationError::ParticleNotFound { id })
    }

    pub fn particle_by_id(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id)
    }

    /// Current ordinal index of a live particle.
    pub fn particle_index(&self, id: ParticleId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    /// Live particles in ordinal order.
    pub fn particles(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.order
            .iter()
            .filter_map(|&id| self.particles.get(id).map(|p| (id, p)))
    }

    /// Selection of every site of one particle.
    pub fn select_particle(&self, index: usize) -> Result<Select, ConfigurationError> {
        let id = self.particle_id(index)?;
        let num_sites = self.particle(index)?.num_sites();
        Ok(Select::single(id, (0..num_sites).collect()))
    }

    /// Selection of the sites of one particle that belong to `group`.
    ///
    /// The selection is empty when the particle has no site in the group.
    pub fn select_particle_in_group(
        &self,
        index: usize,
        group: usize,
    ) -> Result<Select, ConfigurationError> {
        let id = self.particle_id(index)?;
        Ok(match self.group_select(group)?.sites_of(id) {
            Some(sites) => Select::single(id, sites.to_vec()),
            None => Select::new(),
        })
    }

    /// Picks one particle of a group uniformly at random.
    ///
    /// # Return
    ///
    /// Returns the particle with its group sites, or `None` if the group is
    /// empty.
    ///
    /// # Errors
    ///
    /// Fails if the group does not exist.
    pub fn random_particle<R: Rng + ?Sized>(
        &self,
        group: usize,
        rng: &mut R,
    ) -> Result<Option<Select>, ConfigurationError> {
        let select = self.group_select(group)?;
        if select.is_empty() {
            return Ok(None);
        }
        let position = rng.gen_range(0..select.num_particles());
        Ok(select
            .particle_id(position)
            .zip(select.site_indices(position))
            .map(|(id, sites)| Select::single(id, sites.to_vec())))
    }

    /// Value of a named property of one site.
    ///
    /// Dynamic properties of the instance site (such as `cell0`) are checked
    /// first, then the properties of its current site type.
    pub fn site_property(
        &self,
        index: usize,
        site: usize,
        name: &str,
    ) -> Result<f64, ConfigurationError> {
        let entry = self.site(index, site)?;
        entry
            .property(name)
            .or_else(|| {
                self.particle_types
                    .site_type_properties(entry.site_type())
                    .and_then(|props| props.get(name))
            })
            .ok_or_else(|| ConfigurationError::PropertyNotFound {
                name: name.to_string(),
                particle: index,
                site,
            })
    }

    /// Sets a dynamic property on one instance site.
    ///
    /// # Errors
    ///
    /// Fails for out-of-range indices and for names of the form `cellK`,
    /// which are reserved for cell-list caches.
    pub fn set_site_property(
        &mut self,
        index: usize,
        site: usize,
        name: &str,
        value: f64,
    ) -> Result<(), ConfigurationError> {
        if is_cell_label(name) {
            return Err(ConfigurationError::ReservedProperty {
                name: name.to_string(),
            });
        }
        let entry = self.site_mut(index, site)?;
        entry.properties.add_or_set(name, value);
        Ok(())
    }

    /// Position of a site folded into the primary image, whatever the
    /// wrapping setting.
    pub fn wrapped_position(
        &self,
        index: usize,
        site: usize,
    ) -> Result<Point3<f64>, ConfigurationError> {
        let position = self.site(index, site)?.position();
        Ok(match &self.domain {
            Some(domain) => domain.wrap(position),
            None => *position,
        })
    }

    /// Translates every selected site by `displacement`.
    ///
    /// Sites are wrapped when wrapping is enabled, and every cell list is
    /// updated for each moved site.
    ///
    /// # Arguments
    ///
    /// * `select` - The sites to move.
    /// * `displacement` - The translation applied to each site.
    ///
    /// # Errors
    ///
    /// Fails, without moving anything, if the selection names a particle or
    /// site that does not exist, or names a site twice.
    pub fn displace_particles(
        &mut self,
        select: &Select,
        displacement: &Vector3<f64>,
    ) -> Result<(), ConfigurationError> {
        self.validate_select(select)?;
        let wrap = self.settings.wrap;
        for (id, sites) in select.iter() {
            if let Some(particle) = self.particles.get_mut(id) {
                for &index in sites {
                    let site = &mut particle.sites[index];
                    let moved = site.position + displacement;
                    site.position = match (&self.domain, wrap) {
                        (Some(domain), true) => domain.wrap(&moved),
                        _ => moved,
                    };
                }
            }
            self.refresh_cells(id, sites, false);
        }
        trace!(
            "Displaced {} sites of {} particles by {:?}",
            select.num_sites(),
            select.num_particles(),
            displacement
        );
        Ok(())
    }

    /// Wraps every site of one particle into the primary image.
    ///
    /// Does nothing when wrapping is disabled or no domain is set.
    pub fn wrap_particle(&mut self, index: usize) -> Result<(), ConfigurationError> {
        let id = self.particle_id(index)?;
        if !self.settings.wrap {
            return Ok(());
        }
        let Some(domain) = &self.domain else {
            return Ok(());
        };
        let mut num_sites = 0;
        if let Some(particle) = self.particles.get_mut(id) {
            for site in &mut particle.sites {
                site.position = domain.wrap(&site.position);
            }
            num_sites = particle.num_sites();
        }
        let all: Vec<usize> = (0..num_sites).collect();
        self.refresh_cells(id, &all, false);
        Ok(())
    }

    /// Removes the single particle named in `select`.
    ///
    /// # Errors
    ///
    /// Fails unless the selection holds exactly one existing particle.
    pub fn remove_particle(&mut self, select: &Select) -> Result<(), ConfigurationError> {
        if select.num_particles() != 1 {
            return Err(ConfigurationError::NotSingleParticle {
                found: select.num_particles(),
            });
        }
        self.remove_particles(select)
    }

    /// Removes every particle named in `select`, evicting them from every
    /// group selection and cell list.
    ///
    /// # Errors
    ///
    /// Fails, without removing anything, if any particle does not exist.
    pub fn remove_particles(&mut self, select: &Select) -> Result<(), ConfigurationError> {
        self.validate_select(select)?;
        for (id, _) in select.iter() {
            let num_sites = self.particles.get(id).map_or(0, Particle::num_sites);
            let all: Vec<usize> = (0..num_sites).collect();
            self.refresh_cells(id, &all, true);
            for group_select in &mut self.selects {
                group_select.remove_particle(id);
            }
            self.order.retain(|&other| other != id);
            self.particles.remove(id);
        }
        debug!(
            "Removed {} particles, {} remain",
            select.num_particles(),
            self.num_particles()
        );
        Ok(())
    }

    /// Relabels the site type of one instance site.
    ///
    /// Group selections and cell lists whose groups depend on site type are
    /// updated for that particle. The particle type template is unchanged.
    ///
    /// # Arguments
    ///
    /// * `index` - Ordinal index of the particle.
    /// * `site` - Index of the site within the particle.
    /// * `site_type` - Any registered global site type.
    ///
    /// # Errors
    ///
    /// Fails if the particle, site or site type does not exist.
    pub fn set_site_type(
        &mut self,
        index: usize,
        site: usize,
        site_type: usize,
    ) -> Result<(), ConfigurationError> {
        if site_type >= self.num_site_types() {
            return Err(ConfigurationError::SiteTypeOutOfRange {
                site_type,
                num_site_types: self.num_site_types(),
            });
        }
        let id = self.particle_id(index)?;
        self.site_mut(index, site)?.site_type = site_type;
        self.reselect(index, id);
        self.refresh_cells(id, &[site], false);
        Ok(())
    }

    // --- Domain ---

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    /// Spatial dimension, fixed by the first domain.
    pub fn dimension(&self) -> Option<usize> {
        self.domain.as_ref().map(Domain::dimension)
    }

    /// Sets or replaces the domain and rebuilds every cell list it carries.
    ///
    /// With wrapping enabled, existing positions are folded into the new box.
    ///
    /// # Errors
    ///
    /// Fails if the dimension differs from the current domain's, or if a
    /// cell list refers to a group that does not exist.
    pub fn set_domain(&mut self, mut domain: Domain) -> Result<(), ConfigurationError> {
        if let Some(current) = &self.domain {
            if current.dimension() != domain.dimension() {
                return Err(ConfigurationError::DimensionMismatch {
                    expected: current.dimension(),
                    found: domain.dimension(),
                });
            }
        }
        if let Some(cells) = domain.cells().iter().find(|c| c.group() >= self.groups.len()) {
            return Err(ConfigurationError::GroupOutOfRange {
                group: cells.group(),
                num_groups: self.groups.len(),
            });
        }
        let stale: Vec<String> = self
            .domain
            .iter()
            .flat_map(|d| d.cells().iter().map(|c| c.label().to_string()))
            .collect();
        domain.clear_cells();
        if self.settings.wrap {
            for particle in self.particles.values_mut() {
                for site in &mut particle.sites {
                    site.position = domain.wrap(&site.position);
                }
            }
        }
        debug!(
            "Set domain with side lengths {:?} and {} cell lists",
            domain.side_lengths(),
            domain.num_cell_lists()
        );
        self.domain = Some(domain);
        self.rebuild_cells(&stale);
        Ok(())
    }

    /// Adds a cell list to the domain and fills it with the sites of `group`.
    ///
    /// # Return
    ///
    /// Returns the resolution index `K` of the new list; its sites carry the
    /// cached cell index as property `cellK`.
    ///
    /// # Errors
    ///
    /// Fails if no domain is set, the group does not exist, or the cell
    /// length is not positive.
    pub fn init_cells(&mut self, cell_length: f64, group: usize) -> Result<usize, ConfigurationError> {
        if group >= self.groups.len() {
            return Err(ConfigurationError::GroupOutOfRange {
                group,
                num_groups: self.groups.len(),
            });
        }
        let domain = self
            .domain
            .as_mut()
            .ok_or(ConfigurationError::DomainNotSet {
                operation: "initializing cell lists",
            })?;
        let resolution = domain.init_cells(cell_length, group)?;
        for position in 0..self.order.len() {
            let id = self.order[position];
            let all = self.all_sites(id);
            self.refresh_cells(id, &all, false);
        }
        Ok(resolution)
    }

    /// Enables or disables wrapping of positions after displacements.
    ///
    /// Stored coordinates are left as they are; disabling lets subsequent
    /// displacements accumulate unwrapped.
    pub fn init_wrap(&mut self, wrap: bool) {
        if wrap != self.settings.wrap && !self.particles.is_empty() {
            warn!(
                "Wrapping turned {} with {} particles present; existing coordinates are kept",
                if wrap { "on" } else { "off" },
                self.num_particles()
            );
        }
        self.settings.wrap = wrap;
    }

    // --- Frames ---

    /// Current positions of every particle, in ordinal order.
    pub fn frame(&self) -> Frame {
        Frame {
            particles: self
                .particles()
                .map(|(_, particle)| ParticleFrame {
                    particle_type: particle.particle_type(),
                    positions: particle.sites().iter().map(|s| *s.position()).collect(),
                })
                .collect(),
        }
    }

    /// Applies a frame: existing particles take the frame's positions, and
    /// particles beyond the current count are created from the records.
    ///
    /// Positions are wrapped when wrapping is enabled.
    ///
    /// # Errors
    ///
    /// Fails, without changing anything, if a record's particle type or site
    /// count does not match.
    #[instrument(level = "trace", skip_all, fields(particles = frame.num_particles()))]
    pub fn load_frame(&mut self, frame: &Frame) -> Result<(), ConfigurationError> {
        for (index, entry) in frame.particles.iter().enumerate() {
            let expected_sites = if index < self.num_particles() {
                let particle = self.particle(index)?;
                if particle.particle_type() != entry.particle_type {
                    return Err(ConfigurationError::FrameTypeMismatch {
                        index,
                        expected: particle.particle_type(),
                        found: entry.particle_type,
                    });
                }
                particle.num_sites()
            } else {
                self.particle_type(entry.particle_type)?.num_sites()
            };
            if entry.positions.len() != expected_sites {
                return Err(ConfigurationError::PositionCount {
                    particle_type: entry.particle_type,
                    expected: expected_sites,
                    found: entry.positions.len(),
                });
            }
        }

        for (index, entry) in frame.particles.iter().enumerate() {
            if index < self.num_particles() {
                let id = self.particle_id(index)?;
                let wrapped: Vec<Point3<f64>> = entry
                    .positions
                    .iter()
                    .map(|p| self.wrapped_if_enabled(p))
                    .collect();
                if let Some(particle) = self.particles.get_mut(id) {
                    for (site, position) in particle.sites.iter_mut().zip(wrapped) {
                        site.position = position;
                    }
                }
                let all = self.all_sites(id);
                self.refresh_cells(id, &all, false);
            } else {
                self.add_particle_with_positions(entry.particle_type, &entry.positions)?;
            }
        }
        Ok(())
    }

    // --- Consistency ---

    /// Audits every derived cache against primary state.
    ///
    /// Checks that each particle matches its template, that every group
    /// selection equals a fresh scan, and that every cell list and `cellK`
    /// site cache agrees with a recomputation from current positions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Inconsistent`] describing the first
    /// mismatch found.
    #[instrument(level = "trace", skip_all)]
    pub fn check(&self) -> Result<(), ConfigurationError> {
        let fail = |message: String| ConfigurationError::Inconsistent(message);

        if self.order.len() != self.particles.len() {
            return Err(fail(format!(
                "{} ordered particles but {} stored",
                self.order.len(),
                self.particles.len()
            )));
        }
        if self.groups.len() != self.selects.len() {
            return Err(fail(format!(
                "{} groups but {} selections",
                self.groups.len(),
                self.selects.len()
            )));
        }

        for (index, &id) in self.order.iter().enumerate() {
            let particle = self
                .particles
                .get(id)
                .ok_or_else(|| fail(format!("particle {index} is missing from storage")))?;
            let template = self.particle_types.get(particle.particle_type()).ok_or_else(|| {
                fail(format!(
                    "particle {index} has unknown type {}",
                    particle.particle_type()
                ))
            })?;
            if particle.num_sites() != template.num_sites() {
                return Err(fail(format!(
                    "particle {index} has {} sites, its type has {}",
                    particle.num_sites(),
                    template.num_sites()
                )));
            }
            if let Some(site) = particle
                .sites()
                .iter()
                .position(|s| s.site_type() >= self.num_site_types())
            {
                return Err(fail(format!(
                    "site {site} of particle {index} has an unknown site type"
                )));
            }
        }

        for (g, (group, select)) in self.groups.iter().zip(&self.selects).enumerate() {
            let mut expected = Select::new();
            for (id, particle) in self.particles() {
                let sites = group.site_indices(particle);
                if !sites.is_empty() {
                    expected.add_particle(id, sites);
                }
            }
            if &expected != select {
                return Err(fail(format!(
                    "selection of group {g} holds {} particles and {} sites, expected {} and {}",
                    select.num_particles(),
                    select.num_sites(),
                    expected.num_particles(),
                    expected.num_sites()
                )));
            }
        }

        if let Some(domain) = &self.domain {
            for cells in domain.cells() {
                let label = cells.label();
                let group = self.groups.get(cells.group()).ok_or_else(|| {
                    fail(format!("{label} refers to missing group {}", cells.group()))
                })?;
                let mut members = 0;
                for (index, (id, particle)) in self.particles().enumerate() {
                    for (s, site) in particle.sites().iter().enumerate() {
                        let cached = site.property(label);
                        if !group.matches(particle.particle_type(), site.site_type()) {
                            if cached.is_some() {
                                return Err(fail(format!(
                                    "site {s} of particle {index} carries {label} outside its group"
                                )));
                            }
                            continue;
                        }
                        members += 1;
                        let cell = cells.cell_index(site.position());
                        let cached_matches = cached.is_some_and(|c| c == cell as f64);
                        if !cached_matches || !cells.contains(&SiteRef::new(id, s), cell) {
                            return Err(fail(format!(
                                "site {s} of particle {index} is not cached in {label} cell {cell}"
                            )));
                        }
                    }
                }
                if members != cells.num_sites() {
                    return Err(fail(format!(
                        "{label} holds {} sites, expected {members}",
                        cells.num_sites()
                    )));
                }
            }
        }
        Ok(())
    }

    // --- Internal maintenance ---

    fn site(&self, index: usize, site: usize) -> Result<&ParticleSite, ConfigurationError> {
        let particle = self.particle(index)?;
        particle
            .site(site)
            .ok_or(ConfigurationError::SiteOutOfRange {
                particle: index,
                site,
                num_sites: particle.num_sites(),
            })
    }

    fn site_mut(&mut self, index: usize, site: usize) -> Result<&mut ParticleSite, ConfigurationError> {
        let id = self.particle_id(index)?;
        let particle = self
            .particles
            .get_mut(id)
            .ok_or(ConfigurationError::ParticleNotFound { id })?;
        let num_sites = particle.num_sites();
        particle
            .sites
            .get_mut(site)
            .ok_or(ConfigurationError::SiteOutOfRange {
                particle: index,
                site,
                num_sites,
            })
    }

    pub(crate) fn validate_select(&self, select: &Select) -> Result<(), ConfigurationError> {
        for (id, sites) in select.iter() {
            let particle = self
                .particles
                .get(id)
                .ok_or(ConfigurationError::ParticleNotFound { id })?;
            let mut seen = vec![false; particle.num_sites()];
            for &site in sites {
                let index = || self.particle_index(id).unwrap_or_default();
                match seen.get_mut(site) {
                    None => {
                        return Err(ConfigurationError::SiteOutOfRange {
                            particle: index(),
                            site,
                            num_sites: particle.num_sites(),
                        });
                    }
                    Some(true) => {
                        return Err(ConfigurationError::DuplicateSite {
                            particle: index(),
                            site,
                        });
                    }
                    Some(flag) => *flag = true,
                }
            }
        }
        Ok(())
    }

    /// Puts recorded positions and site types back on one particle.
    ///
    /// Returns `false` if the particle no longer exists.
    pub(crate) fn restore_sites(&mut self, id: ParticleId, states: &[(usize, Point3<f64>, usize)]) -> bool {
        let Some(particle) = self.particles.get_mut(id) else {
            return false;
        };
        let mut retyped = false;
        for &(index, position, site_type) in states {
            if let Some(site) = particle.sites.get_mut(index) {
                site.position = position;
                retyped |= site.site_type != site_type;
                site.site_type = site_type;
            }
        }
        if retyped {
            if let Some(index) = self.particle_index(id) {
                self.reselect(index, id);
            }
        }
        let sites: Vec<usize> = states.iter().map(|&(index, _, _)| index).collect();
        self.refresh_cells(id, &sites, false);
        true
    }

    fn wrapped_if_enabled(&self, position: &Point3<f64>) -> Point3<f64> {
        match (&self.domain, self.settings.wrap) {
            (Some(domain), true) => domain.wrap(position),
            _ => *position,
        }
    }

    fn all_sites(&self, id: ParticleId) -> Vec<usize> {
        let num_sites = self.particles.get(id).map_or(0, Particle::num_sites);
        (0..num_sites).collect()
    }

    fn insert_particle(&mut self, particle: Particle) -> usize {
        let id = self.particles.insert(particle);
        self.order.push(id);
        if let Some(particle) = self.particles.get(id) {
            for (group, select) in self.groups.iter().zip(self.selects.iter_mut()) {
                let sites = group.site_indices(particle);
                if !sites.is_empty() {
                    select.add_particle(id, sites);
                }
            }
        }
        let all = self.all_sites(id);
        self.refresh_cells(id, &all, false);
        self.order.len() - 1
    }

    /// Re-evaluates every group for one particle after a site type change.
    fn reselect(&mut self, index: usize, id: ParticleId) {
        let Some(particle) = self.particles.get(id) else {
            return;
        };
        for (group, select) in self.groups.iter().zip(self.selects.iter_mut()) {
            let sites = group.site_indices(particle);
            if sites.is_empty() {
                select.remove_particle(id);
            } else if select.contains(id) {
                select.replace_sites(id, sites);
            } else {
                let position = self.order[..index]
                    .iter()
                    .filter(|&&other| select.contains(other))
                    .count();
                select.insert_particle(position, id, sites);
            }
        }
    }

    /// Brings the given sites of one particle up to date in every cell list.
    ///
    /// With `evict`, the sites are removed from every list instead.
    pub(crate) fn refresh_cells(&mut self, id: ParticleId, sites: &[usize], evict: bool) {
        let Some(domain) = self.domain.as_mut() else {
            return;
        };
        let Some(particle) = self.particles.get_mut(id) else {
            return;
        };
        let particle_type = particle.particle_type();
        for cells in domain.cells_mut() {
            let group = self.groups.get(cells.group());
            for &index in sites {
                let Some(site) = particle.sites.get_mut(index) else {
                    continue;
                };
                let in_group =
                    !evict && group.is_some_and(|g| g.matches(particle_type, site.site_type));
                refresh_site_cell(cells, SiteRef::new(id, index), site, in_group);
            }
        }
    }

    #[instrument(level = "trace", skip_all)]
    fn rebuild_cells(&mut self, stale_labels: &[String]) {
        for particle in self.particles.values_mut() {
            for site in &mut particle.sites {
                for label in stale_labels {
                    site.properties.remove(label);
                }
            }
        }
        if let Some(domain) = self.domain.as_mut() {
            domain.clear_cells();
        }
        for position in 0..self.order.len() {
            let id = self.order[position];
            let all = self.all_sites(id);
            self.refresh_cells(id, &all, false);
        }
    }
}

/// Moves one site to its current cell, or out of the list when it is not
/// in the list's group, keeping the `cellK` cache in step.
fn refresh_site_cell(cells: &mut CellList, site_ref: SiteRef, site: &mut ParticleSite, in_group: bool) {
    let cached = site.properties.get(cells.label()).map(|cell| cell as usize);
    if !in_group {
        if let Some(old) = cached {
            cells.evict(&site_ref, old);
            site.properties.remove(cells.label());
        }
        return;
    }
    let cell = cells.cell_index(&site.position);
    match cached {
        Some(old) => cells.reassign(site_ref, old, cell),
        None => cells.assign(site_ref, cell),
    }
    site.properties.add_or_set(cells.label(), cell as f64);
}

/// Whether `name` has the form of a cell-list cache property (`cellK`).
pub(crate) fn is_cell_label(name: &str) -> bool {
    name.strip_prefix("cell")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
