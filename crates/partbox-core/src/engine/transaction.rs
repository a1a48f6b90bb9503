use super::configuration::Configuration;
use super::error::ConfigurationError;
use crate::core::models::ids::ParticleId;
use crate::core::selection::select::Select;
use nalgebra::Point3;
use tracing::{trace, warn};

/// Position and site type of one selected site before a trial move.
type SiteState = (usize, Point3<f64>, usize);

impl Configuration {
    /// Runs a trial move on the sites named in `select` and keeps it only if
    /// the action accepts it.
    ///
    /// The positions and site types of the selected sites are recorded first.
    /// If `action` returns `Ok(false)` or an error, they are put back exactly
    /// and group selections and cell lists are refreshed for those sites, so
    /// repeated rejected moves leave no drift.
    ///
    /// # Arguments
    ///
    /// * `select` - The sites the action may modify.
    /// * `action` - The trial move. Returns `Ok(true)` to accept.
    ///
    /// # Return
    ///
    /// Returns whether the move was accepted.
    ///
    /// # Errors
    ///
    /// Fails if `select` names sites that do not exist, or with the action's
    /// own error after restoring the recorded state.
    pub fn transaction<F>(&mut self, select: &Select, action: F) -> Result<bool, ConfigurationError>
    where
        F: FnOnce(&mut Self) -> Result<bool, ConfigurationError>,
    {
        self.validate_select(select)?;
        let recorded: Vec<(ParticleId, Vec<SiteState>)> = select
            .iter()
            .filter_map(|(id, sites)| {
                let particle = self.particle_by_id(id)?;
                let states = sites
                    .iter()
                    .filter_map(|&index| {
                        particle
                            .site(index)
                            .map(|site| (index, *site.position(), site.site_type()))
                    })
                    .collect();
                Some((id, states))
            })
            .collect();

        let outcome = action(self);
        if matches!(outcome, Ok(true)) {
            trace!("Accepted trial move on {} sites", select.num_sites());
            return outcome;
        }

        for (id, states) in &recorded {
            if !self.restore_sites(*id, states) {
                warn!("Particle {:?} was removed during a rejected move and cannot be restored", id);
            }
        }
        trace!("Rejected trial move on {} sites", select.num_sites());
        outcome
    }
}
