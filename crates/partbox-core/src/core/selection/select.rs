use crate::core::models::ids::{ParticleId, SiteRef};
use std::collections::HashMap;

/// An ordered set of particles, each with the indices of its selected sites.
///
/// Entries keep the order in which particles were added. Membership checks
/// and site lookups by particle ID are O(1); removal shifts the later entries
/// to keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    entries: Vec<(ParticleId, Vec<usize>)>,
    positions: HashMap<ParticleId, usize>,
    num_sites: usize,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// A selection of one particle.
    pub fn single(particle: ParticleId, sites: Vec<usize>) -> Self {
        let mut select = Self::new();
        select.add_particle(particle, sites);
        select
    }

    pub fn num_particles(&self) -> usize {
        self.entries.len()
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selected site indices of the particle at `position` in this selection.
    pub fn site_indices(&self, position: usize) -> Option<&[usize]> {
        self.entries.get(position).map(|(_, sites)| sites.as_slice())
    }

    pub fn particle_id(&self, position: usize) -> Option<ParticleId> {
        self.entries.get(position).map(|(id, _)| *id)
    }

    pub fn contains(&self, particle: ParticleId) -> bool {
        self.positions.contains_key(&particle)
    }

    pub fn position_of(&self, particle: ParticleId) -> Option<usize> {
        self.positions.get(&particle).copied()
    }

    pub fn sites_of(&self, particle: ParticleId) -> Option<&[usize]> {
        self.position_of(particle)
            .map(|position| self.entries[position].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &[usize])> {
        self.entries.iter().map(|(id, sites)| (*id, sites.as_slice()))
    }

    /// Every selected site as a handle, in selection order.
    pub fn site_refs(&self) -> impl Iterator<Item = SiteRef> + '_ {
        self.entries.iter().flat_map(|(id, sites)| {
            sites.iter().map(move |&site| SiteRef::new(*id, site))
        })
    }

    /// Appends a particle, or replaces its sites if it is already selected.
    pub fn add_particle(&mut self, particle: ParticleId, sites: Vec<usize>) {
        if self.contains(particle) {
            self.replace_sites(particle, sites);
            return;
        }
        self.num_sites += sites.len();
        self.positions.insert(particle, self.entries.len());
        self.entries.push((particle, sites));
    }

    /// Inserts a particle at `position`, shifting later entries back.
    pub fn insert_particle(&mut self, position: usize, particle: ParticleId, sites: Vec<usize>) {
        if self.contains(particle) {
            self.replace_sites(particle, sites);
            return;
        }
        let position = position.min(self.entries.len());
        self.num_sites += sites.len();
        self.entries.insert(position, (particle, sites));
        self.reindex_from(position);
    }

    /// Removes a particle, returning its selected sites.
    pub fn remove_particle(&mut self, particle: ParticleId) -> Option<Vec<usize>> {
        let position = self.positions.remove(&particle)?;
        let (_, sites) = self.entries.remove(position);
        self.num_sites -= sites.len();
        self.reindex_from(position);
        Some(sites)
    }

    /// Replaces the selected sites of a particle already in the selection.
    ///
    /// Returns `false` if the particle is not selected.
    pub fn replace_sites(&mut self, particle: ParticleId, sites: Vec<usize>) -> bool {
        let Some(&position) = self.positions.get(&particle) else {
            return false;
        };
        let entry = &mut self.entries[position].1;
        self.num_sites = self.num_sites - entry.len() + sites.len();
        *entry = sites;
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
        self.num_sites = 0;
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, (id, _)) in self.entries[start..].iter().enumerate() {
            self.positions.insert(*id, start + offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(count: usize) -> Vec<ParticleId> {
        let mut map: SlotMap<ParticleId, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    #[test]
    fn add_particle_tracks_counts_and_order() {
        let ids = ids(3);
        let mut select = Select::new();
        select.add_particle(ids[2], vec![0]);
        select.add_particle(ids[0], vec![1, 2]);
        assert_eq!(select.num_particles(), 2);
        assert_eq!(select.num_sites(), 3);
        assert_eq!(select.particle_id(0), Some(ids[2]));
        assert_eq!(select.site_indices(1), Some(&[1, 2][..]));
        assert_eq!(select.site_indices(2), None);
        assert!(!select.contains(ids[1]));
    }

    #[test]
    fn adding_existing_particle_replaces_its_sites() {
        let ids = ids(1);
        let mut select = Select::single(ids[0], vec![0, 1, 2]);
        select.add_particle(ids[0], vec![1]);
        assert_eq!(select.num_particles(), 1);
        assert_eq!(select.num_sites(), 1);
    }

    #[test]
    fn remove_particle_preserves_order_of_the_rest() {
        let ids = ids(4);
        let mut select = Select::new();
        for id in &ids {
            select.add_particle(*id, vec![0]);
        }
        assert_eq!(select.remove_particle(ids[1]), Some(vec![0]));
        assert_eq!(select.remove_particle(ids[1]), None);
        let order: Vec<_> = select.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(select.position_of(ids[3]), Some(2));
        assert_eq!(select.num_sites(), 3);
    }

    #[test]
    fn insert_particle_shifts_later_entries() {
        let ids = ids(3);
        let mut select = Select::new();
        select.add_particle(ids[0], vec![0]);
        select.add_particle(ids[2], vec![0]);
        select.insert_particle(1, ids[1], vec![0, 1]);
        assert_eq!(select.particle_id(1), Some(ids[1]));
        assert_eq!(select.position_of(ids[2]), Some(2));
        assert_eq!(select.num_sites(), 4);
    }

    #[test]
    fn replace_sites_requires_membership() {
        let ids = ids(2);
        let mut select = Select::single(ids[0], vec![0, 1]);
        assert!(select.replace_sites(ids[0], vec![2]));
        assert!(!select.replace_sites(ids[1], vec![2]));
        assert_eq!(select.sites_of(ids[0]), Some(&[2][..]));
        assert_eq!(select.num_sites(), 1);
    }

    #[test]
    fn site_refs_flatten_in_order() {
        let ids = ids(2);
        let mut select = Select::new();
        select.add_particle(ids[1], vec![0, 2]);
        select.add_particle(ids[0], vec![1]);
        let refs: Vec<_> = select.site_refs().collect();
        assert_eq!(
            refs,
            vec![
                SiteRef::new(ids[1], 0),
                SiteRef::new(ids[1], 2),
                SiteRef::new(ids[0], 1)
            ]
        );
        select.clear();
        assert!(select.is_empty());
        assert_eq!(select.num_sites(), 0);
    }
}
