use super::periodic::{DomainError, wrap_coordinate};
use crate::core::models::ids::SiteRef;
use nalgebra::Point3;
use std::collections::HashSet;

/// Upper bound on the number of cells in one list.
pub const MAX_CELLS: usize = 1 << 24;

/// A uniform grid of cells over the periodic domain.
///
/// Cells are flattened with x varying fastest. Each cell holds the sites of
/// the list's group that currently lie inside it; the configuration keeps the
/// assignment current and mirrors it into the `cellK` site property.
#[derive(Debug, Clone, PartialEq)]
pub struct CellList {
    resolution: usize,
    label: String,
    group: usize,
    cell_length: f64,
    side_lengths: Vec<f64>,
    counts: Vec<usize>,
    occupants: Vec<HashSet<SiteRef>>,
}

impl CellList {
    pub(crate) fn new(
        resolution: usize,
        cell_length: f64,
        side_lengths: &[f64],
        group: usize,
    ) -> Result<Self, DomainError> {
        if !cell_length.is_finite() || cell_length <= 0.0 {
            return Err(DomainError::InvalidCellLength { length: cell_length });
        }
        let counts: Vec<usize> = side_lengths
            .iter()
            .map(|&length| ((length / cell_length).floor() as usize).max(1))
            .collect();
        let total = counts
            .iter()
            .try_fold(1usize, |total, &count| total.checked_mul(count))
            .filter(|&total| total <= MAX_CELLS)
            .ok_or(DomainError::TooManyCells { length: cell_length })?;
        Ok(Self {
            resolution,
            label: format!("cell{resolution}"),
            group,
            cell_length,
            side_lengths: side_lengths.to_vec(),
            counts,
            occupants: vec![HashSet::new(); total],
        })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Name of the site property caching this list's cell index.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Index of the group whose sites populate this list.
    pub fn group(&self) -> usize {
        self.group
    }

    pub fn cell_length(&self) -> f64 {
        self.cell_length
    }

    /// Number of cells along each axis.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn num_total(&self) -> usize {
        self.occupants.len()
    }

    /// Flattened index of the cell containing `position`.
    ///
    /// The position is wrapped first, so unwrapped coordinates resolve to the
    /// cell of their primary image.
    pub fn cell_index(&self, position: &Point3<f64>) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for (axis, (&length, &count)) in self.side_lengths.iter().zip(&self.counts).enumerate() {
            let scaled = wrap_coordinate(position[axis], length) / length + 0.5;
            let bucket = ((scaled * count as f64).floor() as isize).clamp(0, count as isize - 1);
            index += bucket as usize * stride;
            stride *= count;
        }
        index
    }

    /// Per-axis bucket coordinates of a flattened cell index.
    pub fn cell_coordinates(&self, cell: usize) -> Vec<usize> {
        let mut remainder = cell;
        self.counts
            .iter()
            .map(|&count| {
                let bucket = remainder % count;
                remainder /= count;
                bucket
            })
            .collect()
    }

    pub fn occupants(&self, cell: usize) -> Option<&HashSet<SiteRef>> {
        self.occupants.get(cell)
    }

    pub fn num_sites_in(&self, cell: usize) -> usize {
        self.occupants.get(cell).map_or(0, HashSet::len)
    }

    /// Number of distinct particles with at least one site in `cell`.
    pub fn num_particles(&self, cell: usize) -> usize {
        self.occupants.get(cell).map_or(0, |members| {
            members
                .iter()
                .map(|site| site.particle)
                .collect::<HashSet<_>>()
                .len()
        })
    }

    pub fn num_sites(&self) -> usize {
        self.occupants.iter().map(HashSet::len).sum()
    }

    pub fn contains(&self, site: &SiteRef, cell: usize) -> bool {
        self.occupants
            .get(cell)
            .is_some_and(|members| members.contains(site))
    }

    /// Cells within one step of `cell` along every axis, periodic, sorted and
    /// without duplicates (small grids fold neighbours onto each other).
    pub fn neighbors(&self, cell: usize) -> Vec<usize> {
        let center = self.cell_coordinates(cell);
        let mut found = vec![0usize];
        let mut stride = 1;
        for (axis, &count) in self.counts.iter().enumerate() {
            let mut next = Vec::with_capacity(found.len() * 3);
            for offset in [count - 1, 0, 1] {
                let bucket = (center[axis] + offset) % count;
                next.extend(found.iter().map(|partial| partial + bucket * stride));
            }
            found = next;
            stride *= count;
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    pub(crate) fn assign(&mut self, site: SiteRef, cell: usize) {
        if let Some(members) = self.occupants.get_mut(cell) {
            members.insert(site);
        }
    }

    pub(crate) fn evict(&mut self, site: &SiteRef, cell: usize) -> bool {
        self.occupants
            .get_mut(cell)
            .is_some_and(|members| members.remove(site))
    }

    pub(crate) fn reassign(&mut self, site: SiteRef, old_cell: usize, new_cell: usize) {
        if old_cell != new_cell {
            self.evict(&site, old_cell);
            self.assign(site, new_cell);
        }
    }

    pub(crate) fn clear(&mut self) {
        for members in &mut self.occupants {
            members.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ParticleId;
    use slotmap::SlotMap;

    fn cubic(length: f64, cell_length: f64) -> CellList {
        CellList::new(0, cell_length, &[length; 3], 0).unwrap()
    }

    #[test]
    fn counts_floor_box_over_cell_length() {
        assert_eq!(cubic(7.0, 1.0).counts(), &[7, 7, 7]);
        assert_eq!(cubic(7.0, 1.4).counts(), &[5, 5, 5]);
        assert_eq!(cubic(7.0, 1.4).num_total(), 125);
    }

    #[test]
    fn oversized_cell_length_yields_single_cell() {
        let cells = cubic(3.0, 10.0);
        assert_eq!(cells.counts(), &[1, 1, 1]);
        assert_eq!(cells.cell_index(&Point3::new(1.4, -1.4, 0.0)), 0);
        assert_eq!(cells.neighbors(0), vec![0]);
    }

    #[test]
    fn tiny_cell_length_is_rejected_instead_of_overflowing() {
        assert!(matches!(
            CellList::new(0, 1e-7, &[7.0; 3], 0),
            Err(DomainError::TooManyCells { .. })
        ));
        assert!(matches!(
            CellList::new(0, 1e-300, &[7.0; 3], 0),
            Err(DomainError::TooManyCells { .. })
        ));
        let fine = CellList::new(0, 0.0625, &[7.0; 3], 0).unwrap();
        assert_eq!(fine.num_total(), 112 * 112 * 112);
    }

    #[test]
    fn origin_lies_in_central_cell() {
        assert_eq!(cubic(7.0, 1.0).cell_index(&Point3::origin()), 171);
        assert_eq!(cubic(7.0, 1.4).cell_index(&Point3::origin()), 62);
    }

    #[test]
    fn corner_positions_map_to_low_cells_with_x_fastest() {
        let cells = cubic(7.0, 1.0);
        assert_eq!(cells.cell_index(&Point3::new(-3.49, -3.49, -3.49)), 0);
        assert_eq!(cells.cell_index(&Point3::new(-2.49, -3.49, -3.49)), 1);
        assert_eq!(cells.cell_index(&Point3::new(-3.49, -2.49, -3.49)), 7);
        assert_eq!(cells.cell_index(&Point3::new(-3.49, -3.49, -2.49)), 49);
    }

    #[test]
    fn cell_index_wraps_unwrapped_positions() {
        let cells = cubic(7.0, 1.0);
        let inside = cells.cell_index(&Point3::new(0.2, -1.3, 2.9));
        assert_eq!(cells.cell_index(&Point3::new(7.2, -8.3, 16.9)), inside);
    }

    #[test]
    fn cell_coordinates_invert_flattening() {
        let cells = CellList::new(0, 1.0, &[3.0, 4.0, 5.0], 0).unwrap();
        assert_eq!(cells.cell_coordinates(0), vec![0, 0, 0]);
        assert_eq!(cells.cell_coordinates(1 + 3 * (2 + 4 * 4)), vec![1, 2, 4]);
    }

    #[test]
    fn neighbors_form_periodic_stencil() {
        let cells = cubic(7.0, 1.0);
        let around_origin = cells.neighbors(0);
        assert_eq!(around_origin.len(), 27);
        assert!(around_origin.contains(&0));
        assert!(around_origin.contains(&6));
        assert!(around_origin.contains(&(6 + 7 * (6 + 7 * 6))));

        let two_d = CellList::new(0, 1.0, &[2.0, 5.0], 0).unwrap();
        assert_eq!(two_d.neighbors(0), vec![0, 1, 2, 3, 8, 9]);
    }

    #[test]
    fn assign_reassign_and_evict_track_membership() {
        let mut ids: SlotMap<ParticleId, ()> = SlotMap::with_key();
        let site = SiteRef::new(ids.insert(()), 0);
        let mut cells = cubic(7.0, 1.0);

        cells.assign(site, 171);
        assert!(cells.contains(&site, 171));
        assert_eq!(cells.num_sites(), 1);

        cells.reassign(site, 171, 0);
        assert!(!cells.contains(&site, 171));
        assert!(cells.contains(&site, 0));
        assert_eq!(cells.num_sites_in(0), 1);

        assert!(cells.evict(&site, 0));
        assert!(!cells.evict(&site, 0));
        assert_eq!(cells.num_sites(), 0);
    }

    #[test]
    fn clear_keeps_grid() {
        let mut ids: SlotMap<ParticleId, ()> = SlotMap::with_key();
        let mut cells = cubic(5.0, 1.0);
        cells.assign(SiteRef::new(ids.insert(()), 2), 3);
        cells.clear();
        assert_eq!(cells.num_sites(), 0);
        assert_eq!(cells.num_total(), 125);
    }
}
