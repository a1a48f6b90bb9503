use super::cells::{CellList, MAX_CELLS};
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// Largest supported spatial dimension.
pub const MAX_DIMENSION: usize = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid domain dimension {dimension}, expected 1 to {MAX_DIMENSION}")]
    InvalidDimension { dimension: usize },
    #[error("Invalid side length {length} along axis {axis}, expected a finite positive value")]
    InvalidSideLength { axis: usize, length: f64 },
    #[error("Invalid cell length {length}, expected a finite positive value")]
    InvalidCellLength { length: f64 },
    #[error("Cell length {length} splits the domain into more than {MAX_CELLS} cells")]
    TooManyCells { length: f64 },
    #[error("Cell list for resolution {resolution} not found")]
    CellListNotFound { resolution: usize },
}

/// Folds `x` into the primary image `[-length/2, length/2)`.
///
/// Uses a single floor-based correction, so the cost does not depend on how
/// many box lengths `x` lies away from the origin.
pub fn wrap_coordinate(x: f64, length: f64) -> f64 {
    let half = 0.5 * length;
    let mut wrapped = x - length * (x / length + 0.5).floor();
    // Rounding in the division can land exactly on the upper bound.
    if wrapped >= half {
        wrapped -= length;
    } else if wrapped < -half {
        wrapped += length;
    }
    wrapped
}

/// Orthorhombic periodic simulation box and its cell lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    side_lengths: Vec<f64>,
    cells: Vec<CellList>,
}

impl Domain {
    /// Creates a domain with one side length per axis (1 to 3 axes).
    pub fn new(side_lengths: &[f64]) -> Result<Self, DomainError> {
        if side_lengths.is_empty() || side_lengths.len() > MAX_DIMENSION {
            return Err(DomainError::InvalidDimension {
                dimension: side_lengths.len(),
            });
        }
        for (axis, &length) in side_lengths.iter().enumerate() {
            if !length.is_finite() || length <= 0.0 {
                return Err(DomainError::InvalidSideLength { axis, length });
            }
        }
        Ok(Self {
            side_lengths: side_lengths.to_vec(),
            cells: Vec::new(),
        })
    }

    pub fn cubic(length: f64, dimension: usize) -> Result<Self, DomainError> {
        if dimension == 0 || dimension > MAX_DIMENSION {
            return Err(DomainError::InvalidDimension { dimension });
        }
        Self::new(&vec![length; dimension])
    }

    pub fn dimension(&self) -> usize {
        self.side_lengths.len()
    }

    pub fn side_lengths(&self) -> &[f64] {
        &self.side_lengths
    }

    pub fn side_length(&self, axis: usize) -> Option<f64> {
        self.side_lengths.get(axis).copied()
    }

    pub fn volume(&self) -> f64 {
        self.side_lengths.iter().product()
    }

    /// Returns `position` folded into the primary periodic image.
    ///
    /// Axes at or beyond the domain dimension pass through unchanged.
    pub fn wrap(&self, position: &Point3<f64>) -> Point3<f64> {
        let mut wrapped = *position;
        for (axis, &length) in self.side_lengths.iter().enumerate() {
            wrapped[axis] = wrap_coordinate(position[axis], length);
        }
        wrapped
    }

    /// Shortest periodic image of a separation vector.
    pub fn minimum_image(&self, separation: &Vector3<f64>) -> Vector3<f64> {
        let mut image = *separation;
        for (axis, &length) in self.side_lengths.iter().enumerate() {
            image[axis] = wrap_coordinate(separation[axis], length);
        }
        image
    }

    /// Registers a new cell list and returns its resolution index.
    ///
    /// Only sites of the group at `group_index` populate the new list.
    pub fn init_cells(&mut self, cell_length: f64, group_index: usize) -> Result<usize, DomainError> {
        let resolution = self.cells.len();
        let cells = CellList::new(resolution, cell_length, &self.side_lengths, group_index)?;
        tracing::debug!(
            "Initialized {} with {:?} cells of target length {}",
            cells.label(),
            cells.counts(),
            cell_length
        );
        self.cells.push(cells);
        Ok(resolution)
    }

    pub fn num_cell_lists(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[CellList] {
        &self.cells
    }

    pub fn cell_list(&self, resolution: usize) -> Result<&CellList, DomainError> {
        self.cells
            .get(resolution)
            .ok_or(DomainError::CellListNotFound { resolution })
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellList] {
        &mut self.cells
    }

    /// Empties every cell list, keeping grid definitions.
    pub(crate) fn clear_cells(&mut self) {
        for cells in &mut self.cells {
            cells.clear();
        }
    }
}
