//! Periodic simulation box geometry.
//!
//! [`periodic::Domain`] owns the box side lengths and wraps positions into the
//! primary image; [`cells::CellList`] partitions the box into uniform cells
//! for neighbour search.

pub mod cells;
pub mod periodic;
