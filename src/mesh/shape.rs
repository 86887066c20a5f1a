use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deref, From, Into)]
/// Number of points along the logical `(x, y, z)` axes of a grid.
///
/// Depending on where it comes from, a `Shape` counts either nodes (cell edges) or
/// cells. [`Shape::to_cell_centered`] converts the former into the latter.
pub struct Shape([usize; 3]);

impl Shape {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self([nx, ny, nz])
    }

    /// build a logical shape from the dimensions of an array stored with the last
    /// logical axis first, `(nz, ny, nx)`. Missing trailing axes are padded with 1.
    pub fn from_stored(stored: &[usize]) -> Self {
        let mut dims = [1; 3];
        for (slot, n) in dims.iter_mut().zip(stored.iter().rev()) {
            *slot = *n;
        }
        Self(dims)
    }

    /// An axis with `n` edges holds `n - 1` cells. Axes that hold a single point are
    /// kept at a single cell.
    pub fn to_cell_centered(self) -> Self {
        Self(self.0.map(|n| n.saturating_sub(1).max(1)))
    }

    /// number of axes with more than one point
    pub fn dimensionality(&self) -> usize {
        self.0.iter().filter(|n| **n > 1).count()
    }

    /// the dimensions in storage order `(nz, ny, nx)`
    pub fn stored(&self) -> [usize; 3] {
        [self.0[2], self.0[1], self.0[0]]
    }
}
