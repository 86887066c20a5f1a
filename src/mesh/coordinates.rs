use super::{Geometry, Shape};

/// left and right boundaries of the computational domain along each logical axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainEdges {
    pub left: [f64; 3],
    pub right: [f64; 3],
}

impl DomainEdges {
    pub fn width(&self) -> [f64; 3] {
        [
            self.right[0] - self.left[0],
            self.right[1] - self.left[1],
            self.right[2] - self.left[2],
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Cell edge positions along each logical axis of a grid, together with the number of
/// cells they describe.
///
/// Axes are labelled by the coordinate system of the grid: for a spherical grid `x`
/// holds radii, `y` colatitudes and `z` azimuths.
pub struct Coordinates {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// number of cells along each axis
    pub array_shape: Shape,
    pub geometry: Geometry,
}

impl Coordinates {
    pub fn arrays(&self) -> [&[f64]; 3] {
        [&self.x, &self.y, &self.z]
    }

    /// extent of the grid. An axis with no width (a single node) is given a width of
    /// one so that downstream consumers never see a degenerate domain.
    pub fn domain_edges(&self) -> DomainEdges {
        let mut left = [0.0; 3];
        let mut right = [0.0; 3];

        for (idir, edges) in self.arrays().iter().enumerate() {
            let min = edges.iter().copied().fold(f64::INFINITY, f64::min);
            let max = edges.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            left[idir] = min;
            right[idir] = if max == min { min + 1.0 } else { max };
        }

        DomainEdges { left, right }
    }

    /// width of every cell. Axes that hold a single cell span the whole domain.
    pub fn cell_widths(&self, domain: &DomainEdges) -> [Vec<f64>; 3] {
        let widths = domain.width();
        let mut out: [Vec<f64>; 3] = Default::default();

        for (idir, edges) in self.arrays().iter().enumerate() {
            out[idir] = if self.array_shape[idir] > 1 {
                edges.windows(2).map(|w| w[1] - w[0]).collect()
            } else {
                vec![widths[idir]; self.array_shape[idir]]
            };
        }

        out
    }

    /// position of every cell center. Axes that hold a single cell are centered on
    /// their first edge.
    pub fn cell_centers(&self) -> [Vec<f64>; 3] {
        let mut out: [Vec<f64>; 3] = Default::default();

        for (idir, edges) in self.arrays().iter().enumerate() {
            out[idir] = if self.array_shape[idir] > 1 {
                edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
            } else {
                edges.first().copied().into_iter().collect()
            };
        }

        out
    }
}
