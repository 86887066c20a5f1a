//! turn raw node coordinates into per-axis cell edges
//!
//! Rectilinear grids store one vector of edges per axis and need no work beyond
//! counting cells. Structured grids store the position of every node as three arrays
//! laid out `(z, y, x)`, the last logical axis first. Cartesian and cylindrical grids
//! are read by slicing those arrays along each axis. Polar and spherical grids are
//! written in cartesian space, so their nodes are mapped back to `(r, θ, z)` or
//! `(r, θ, φ)` before the edges are taken.

use super::{Coordinates, Geometry, GeometryError, Shape};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Zip};
use std::f64::consts::PI;

/// radial extents below this are treated as collapsed onto a single value
const COLLAPSED_EXTENT: f64 = 1e-8;

/// node coordinates as they are found on disk
#[derive(Debug, Clone, PartialEq)]
pub enum NodeCoordinates {
    /// one vector of edge positions per logical axis
    Rectilinear {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
    },
    /// the position of every node, three arrays of identical shape stored with the
    /// last logical axis first
    Structured {
        x: ArrayD<f64>,
        y: ArrayD<f64>,
        z: ArrayD<f64>,
    },
}

/// reconstruct cell edges for a grid of the given geometry.
///
/// `radial_cells` holds the radial cell center positions when they are available. They
/// are only consulted for one dimensional polar and spherical grids whose radial nodes
/// collapsed onto a single value, see [`collapsed_radial_correction`].
pub fn reconstruct(
    nodes: NodeCoordinates,
    geometry: Geometry,
    radial_cells: Option<&[f64]>,
) -> Result<Coordinates, GeometryError> {
    if !geometry.is_known() {
        return Err(GeometryError::Unsupported(geometry));
    }

    match nodes {
        NodeCoordinates::Rectilinear { x, y, z } => rectilinear(x, y, z, geometry),
        NodeCoordinates::Structured { x, y, z } => {
            if x.shape() != y.shape() || x.shape() != z.shape() {
                return Err(GeometryError::InconsistentNodes {
                    x: x.shape().to_vec(),
                    y: y.shape().to_vec(),
                    z: z.shape().to_vec(),
                });
            }

            let dimensions = x.ndim();
            if !(1..=3).contains(&dimensions) {
                return Err(GeometryError::UnsupportedShape(dimensions));
            }
            for (axis, n) in ['x', 'y', 'z'].iter().zip(x.shape().iter().rev()) {
                if *n == 0 {
                    return Err(GeometryError::EmptyAxis(*axis));
                }
            }

            if geometry.is_curvilinear() && dimensions > 1 {
                Ok(curvilinear(x, y, z, geometry))
            } else {
                Ok(sliced(x, y, z, geometry, radial_cells))
            }
        }
    }
}

fn rectilinear(
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    geometry: Geometry,
) -> Result<Coordinates, GeometryError> {
    for (axis, edges) in ['x', 'y', 'z'].iter().zip([&x, &y, &z]) {
        if edges.is_empty() {
            return Err(GeometryError::EmptyAxis(*axis));
        }
    }

    let array_shape = Shape::new(x.len(), y.len(), z.len()).to_cell_centered();

    Ok(Coordinates {
        x,
        y,
        z,
        array_shape,
        geometry,
    })
}

/// edges for cartesian and cylindrical grids of any dimensionality, and for one
/// dimensional polar and spherical grids
fn sliced(
    x: ArrayD<f64>,
    y: ArrayD<f64>,
    z: ArrayD<f64>,
    geometry: Geometry,
    radial_cells: Option<&[f64]>,
) -> Coordinates {
    let stored = x.shape().to_vec();
    let array_shape = Shape::from_stored(&stored).to_cell_centered();

    let (x, y, z) = match stored.len() {
        1 => {
            let mut x: Vec<f64> = x.iter().copied().collect();

            if geometry.is_curvilinear() {
                match radial_cells {
                    Some(cells) => {
                        if let Some(corrected) = collapsed_radial_correction(&x, cells, geometry) {
                            x = corrected;
                        }
                    }
                    None if is_collapsed(&x) => {
                        log::warn!(
                            "radial nodes of this {geometry} grid collapse onto a single value \
                             but no cell coordinates are available to rebuild them"
                        );
                    }
                    None => (),
                }
            }

            // the inactive axes are not stored at all for 1D data
            (x, vec![0.0, 1.0], vec![0.0, 1.0])
        }
        2 => {
            let third = if geometry == Geometry::Cartesian {
                vec![0.0, 1.0]
            } else {
                vec![0.0, 2.0 * PI]
            };
            (line(x.view(), 1), line(y.view(), 0), third)
        }
        _ => (line(x.view(), 2), line(y.view(), 1), line(z.view(), 0)),
    };

    Coordinates {
        x,
        y,
        z,
        array_shape,
        geometry,
    }
}

/// edges for polar and spherical grids with two or three stored dimensions
fn curvilinear(x: ArrayD<f64>, y: ArrayD<f64>, z: ArrayD<f64>, geometry: Geometry) -> Coordinates {
    let array_shape = Shape::from_stored(x.shape()).to_cell_centered();

    // 2D data is a single slab of a 3D grid
    let promote = |arr: ArrayD<f64>| {
        if arr.ndim() == 2 {
            arr.insert_axis(Axis(0))
        } else {
            arr
        }
    };

    // from (z, y, x) storage into (x, y, z) logical order
    let ordering = IxDyn(&[2, 1, 0]);
    let xcart = promote(x).permuted_axes(ordering.clone());
    let ycart = promote(y).permuted_axes(ordering.clone());
    let zcart = promote(z).permuted_axes(ordering);

    let [first, second, third] = map_from_cartesian(&xcart, &ycart, &zcart, geometry);

    let radius = line(first.view(), 0);
    let mut second = line(second.view(), 1);
    let mut third = line(third.view(), 2);

    match geometry {
        Geometry::Polar => second = unwrap_angles(second),
        Geometry::Spherical => third = unwrap_angles(third),
        _ => (),
    }

    Coordinates {
        x: radius,
        y: second,
        z: third,
        array_shape,
        geometry,
    }
}

/// map cartesian node positions onto the curvilinear axes of `geometry`.
///
/// polar: `(r, θ, z)` with `r = √(x² + y²)` and `θ = atan2(y, x)`.
/// spherical: `(r, θ, φ)` with `r = √(x² + y² + z²)`, `θ = acos(z / r)` and
/// `φ = atan2(y, x)`.
pub fn map_from_cartesian(
    x: &ArrayD<f64>,
    y: &ArrayD<f64>,
    z: &ArrayD<f64>,
    geometry: Geometry,
) -> [ArrayD<f64>; 3] {
    match geometry {
        Geometry::Spherical => {
            let r = Zip::from(x)
                .and(y)
                .and(z)
                .map_collect(|&x, &y, &z| (x * x + y * y + z * z).sqrt());
            let theta = Zip::from(&r).and(z).map_collect(|&r, &z| {
                if r == 0.0 {
                    0.0
                } else {
                    (z / r).clamp(-1.0, 1.0).acos()
                }
            });
            let phi = Zip::from(x).and(y).map_collect(|&x, &y| y.atan2(x));
            [r, theta, phi]
        }
        Geometry::Polar => {
            let r = Zip::from(x).and(y).map_collect(|&x, &y| x.hypot(y));
            let theta = Zip::from(x).and(y).map_collect(|&x, &y| y.atan2(x));
            [r, theta, z.clone()]
        }
        _ => [x.clone(), y.clone(), z.clone()],
    }
}

/// The named special case for 1D polar and spherical outputs whose radial nodes all
/// hold the same value: the solver wrote cell centers in place of edges. The edges
/// are rebuilt from the radial cell centers `c` as `[c1 - c0, c0, c1, ...]`, divided
/// by `sin(0.5)` for spherical and `cos(0.5)` for polar grids.
///
/// This only reproduces the data seen in practice from that solver; it is not a
/// general transform. Returns `None` when the correction does not apply.
pub fn collapsed_radial_correction(
    nodes: &[f64],
    radial_cells: &[f64],
    geometry: Geometry,
) -> Option<Vec<f64>> {
    let divisor = match geometry {
        Geometry::Spherical => 0.5f64.sin(),
        Geometry::Polar => 0.5f64.cos(),
        _ => return None,
    };

    if !is_collapsed(nodes) || radial_cells.len() < 2 {
        return None;
    }

    let mut edges = Vec::with_capacity(radial_cells.len() + 1);
    edges.push(radial_cells[1] - radial_cells[0]);
    edges.extend_from_slice(radial_cells);

    Some(edges.into_iter().map(|r| r / divisor).collect())
}

fn is_collapsed(values: &[f64]) -> bool {
    if values.is_empty() {
        return false;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (max - min).abs() < COLLAPSED_EXTENT
}

/// values along axis `along`, every other axis held at index 0
fn line(arr: ArrayViewD<'_, f64>, along: usize) -> Vec<f64> {
    let mut view = arr;
    // removing the highest axes first keeps the index of the lower ones stable
    for ax in (0..view.ndim()).rev() {
        if ax != along {
            view = view.index_axis_move(Axis(ax), 0);
        }
    }
    view.iter().copied().collect()
}

/// bring azimuths from `(-π, π]` into a monotonic sequence starting in `[0, 2π)`
fn unwrap_angles(mut angles: Vec<f64>) -> Vec<f64> {
    for angle in angles.iter_mut() {
        if *angle < 0.0 {
            *angle += 2.0 * PI;
        }
    }
    for i in 1..angles.len() {
        if angles[i] < angles[i - 1] {
            angles[i] += 2.0 * PI;
        }
    }
    angles
}
