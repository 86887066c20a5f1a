//! # Mesh Information
//!
//! Every snapshot format describes its grid differently, but all of them end up as a
//! [`Coordinates`] value: one vector of cell edges per logical axis, the number of cells
//! those edges bound and the [`Geometry`] they are expressed in.
//!
//! Binary dumps and rectilinear VTK files store edges directly. Structured VTK files and
//! HDF5 containers store the position of every node instead; [`reconstruct`] turns those
//! back into per-axis edges, mapping cartesian positions onto polar or spherical axes
//! when needed.
//!
//! ## Shapes
//!
//! A [`Shape`] always lists the `(x, y, z)` axes. On disk, arrays are usually stored
//! with the last logical axis first; use [`Shape::from_stored`] and [`Shape::stored`] to
//! move between the two orders.
//!
//! ## Geometry
//!
//! The geometry of a snapshot can come from the data file, from a compile-time
//! definitions header next to it, or from the caller. [`resolve_geometry`] combines
//! the three.

mod coordinates;
mod geometry;
pub mod reconstruct;
mod shape;

pub use coordinates::{Coordinates, DomainEdges};
pub use geometry::{resolve_geometry, Geometry, GeometryError};
pub use reconstruct::{reconstruct, NodeCoordinates};
pub use shape::Shape;
