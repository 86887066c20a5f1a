//! Common traits and types that are useful for working with `fluidsnap`
#![allow(unused_imports)]

pub use crate::array::{ElementKind, FieldArray};
pub use crate::decoder::{Decoder, Format};
pub use crate::index::{FieldIndex, FieldLocation};
pub use crate::mesh::{Coordinates, DomainEdges, Geometry, GeometryError, Shape};
pub use crate::metadata::Metadata;

pub(crate) use crate::binary::{BinaryReader, Endian, Packed};
pub(crate) use crate::parse::ParseError;
pub(crate) use crate::Error;

pub(crate) use std::io::{Read, Seek};

pub(crate) use derive_more::{Constructor, Deref, Display, From, Into};

pub(crate) use ndarray::{ArrayD, IxDyn};
