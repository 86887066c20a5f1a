#![doc = include_str!("../README.md")]

pub mod array;
pub mod binary;
pub mod container;
pub mod decoder;
pub mod dump;
pub mod index;
pub mod legacy;
pub mod mesh;
pub mod metadata;
pub mod parse;
pub mod prelude;
pub mod run_log;

pub use array::{ElementKind, FieldArray};
pub use decoder::{Decoder, Format};
pub use index::{FieldIndex, FieldLocation};
pub use mesh::{reconstruct, resolve_geometry, Coordinates, DomainEdges, Geometry, GeometryError, Shape};
pub use metadata::Metadata;
pub use parse::ParseError;

pub use container::{DatasetSource, MemorySource, XdmfDecoder};
pub use dump::DumpDecoder;
pub use legacy::LegacyDecoder;

#[cfg(feature = "hdf5")]
pub use container::Hdf5Source;

pub use ndarray;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Error while parsing snapshot file: {0}")]
    Parse(#[from] parse::ParseError),
    #[error("Could not reconstruct grid: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Array data does not match its declared shape: `{0}`")]
    Shape(#[from] ndarray::ShapeError),
    #[cfg(feature = "hdf5")]
    #[error("Could not read hdf5 container: `{0}`")]
    Hdf5(#[from] hdf5::Error),
    #[error("Field `{0}` is not in the field index")]
    MissingField(String),
    #[error("Dataset `{0}` does not exist in the container")]
    MissingDataset(String),
    #[error("Container holds {0} blocks, only single block outputs are supported")]
    MultiBlock(usize),
    #[error("Support for `{0}` is not compiled in, enable the cargo feature of the same name")]
    FeatureDisabled(&'static str),
}
