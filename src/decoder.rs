//! # Decoders
//!
//! Every supported file flavour implements [`Decoder`]. Callers that do not know
//! what they are looking at go through [`Format::detect`] and [`Format::open`]:
//!
//! ```no_run
//! use fluidsnap::prelude::*;
//!
//! # fn main() -> Result<(), fluidsnap::Error> {
//! let path = std::path::Path::new("data.0001.vtk");
//! let decoder = Format::open(path)?;
//!
//! let metadata = decoder.read_metadata()?;
//! let geometry = metadata.geometry.unwrap_or(Geometry::Cartesian);
//! let coordinates = decoder.read_coordinates(geometry)?;
//!
//! let index = decoder.read_field_index()?;
//! let rho = decoder.read_field(&index, "RHO")?;
//! # Ok(())
//! # }
//! ```

use crate::prelude::*;
use crate::container::{Sidecars, XdmfDecoder};
use crate::dump::DumpDecoder;
use crate::legacy::{Idefix, LegacyDecoder, Pluto};
use std::path::Path;

/// The operations shared by all snapshot decoders.
///
/// Each call opens the file again and performs a single pass over it, so a decoder
/// holds no open handle between calls.
pub trait Decoder {
    /// Does `path` look like a file this decoder understands. Never fails: unreadable
    /// files are simply not recognized.
    fn sniff(path: &Path) -> bool
    where
        Self: Sized;

    fn format(&self) -> Format;

    fn path(&self) -> &Path;

    /// header, time, periodicity, geometry and grid extents
    fn read_metadata(&self) -> Result<Metadata, Error>;

    /// cell edges along each axis, interpreted in `geometry`
    fn read_coordinates(&self, geometry: Geometry) -> Result<Coordinates, Error>;

    /// where every field lives in the file, without reading any field data
    fn read_field_index(&self) -> Result<FieldIndex, Error>;

    /// read a single field through an index built by [`Decoder::read_field_index`]
    fn read_field(&self, index: &FieldIndex, name: &str) -> Result<FieldArray, Error>;
}

/// the file flavours understood by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Format {
    #[display(fmt = "Idefix dump")]
    IdefixDump,
    #[display(fmt = "Idefix vtk")]
    IdefixVtk,
    #[display(fmt = "PLUTO vtk")]
    PlutoVtk,
    #[display(fmt = "PLUTO xdmf")]
    PlutoXdmf,
}

impl Format {
    /// Find the format of the file at `path`, trying dumps, then legacy vtk files and
    /// finally hdf5 containers.
    pub fn detect(path: &Path) -> Option<Format> {
        let format = if DumpDecoder::sniff(path) {
            Some(Format::IdefixDump)
        } else if LegacyDecoder::<Idefix>::sniff(path) {
            Some(Format::IdefixVtk)
        } else if LegacyDecoder::<Pluto>::sniff(path) {
            Some(Format::PlutoVtk)
        } else if sniff_container(path) {
            Some(Format::PlutoXdmf)
        } else {
            None
        };

        match format {
            Some(format) => log::debug!("{} detected as {format}", path.display()),
            None => log::debug!("{} matches no known format", path.display()),
        }

        format
    }

    /// detect the format of `path` and open a decoder for it
    pub fn open(path: &Path) -> Result<Box<dyn Decoder>, Error> {
        let format = Format::detect(path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not a recognized snapshot file", path.display()),
            )
        })?;

        format.decoder(path)
    }

    /// open a decoder of this format, without sniffing
    pub fn decoder(self, path: &Path) -> Result<Box<dyn Decoder>, Error> {
        let path = path.to_path_buf();

        let decoder: Box<dyn Decoder> = match self {
            Format::IdefixDump => Box::new(DumpDecoder::new(path)),
            Format::IdefixVtk => Box::new(LegacyDecoder::<Idefix>::new(path)),
            Format::PlutoVtk => Box::new(LegacyDecoder::<Pluto>::new(path)),
            Format::PlutoXdmf => open_container(path)?,
        };

        Ok(decoder)
    }
}

#[cfg(feature = "hdf5")]
fn sniff_container(path: &Path) -> bool {
    XdmfDecoder::<crate::container::Hdf5Source>::sniff(path)
}

#[cfg(not(feature = "hdf5"))]
fn sniff_container(path: &Path) -> bool {
    XdmfDecoder::<crate::container::MemorySource>::sniff(path)
}

#[cfg(feature = "hdf5")]
fn open_container(path: std::path::PathBuf) -> Result<Box<dyn Decoder>, Error> {
    Ok(Box::new(XdmfDecoder::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_container(path: std::path::PathBuf) -> Result<Box<dyn Decoder>, Error> {
    log::warn!(
        "{} is a PLUTO hdf5 output, but hdf5 support is not compiled in",
        path.display()
    );
    Err(Error::FeatureDisabled("hdf5"))
}

/// sidecars of a container, if its name follows the PLUTO convention and they all exist
pub fn container_sidecars(path: &Path) -> Option<Sidecars> {
    Sidecars::for_container(path).filter(Sidecars::exist)
}
