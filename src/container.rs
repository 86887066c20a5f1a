//! # PLUTO hdf5 outputs
//!
//! PLUTO's XDMF output is a hdf5 container `data.NNNN.dbl.h5` (or `.flt.h5`) that
//! holds the grid nodes and the fields of one timestep:
//!
//! ```text
//! /cell_coords/{X,Y,Z}
//! /node_coords/{X,Y,Z}
//! /Timestep_N/vars/{rho,vx1,...}
//! ```
//!
//! next to three text files: the XDMF descriptor `data.NNNN.dbl.xmf`, the grid
//! description `grid.out` and the run log `dbl.h5.out`.
//!
//! The container itself is reached through the [`DatasetSource`] trait. An hdf5 backed
//! implementation is available with the `hdf5` feature; [`MemorySource`] holds
//! datasets in memory.

mod grid_description;
#[cfg(feature = "hdf5")]
mod hdf5_source;
mod xmf;

pub use grid_description::{AxisHeader, GridDescription};
#[cfg(feature = "hdf5")]
pub use hdf5_source::Hdf5Source;
pub use xmf::XmfDescriptor;

use crate::prelude::*;
use crate::mesh::{reconstruct, NodeCoordinates};
use crate::metadata::Producer;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const NODE_COORDS: &str = "node_coords";
const CELL_COORDS: &str = "cell_coords";

/// read access to the datasets of a hierarchical container
pub trait DatasetSource {
    /// names of the members of `group`, `"/"` being the root
    fn member_names(&self, group: &str) -> Result<Vec<String>, Error>;

    /// does a group or dataset exist at `path`
    fn contains(&self, path: &str) -> bool;

    /// read a dataset as doubles, in its stored shape
    fn read_dataset(&self, path: &str) -> Result<ArrayD<f64>, Error>;

    /// quick check that the container at `path` looks like a PLUTO output. Sources
    /// that cannot open files accept everything.
    fn looks_like_output(_path: &Path) -> bool
    where
        Self: Sized,
    {
        true
    }
}

/// datasets held in memory, keyed by their absolute path
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: IndexMap<String, ArrayD<f64>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: ArrayD<f64>) {
        self.datasets.insert(normalize(path), data);
    }
}

fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

impl DatasetSource for MemorySource {
    fn member_names(&self, group: &str) -> Result<Vec<String>, Error> {
        let group = normalize(group);
        let prefix = if group == "/" { group } else { format!("{group}/") };

        let mut names: Vec<String> = Vec::new();
        for path in self.datasets.keys() {
            if let Some(rest) = path.strip_prefix(&prefix) {
                let member = rest.split('/').next().unwrap_or_default();
                if !member.is_empty() && !names.iter().any(|n| n == member) {
                    names.push(member.to_string());
                }
            }
        }
        Ok(names)
    }

    fn contains(&self, path: &str) -> bool {
        let path = normalize(path);
        let prefix = format!("{path}/");
        self.datasets
            .keys()
            .any(|key| *key == path || key.starts_with(&prefix))
    }

    fn read_dataset(&self, path: &str) -> Result<ArrayD<f64>, Error> {
        self.datasets
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| Error::MissingDataset(path.to_string()))
    }
}

/// the text files that accompany a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidecars {
    /// `data.NNNN.dbl.xmf`
    pub xmf: PathBuf,
    /// `grid.out`
    pub grid: PathBuf,
    /// `dbl.h5.out` or `flt.h5.out`
    pub log: PathBuf,
}

impl Sidecars {
    /// sidecar paths for a container named `*.dbl.h5` or `*.flt.h5`
    pub fn for_container(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let precision = if name.ends_with("dbl.h5") {
            "dbl"
        } else if name.ends_with("flt.h5") {
            "flt"
        } else {
            return None;
        };

        let stem = name.strip_suffix("h5")?;

        Some(Self {
            xmf: path.with_file_name(format!("{stem}xmf")),
            grid: path.with_file_name("grid.out"),
            log: path.with_file_name(format!("{precision}.h5.out")),
        })
    }

    pub fn exist(&self) -> bool {
        self.xmf.is_file() && self.grid.is_file() && self.log.is_file()
    }
}

/// error out on containers holding more than one timestep
pub fn check_single_block<S: DatasetSource>(source: &S) -> Result<(), Error> {
    let blocks = timestep_groups(source)?;
    if blocks.len() > 1 {
        return Err(Error::MultiBlock(blocks.len()));
    }
    Ok(())
}

fn timestep_groups<S: DatasetSource>(source: &S) -> Result<Vec<String>, Error> {
    Ok(source
        .member_names("/")?
        .into_iter()
        .filter(|name| name != NODE_COORDS && name != CELL_COORDS)
        .collect())
}

/// reconstruct cell edges from the node coordinates of a container
pub fn read_grid_coordinates<S: DatasetSource>(source: &S, geometry: Geometry) -> Result<Coordinates, Error> {
    check_single_block(source)?;

    let x = source.read_dataset("/node_coords/X")?;
    let y = source.read_dataset("/node_coords/Y")?;
    let z = source.read_dataset("/node_coords/Z")?;

    // only 1D curvilinear grids may need the radial cell centers
    let radial_cells = if x.ndim() == 1 && geometry.is_curvilinear() && source.contains("/cell_coords/X") {
        Some(source.read_dataset("/cell_coords/X")?.iter().copied().collect::<Vec<f64>>())
    } else {
        None
    };

    log::debug!("container node coordinates have stored shape {:?}", x.shape());

    let nodes = NodeCoordinates::Structured { x, y, z };
    Ok(reconstruct(nodes, geometry, radial_cells.as_deref())?)
}

/// dataset paths of the fields of the single timestep in the container
pub fn read_field_index<S: DatasetSource>(source: &S) -> Result<FieldIndex, Error> {
    check_single_block(source)?;

    let mut index = FieldIndex::new();
    if let Some(root) = timestep_groups(source)?.first() {
        let vars = format!("/{root}/vars");
        if source.contains(&vars) {
            for name in source.member_names(&vars)? {
                let path = format!("{vars}/{name}");
                index.insert(name, FieldLocation::Dataset { path });
            }
        }
    }
    Ok(index)
}

/// [`Decoder`] over a PLUTO hdf5 output and its sidecar files
#[derive(Debug, Clone)]
pub struct XdmfDecoder<S> {
    path: PathBuf,
    sidecars: Sidecars,
    source: S,
}

impl<S: DatasetSource> XdmfDecoder<S> {
    /// pair an already opened container with the sidecars next to `path`
    pub fn with_source(path: PathBuf, source: S) -> Result<Self, Error> {
        let sidecars = Sidecars::for_container(&path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not named like a PLUTO hdf5 output", path.display()),
            )
        })?;

        Ok(Self { path, sidecars, source })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sidecars(&self) -> &Sidecars {
        &self.sidecars
    }

    pub fn grid_description(&self) -> Result<GridDescription, Error> {
        let text = std::fs::read_to_string(&self.sidecars.grid)?;
        GridDescription::parse(&text)
    }
}

#[cfg(feature = "hdf5")]
impl XdmfDecoder<Hdf5Source> {
    pub fn open(path: PathBuf) -> Result<Self, Error> {
        let source = Hdf5Source::open(&path)?;
        Self::with_source(path, source)
    }
}

impl<S: DatasetSource> Decoder for XdmfDecoder<S> {
    fn sniff(path: &Path) -> bool {
        match Sidecars::for_container(path) {
            Some(sidecars) => sidecars.exist() && S::looks_like_output(path),
            None => false,
        }
    }

    fn format(&self) -> Format {
        Format::PlutoXdmf
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<Metadata, Error> {
        let grid = self.grid_description()?;

        let header = grid.code_line().unwrap_or_default().to_string();
        let code_version = if header.is_empty() {
            None
        } else {
            crate::metadata::code_version(&header, Producer::Pluto)
        };

        let entry = match crate::run_log::output_number(&self.path) {
            Some(number) => {
                let log = std::fs::read_to_string(&self.sidecars.log)?;
                crate::run_log::h5_log_entry(&log, number)
            }
            None => None,
        };

        let time = match entry {
            Some(entry) => Some(entry.time),
            None => {
                log::warn!(
                    "no entry for {} in {}, falling back to the xmf descriptor",
                    self.path.display(),
                    self.sidecars.log.display()
                );
                XmfDescriptor::read(&self.sidecars.xmf)?.time
            }
        };

        Ok(Metadata {
            header,
            code_version,
            time,
            periodicity: Some([true; 3]),
            geometry: grid.geometry,
            dimensions: Some(grid.dimensions()),
            domain: Some(grid.domain_edges()),
            tracers: entry.map(|entry| entry.tracers),
        })
    }

    fn read_coordinates(&self, geometry: Geometry) -> Result<Coordinates, Error> {
        read_grid_coordinates(&self.source, geometry)
    }

    fn read_field_index(&self) -> Result<FieldIndex, Error> {
        let index = read_field_index(&self.source)?;
        if !index.is_empty() {
            return Ok(index);
        }

        // containers without a vars group, the descriptor still knows the paths
        let descriptor = XmfDescriptor::read(&self.sidecars.xmf)?;
        let mut index = FieldIndex::new();
        for (name, path) in descriptor.fields {
            index.insert(name, FieldLocation::Dataset { path });
        }
        Ok(index)
    }

    /// fields are returned with logical shape `(nx, ny, nz)`
    fn read_field(&self, index: &FieldIndex, name: &str) -> Result<FieldArray, Error> {
        match index.get(name) {
            Some(FieldLocation::Dataset { path }) => {
                let data = self.source.read_dataset(path)?;
                Ok(FieldArray::Float64(data.reversed_axes()))
            }
            _ => Err(Error::MissingField(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arr(shape: &[usize], values: Vec<f64>) -> ArrayD<f64> {
        ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
    }

    #[test]
    fn memory_members() {
        let mut source = MemorySource::new();
        source.insert("/node_coords/X", arr(&[2], vec![0.0, 1.0]));
        source.insert("node_coords/Y", arr(&[2], vec![0.0, 1.0]));
        source.insert("/Timestep_0/vars/rho", arr(&[1], vec![1.0]));

        assert_eq!(source.member_names("/").unwrap(), vec!["node_coords", "Timestep_0"]);
        assert_eq!(source.member_names("/node_coords").unwrap(), vec!["X", "Y"]);
        assert!(source.contains("/Timestep_0/vars"));
        assert!(!source.contains("/Timestep_0/var"));
        assert!(matches!(
            source.read_dataset("/cell_coords/X"),
            Err(Error::MissingDataset(_))
        ));
    }

    #[test]
    fn sidecar_names() {
        let sidecars = Sidecars::for_container(Path::new("/run/data.0003.flt.h5")).unwrap();
        assert_eq!(sidecars.xmf, Path::new("/run/data.0003.flt.xmf"));
        assert_eq!(sidecars.grid, Path::new("/run/grid.out"));
        assert_eq!(sidecars.log, Path::new("/run/flt.h5.out"));

        assert!(Sidecars::for_container(Path::new("/run/data.0003.vtk")).is_none());
    }

    #[test]
    fn multi_block_is_fatal() {
        let mut source = MemorySource::new();
        source.insert("/Timestep_0/vars/rho", arr(&[1], vec![1.0]));
        source.insert("/Timestep_1/vars/rho", arr(&[1], vec![1.0]));

        let err = read_field_index(&source).unwrap_err();
        assert!(matches!(err, Error::MultiBlock(2)));
    }

    #[test]
    fn fields_from_vars_group() {
        let mut source = MemorySource::new();
        source.insert("/node_coords/X", arr(&[2], vec![0.0, 1.0]));
        source.insert("/Timestep_0/vars/rho", arr(&[1], vec![1.0]));
        source.insert("/Timestep_0/vars/prs", arr(&[1], vec![1.0]));

        let index = read_field_index(&source).unwrap();
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["rho", "prs"]);
        assert_eq!(
            index.get("prs"),
            Some(&FieldLocation::Dataset {
                path: "/Timestep_0/vars/prs".into()
            })
        );
    }
}
