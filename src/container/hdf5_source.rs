use super::{DatasetSource, CELL_COORDS, NODE_COORDS};
use crate::prelude::*;
use std::path::Path;

/// a PLUTO output opened through libhdf5
#[derive(Debug)]
pub struct Hdf5Source {
    file: ::hdf5::File,
}

impl Hdf5Source {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = ::hdf5::File::open(path)?;
        Ok(Self { file })
    }
}

impl DatasetSource for Hdf5Source {
    fn member_names(&self, group: &str) -> Result<Vec<String>, Error> {
        if group == "/" {
            return Ok(self.file.member_names()?);
        }
        Ok(self.file.group(group)?.member_names()?)
    }

    fn contains(&self, path: &str) -> bool {
        self.file.link_exists(path)
    }

    fn read_dataset(&self, path: &str) -> Result<ArrayD<f64>, Error> {
        if !self.file.link_exists(path) {
            return Err(Error::MissingDataset(path.to_string()));
        }
        let dataset = self.file.dataset(path)?;
        Ok(dataset.read_dyn::<f64>()?)
    }

    fn looks_like_output(path: &Path) -> bool {
        match Self::open(path) {
            Ok(source) => source.contains(CELL_COORDS) && source.contains(NODE_COORDS),
            Err(_) => false,
        }
    }
}
