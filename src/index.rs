//! field name to on-disk location lookup, built by a skip-only pass over a file

use crate::prelude::*;
use indexmap::IndexMap;

/// where the payload of one field can be found again
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLocation {
    /// start of a self describing dump record. The record header is read again when
    /// the field is loaded.
    Record { offset: u64 },
    /// start of a bare big-endian payload in a legacy vtk file
    Raw {
        offset: u64,
        kind: ElementKind,
        shape: Shape,
    },
    /// path of a dataset inside a hierarchical container
    Dataset { path: String },
}

impl FieldLocation {
    /// byte offset of the location, if it has one
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Record { offset } | Self::Raw { offset, .. } => Some(*offset),
            Self::Dataset { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Insertion ordered mapping from field name to [`FieldLocation`].
///
/// Names keep the order they were found in the file. Inserting a name twice keeps
/// the first position and replaces the location.
pub struct FieldIndex {
    fields: IndexMap<String, FieldLocation>,
}

impl FieldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, location: FieldLocation) {
        let name = name.into();
        if self.fields.insert(name.clone(), location).is_some() {
            log::warn!("field `{name}` appears more than once, keeping the last location");
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldLocation> {
        self.fields.get(name)
    }

    pub fn offset(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldLocation::offset)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// field names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldLocation)> {
        self.fields.iter().map(|(name, loc)| (name.as_str(), loc))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
