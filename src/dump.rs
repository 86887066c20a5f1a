//! # Idefix binary dumps
//!
//! A dump starts with a 128 byte header string, followed by a sequence of self
//! describing records:
//!
//! ```text
//! name (16 bytes) | type code (i32) | rank (i32) | extents (rank x i32) | payload
//! ```
//!
//! all in the byte order of the machine that wrote the file. The first nine records
//! describe the grid (`x1 xl1 xr1 x2 xl2 xr2 x3 xl3 xr3`) and the sequence ends with a
//! record named `eof`.
//!
//! Records whose name starts with `Vc-` or `Vs-` are *distributed*: their payload is
//! always made of doubles, whatever type code they declare. Every other record is
//! *serial*, must have rank 1, and is read with the type it declares.

use crate::prelude::*;
use crate::parse::{NegativeExtent, SerialRank, UnknownElementKind, UnsupportedRank};
use crate::metadata::Producer;
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// size of the header string at the start of every dump
pub const HEADER_SIZE: usize = 128;
/// size of the name field of a record
pub const NAME_SIZE: usize = 16;

const GRID_PROPERTIES: usize = 9;
const END_OF_RECORDS: &str = "eof";
const COORDINATE_AXES: [&str; 3] = ["x1", "x2", "x3"];

static DUMP_HEADER: OnceLock<Option<Regex>> = OnceLock::new();

/// the declaration that precedes every record payload
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub name: String,
    pub kind: ElementKind,
    pub extents: Vec<usize>,
}

impl FieldRecord {
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// `Vc-` (cell centered) and `Vs-` (face centered) records hold per-cell data
    pub fn is_distributed(&self) -> bool {
        self.name.starts_with("Vc-") || self.name.starts_with("Vs-")
    }

    /// a serial record holding a single value. Coordinate axes with one cell stay
    /// arrays.
    pub fn is_scalar(&self) -> bool {
        self.extents == [1] && !COORDINATE_AXES.contains(&self.name.as_str())
    }

    /// element type the payload is actually stored with
    fn stored_kind(&self) -> ElementKind {
        if self.is_distributed() {
            ElementKind::Float64
        } else {
            self.kind
        }
    }
}

/// the value of one record once it has been read
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar { kind: ElementKind, value: f64 },
    Array(FieldArray),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar { value, .. } => Some(*value),
            Self::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&FieldArray> {
        match self {
            Self::Array(arr) => Some(arr),
            Self::Scalar { .. } => None,
        }
    }

    /// turn the value into an array, wrapping scalars in a single element array
    pub fn into_array(self) -> Result<FieldArray, Error> {
        let arr = match self {
            Self::Array(arr) => arr,
            Self::Scalar {
                kind: ElementKind::Int32,
                value,
            } => FieldArray::Int32(ArrayD::from_shape_vec(IxDyn(&[1]), vec![value as i32])?),
            Self::Scalar {
                kind: ElementKind::Float32,
                value,
            } => FieldArray::Float32(ArrayD::from_shape_vec(IxDyn(&[1]), vec![value as f32])?),
            Self::Scalar {
                kind: ElementKind::Float64,
                value,
            } => FieldArray::Float64(ArrayD::from_shape_vec(IxDyn(&[1]), vec![value])?),
        };
        Ok(arr)
    }
}

/// read the declaration of the next record
pub fn read_record<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<FieldRecord, Error> {
    let name = reader.read_fixed_string(NAME_SIZE)?;

    let code = reader.read_one::<i32>(Endian::Native)?;
    let kind = ElementKind::from_code(code)
        .ok_or_else(|| ParseError::from(UnknownElementKind::new(name.clone(), code)))?;

    let rank = reader.read_one::<i32>(Endian::Native)?;
    if !(0..=3).contains(&rank) {
        return Err(ParseError::from(UnsupportedRank::new(name, rank)).into());
    }

    let raw_extents = reader.read_packed::<i32>(Endian::Native, rank as usize)?;
    let mut extents = Vec::with_capacity(raw_extents.len());
    for extent in raw_extents {
        let extent = usize::try_from(extent)
            .map_err(|_| ParseError::from(NegativeExtent::new(name.clone(), extent)))?;
        extents.push(extent);
    }

    log::trace!("dump record `{name}` {kind:?} {extents:?}");

    Ok(FieldRecord { name, kind, extents })
}

/// read a payload of `kind` described by `record`
pub fn read_chunk<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    record: &FieldRecord,
    kind: ElementKind,
    scalar: bool,
) -> Result<FieldValue, Error> {
    let arr = crate::array::read_array(reader, kind, Endian::Native, &record.extents, true)?;

    if scalar {
        // a scalar record holds exactly one element
        if let Some(value) = arr.first_f64() {
            return Ok(FieldValue::Scalar { kind, value });
        }
    }

    Ok(FieldValue::Array(arr))
}

/// move past a payload of `kind` described by `record` without reading it
pub fn skip_chunk<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    record: &FieldRecord,
    kind: ElementKind,
) -> Result<(), Error> {
    let mut factors = record.extents.clone();
    factors.push(kind.size());
    let byte_count = reader.checked_size("record payload", &factors)?;
    reader.skip(byte_count as u64)
}

fn check_serial(record: &FieldRecord) -> Result<(), Error> {
    if record.rank() != 1 {
        return Err(ParseError::from(SerialRank::new(record.name.clone(), record.rank())).into());
    }
    Ok(())
}

/// read a replicated record, which has to be one dimensional
pub fn read_serial<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    record: &FieldRecord,
) -> Result<FieldValue, Error> {
    check_serial(record)?;
    read_chunk(reader, record, record.kind, record.is_scalar())
}

/// read a per-cell record. The payload is always made of doubles.
pub fn read_distributed<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    record: &FieldRecord,
) -> Result<FieldArray, Error> {
    match read_chunk(reader, record, ElementKind::Float64, false)? {
        FieldValue::Array(arr) => Ok(arr),
        scalar => scalar.into_array(),
    }
}

/// receives the records of a dump, in file order, as they are walked by [`walk`]
///
/// Implementors must move the reader past the payload of every record they are
/// handed, either by reading or by skipping it.
pub trait RecordVisitor {
    /// one of the nine records describing the grid
    fn grid_property<R: Read + Seek>(
        &mut self,
        reader: &mut BinaryReader<R>,
        record: FieldRecord,
    ) -> Result<(), Error>;

    /// any record after the grid, `offset` being the start of its declaration
    fn field<R: Read + Seek>(
        &mut self,
        reader: &mut BinaryReader<R>,
        offset: u64,
        record: FieldRecord,
    ) -> Result<(), Error>;
}

/// walk every record of a dump, handing each to `visitor`
pub fn walk<R: Read + Seek, V: RecordVisitor>(
    reader: &mut BinaryReader<R>,
    visitor: &mut V,
) -> Result<(), Error> {
    reader.seek_to(HEADER_SIZE as u64)?;

    for _ in 0..GRID_PROPERTIES {
        let record = read_record(reader)?;
        check_serial(&record)?;
        visitor.grid_property(reader, record)?;
    }

    let mut count = 0;
    loop {
        let offset = reader.position()?;
        let record = read_record(reader)?;
        if record.name == END_OF_RECORDS {
            break;
        }
        visitor.field(reader, offset, record)?;
        count += 1;
    }

    log::debug!("walked {GRID_PROPERTIES} grid records and {count} field records");

    Ok(())
}

/// records every field offset and skips all payloads
#[derive(Default)]
struct IndexVisitor {
    index: FieldIndex,
}

impl RecordVisitor for IndexVisitor {
    fn grid_property<R: Read + Seek>(
        &mut self,
        reader: &mut BinaryReader<R>,
        record: FieldRecord,
    ) -> Result<(), Error> {
        skip_chunk(reader, &record, record.kind)
    }

    fn field<R: Read + Seek>(
        &mut self,
        reader: &mut BinaryReader<R>,
        offset: u64,
        record: FieldRecord,
    ) -> Result<(), Error> {
        if !record.is_distributed() {
            check_serial(&record)?;
        }
        skip_chunk(reader, &record, record.stored_kind())?;
        self.index.insert(record.name, FieldLocation::Record { offset });
        Ok(())
    }
}

/// reads records into a [`DumpContents`]
struct ContentsVisitor {
    contents: DumpContents,
    load_distributed: bool,
}

impl RecordVisitor for ContentsVisitor {
    fn grid_property<R: Read + Seek>(
        &mut self,
        reader: &mut BinaryReader<R>,
        record: FieldRecord,
    ) -> Result<(), Error> {
        let value = read_chunk(reader, &record, record.kind, false)?.into_array()?;
        self.contents.grid.insert(record.name.clone(), value);
        self.contents.records.insert(record.name.clone(), record);
        Ok(())
    }

    fn field<R: Read + Seek>(
        &mut self,
        reader: &mut BinaryReader<R>,
        _offset: u64,
        record: FieldRecord,
    ) -> Result<(), Error> {
        if record.is_distributed() {
            if self.load_distributed {
                let arr = read_distributed(reader, &record)?;
                self.contents.fields.insert(record.name.clone(), FieldValue::Array(arr));
            } else {
                skip_chunk(reader, &record, ElementKind::Float64)?;
            }
        } else {
            let value = read_serial(reader, &record)?;
            self.contents.fields.insert(record.name.clone(), value);
        }

        self.contents.records.insert(record.name.clone(), record);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Everything read from a dump in one pass.
///
/// When distributed records are skipped they still appear in `records` but not in
/// `fields`.
pub struct DumpContents {
    pub header: String,
    /// the nine grid records, by name
    pub grid: IndexMap<String, FieldArray>,
    /// every record after the grid that was read, by name
    pub fields: IndexMap<String, FieldValue>,
    /// declarations of every record, in file order
    pub records: IndexMap<String, FieldRecord>,
}

impl DumpContents {
    fn grid_values(&self, name: &str) -> Result<Vec<f64>, Error> {
        self.grid
            .get(name)
            .map(FieldArray::to_vec_f64)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// names of the per-cell records
    pub fn field_list(&self) -> Vec<&str> {
        self.records
            .values()
            .filter(|record| record.is_distributed())
            .map(|record| record.name.as_str())
            .collect()
    }

    /// number of cells along each axis, from the lengths of the cell center records
    pub fn dimensions(&self) -> Result<Shape, Error> {
        let mut dims = [1; 3];
        for (slot, axis) in dims.iter_mut().zip(COORDINATE_AXES) {
            *slot = self
                .grid
                .get(axis)
                .map(FieldArray::len)
                .ok_or_else(|| Error::MissingField(axis.to_string()))?;
        }
        Ok(Shape::from(dims))
    }

    pub fn domain_edges(&self) -> Result<DomainEdges, Error> {
        let mut left = [0.0; 3];
        let mut right = [0.0; 3];

        for idir in 0..3 {
            let axis = idir + 1;
            let xl = self.grid_values(&format!("xl{axis}"))?;
            let xr = self.grid_values(&format!("xr{axis}"))?;
            left[idir] = xl.first().copied().ok_or_else(|| Error::MissingField(format!("xl{axis}")))?;
            right[idir] = xr.last().copied().ok_or_else(|| Error::MissingField(format!("xr{axis}")))?;
        }

        Ok(DomainEdges { left, right })
    }

    /// cell edges: every left edge followed by the last right edge
    pub fn coordinates(&self, geometry: Geometry) -> Result<Coordinates, Error> {
        let mut axes: [Vec<f64>; 3] = Default::default();
        for (idir, edges) in axes.iter_mut().enumerate() {
            let axis = idir + 1;
            let mut xl = self.grid_values(&format!("xl{axis}"))?;
            let xr = self.grid_values(&format!("xr{axis}"))?;
            xl.extend(xr.last());
            *edges = xl;
        }
        let [x, y, z] = axes;

        Ok(Coordinates {
            x,
            y,
            z,
            array_shape: self.dimensions()?,
            geometry,
        })
    }

    /// `xr - xl` along each axis
    pub fn cell_widths(&self) -> Result<[Vec<f64>; 3], Error> {
        let mut out: [Vec<f64>; 3] = Default::default();
        for (idir, widths) in out.iter_mut().enumerate() {
            let axis = idir + 1;
            let xl = self.grid_values(&format!("xl{axis}"))?;
            let xr = self.grid_values(&format!("xr{axis}"))?;
            *widths = xr.iter().zip(&xl).map(|(r, l)| r - l).collect();
        }
        Ok(out)
    }

    /// the stored cell center records `x1`, `x2`, `x3`
    pub fn cell_centers(&self) -> Result<[Vec<f64>; 3], Error> {
        Ok([
            self.grid_values("x1")?,
            self.grid_values("x2")?,
            self.grid_values("x3")?,
        ])
    }

    pub fn metadata(&self) -> Result<Metadata, Error> {
        let time = self.fields.get("time").and_then(FieldValue::as_scalar);

        let periodicity = match self.fields.get("periodicity") {
            Some(value) => {
                let flags = match value {
                    FieldValue::Scalar { value, .. } => vec![*value],
                    FieldValue::Array(arr) => arr.to_vec_f64(),
                };
                let mut out = [true; 3];
                for (slot, flag) in out.iter_mut().zip(flags) {
                    *slot = flag != 0.0;
                }
                Some(out)
            }
            None => None,
        };

        let geometry = self
            .fields
            .get("geometry")
            .and_then(FieldValue::as_scalar)
            .map(|code| Geometry::from_code(code as i32));

        let header = self.header.clone();
        let code_version = crate::metadata::code_version(&header, Producer::Idefix);

        Ok(Metadata {
            header,
            code_version,
            time,
            periodicity,
            geometry,
            dimensions: Some(self.dimensions()?),
            domain: Some(self.domain_edges()?),
            tracers: None,
        })
    }
}

/// read the 128 byte header string of a dump
pub fn read_header_from<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<String, Error> {
    reader.seek_to(0)?;
    reader.read_fixed_string(HEADER_SIZE)
}

pub fn read_header(path: &Path) -> Result<String, Error> {
    let mut reader = BinaryReader::open(path)?;
    read_header_from(&mut reader)
}

/// read every record of a dump. Distributed records are skipped unless
/// `load_distributed` is set.
pub fn read_contents<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    load_distributed: bool,
) -> Result<DumpContents, Error> {
    let header = read_header_from(reader)?;

    let mut visitor = ContentsVisitor {
        contents: DumpContents {
            header,
            ..Default::default()
        },
        load_distributed,
    };
    walk(reader, &mut visitor)?;

    Ok(visitor.contents)
}

/// offset of every record after the grid, built without reading any payload
pub fn read_field_offset_index<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<FieldIndex, Error> {
    let mut visitor = IndexVisitor::default();
    walk(reader, &mut visitor)?;
    Ok(visitor.index)
}

/// read a single record starting at `offset`, as recorded in the field index
pub fn read_single_field<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    offset: u64,
) -> Result<FieldArray, Error> {
    reader.seek_to(offset)?;
    let record = read_record(reader)?;

    if record.is_distributed() {
        read_distributed(reader, &record)
    } else {
        read_serial(reader, &record)?.into_array()
    }
}

/// does the header look like an Idefix dump
pub fn is_dump_header(header: &str) -> bool {
    DUMP_HEADER
        .get_or_init(|| Regex::new(r"Idefix .* Dump Data").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(header))
}

/// [`Decoder`] over an Idefix dump on disk
#[derive(Debug, Clone, Constructor)]
pub struct DumpDecoder {
    path: PathBuf,
}

impl Decoder for DumpDecoder {
    fn sniff(path: &Path) -> bool {
        read_header(path).map(|header| is_dump_header(&header)).unwrap_or(false)
    }

    fn format(&self) -> Format {
        Format::IdefixDump
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<Metadata, Error> {
        let mut reader = BinaryReader::open(&self.path)?;
        read_contents(&mut reader, false)?.metadata()
    }

    fn read_coordinates(&self, geometry: Geometry) -> Result<Coordinates, Error> {
        if !geometry.is_known() {
            return Err(GeometryError::Unsupported(geometry).into());
        }
        let mut reader = BinaryReader::open(&self.path)?;
        read_contents(&mut reader, false)?.coordinates(geometry)
    }

    fn read_field_index(&self) -> Result<FieldIndex, Error> {
        let mut reader = BinaryReader::open(&self.path)?;
        read_field_offset_index(&mut reader)
    }

    fn read_field(&self, index: &FieldIndex, name: &str) -> Result<FieldArray, Error> {
        match index.get(name) {
            Some(FieldLocation::Record { offset }) => {
                let mut reader = BinaryReader::open(&self.path)?;
                read_single_field(&mut reader, *offset)
            }
            _ => Err(Error::MissingField(name.to_string())),
        }
    }
}
