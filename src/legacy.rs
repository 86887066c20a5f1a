//! # Legacy binary VTK files
//!
//! Idefix and PLUTO both write the legacy (non-xml) flavour of VTK in binary
//! encoding. The files mix ASCII declaration lines with big-endian payloads:
//!
//! ```text
//! # vtk DataFile Version 2.0
//! Idefix v1.0 ...
//! BINARY
//! DATASET RECTILINEAR_GRID
//! FIELD FieldData 3               <- optional
//! GEOMETRY 1 1 int
//! <4 bytes>
//! TIME 1 1 double
//! <8 bytes>
//! PERIODICITY 3 1 int
//! <12 bytes>
//! DIMENSIONS 65 65 1
//! X_COORDINATES 65 float          <- or POINTS n float for structured grids
//! <payload>
//! Y_COORDINATES 65 float
//! ...
//! CELL_DATA 4096
//! SCALARS RHO float
//! LOOKUP_TABLE default
//! <payload>
//! VECTORS VX float
//! <payload>
//! ```
//!
//! Every binary payload is followed by a single line feed. Field payloads are laid
//! out with `x` varying fastest.

use crate::prelude::*;
use crate::mesh::{reconstruct, GeometryError, NodeCoordinates};
use crate::metadata::Producer;
use crate::parse::{LineSummary, MalformedLine, Tokens, UnknownDatatype, UnrecognizedHeader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// the lines of a file up to and including `DIMENSIONS`
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    /// the version line and the comment line that identifies the producer
    pub header: String,
    pub dataset: String,
    pub geometry: Option<Geometry>,
    pub time: Option<f64>,
    pub periodicity: Option<[bool; 3]>,
    /// the `DIMENSIONS` triple, counting nodes along `(x, y, z)`
    pub dimensions: [usize; 3],
}

fn parse_dimensions(tokens: &Tokens<'_>) -> Result<[usize; 3], ParseError> {
    Ok([
        tokens.parse(1, "DIMENSIONS")?,
        tokens.parse(2, "DIMENSIONS")?,
        tokens.parse(3, "DIMENSIONS")?,
    ])
}

fn element_kind(tokens: &Tokens<'_>, idx: usize, context: &'static str) -> Result<ElementKind, ParseError> {
    tokens
        .get(idx)
        .and_then(ElementKind::from_vtk_name)
        .ok_or_else(|| MalformedLine::new(context, tokens.summary()).into())
}

/// read the four preamble lines, the optional `FIELD` block and `DIMENSIONS`
pub fn read_preamble<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<Preamble, Error> {
    reader.seek_to(0)?;

    let version = reader.read_line()?;
    let comment = reader.read_line()?;
    let _encoding = reader.read_line()?;
    let dataset_line = reader.read_line()?;

    let header = format!(
        "{}\n{}",
        String::from_utf8_lossy(&version).trim(),
        String::from_utf8_lossy(&comment).trim()
    );
    let dataset = Tokens::new(&dataset_line).get(1).unwrap_or_default().to_string();

    let mut preamble = Preamble {
        header,
        dataset,
        geometry: None,
        time: None,
        periodicity: None,
        dimensions: [1; 3],
    };

    let line = reader.read_line()?;
    let tokens = Tokens::new(&line);

    match tokens.first() {
        Some("DIMENSIONS") => {
            preamble.dimensions = parse_dimensions(&tokens)?;
        }
        Some("FIELD") => {
            let count: usize = tokens.parse(2, "FIELD entry count")?;
            for _ in 0..count {
                read_field_entry(reader, &mut preamble)?;
            }

            let line = reader.read_line()?;
            let tokens = Tokens::new(&line);
            if tokens.first() != Some("DIMENSIONS") {
                return Err(ParseError::from(UnrecognizedHeader::new(tokens.summary())).into());
            }
            preamble.dimensions = parse_dimensions(&tokens)?;
        }
        _ => {
            let summary = if line.is_empty() {
                LineSummary::eof()
            } else {
                tokens.summary()
            };
            return Err(ParseError::from(UnrecognizedHeader::new(summary)).into());
        }
    }

    log::debug!(
        "vtk preamble: dataset {}, dimensions {:?}, geometry {:?}",
        preamble.dataset,
        preamble.dimensions,
        preamble.geometry
    );

    Ok(preamble)
}

/// one `<TAG> <ncomp> <ntuples> <dtype>` entry of the `FIELD` block
fn read_field_entry<R: Read + Seek>(reader: &mut BinaryReader<R>, preamble: &mut Preamble) -> Result<(), Error> {
    let line = reader.read_line()?;
    let tokens = Tokens::new(&line);

    let tag = tokens
        .first()
        .ok_or_else(|| ParseError::from(MalformedLine::new("FIELD entry", tokens.summary())))?;
    let ncomp: usize = tokens.parse(1, "FIELD entry components")?;
    let ntuples: usize = tokens.parse(2, "FIELD entry tuples")?;
    let kind = element_kind(&tokens, 3, "FIELD entry type")?;
    let count = reader.checked_size("FIELD entry", &[ncomp, ntuples])?;

    match tag {
        "GEOMETRY" => {
            let values = crate::array::read_array(reader, kind, Endian::Big, &[count], false)?;
            if let Some(code) = values.first_f64() {
                preamble.geometry = Some(Geometry::from_code(code as i32));
            }
        }
        "TIME" => {
            let values = crate::array::read_array(reader, kind, Endian::Big, &[count], false)?;
            preamble.time = values.first_f64();
        }
        "PERIODICITY" => {
            let values = crate::array::read_array(reader, kind, Endian::Big, &[count], false)?.to_vec_f64();
            let mut periodicity = [true; 3];
            for (slot, flag) in periodicity.iter_mut().zip(values) {
                *slot = flag != 0.0;
            }
            preamble.periodicity = Some(periodicity);
        }
        other => {
            log::warn!("unknown field data `{other}` in vtk file, skipping {count} values");
            let byte_count = reader.checked_size("FIELD entry", &[count, kind.size()])?;
            reader.skip(byte_count as u64)?;
        }
    }

    // line feed after the payload
    reader.read_line()?;
    Ok(())
}

/// read the node coordinates that follow the preamble, together with the number of
/// cells they bound. A `CELL_DATA` or `POINT_DATA` line after them is consumed.
pub fn read_grid_nodes<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    preamble: &Preamble,
) -> Result<(NodeCoordinates, Shape), Error> {
    let line = reader.read_line()?;
    let tokens = Tokens::new(&line);

    let (nodes, array_shape) = match tokens.first() {
        Some("X_COORDINATES") => {
            let x = read_axis(reader, &tokens, "X_COORDINATES")?;
            let line = reader.read_line()?;
            let y = read_axis(reader, &Tokens::new(&line), "Y_COORDINATES")?;
            let line = reader.read_line()?;
            let z = read_axis(reader, &Tokens::new(&line), "Z_COORDINATES")?;

            let shape = Shape::new(x.len(), y.len(), z.len()).to_cell_centered();
            (NodeCoordinates::Rectilinear { x, y, z }, shape)
        }
        Some("POINTS") => {
            let count: usize = tokens.parse(1, "POINTS count")?;
            let kind = element_kind(&tokens, 2, "POINTS type")?;

            let [nx, ny, nz] = preamble.dimensions;
            if count != reader.checked_size("POINTS", &[nx, ny, nz])? {
                return Err(ParseError::from(MalformedLine::new("POINTS count matching DIMENSIONS", tokens.summary())).into());
            }

            let values = reader.checked_size("POINTS", &[count, 3])?;
            let points = crate::array::read_array(reader, kind, Endian::Big, &[values], false)?.to_vec_f64();
            reader.read_line()?;

            let stored = IxDyn(&squeeze_stored([nz, ny, nx]));
            let component = |offset: usize| -> Result<ArrayD<f64>, Error> {
                let values = points.iter().skip(offset).step_by(3).copied().collect();
                Ok(ArrayD::from_shape_vec(stored.clone(), values)?)
            };

            let nodes = NodeCoordinates::Structured {
                x: component(0)?,
                y: component(1)?,
                z: component(2)?,
            };
            (nodes, Shape::new(nx, ny, nz).to_cell_centered())
        }
        _ => {
            return Err(ParseError::from(MalformedLine::new("grid coordinates declaration", tokens.summary())).into());
        }
    };

    if reader.starts_with(b"CELL_DATA")? || reader.starts_with(b"POINT_DATA")? {
        reader.read_line()?;
    }

    Ok((nodes, array_shape))
}

/// drop leading stored axes of a single node so that the node arrays carry the
/// dimensionality of the grid. At least one axis is kept, and an inactive axis between
/// two active ones stays in place.
fn squeeze_stored(stored: [usize; 3]) -> Vec<usize> {
    let inactive = stored.iter().take(2).take_while(|n| **n == 1).count();
    stored[inactive..].to_vec()
}

/// read one `<AXIS>_COORDINATES <n> <dtype>` vector and the line feed after it
fn read_axis<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    tokens: &Tokens<'_>,
    expected: &'static str,
) -> Result<Vec<f64>, Error> {
    if tokens.first() != Some(expected) {
        return Err(ParseError::from(MalformedLine::new(expected, tokens.summary())).into());
    }

    let count: usize = tokens.parse(1, expected)?;
    let kind = element_kind(tokens, 2, expected)?;

    let values = crate::array::read_array(reader, kind, Endian::Big, &[count], false)?.to_vec_f64();
    reader.read_line()?;

    Ok(values)
}

/// read the preamble and grid of a file and reconstruct its cell edges. The reader
/// is left at the first data block declaration.
pub fn read_grid_coordinates<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    geometry: Geometry,
) -> Result<Coordinates, Error> {
    let preamble = read_preamble(reader)?;
    let (nodes, _) = read_grid_nodes(reader, &preamble)?;
    Ok(reconstruct(nodes, geometry, None)?)
}

/// walk the `SCALARS` / `VECTORS` blocks that follow the grid, recording where each
/// payload starts. Names are upper-cased.
pub fn read_field_offset_index<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    array_shape: Shape,
) -> Result<FieldIndex, Error> {
    let mut index = FieldIndex::new();

    loop {
        let line = reader.read_line()?;
        if line.len() < 2 {
            break;
        }

        let tokens = Tokens::new(&line);
        match tokens.first() {
            Some("SCALARS") => {
                let name = block_name(&tokens)?;
                let kind = element_kind(&tokens, 2, "SCALARS type")?;

                if reader.starts_with(b"LOOKUP_TABLE")? {
                    reader.read_line()?;
                }

                let offset = reader.position()?;
                index.insert(
                    name,
                    FieldLocation::Raw {
                        offset,
                        kind,
                        shape: array_shape,
                    },
                );
                skip_single_field(reader, kind, array_shape)?;
            }
            Some("VECTORS") => {
                let name = block_name(&tokens)?;
                let kind = element_kind(&tokens, 2, "VECTORS type")?;

                for component in ["X", "Y", "Z"] {
                    let offset = reader.position()?;
                    index.insert(
                        format!("{name}_{component}"),
                        FieldLocation::Raw {
                            offset,
                            kind,
                            shape: array_shape,
                        },
                    );
                    skip_single_field(reader, kind, array_shape)?;
                }
            }
            _ => return Err(ParseError::from(UnknownDatatype::new(tokens.summary())).into()),
        }

        // line feed after the payload
        reader.read_line()?;
    }

    log::debug!("indexed {} vtk fields", index.len());

    Ok(index)
}

fn block_name(tokens: &Tokens<'_>) -> Result<String, ParseError> {
    tokens
        .get(1)
        .map(str::to_uppercase)
        .ok_or_else(|| MalformedLine::new("data block name", tokens.summary()).into())
}

/// read one field payload at the cursor. The array is returned with logical shape
/// `(nx, ny, nz)`.
pub fn read_single_field<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    kind: ElementKind,
    shape: Shape,
) -> Result<FieldArray, Error> {
    let arr = crate::array::read_array(reader, kind, Endian::Big, &shape.stored(), false)?;

    let arr = match arr {
        FieldArray::Float64(a) => FieldArray::Float64(a.reversed_axes()),
        FieldArray::Float32(a) => FieldArray::Float32(a.reversed_axes()),
        FieldArray::Int32(a) => FieldArray::Int32(a.reversed_axes()),
    };
    Ok(arr)
}

/// move past one field payload without reading it
pub fn skip_single_field<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    kind: ElementKind,
    shape: Shape,
) -> Result<(), Error> {
    let [nx, ny, nz] = *shape;
    let byte_count = reader.checked_size("field payload", &[nx, ny, nz, kind.size()])?;
    reader.skip(byte_count as u64)
}

/// read the header lines of a vtk file
pub fn read_header(path: &Path) -> Result<String, Error> {
    let mut reader = BinaryReader::open(path)?;
    let first = reader.read_line()?;
    let second = reader.read_line()?;
    Ok(format!(
        "{}\n{}",
        String::from_utf8_lossy(&first).trim(),
        String::from_utf8_lossy(&second).trim()
    ))
}

/// a code that writes legacy vtk files
pub trait VtkProducer {
    const PRODUCER: Producer;
    const FORMAT: Format;
    /// keyword the comment line of the header must contain
    const KEYWORD: &'static str;
}

/// vtk files written by Idefix
#[derive(Debug, Clone, Copy)]
pub struct Idefix;

/// vtk files written by PLUTO
#[derive(Debug, Clone, Copy)]
pub struct Pluto;

impl VtkProducer for Idefix {
    const PRODUCER: Producer = Producer::Idefix;
    const FORMAT: Format = Format::IdefixVtk;
    const KEYWORD: &'static str = "Idefix";
}

impl VtkProducer for Pluto {
    const PRODUCER: Producer = Producer::Pluto;
    const FORMAT: Format = Format::PlutoVtk;
    const KEYWORD: &'static str = "PLUTO";
}

/// geometry from the definitions header next to a file that does not record it
fn definitions_geometry<P: VtkProducer>(path: &Path) -> Option<Geometry> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    match crate::metadata::read_definitions_geometry(directory, P::PRODUCER) {
        Ok(geometry) => geometry,
        Err(e) => {
            log::warn!("could not read the definitions header next to {}: {e}", path.display());
            None
        }
    }
}

/// [`Decoder`] over a legacy vtk file on disk, written by `P`
#[derive(Debug, Clone)]
pub struct LegacyDecoder<P> {
    path: PathBuf,
    producer: PhantomData<P>,
}

impl<P> LegacyDecoder<P> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            producer: PhantomData,
        }
    }
}

impl<P: VtkProducer> Decoder for LegacyDecoder<P> {
    fn sniff(path: &Path) -> bool {
        read_header(path)
            .map(|header| header.lines().nth(1).unwrap_or_default().contains(P::KEYWORD))
            .unwrap_or(false)
    }

    fn format(&self) -> Format {
        P::FORMAT
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<Metadata, Error> {
        let mut reader = BinaryReader::open(&self.path)?;
        let preamble = read_preamble(&mut reader)?;
        let (nodes, array_shape) = read_grid_nodes(&mut reader, &preamble)?;

        let geometry = preamble.geometry.or_else(|| definitions_geometry::<P>(&self.path));

        let domain = match geometry {
            Some(geometry) if geometry.is_known() => Some(reconstruct(nodes, geometry, None)?.domain_edges()),
            _ => None,
        };

        let time = match P::PRODUCER {
            Producer::Pluto => crate::run_log::read_vtk_time(&self.path),
            Producer::Idefix => preamble.time,
        };

        let code_version = crate::metadata::code_version(&preamble.header, P::PRODUCER);

        Ok(Metadata {
            header: preamble.header,
            code_version,
            time,
            periodicity: preamble.periodicity,
            geometry,
            dimensions: Some(array_shape),
            domain,
            tracers: None,
        })
    }

    fn read_coordinates(&self, geometry: Geometry) -> Result<Coordinates, Error> {
        if !geometry.is_known() {
            return Err(GeometryError::Unsupported(geometry).into());
        }
        let mut reader = BinaryReader::open(&self.path)?;
        read_grid_coordinates(&mut reader, geometry)
    }

    fn read_field_index(&self) -> Result<FieldIndex, Error> {
        let mut reader = BinaryReader::open(&self.path)?;
        let preamble = read_preamble(&mut reader)?;
        let (_, array_shape) = read_grid_nodes(&mut reader, &preamble)?;
        read_field_offset_index(&mut reader, array_shape)
    }

    fn read_field(&self, index: &FieldIndex, name: &str) -> Result<FieldArray, Error> {
        match index.get(&name.to_uppercase()) {
            Some(FieldLocation::Raw { offset, kind, shape }) => {
                let mut reader = BinaryReader::open(&self.path)?;
                reader.seek_to(*offset)?;
                read_single_field(&mut reader, *kind, *shape)
            }
            _ => Err(Error::MissingField(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    fn reader(buf: Vec<u8>) -> BinaryReader<Cursor<Vec<u8>>> {
        BinaryReader::new(Cursor::new(buf)).unwrap()
    }

    fn preamble_lines(buf: &mut Vec<u8>, dataset: &str) {
        buf.extend_from_slice(b"# vtk DataFile Version 2.0\nIdefix v1.0\nBINARY\n");
        buf.extend_from_slice(format!("DATASET {dataset}\n").as_bytes());
    }

    #[test]
    fn field_block() {
        let mut buf = Vec::new();
        preamble_lines(&mut buf, "RECTILINEAR_GRID");
        buf.extend_from_slice(b"FIELD FieldData 4\n");
        buf.extend_from_slice(b"GEOMETRY 1 1 int\n");
        buf.write_i32::<BigEndian>(1).unwrap();
        buf.extend_from_slice(b"\nTIME 1 1 float\n");
        buf.write_f32::<BigEndian>(2.5).unwrap();
        buf.extend_from_slice(b"\nPERIODICITY 3 1 int\n");
        for flag in [1, 0, 1] {
            buf.write_i32::<BigEndian>(flag).unwrap();
        }
        buf.extend_from_slice(b"\nCOMMENT 2 1 double\n");
        buf.write_f64::<BigEndian>(0.0).unwrap();
        buf.write_f64::<BigEndian>(0.0).unwrap();
        buf.extend_from_slice(b"\nDIMENSIONS 3 2 1\n");

        let preamble = read_preamble(&mut reader(buf)).unwrap();
        assert_eq!(preamble.geometry, Some(Geometry::Polar));
        assert_eq!(preamble.time, Some(2.5));
        assert_eq!(preamble.periodicity, Some([true, false, true]));
        assert_eq!(preamble.dimensions, [3, 2, 1]);
        assert_eq!(preamble.dataset, "RECTILINEAR_GRID");
    }

    #[test]
    fn unrecognized_header() {
        let mut buf = Vec::new();
        preamble_lines(&mut buf, "RECTILINEAR_GRID");
        buf.extend_from_slice(b"ORIGIN 0 0 0\n");

        let err = read_preamble(&mut reader(buf)).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnrecognizedHeader(_))));
    }

    #[test]
    fn structured_points() {
        let mut buf = Vec::new();
        preamble_lines(&mut buf, "STRUCTURED_GRID");
        buf.extend_from_slice(b"DIMENSIONS 2 2 1\nPOINTS 4 float\n");
        // x fastest
        for (x, y) in [(0.0f32, 0.0f32), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
            buf.write_f32::<BigEndian>(x).unwrap();
            buf.write_f32::<BigEndian>(y).unwrap();
            buf.write_f32::<BigEndian>(0.0).unwrap();
        }
        buf.extend_from_slice(b"\nCELL_DATA 1\n");

        let mut reader = reader(buf);
        let coords = read_grid_coordinates(&mut reader, Geometry::Cartesian).unwrap();
        assert_eq!(coords.x, vec![0.0, 1.0]);
        assert_eq!(coords.y, vec![0.0, 1.0]);
        // a single layer of nodes is a 2D grid, whose inactive axis spans one unit
        assert_eq!(coords.z, vec![0.0, 1.0]);
        assert_eq!(coords.array_shape, Shape::new(1, 1, 1));

        // CELL_DATA was consumed
        assert!(reader.read_line().unwrap().is_empty());
    }

    #[test]
    fn single_node_layers_are_squeezed() {
        assert_eq!(squeeze_stored([1, 1, 4]), vec![4]);
        assert_eq!(squeeze_stored([1, 3, 4]), vec![3, 4]);
        assert_eq!(squeeze_stored([2, 3, 4]), vec![2, 3, 4]);
        assert_eq!(squeeze_stored([1, 1, 1]), vec![1]);
        // an x-z grid keeps its inactive middle axis
        assert_eq!(squeeze_stored([3, 1, 4]), vec![3, 1, 4]);
    }

    #[test]
    fn oversized_points_declaration() {
        let mut buf = Vec::new();
        preamble_lines(&mut buf, "STRUCTURED_GRID");
        buf.extend_from_slice(b"DIMENSIONS 4294967296 4294967296 2
POINTS 4 float
");
        buf.extend_from_slice(&[0; 48]);

        let mut reader = reader(buf);
        let preamble = read_preamble(&mut reader).unwrap();
        let err = read_grid_nodes(&mut reader, &preamble).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
    }

    #[test]
    fn oversized_field_entry() {
        let mut buf = Vec::new();
        preamble_lines(&mut buf, "RECTILINEAR_GRID");
        buf.extend_from_slice(b"FIELD FieldData 1
COMMENT 4294967296 4294967296 double
");
        buf.write_f64::<BigEndian>(0.0).unwrap();
        buf.extend_from_slice(b"
DIMENSIONS 2 1 1
");

        let err = read_preamble(&mut reader(buf)).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
    }

    #[test]
    fn oversized_field_skip() {
        let shape = Shape::new(usize::MAX, 2, 1);
        let err = skip_single_field(&mut reader(vec![0; 16]), ElementKind::Float64, shape).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
    }

    #[test]
    fn vectors_expand_to_components() {
        let shape = Shape::new(2, 1, 1);
        let mut buf = b"VECTORS vx double\n".to_vec();
        for v in 0..6 {
            buf.write_f64::<BigEndian>(v as f64).unwrap();
        }
        buf.extend_from_slice(b"\n\n");

        let index = read_field_offset_index(&mut reader(buf), shape).unwrap();
        let names: Vec<_> = index.names().collect();
        assert_eq!(names, vec!["VX_X", "VX_Y", "VX_Z"]);
        assert_eq!(index.offset("VX_X"), Some(18));
        assert_eq!(index.offset("VX_Y"), Some(34));
        assert_eq!(index.offset("VX_Z"), Some(50));
    }

    #[test]
    fn unknown_block() {
        let buf = b"TENSORS t float\n".to_vec();
        let err = read_field_offset_index(&mut reader(buf), Shape::new(1, 1, 1)).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnknownDatatype(_))));
    }

    #[test]
    fn fields_come_back_x_major() {
        // stored (nz, ny, nx) = (1, 2, 3), x fastest
        let mut buf = Vec::new();
        for v in 0..6 {
            buf.write_f32::<BigEndian>(v as f32).unwrap();
        }

        let arr = read_single_field(&mut reader(buf), ElementKind::Float32, Shape::new(3, 2, 1)).unwrap();
        assert_eq!(arr.shape(), &[3, 2, 1]);
        let arr = arr.to_f64();
        assert_eq!(arr[[1, 0, 0]], 1.0);
        assert_eq!(arr[[0, 1, 0]], 3.0);
        assert_eq!(arr[[2, 1, 0]], 5.0);
    }
}
