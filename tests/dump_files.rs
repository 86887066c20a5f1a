use byteorder::{NativeEndian, WriteBytesExt};
use fluidsnap::binary::BinaryReader;
use fluidsnap::dump::{self, DumpDecoder};
use fluidsnap::prelude::*;
use fluidsnap::{Error, ParseError};
use std::io::Cursor;

struct DumpBuilder {
    buf: Vec<u8>,
}

impl DumpBuilder {
    fn new(header: &str) -> Self {
        let mut buf = header.as_bytes().to_vec();
        buf.resize(dump::HEADER_SIZE, 0);
        Self { buf }
    }

    fn record(&mut self, name: &str, code: i32, extents: &[i32]) -> &mut Self {
        let mut raw = name.as_bytes().to_vec();
        raw.resize(dump::NAME_SIZE, 0);
        self.buf.extend_from_slice(&raw);
        self.buf.write_i32::<NativeEndian>(code).unwrap();
        self.buf.write_i32::<NativeEndian>(extents.len() as i32).unwrap();
        for e in extents {
            self.buf.write_i32::<NativeEndian>(*e).unwrap();
        }
        self
    }

    fn doubles(&mut self, values: &[f64]) -> &mut Self {
        for v in values {
            self.buf.write_f64::<NativeEndian>(*v).unwrap();
        }
        self
    }

    fn ints(&mut self, values: &[i32]) -> &mut Self {
        for v in values {
            self.buf.write_i32::<NativeEndian>(*v).unwrap();
        }
        self
    }

    /// uniform grid of `cells` cells per axis on `[0, cells]`
    fn grid(&mut self, cells: [usize; 3]) -> &mut Self {
        for (idir, n) in cells.into_iter().enumerate() {
            let axis = idir + 1;
            let centers: Vec<f64> = (0..n).map(|i| i as f64 + 0.5).collect();
            let left: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let right: Vec<f64> = (0..n).map(|i| i as f64 + 1.0).collect();
            self.record(&format!("x{axis}"), 0, &[n as i32]).doubles(&centers);
            self.record(&format!("xl{axis}"), 0, &[n as i32]).doubles(&left);
            self.record(&format!("xr{axis}"), 0, &[n as i32]).doubles(&right);
        }
        self
    }

    fn eof(&mut self) -> Vec<u8> {
        self.record("eof", 2, &[1]);
        std::mem::take(&mut self.buf)
    }
}

fn sample() -> Vec<u8> {
    let mut builder = DumpBuilder::new("Idefix v1.0.0 Dump Data");
    builder.grid([2, 2, 1]);
    builder.record("Vc-RHO", 0, &[2, 2, 1]).doubles(&[1.0, 2.0, 3.0, 4.0]);
    builder.record("time", 0, &[1]).doubles(&[3.25]);
    builder.record("geometry", 2, &[1]).ints(&[0]);
    builder.record("periodicity", 2, &[3]).ints(&[1, 0, 1]);
    builder.record("Vs-BX1", 0, &[3, 2, 1]).doubles(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
    builder.eof()
}

fn reader(buf: Vec<u8>) -> BinaryReader<Cursor<Vec<u8>>> {
    BinaryReader::new(Cursor::new(buf)).unwrap()
}

#[test]
fn index_and_full_read_agree() {
    let contents = dump::read_contents(&mut reader(sample()), true).unwrap();
    let index = dump::read_field_offset_index(&mut reader(sample())).unwrap();

    let full: Vec<&str> = contents.records.keys().skip(9).map(String::as_str).collect();
    let indexed: Vec<&str> = index.names().collect();
    assert_eq!(full, indexed);
    assert_eq!(contents.field_list(), vec!["Vc-RHO", "Vs-BX1"]);

    // every offset leads back to the same data
    let mut reader = reader(sample());
    for (name, location) in index.iter() {
        let offset = location.offset().unwrap();
        let single = dump::read_single_field(&mut reader, offset).unwrap();
        let full = contents.fields[name].clone().into_array().unwrap();
        assert_eq!(single, full, "field {name}");
    }
}

#[test]
fn grid_only_dump() {
    let buf = DumpBuilder::new("Idefix v1.0 Dump Data").grid([4, 1, 1]).eof();
    let index = dump::read_field_offset_index(&mut reader(buf)).unwrap();
    assert_eq!(index.len(), 0);
}

#[test]
fn rank_four_record_is_rejected() {
    let mut builder = DumpBuilder::new("Idefix v1.0 Dump Data");
    builder.grid([2, 1, 1]);
    builder.record("Vc-RHO", 0, &[2, 1, 1, 1]).doubles(&[1.0, 2.0]);
    let buf = builder.eof();

    let err = dump::read_field_offset_index(&mut reader(buf)).unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::UnsupportedRank(_))));
}

#[test]
fn truncated_payload() {
    let mut builder = DumpBuilder::new("Idefix v1.0 Dump Data");
    builder.grid([2, 1, 1]);
    builder.record("Vc-RHO", 0, &[2, 1, 1]).doubles(&[1.0]);
    let buf = std::mem::take(&mut builder.buf);

    let err = dump::read_field_offset_index(&mut reader(buf)).unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
}

#[test]
fn oversized_extents() {
    for extents in [[i32::MAX; 3], [i32::MAX, i32::MAX, 1]] {
        let mut builder = DumpBuilder::new("Idefix v1.0 Dump Data");
        builder.grid([2, 1, 1]);
        builder.record("Vc-RHO", 0, &extents).doubles(&[1.0, 2.0]);
        let buf = builder.eof();

        let err = dump::read_field_offset_index(&mut reader(buf.clone())).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));

        for load_distributed in [true, false] {
            let err = dump::read_contents(&mut reader(buf.clone()), load_distributed).unwrap_err();
            assert!(matches!(err, Error::Parse(ParseError::Truncated(_))));
        }
    }
}

#[test]
fn decoder_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.0001.dmp");
    std::fs::write(&path, sample()).unwrap();

    assert_eq!(Format::detect(&path), Some(Format::IdefixDump));
    let decoder = DumpDecoder::new(path);

    let metadata = decoder.read_metadata().unwrap();
    assert_eq!(metadata.time, Some(3.25));
    assert_eq!(metadata.geometry, Some(Geometry::Cartesian));
    assert_eq!(metadata.periodicity, Some([true, false, true]));
    assert_eq!(metadata.dimensions, Some(Shape::new(2, 2, 1)));
    assert_eq!(metadata.code_version.as_deref(), Some("v1.0.0"));

    let domain = metadata.domain.unwrap();
    assert_eq!(domain.left, [0.0, 0.0, 0.0]);
    assert_eq!(domain.right, [2.0, 2.0, 1.0]);

    let coordinates = decoder.read_coordinates(Geometry::Cartesian).unwrap();
    assert_eq!(coordinates.x, vec![0.0, 1.0, 2.0]);
    assert_eq!(coordinates.z, vec![0.0, 1.0]);
    assert_eq!(coordinates.array_shape, Shape::new(2, 2, 1));

    let index = decoder.read_field_index().unwrap();
    let rho = decoder.read_field(&index, "Vc-RHO").unwrap();
    assert_eq!(rho.kind(), ElementKind::Float64);
    assert_eq!(rho.shape(), &[2, 2, 1]);
    let rho = rho.to_f64();
    // fortran ordered on disk
    assert_eq!(rho[[1, 0, 0]], 2.0);
    assert_eq!(rho[[0, 1, 0]], 3.0);

    let geometry = decoder.read_field(&index, "geometry").unwrap();
    assert_eq!(geometry.kind(), ElementKind::Int32);

    assert!(matches!(
        decoder.read_field(&index, "Vc-PRS"),
        Err(Error::MissingField(_))
    ));
}
