use fluidsnap::container::{self, GridDescription, MemorySource, XdmfDecoder};
use fluidsnap::ndarray::{ArrayD, IxDyn};
use fluidsnap::prelude::*;
use fluidsnap::{DatasetSource, Error};
use std::path::{Path, PathBuf};

const GRID: &str = "\
# ******************************************************
# PLUTO 4.4 Grid File
# Generated on  Mon Jan  1 00:00:00 2024
#
# DIMENSIONS: 2
# GEOMETRY:   CARTESIAN
# X1: [ 0.000000,  1.500000], 3 point(s), 2 ghosts
# X2: [ 0.000000,  2.000000], 2 point(s), 2 ghosts
# X3: [ 0.000000,  1.000000], 1 point(s), 0 ghosts
# ******************************************************
3
 1   0.0e+00    0.5e+00
 2   0.5e+00    1.0e+00
 3   1.0e+00    1.5e+00
2
 1   0.0e+00    1.0e+00
 2   1.0e+00    2.0e+00
1
 1   0.0e+00    1.0e+00
";

const XMF: &str = r#"<?xml version="1.0" ?>
<Xdmf Version="2.0">
 <Domain>
   <Grid Name="node_mesh" GridType="Uniform">
     <Time Value="7.5"/>
     <Attribute Name="rho" AttributeType="Scalar" Center="Cell">
       <DataItem Dimensions="2 3" NumberType="Float" Precision="8" Format="HDF">
        data.0001.dbl.h5:/Timestep_1/vars/rho
       </DataItem>
     </Attribute>
   </Grid>
 </Domain>
</Xdmf>
"#;

const LOG: &str = "\
0 0.000000e+00 1.000000e-04 0 single_file little rho prs tr1
1 2.500000e+00 3.500985e-03 747 single_file little rho prs tr1
";

fn arr(shape: &[usize], values: Vec<f64>) -> ArrayD<f64> {
    ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
}

/// a 3 x 2 cartesian grid, nodes stored `(ny + 1, nx + 1)`
fn source(with_vars: bool) -> MemorySource {
    let mut source = MemorySource::new();

    let mut x = Vec::new();
    let mut y = Vec::new();
    for j in 0..3 {
        for i in 0..4 {
            x.push(i as f64 * 0.5);
            y.push(j as f64);
        }
    }
    source.insert("/node_coords/X", arr(&[3, 4], x));
    source.insert("/node_coords/Y", arr(&[3, 4], y));
    source.insert("/node_coords/Z", arr(&[3, 4], vec![0.0; 12]));
    source.insert("/cell_coords/X", arr(&[2, 3], vec![0.25, 0.75, 1.25, 0.25, 0.75, 1.25]));

    if with_vars {
        source.insert("/Timestep_1/vars/rho", arr(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        source.insert("/Timestep_1/vars/prs", arr(&[2, 3], vec![0.1; 6]));
    } else {
        source.insert("/Timestep_1/rho", arr(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    source
}

fn sidecars(dir: &Path, log: &str) -> PathBuf {
    std::fs::write(dir.join("grid.out"), GRID).unwrap();
    std::fs::write(dir.join("data.0001.dbl.xmf"), XMF).unwrap();
    std::fs::write(dir.join("dbl.h5.out"), log).unwrap();
    dir.join("data.0001.dbl.h5")
}

#[test]
fn metadata_from_sidecars() {
    let dir = tempfile::tempdir().unwrap();
    let path = sidecars(dir.path(), LOG);

    assert!(XdmfDecoder::<MemorySource>::sniff(&path));

    let decoder = XdmfDecoder::with_source(path, source(true)).unwrap();
    assert_eq!(decoder.format(), Format::PlutoXdmf);

    let metadata = decoder.read_metadata().unwrap();
    assert_eq!(metadata.time, Some(2.5));
    assert_eq!(metadata.tracers, Some(1));
    assert_eq!(metadata.geometry, Some(Geometry::Cartesian));
    assert_eq!(metadata.periodicity, Some([true; 3]));
    assert_eq!(metadata.dimensions, Some(Shape::new(3, 2, 1)));
    assert_eq!(metadata.code_version.as_deref(), Some("4.4"));

    let domain = metadata.domain.unwrap();
    assert_eq!(domain.left, [0.0, 0.0, 0.0]);
    assert_eq!(domain.right, [1.5, 2.0, 1.0]);
}

#[test]
fn time_falls_back_to_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = sidecars(dir.path(), "0 0.0 1.0e-04 0 single_file little rho\n");

    let decoder = XdmfDecoder::with_source(path, source(true)).unwrap();
    let metadata = decoder.read_metadata().unwrap();
    assert_eq!(metadata.time, Some(7.5));
    assert_eq!(metadata.tracers, None);
}

#[test]
fn coordinates_and_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = sidecars(dir.path(), LOG);
    let decoder = XdmfDecoder::with_source(path, source(true)).unwrap();

    let coordinates = decoder.read_coordinates(Geometry::Cartesian).unwrap();
    assert_eq!(coordinates.x, vec![0.0, 0.5, 1.0, 1.5]);
    assert_eq!(coordinates.y, vec![0.0, 1.0, 2.0]);
    assert_eq!(coordinates.z, vec![0.0, 1.0]);
    assert_eq!(coordinates.array_shape, Shape::new(3, 2, 1));

    let index = decoder.read_field_index().unwrap();
    assert_eq!(index.names().collect::<Vec<_>>(), vec!["rho", "prs"]);

    let rho = decoder.read_field(&index, "rho").unwrap();
    assert_eq!(rho.shape(), &[3, 2]);
    let rho = rho.to_f64();
    assert_eq!(rho[[2, 0]], 3.0);
    assert_eq!(rho[[0, 1]], 4.0);

    assert!(matches!(decoder.read_field(&index, "vx1"), Err(Error::MissingField(_))));
}

#[test]
fn field_paths_from_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = sidecars(dir.path(), LOG);

    // no vars group: the paths listed in the xmf are used, and they point nowhere
    let decoder = XdmfDecoder::with_source(path, source(false)).unwrap();
    let index = decoder.read_field_index().unwrap();
    assert_eq!(
        index.get("rho"),
        Some(&FieldLocation::Dataset {
            path: "/Timestep_1/vars/rho".to_string()
        })
    );
    assert!(matches!(decoder.read_field(&index, "rho"), Err(Error::MissingDataset(_))));
}

#[test]
fn grid_description_matches_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = sidecars(dir.path(), LOG);
    let decoder = XdmfDecoder::with_source(path, source(true)).unwrap();

    let grid: GridDescription = decoder.grid_description().unwrap();
    let [cx, _, _] = grid.cell_centers();
    let stored = decoder.source().read_dataset("/cell_coords/X").unwrap();
    assert_eq!(cx, stored.iter().take(3).copied().collect::<Vec<_>>());
}

#[test]
fn several_timesteps_are_refused() {
    let mut source = source(true);
    source.insert("/Timestep_2/vars/rho", arr(&[2, 3], vec![0.0; 6]));

    assert!(matches!(container::check_single_block(&source), Err(Error::MultiBlock(2))));
    assert!(matches!(
        container::read_grid_coordinates(&source, Geometry::Cartesian),
        Err(Error::MultiBlock(2))
    ));
}

#[test]
fn badly_named_container() {
    let err = XdmfDecoder::with_source(PathBuf::from("data.0001.h5"), MemorySource::new()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
