//! container types for field data read from snapshot files

use crate::prelude::*;
use num_traits::ToPrimitive;

/// numeric type of the elements of an on-disk array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Float64,
    Float32,
    Int32,
}

impl ElementKind {
    /// decode the type code used in dump field records
    /// (`0` double, `1` single, `2` integer)
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Float64),
            1 => Some(Self::Float32),
            2 => Some(Self::Int32),
            _ => None,
        }
    }

    /// decode the type names used in legacy vtk declarations
    pub fn from_vtk_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "double" => Some(Self::Float64),
            "float" => Some(Self::Float32),
            "int" => Some(Self::Int32),
            _ => None,
        }
    }

    /// width of a single element in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Float64 => 8,
            Self::Float32 | Self::Int32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, From)]
/// An n-dimensional array holding the values of one field, in the element type it was
/// stored with on disk
pub enum FieldArray {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int32(ArrayD<i32>),
}

impl FieldArray {
    /// element type of the array
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Float64(_) => ElementKind::Float64,
            Self::Float32(_) => ElementKind::Float32,
            Self::Int32(_) => ElementKind::Int32,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float64(arr) => arr.shape(),
            Self::Float32(arr) => arr.shape(),
            Self::Int32(arr) => arr.shape(),
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// borrow the array if it already holds doubles
    pub fn as_f64(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Float64(arr) => Some(arr),
            _ => None,
        }
    }

    /// convert to a double precision array, widening smaller types
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Self::Float64(arr) => arr.clone(),
            Self::Float32(arr) => widen(arr),
            Self::Int32(arr) => widen(arr),
        }
    }

    /// values in logical (memory) order of the array, widened to doubles
    pub fn to_vec_f64(&self) -> Vec<f64> {
        self.to_f64().iter().copied().collect()
    }

    /// first element of the array, widened to double
    pub fn first_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(arr) => arr.iter().next().copied(),
            Self::Float32(arr) => arr.iter().next().and_then(ToPrimitive::to_f64),
            Self::Int32(arr) => arr.iter().next().and_then(ToPrimitive::to_f64),
        }
    }
}

fn widen<T: ToPrimitive + Copy>(arr: &ArrayD<T>) -> ArrayD<f64> {
    arr.mapv(|x| x.to_f64().unwrap_or(f64::NAN))
}

/// read `count` elements of `kind` into an array of the given shape. The bytes are
/// laid out in column-major (Fortran) order when `fortran` is set, otherwise in
/// row-major order.
pub(crate) fn read_array<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    kind: ElementKind,
    endian: Endian,
    shape: &[usize],
    fortran: bool,
) -> Result<FieldArray, Error> {
    let array = match kind {
        ElementKind::Float64 => FieldArray::Float64(read_typed(reader, endian, shape, fortran)?),
        ElementKind::Float32 => FieldArray::Float32(read_typed(reader, endian, shape, fortran)?),
        ElementKind::Int32 => FieldArray::Int32(read_typed(reader, endian, shape, fortran)?),
    };
    Ok(array)
}

fn read_typed<T: Packed, R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    endian: Endian,
    shape: &[usize],
    fortran: bool,
) -> Result<ArrayD<T>, Error> {
    use ndarray::ShapeBuilder;

    let count = reader.checked_size("array", shape)?;
    let values = reader.read_packed::<T>(endian, count)?;

    let array = if fortran {
        ArrayD::from_shape_vec(IxDyn(shape).f(), values)?
    } else {
        ArrayD::from_shape_vec(IxDyn(shape), values)?
    };

    Ok(array)
}
