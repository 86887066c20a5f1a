use std::fmt;
use std::str::FromStr;

/// coordinate system a grid is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geometry {
    Cartesian,
    Cylindrical,
    Polar,
    Spherical,
    /// a geometry code that is not in the known table. Decoding continues, but any
    /// geometry dependent step will refuse to run.
    Unknown(i32),
}

impl Geometry {
    /// map the integer code stored in binary headers. Unknown codes are logged and
    /// kept as [`Geometry::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Cartesian,
            1 => Self::Polar,
            2 => Self::Spherical,
            3 => Self::Cylindrical,
            other => {
                log::warn!(
                    "unknown geometry code {other}, expected one of 0 (cartesian), 1 (polar), \
                     2 (spherical) or 3 (cylindrical)"
                );
                Self::Unknown(other)
            }
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// polar and spherical grids are stored as curvilinear meshes
    pub fn is_curvilinear(self) -> bool {
        matches!(self, Self::Polar | Self::Spherical)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cartesian => "cartesian",
            Self::Cylindrical => "cylindrical",
            Self::Polar => "polar",
            Self::Spherical => "spherical",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown (code {code})"),
            known => f.write_str(known.name()),
        }
    }
}

impl FromStr for Geometry {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cartesian" => Ok(Self::Cartesian),
            "cylindrical" => Ok(Self::Cylindrical),
            "polar" => Ok(Self::Polar),
            "spherical" => Ok(Self::Spherical),
            _ => Err(GeometryError::UnknownName(s.trim().to_string())),
        }
    }
}

/// failures of geometry dependent steps
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("unknown geometry `{0}`, expected one of cartesian, cylindrical, polar, spherical")]
    UnknownName(String),
    #[error("cannot reconstruct coordinates for {0} geometry")]
    Unsupported(Geometry),
    #[error(
        "geometry could not be read from disk and no geometry hint was given"
    )]
    Missing,
    #[error("geometries from the data file ({disk}) and the definitions header ({header}) do not match")]
    Mismatch { disk: Geometry, header: Geometry },
    #[error("node coordinate arrays have rank {0}, expected 1, 2 or 3")]
    UnsupportedShape(usize),
    #[error("node coordinate arrays disagree on their shape: {x:?}, {y:?}, {z:?}")]
    InconsistentNodes {
        x: Vec<usize>,
        y: Vec<usize>,
        z: Vec<usize>,
    },
    #[error("coordinate axis {0} has no nodes")]
    EmptyAxis(char),
}

/// pick the geometry to use from what was read on disk, what the definitions header
/// declares and what the caller asked for.
///
/// The data file and the header have to agree when both are present. A caller
/// provided geometry always wins, with a warning when it contradicts the files.
pub fn resolve_geometry(
    from_disk: Option<Geometry>,
    from_header: Option<Geometry>,
    from_user: Option<Geometry>,
) -> Result<Geometry, GeometryError> {
    if let (Some(disk), Some(header)) = (from_disk, from_header) {
        if disk != header {
            return Err(GeometryError::Mismatch { disk, header });
        }
    }

    let on_disk = from_disk.or(from_header);

    match (on_disk, from_user) {
        (Some(disk), Some(user)) => {
            if disk != user {
                log::warn!(
                    "geometries from disk ({disk}) and input ({user}) do not match, \
                     the input geometry is used"
                );
            }
            Ok(user)
        }
        (None, Some(user)) => Ok(user),
        (Some(disk), None) => Ok(disk),
        (None, None) => Err(GeometryError::Missing),
    }
}
