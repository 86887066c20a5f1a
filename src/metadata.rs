//! physical metadata of a snapshot and the text sources it is read from

use crate::prelude::*;
use crate::mesh::GeometryError;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static IDEFIX_VERSION: OnceLock<Option<Regex>> = OnceLock::new();
static PLUTO_VERSION: OnceLock<Option<Regex>> = OnceLock::new();

/// simulation code that wrote a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Producer {
    #[display(fmt = "Idefix")]
    Idefix,
    #[display(fmt = "PLUTO")]
    Pluto,
}

impl Producer {
    /// pattern matching the version tag in the last line of a file header
    fn version_pattern(self) -> &'static str {
        match self {
            Self::Idefix => r"v\d+\.\d+\.?\d*[-\w+]*",
            Self::Pluto => r"\d+\.\d+\.?\d*[-\w+]*",
        }
    }

    /// the compiled version pattern, built on first use
    fn version_regex(self) -> Option<&'static Regex> {
        let cell = match self {
            Self::Idefix => &IDEFIX_VERSION,
            Self::Pluto => &PLUTO_VERSION,
        };
        cell.get_or_init(|| Regex::new(self.version_pattern()).ok()).as_ref()
    }
}

/// Everything a decoder learns about a snapshot besides its fields and grid.
///
/// Each format stores a different subset; anything not found is left as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// the raw header text of the file
    pub header: String,
    /// version tag found in the header, if any
    pub code_version: Option<String>,
    pub time: Option<f64>,
    pub periodicity: Option<[bool; 3]>,
    pub geometry: Option<Geometry>,
    /// number of cells along each axis
    pub dimensions: Option<Shape>,
    pub domain: Option<DomainEdges>,
    /// number of passive tracers, only known for hierarchical containers
    pub tracers: Option<usize>,
}

impl Metadata {
    /// simulation time, `-1` when the file does not record it
    pub fn current_time(&self) -> f64 {
        self.time.unwrap_or(-1.0)
    }

    /// periodicity along each axis, periodic everywhere when the file does not say
    pub fn periodicity_or_default(&self) -> [bool; 3] {
        self.periodicity.unwrap_or([true; 3])
    }

    /// number of axes holding more than one cell
    pub fn dimensionality(&self) -> Option<usize> {
        self.dimensions.map(|shape| shape.dimensionality())
    }
}

/// extract the code version from a file header. Only the last line is searched: vtk
/// files carry a generic first line before the code specific one.
pub fn code_version(header: &str, producer: Producer) -> Option<String> {
    let last = header.lines().last()?;
    let regex = producer.version_regex()?;

    match regex.find(last) {
        Some(found) => Some(found.as_str().to_string()),
        None => {
            log::warn!("could not determine {producer} version from file header `{last}`");
            None
        }
    }
}

/// remove `/* ... */` and `// ...` comments from C source, keeping string literals
/// and line structure intact
pub fn strip_c_comments(source: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Line,
        Block,
        Str,
        Char,
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match (c, chars.peek()) {
                ('/', Some('/')) => {
                    chars.next();
                    state = State::Line;
                }
                ('/', Some('*')) => {
                    chars.next();
                    // a block comment separates tokens
                    out.push(' ');
                    state = State::Block;
                }
                ('"', _) => {
                    out.push(c);
                    state = State::Str;
                }
                ('\'', _) => {
                    out.push(c);
                    state = State::Char;
                }
                _ => out.push(c),
            },
            State::Line => {
                if c == '\n' {
                    out.push(c);
                    state = State::Code;
                }
            }
            State::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                } else if c == '\n' {
                    out.push(c);
                }
            }
            State::Str | State::Char => {
                out.push(c);
                let closing = if state == State::Str { '"' } else { '\'' };
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == closing {
                    state = State::Code;
                }
            }
        }
    }

    out
}

/// read the `#define GEOMETRY NAME` line of a PLUTO `definitions.h` or Idefix
/// `definitions.hpp` header
pub fn definitions_geometry(source: &str) -> Result<Option<Geometry>, GeometryError> {
    let stripped = strip_c_comments(source);

    for line in stripped.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("#define") || tokens.next() != Some("GEOMETRY") {
            continue;
        }
        if let Some(name) = tokens.next() {
            return name.parse().map(Some);
        }
    }

    Ok(None)
}

/// geometry declared in the definitions header of the run in `directory`, if one
/// exists there. Idefix names it `definitions.hpp`, PLUTO `definitions.h`.
pub fn read_definitions_geometry(directory: &Path, producer: Producer) -> Result<Option<Geometry>, Error> {
    let file_name = match producer {
        Producer::Idefix => "definitions.hpp",
        Producer::Pluto => "definitions.h",
    };
    let path = directory.join(file_name);
    if !path.is_file() {
        log::debug!("no definitions header at {}", path.display());
        return Ok(None);
    }

    let source = std::fs::read_to_string(&path)?;
    Ok(definitions_geometry(&source)?)
}
