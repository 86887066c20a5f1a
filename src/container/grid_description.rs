//! the `grid.out` file PLUTO writes next to its outputs
//!
//! ```text
//! # ******************************************************
//! # PLUTO 4.4 Grid File
//! # DIMENSIONS: 2
//! # GEOMETRY:   POLAR
//! # X1: [ 0.040000,  0.500000], 400 point(s), 2 ghosts
//! # X2: [ 0.000000,  6.283185], 400 point(s), 2 ghosts
//! # X3: [ 0.000000,  1.000000], 1 point(s), 0 ghosts
//! # ******************************************************
//! 400
//!  1   0.040000e+00    0.041150e+00
//!  ...
//! ```
//!
//! After the header comes, for each of the three axes, a cell count followed by one
//! `<index> <left edge> <right edge>` row per cell.

use crate::prelude::*;
use crate::parse::GridDescription as GridDescriptionError;

const MARKER: &str = "# ***********";

/// extent of one axis as announced in the header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisHeader {
    pub left: f64,
    pub right: f64,
    pub points: usize,
}

/// the parsed contents of a `grid.out` file
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescription {
    /// header lines, without the leading `#`
    pub header: Vec<String>,
    pub dimensionality: Option<usize>,
    pub geometry: Option<Geometry>,
    /// axes announced in the header, in order
    pub axes: Vec<AxisHeader>,
    /// `(left, right)` edge pairs of every cell, per axis
    pub cells: [Vec<(f64, f64)>; 3],
}

fn error(line_number: usize, reason: impl Into<String>) -> Error {
    ParseError::from(GridDescriptionError::new(line_number, reason.into())).into()
}

impl GridDescription {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

        let mut description = GridDescription {
            header: Vec::new(),
            dimensionality: None,
            geometry: None,
            axes: Vec::new(),
            cells: Default::default(),
        };

        let mut markers = 0;
        for (line_number, line) in lines.by_ref() {
            if line.contains(MARKER) {
                markers += 1;
                if markers == 2 {
                    break;
                }
                continue;
            }
            if markers == 1 {
                description.read_header_line(line_number, line)?;
            }
        }

        if markers < 2 {
            return Err(error(text.lines().count(), "missing end of header marker"));
        }

        for cells in description.cells.iter_mut() {
            let (line_number, line) = lines
                .by_ref()
                .find(|(_, line)| !line.trim().is_empty())
                .ok_or_else(|| error(text.lines().count(), "missing cell count"))?;
            let count: usize = line
                .trim()
                .parse()
                .map_err(|_| error(line_number, format!("expected a cell count, got `{}`", line.trim())))?;

            for _ in 0..count {
                let (line_number, line) = lines
                    .next()
                    .ok_or_else(|| error(line_number, "fewer rows than the announced cell count"))?;
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() < 3 {
                    return Err(error(line_number, "expected `<index> <left> <right>`"));
                }
                let left: f64 = tokens[tokens.len() - 2]
                    .parse()
                    .map_err(|_| error(line_number, "invalid left edge"))?;
                let right: f64 = tokens[tokens.len() - 1]
                    .parse()
                    .map_err(|_| error(line_number, "invalid right edge"))?;
                cells.push((left, right));
            }
        }

        Ok(description)
    }

    fn read_header_line(&mut self, line_number: usize, line: &str) -> Result<(), Error> {
        let content = line.trim_start_matches('#').trim();
        self.header.push(content.to_string());

        if let Some(value) = content.strip_prefix("DIMENSIONS:") {
            let dims = value
                .trim()
                .parse()
                .map_err(|_| error(line_number, "invalid dimensionality"))?;
            self.dimensionality = Some(dims);
        } else if let Some(value) = content.strip_prefix("GEOMETRY:") {
            let geometry = value
                .trim()
                .parse()
                .map_err(|e: GeometryError| error(line_number, e.to_string()))?;
            self.geometry = Some(geometry);
        } else if content.starts_with('X') && content.contains(':') {
            // X1: [ 0.04,  0.5], 400 point(s), 2 ghosts
            let cleaned: String = content
                .chars()
                .filter(|c| !matches!(c, '[' | ']' | ','))
                .collect();
            let tokens: Vec<&str> = cleaned.split_whitespace().collect();

            let field = |idx: usize| tokens.get(idx).copied().unwrap_or_default();
            let left = field(1).parse().map_err(|_| error(line_number, "invalid axis left edge"))?;
            let right = field(2).parse().map_err(|_| error(line_number, "invalid axis right edge"))?;
            let points = field(3).parse().map_err(|_| error(line_number, "invalid axis point count"))?;

            self.axes.push(AxisHeader { left, right, points });
        }

        Ok(())
    }

    /// the header line naming the code, e.g. `PLUTO 4.4 Grid File`
    pub fn code_line(&self) -> Option<&str> {
        self.header
            .iter()
            .map(String::as_str)
            .find(|line| line.contains("PLUTO"))
    }

    /// cells along each axis
    pub fn dimensions(&self) -> Shape {
        let [x, y, z] = &self.cells;
        Shape::new(x.len().max(1), y.len().max(1), z.len().max(1))
    }

    /// domain announced in the header. Axes that are not announced span `[0, 1]`.
    pub fn domain_edges(&self) -> DomainEdges {
        let mut left = [0.0; 3];
        let mut right = [1.0; 3];
        for (idir, axis) in self.axes.iter().take(3).enumerate() {
            left[idir] = axis.left;
            right[idir] = axis.right;
        }
        DomainEdges { left, right }
    }

    /// `right - left` for every cell
    pub fn cell_widths(&self) -> [Vec<f64>; 3] {
        self.cells
            .clone()
            .map(|cells| cells.iter().map(|(l, r)| r - l).collect())
    }

    /// the left edge of every cell plus half its width
    pub fn cell_centers(&self) -> [Vec<f64>; 3] {
        self.cells
            .clone()
            .map(|cells| cells.iter().map(|(l, r)| l + 0.5 * (r - l)).collect())
    }
}
