//! PLUTO run logs (`vtk.out`, `dbl.h5.out`, `flt.h5.out`)
//!
//! PLUTO does not store the simulation time inside its vtk and hdf5 outputs. Instead
//! it appends one line per output to a log next to the data:
//!
//! ```text
//! 0 0.000000e+00 1.000000e-04 0 single_file little rho vx1 vx2 vx3 prs tr1 tr2
//! 1 2.498181e+00 3.500985e-03 747 single_file little rho vx1 vx2 vx3 prs tr1 tr2
//! ```
//!
//! The first column is the output number, which also appears in the data file name
//! (`data.0001.vtk`), the second one the time.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static OUTPUT_NUMBER: OnceLock<Option<Regex>> = OnceLock::new();

/// output number embedded in a file name such as `data.0042.dbl.h5`
pub fn output_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let regex = OUTPUT_NUMBER
        .get_or_init(|| Regex::new(r"\.(\d+)\.").ok())
        .as_ref()?;
    regex.captures(name)?.get(1)?.as_str().parse().ok()
}

/// time of output `index` in the body of a `vtk.out` log
pub fn vtk_log_time(log: &str, index: u32) -> Option<f64> {
    log.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        match tokens.next()?.parse::<u32>() {
            Ok(number) if number == index => tokens.next()?.parse().ok(),
            _ => None,
        }
    })
}

/// one row of a `dbl.h5.out` / `flt.h5.out` log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct H5LogEntry {
    pub time: f64,
    /// number of passive tracers, counted from the consecutive `tr1`, `tr2`, ...
    /// variable names
    pub tracers: usize,
}

/// entry of output `index` in the body of a `<dbl|flt>.h5.out` log
pub fn h5_log_entry(log: &str, index: u32) -> Option<H5LogEntry> {
    let line = log.lines().find(|line| {
        line.split_whitespace()
            .next()
            .and_then(|token| token.parse::<u32>().ok())
            == Some(index)
    })?;

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let time = tokens.get(1)?.parse().ok()?;

    let mut tracers = 0;
    while tokens.contains(&format!("tr{}", tracers + 1).as_str()) {
        tracers += 1;
    }

    Some(H5LogEntry { time, tracers })
}

/// time of a PLUTO vtk output, read from the `vtk.out` log in the same directory
pub fn read_vtk_time(data_path: &Path) -> Option<f64> {
    let Some(index) = output_number(data_path) else {
        log::warn!(
            "failed to parse an output number from file name {}, setting time to -1",
            data_path.display()
        );
        return None;
    };

    let log_path = data_path.with_file_name("vtk.out");
    let log = match std::fs::read_to_string(&log_path) {
        Ok(log) => log,
        Err(_) => {
            log::warn!("missing log file {}, setting time to -1", log_path.display());
            return None;
        }
    };

    let time = vtk_log_time(&log, index);
    if time.is_none() {
        log::warn!(
            "failed to retrieve time of output {index} from {}, setting time to -1",
            log_path.display()
        );
    }
    time
}
