// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Per-run processing options.
//!
//! Everything a single conversion run needs to know beyond the schema:
//! input sources, coordinate offsets, numeric input format, label
//! placement, the selection chain and the reprojection request. The
//! struct is plain data; CLI or GUI front ends fill it in and hand it to
//! [`run()`](crate::run).
//!

use crate::NumericFormat;

/// Where a feature's label anchor is placed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    /// Feature centroid (the point itself, the line's halfway point, the
    /// polygon's area centroid).
    #[default]
    Center,
    /// First vertex.
    First,
    /// Last vertex.
    Last,
    /// No label anchor at all.
    None,
}

impl LabelMode {
    /// Parse a user-supplied mode name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "center" => Some(LabelMode::Center),
            "first" => Some(LabelMode::First),
            "last" => Some(LabelMode::Last),
            "none" => Some(LabelMode::None),
            _ => None,
        }
    }
}

/// User-supplied Helmert datum-transform parameters (towards WGS84).
///
/// All-default values mean "nothing was specified"; any deviation makes
/// the set override an embedded `+towgs84` term, and any non-default
/// rotation/scale member promotes it to a seven-parameter transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatumShift {
    /// Shift along X, meters.
    pub dx: f64,
    /// Shift along Y, meters.
    pub dy: f64,
    /// Shift along Z, meters.
    pub dz: f64,
    /// Rotation about X, arc seconds.
    pub rx: f64,
    /// Rotation about Y, arc seconds.
    pub ry: f64,
    /// Rotation about Z, arc seconds.
    pub rz: f64,
    /// Scale factor, ppm.
    pub ds: f64,
}

impl Default for DatumShift {
    fn default() -> Self {
        DatumShift {
            dx: 0.0,
            dy: 0.0,
            dz: 0.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            ds: 1.0,
        }
    }
}

impl DatumShift {
    /// Whether the user set any parameter at all.
    pub fn is_set(&self) -> bool {
        *self != DatumShift::default()
    }

    /// Whether the rotation/scale members make this a seven-parameter
    /// transform.
    pub fn is_seven_params(&self) -> bool {
        self.rx != 0.0 || self.ry != 0.0 || self.rz != 0.0 || self.ds != 1.0
    }

    /// Render as the comma-separated `+towgs84=` value.
    pub fn to_towgs84(&self) -> String {
        if self.is_seven_params() {
            format!(
                "{},{},{},{},{},{},{}",
                self.dx, self.dy, self.dz, self.rx, self.ry, self.rz, self.ds
            )
        } else {
            format!("{},{},{}", self.dx, self.dy, self.dz)
        }
    }
}

/// All options of one conversion run.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// Path of the parser schema file.
    pub schema_file: String,
    /// Dump the parser and field definitions after loading.
    pub verbose: bool,
    /// Input sources in processing order; `-` reads the console stream.
    pub inputs: Vec<String>,
    /// Log file path, if line-oriented logging was requested.
    pub log_file: Option<String>,

    /// Constant offset added to every X coordinate.
    pub offset_x: f64,
    /// Constant offset added to every Y coordinate.
    pub offset_y: f64,
    /// Constant offset added to every Z coordinate.
    pub offset_z: f64,

    /// Decimal point / grouping characters of the input data.
    pub numeric_format: NumericFormat,

    /// Drop Z to zero on insertion into the geometry store.
    pub force_2d: bool,
    /// Also populate the raw-vertex array of the geometry store.
    pub dump_raw: bool,

    /// Label placement for point features.
    pub label_mode_point: LabelMode,
    /// Label placement for line features.
    pub label_mode_line: LabelMode,
    /// Label placement for polygon features.
    pub label_mode_poly: LabelMode,

    /// Ordered selection command chain (≤ [`MAX_SELECTIONS`]).
    ///
    /// [`MAX_SELECTIONS`]: crate::MAX_SELECTIONS
    pub selections: Vec<String>,

    /// Input SRS: shorthand, `epsg:<n>` or raw definition string.
    pub proj_in: Option<String>,
    /// Output SRS: shorthand, `epsg:<n>` or raw definition string.
    pub proj_out: Option<String>,
    /// User datum-transform parameters.
    pub datum_shift: DatumShift,
    /// Path of a datum-transform grid file.
    pub proj_grid: Option<String>,
}

impl Options {
    /// Append one selection command, refusing silently past the limit the
    /// way the command line front end caps repeated flags.
    pub fn add_selection(&mut self, command: &str) -> bool {
        if self.selections.len() >= crate::MAX_SELECTIONS {
            return false;
        }
        self.selections.push(command.to_owned());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_shift_default_is_unset() {
        let d = DatumShift::default();
        assert!(!d.is_set());
        assert!(!d.is_seven_params());
    }

    #[test]
    fn test_datum_shift_three_params() {
        let d = DatumShift {
            dx: 598.1,
            dy: 73.7,
            dz: 418.2,
            ..Default::default()
        };
        assert!(d.is_set());
        assert!(!d.is_seven_params());
        assert_eq!(d.to_towgs84(), "598.1,73.7,418.2");
    }

    #[test]
    fn test_datum_shift_seven_params() {
        let d = DatumShift {
            dx: 598.1,
            dy: 73.7,
            dz: 418.2,
            rx: 0.202,
            ry: 0.045,
            rz: -2.455,
            ds: 6.7,
        };
        assert!(d.is_seven_params());
        assert_eq!(d.to_towgs84(), "598.1,73.7,418.2,0.202,0.045,-2.455,6.7");
    }

    #[test]
    fn test_selection_limit() {
        let mut opts = Options::default();
        for i in 0..crate::MAX_SELECTIONS {
            assert!(opts.add_selection(&format!("eq:pt:id:{i}")));
        }
        assert!(!opts.add_selection("all:all"));
        assert_eq!(opts.selections.len(), crate::MAX_SELECTIONS);
    }
}
