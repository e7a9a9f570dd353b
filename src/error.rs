// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Errors raised from this library.
//!
//! Fatal defects (schema, selection and reprojection configuration, I/O)
//! abort the run. Per-record defects (`RecordShape`, `RecordEmpty`,
//! `FieldType`, `FieldOverflow`, `CoordBad`, `CoordOverflow`, `TagConflict`
//! and `UniqueViolation`) are surfaced as warnings by the caller and skip
//! the single offending record.
//!

use std::borrow::Cow;
use thiserror::Error;

/// Coordinate axis, used in coordinate-extraction diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Easting.
    X,
    /// Northing.
    Y,
    /// Elevation.
    Z,
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

/// Variants of error raised from this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed schema file: bad section header, missing `=`, overlong
    /// line or value, option out of context.
    #[error("Syntax error in parser schema ({file}), line #{line}: {reason}")]
    SchemaSyntax {
        /// Schema file path.
        file: String,
        /// 1-based line number.
        line: u32,
        /// What was wrong.
        reason: String,
    },

    /// Well-formed schema that violates a semantic invariant.
    #[error("Error in parser schema ({file}): {reason}")]
    SchemaSemantic {
        /// Schema file path.
        file: String,
        /// The violated rule.
        reason: String,
    },

    /// A schema, input, log or grid file could not be opened.
    #[error("Cannot open '{path}': {source}")]
    IoOpen {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Record w/ the wrong number of fields, or a reduced record w/ tokens
    /// in non-persistent positions.
    #[error("Invalid record on line {line}, read from \"{input}\": {reason}")]
    RecordShape {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// What was wrong.
        reason: String,
    },

    /// Empty content in a field that must not be empty.
    #[error("Invalid record on line {line}, read from \"{input}\": field '{field}' must not be empty")]
    RecordEmpty {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// Offending field name.
        field: String,
    },

    /// Field content does not parse as the declared type.
    #[error("Invalid record on line {line}, read from \"{input}\": value of field '{field}' is not valid ('{content}')")]
    FieldType {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// Offending field name.
        field: String,
        /// Raw field content.
        content: String,
    },

    /// Numeric field content overflows the declared type.
    #[error("Invalid record on line {line}, read from \"{input}\": overflow in numeric value for field '{field}'")]
    FieldOverflow {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// Offending field name.
        field: String,
    },

    /// A coordinate field does not parse as a finite double.
    #[error("Invalid record on line {line}, read from \"{input}\": invalid {axis} coordinate ('{content}')")]
    CoordBad {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// Offending axis.
        axis: Axis,
        /// Raw field content.
        content: String,
    },

    /// A coordinate value overflows the double range.
    #[error("Invalid record on line {line}, read from \"{input}\": {axis} coordinate overflow ('{content}')")]
    CoordOverflow {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// Offending axis.
        axis: Axis,
        /// Raw field content.
        content: String,
    },

    /// A record whose geometry tag does not fit the tagging-mode state
    /// machine (e.g. an untagged vertex in mode `max`).
    #[error("Invalid record on line {line}, read from \"{input}\": {reason}")]
    TagConflict {
        /// Input source name.
        input: String,
        /// Source line number.
        line: u64,
        /// What was wrong.
        reason: String,
    },

    /// Two distinct geometries share a value in a field declared `unique`.
    #[error("Value of field '{field}', read from '{input_b}', line {line_b}: duplicate of value read from '{input_a}', line {line_a}")]
    UniqueViolation {
        /// Field declared unique.
        field: String,
        /// First input source.
        input_a: String,
        /// Line of the first occurrence.
        line_a: u64,
        /// Second input source.
        input_b: String,
        /// Line of the duplicate.
        line_b: u64,
    },

    /// A selection command that does not match the command grammar.
    #[error("Invalid selection specification: '{command}': {reason}")]
    SelectionSyntax {
        /// The command as given.
        command: String,
        /// What was wrong.
        reason: String,
    },

    /// A syntactically valid selection command that does not fit the
    /// schema (unknown field, wrong field type, bad range or pattern).
    #[error("Invalid selection: '{command}': {reason}")]
    SelectionSemantic {
        /// The command as given.
        command: String,
        /// What was wrong.
        reason: String,
    },

    /// Inconsistent or unusable SRS options.
    #[error("Reprojection setup error: {0}")]
    ReprojectConfig(Cow<'static, str>),

    /// A coordinate failed to transform; fatal per spec.
    #[error("Reprojection failed at {feature}: {reason}")]
    ReprojectRuntime {
        /// Which feature (and part) was being transformed.
        feature: String,
        /// Transform error text.
        reason: String,
    },

    /// CRS construction error.
    #[error("CRS creation error: {0}")]
    Crs(#[from] proj::ProjCreateError),

    /// Coordinate transformation (`proj`) related error.
    #[error("Proj error: {0}")]
    Proj(#[from] proj::ProjError),
}

impl Error {
    /// Whether this defect only invalidates a single record (reported as a
    /// warning) rather than aborting the whole run.
    pub fn is_record_defect(&self) -> bool {
        matches!(
            self,
            Error::RecordShape { .. }
                | Error::RecordEmpty { .. }
                | Error::FieldType { .. }
                | Error::FieldOverflow { .. }
                | Error::CoordBad { .. }
                | Error::CoordOverflow { .. }
                | Error::TagConflict { .. }
                | Error::UniqueViolation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defects_are_warnings() {
        let e = Error::CoordBad {
            input: "a.dat".into(),
            line: 7,
            axis: Axis::X,
            content: "abc".into(),
        };
        assert!(e.is_record_defect());

        let e = Error::SchemaSemantic {
            file: "s.schema".into(),
            reason: "No X coordinate field defined".into(),
        };
        assert!(!e.is_record_defect());
    }

    #[test]
    fn test_display_names_file_and_line() {
        let e = Error::RecordEmpty {
            input: "plot1.dat".into(),
            line: 23,
            field: "id".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("plot1.dat"));
        assert!(msg.contains("23"));
        assert!(msg.contains("'id'"));
    }
}
