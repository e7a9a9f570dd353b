// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Survey data to GIS geometry converter.
//!
//! This library turns line-oriented ASCII survey data --sequences of
//! measurements consisting of coordinates and attribute values-- into typed
//! GIS geometries (points, lines, polygons and their multi-part variants)
//! w/ per-feature attribute rows, ready to be handed to a vector format
//! writer.
//!
//! # Pipeline
//!
//! The processing chain is strictly sequential and single-threaded:
//!
//! 1. A [`Schema`] is loaded from an INI-style description file and
//!    validated once. It declares the expected field layout, types,
//!    per-field separators, the tag/key roles and the geometry-tag
//!    vocabulary.
//! 2. The [`ReprojectionDriver`] resolves the input/output SRS options
//!    (shorthand name, `epsg:<n>` code or raw definition string) early, so
//!    that configuration errors surface before any data is read.
//! 3. For every input source a [`DataStore`] is filled: the record reader
//!    tokenizes each line according to the per-field separator rules and
//!    the validator promotes raw tuples into typed records in place.
//! 4. The [`Multiplexer`] runs the tagging-mode state machine over the
//!    validated record stream, fuses same-key features into multi-part
//!    geometries, checks `unique` fields across all inputs and emits the
//!    [`GeomStore`].
//! 5. The [`SelectionEngine`] applies the ordered chain of selection
//!    commands, marking `is_selected` on every feature.
//! 6. If required, the reprojection driver rewrites every coordinate
//!    (including label anchors) and recomputes the store extent.
//!
//! The whole chain is wired by [`run()`]:
//! ```no_run
//! use survey_gis::prelude::*;
//!
//! # fn main() -> Result<(), Error> {
//! let mut opts = Options::default();
//! opts.schema_file = "survey.schema".into();
//! opts.inputs.push("plot1.dat".into());
//! let reporter = Reporter::to_console();
//! let store = survey_gis::run(&opts, &reporter)?;
//! println!("{} point(s)", store.points().len());
//! #    Ok(())
//! # }
//! ```
//!
//! # Diagnostics
//!
//! All components report through a caller-supplied [`Reporter`] --there is
//! no global mutable state. Per-record defects (bad coordinate, wrong type,
//! missing field, ...) are warnings that skip the single record; schema,
//! selection and reprojection configuration defects are fatal.
//!

mod config;
mod crs;
mod error;
mod fuse;
mod geom;
mod multiplex;
mod numeric;
mod options;
mod reader;
mod record;
mod report;
mod reproj;
mod schema;
mod selection;
mod settings;
mod validator;

pub use crs::*;
pub use error::Error;
pub use geom::*;
pub use multiplex::Multiplexer;
pub use numeric::*;
pub use options::*;
pub use reader::*;
pub use record::*;
pub use report::*;
pub use reproj::*;
pub use schema::*;
pub use selection::*;
pub use settings::Settings;
pub use validator::validate_record;

pub mod prelude;

use core::fmt;

/// Maximum number of user fields in a schema. The theoretical attribute
/// table limit is 255, minus the reserved key columns a target GIS may add.
pub const MAX_FIELDS: usize = 251;

/// Maximum length of a field name, in characters.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Maximum length of any option value or token string.
pub const MAX_STR_LEN: usize = 254;

/// Maximum length of one line in a schema or data file, in characters.
pub const MAX_LINE_LEN: usize = 65_535;

/// Maximum number of selection commands in one run.
pub const MAX_SELECTIONS: usize = 255;

/// Maximum number of distinct comment marks in a schema.
pub const MAX_COMMENT_MARKS: usize = 32;

/// Maximum number of distinct separators per field.
pub const MAX_SEPARATORS: usize = 32;

/// Maximum number of lookup (replacement) pairs per field.
pub const MAX_LOOKUP_PAIRS: usize = 100;

/// Geometry type of a validated record or an emitted feature.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GeomType {
    /// Not (yet) assigned to any geometry.
    #[default]
    None,
    /// A single measured point.
    Point,
    /// An open vertex sequence.
    Line,
    /// A closed vertex sequence.
    Polygon,
}

impl fmt::Display for GeomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeomType::None => write!(f, "none"),
            GeomType::Point => write!(f, "point"),
            GeomType::Line => write!(f, "line"),
            GeomType::Polygon => write!(f, "polygon"),
        }
    }
}

/// Run the complete processing pipeline described in the crate docs and
/// return the final geometry store.
///
/// Fatal defects (schema, selection syntax, reprojection configuration,
/// unreadable inputs) abort w/ an [`Error`]; per-record defects are
/// reported as warnings through `reporter` and skip the offending record.
pub fn run(opts: &Options, reporter: &Reporter) -> Result<GeomStore, Error> {
    let schema = Schema::load(&opts.schema_file, &opts.numeric_format, reporter)?;
    if opts.verbose {
        schema.describe(reporter);
    }

    // Resolve SRS options before any data is read.
    let srs = SrsResolution::from_options(opts, reporter)?;
    let driver = ReprojectionDriver::prepare(&srs, reporter)?;

    // Selections are validated against the schema up front, too.
    let engine = SelectionEngine::compile(&opts.selections, &schema)?;

    let mut stores = Vec::with_capacity(opts.inputs.len());
    for input in &opts.inputs {
        let mut ds = DataStore::new(input, &schema, opts);
        consume_input(input, &schema, opts, reporter, &mut ds)?;
        stores.push(ds);
    }

    let mux = Multiplexer::new(&schema, opts);
    mux.assign(&mut stores, reporter);
    fuse::fuse(&mut stores, &schema, reporter);
    fuse::check_unique(&stores, &schema, reporter);
    let mut gs = mux.build(&stores);

    engine.apply(&mut gs, &schema, reporter)?;

    if let Some(driver) = driver {
        driver.run(&mut gs, reporter)?;
    }

    Ok(gs)
}
