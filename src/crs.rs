// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! SRS resolution: shorthand names, EPSG codes and raw definition
//! strings, normalized to expanded PROJ definitions.
//!
//! Every SRS option goes through the same pipeline: a shorthand (`wgs84`,
//! `utm32n`, ...) resolves to its EPSG code; an `epsg:<n>` code expands to
//! a full definition via PROJ; a raw definition string is expanded as
//! given. Two systems count as equal iff their definition token sets
//! match, so `utm32n` and `epsg:32632` name the same system.
//!
//! Datum-shift handling follows the classic PROJ rules: user-supplied
//! Helmert parameters (3 or 7) override an embedded `+towgs84` term w/ a
//! warning, a user grid file overrides `+nadgrids`, and the output side is
//! always tied to WGS84 so a datum transformation can actually occur.
//!

use crate::{DatumShift, Error, Options, Reporter};
use proj::Proj;

/// The pseudo-SRS naming an unreferenced local survey origin.
pub const SRS_LOCAL: &str = "local";

// EPSG code behind a shorthand SRS name, if the name is one
fn shorthand_to_epsg(name: &str) -> Option<u32> {
    match name {
        "local" => Some(5806),
        "wgs84" => Some(4326),
        "web" => Some(3857),
        "osgb" => Some(27700),
        "dhdn2" => Some(31466),
        "dhdn3" => Some(31467),
        "dhdn4" => Some(31468),
        "dhdn5" => Some(31469),
        _ => {
            // utm<zone><n|s>, zones 1..=60
            let rest = name.strip_prefix("utm")?;
            let (zone, hemi) = rest.split_at(rest.len().checked_sub(1)?);
            let zone: u32 = zone.parse().ok()?;
            if !(1..=60).contains(&zone) {
                return None;
            }
            match hemi {
                "n" => Some(32600 + zone),
                "s" => Some(32700 + zone),
                _ => None,
            }
        }
    }
}

// split an expanded PROJ definition into its bare tokens
fn tokenize(definition: &str) -> Vec<String> {
    definition
        .split_whitespace()
        .map(|t| t.trim_start_matches('+').to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

// token-set equality, case-insensitive
fn token_sets_equal(a: &str, b: &str) -> bool {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.len() != tb.len() {
        return false;
    }
    ta.iter()
        .all(|x| tb.iter().any(|y| x.eq_ignore_ascii_case(y)))
}

/// One resolved coordinate reference system.
#[derive(Debug)]
pub struct Crs {
    /// The SRS option as the user gave it.
    pub spec: String,
    /// What the resolution fed to PROJ: `EPSG:<n>` or the raw definition.
    pub source: String,
    /// Expanded PROJ definition, as far as PROJ reports one.
    pub definition: String,
    epsg: Option<u32>,
    is_local: bool,
    is_geographic: bool,
}

impl Crs {
    /// Resolve one SRS option string.
    pub fn resolve(spec: &str, side: &str, reporter: &Reporter) -> Result<Self, Error> {
        let packed = spec.trim().to_lowercase();
        if packed == SRS_LOCAL {
            return Ok(Crs {
                spec: spec.to_owned(),
                source: String::new(),
                definition: String::new(),
                epsg: Some(5806),
                is_local: true,
                is_geographic: false,
            });
        }

        // shorthand -> epsg:<n>
        let (candidate, was_shorthand) = match shorthand_to_epsg(&packed) {
            Some(code) => (format!("epsg:{code}"), true),
            None => (packed.clone(), false),
        };

        // epsg:<n> -> canonical EPSG source for PROJ
        let (source, epsg) = if let Some(code) = candidate.strip_prefix("epsg:") {
            let code: u32 = code.trim().parse().map_err(|_| {
                Error::ReprojectConfig(
                    format!("invalid EPSG code in {side} SRS definition").into(),
                )
            })?;
            if !was_shorthand {
                reporter.warning(format!(
                    "Converted EPSG ID {code} in {side} SRS definition to a PROJ definition. Conversion may incur loss of information."
                ));
            }
            (format!("EPSG:{code}"), Some(code))
        } else {
            (spec.trim().to_owned(), None)
        };

        let proj = Proj::new(&source).map_err(|e| {
            Error::ReprojectConfig(format!("invalid {side} SRS definition: {e}").into())
        })?;
        let definition = proj.def().unwrap_or_default();
        let is_geographic = tokenize(&definition)
            .iter()
            .any(|t| t.eq_ignore_ascii_case("proj=longlat") || t.eq_ignore_ascii_case("proj=latlong"));

        reporter.note(format!("{side} SRS resolved to '{source}'"));
        if !definition.is_empty() {
            reporter.note(format!("{side} SRS (expanded): '{definition}'"));
        }

        Ok(Crs {
            spec: spec.to_owned(),
            source,
            definition,
            epsg,
            is_local: false,
            is_geographic,
        })
    }

    /// Whether this is the unreferenced `local` system.
    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// Whether the system is geographic (lat/lon).
    pub fn is_geographic(&self) -> bool {
        self.is_geographic
    }

    /// Whether this is Web Mercator, which refuses datum options.
    pub fn is_web_mercator(&self) -> bool {
        self.epsg == Some(3857)
    }

    /// Whether this names the same system as `other`: equal specs, equal
    /// resolved sources (`utm32n` vs `epsg:32632`), or matching token sets
    /// of the expanded definitions.
    pub fn same_system(&self, other: &Crs) -> bool {
        if self.is_local || other.is_local {
            return self.is_local == other.is_local;
        }
        if self.spec.eq_ignore_ascii_case(&other.spec)
            || self.source.eq_ignore_ascii_case(&other.source)
        {
            return true;
        }
        !self.definition.is_empty()
            && !other.definition.is_empty()
            && token_sets_equal(&self.definition, &other.definition)
    }
}

/// What the transform pass has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprojAction {
    /// Leave all coordinates untouched.
    None,
    /// Rewrite every coordinate from the input to the output system.
    Reproject,
}

/// Both resolved SRS options plus the datum-shift configuration.
#[derive(Debug)]
pub struct SrsResolution {
    /// Resolved input SRS, if one was given.
    pub input: Option<Crs>,
    /// Resolved output SRS, if one was given.
    pub output: Option<Crs>,
    /// User datum-shift parameters.
    pub shift: DatumShift,
    /// Grid file, resolved to an absolute path.
    pub grid: Option<String>,
}

impl SrsResolution {
    /// Resolve the SRS-related run options. Must run before any input is
    /// read so configuration defects surface early.
    pub fn from_options(opts: &Options, reporter: &Reporter) -> Result<Self, Error> {
        let input = opts
            .proj_in
            .as_deref()
            .map(|s| Crs::resolve(s, "input", reporter))
            .transpose()?;
        let output = opts
            .proj_out
            .as_deref()
            .map(|s| Crs::resolve(s, "output", reporter))
            .transpose()?;

        // the grid file path must survive later working-directory changes
        let grid = match opts.proj_grid.as_deref() {
            Some(path) => Some(
                std::fs::canonicalize(path)
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| path.to_owned()),
            ),
            None => None,
        };

        let web = input.as_ref().is_some_and(Crs::is_web_mercator)
            || output.as_ref().is_some_and(Crs::is_web_mercator);
        if web && opts.datum_shift.is_set() {
            return Err(Error::ReprojectConfig(
                "datum transformation not possible for SRS of type Web Mercator".into(),
            ));
        }
        if web && grid.is_some() {
            return Err(Error::ReprojectConfig(
                "grid file application not possible for SRS of type Web Mercator".into(),
            ));
        }

        Ok(SrsResolution {
            input,
            output,
            shift: opts.datum_shift,
            grid,
        })
    }

    /// Decide whether a reprojection pass is required.
    pub fn action(&self, reporter: &Reporter) -> Result<ReprojAction, Error> {
        match (&self.input, &self.output) {
            (None, None) => Ok(ReprojAction::None),
            (Some(_), None) => {
                reporter.warning(
                    "Only input SRS defined. No reprojection will be performed.",
                );
                Ok(ReprojAction::None)
            }
            (None, Some(_)) => Err(Error::ReprojectConfig(
                "only output SRS defined, no reprojection possible".into(),
            )),
            (Some(i), Some(o)) => {
                if i.is_local() && !o.is_local() {
                    return Err(Error::ReprojectConfig(
                        format!("input SRS is '{SRS_LOCAL}', unable to reproject").into(),
                    ));
                }
                if i.is_local() || o.is_local() {
                    if !(i.is_local() && o.is_local()) {
                        reporter.warning(format!(
                            "Input or output SRS is '{SRS_LOCAL}'. No reprojection will be performed."
                        ));
                    }
                    return Ok(ReprojAction::None);
                }
                if i.same_system(o) {
                    reporter.warning(
                        "Input and output SRS identical. No reprojection will be performed.",
                    );
                    return Ok(ReprojAction::None);
                }
                Ok(ReprojAction::Reproject)
            }
        }
    }

    /// Compose the final input-side definition: strip any embedded datum
    /// terms that user options override and re-append the effective ones.
    pub fn input_definition(&self, reporter: &Reporter) -> Option<String> {
        let crs = self.input.as_ref()?;
        let tokens = tokenize(&crs.definition);

        let embedded_towgs84 = tokens.iter().find(|t| t.starts_with("towgs84="));
        let embedded_nadgrids = tokens.iter().find(|t| t.starts_with("nadgrids="));

        let towgs84 = if self.shift.is_set() {
            reporter.note("Reprojection with user-supplied datum transformation parameters.");
            if embedded_towgs84.is_some() {
                reporter.warning(
                    "Existing WGS 84 datum transformation in input SRS will be overridden.",
                );
            }
            Some(format!("towgs84={}", self.shift.to_towgs84()))
        } else {
            embedded_towgs84.cloned()
        };

        let nadgrids = if let Some(grid) = &self.grid {
            reporter.note("Reprojection with user-supplied grid file.");
            if embedded_nadgrids.is_some() {
                reporter.warning(
                    "Existing grid file specification(s) in input SRS will be overridden.",
                );
            }
            Some(format!("nadgrids={grid}"))
        } else {
            embedded_nadgrids.cloned()
        };

        let mut out = String::new();
        for t in tokens.iter().filter(|t| {
            !t.starts_with("towgs84=") && !t.starts_with("nadgrids=") && *t != "no_defs"
        }) {
            out.push_str(" +");
            out.push_str(t);
        }
        if let Some(t) = towgs84 {
            out.push_str(" +");
            out.push_str(&t);
        }
        if let Some(t) = nadgrids {
            out.push_str(" +");
            out.push_str(&t);
        }
        if crs.is_web_mercator() {
            out.push_str(" +nadgrids=@null");
        }
        out.push_str(" +no_defs");
        Some(out.trim_start().to_owned())
    }

    /// Compose the final output-side definition, ensuring a WGS84 tie so
    /// datum shifts take effect.
    pub fn output_definition(&self) -> Option<String> {
        let crs = self.output.as_ref()?;
        let tokens = tokenize(&crs.definition);

        let mut out = String::new();
        for t in tokens.iter().filter(|t| *t != "no_defs") {
            out.push_str(" +");
            out.push_str(t);
        }
        if !tokens.iter().any(|t| t.starts_with("towgs84=")) {
            out.push_str(" +towgs84=0,0,0");
        }
        if crs.is_web_mercator() {
            out.push_str(" +nadgrids=@null");
        }
        out.push_str(" +no_defs");
        Some(out.trim_start().to_owned())
    }

    /// Whether user options override the datum handling embedded in the
    /// input SRS.
    pub fn has_datum_overrides(&self) -> bool {
        self.shift.is_set() || self.grid.is_some()
    }

    /// The pair of definitions the transform is built from. W/o datum
    /// overrides the resolved sources go to PROJ untouched, which lets it
    /// pick the best available transformation; overrides force the spliced
    /// definition strings.
    pub fn transform_definitions(&self, reporter: &Reporter) -> Option<(String, String)> {
        let input = self.input.as_ref()?;
        let output = self.output.as_ref()?;
        if !self.has_datum_overrides() {
            return Some((input.source.clone(), output.source.clone()));
        }
        Some((self.input_definition(reporter)?, self.output_definition()?))
    }
}
