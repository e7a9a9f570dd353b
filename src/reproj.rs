// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Reprojection driver: the coordinate rewrite pass over the geometry
//! store.
//!
//! The driver is prepared early (configuration defects must surface
//! before any data is read) but runs last, after multiplexing and
//! selections. Every coordinate is rewritten --points, raw vertices, the
//! vertices of every part of every line and polygon, and every label
//! anchor-- and the store extent is recomputed. Axis order and angular
//! units are normalized by the transform itself, so geographic systems
//! take and yield degrees. Z values pass through unchanged.
//!
//! Any transform failure is fatal and names the offending feature and
//! part.
//!

use crate::{Error, GeomStore, ReprojAction, Reporter, SrsResolution};
use proj::Proj;

/// Performs the coordinate rewrite between two resolved systems.
#[derive(Debug)]
pub struct ReprojectionDriver {
    transform: Proj,
}

impl ReprojectionDriver {
    /// Decide the action for the resolved SRS options and build the
    /// transform if one is needed. `Ok(None)` means no reprojection.
    pub fn prepare(
        srs: &SrsResolution,
        reporter: &Reporter,
    ) -> Result<Option<Self>, Error> {
        if srs.action(reporter)? == ReprojAction::None {
            return Ok(None);
        }

        let (from, to) = srs
            .transform_definitions(reporter)
            .expect("Reproject action implies both SRS");
        reporter.note(format!("Final input SRS: '{from}'"));
        reporter.note(format!("Final output SRS: '{to}'"));

        let transform = Proj::new_known_crs(&from, &to, None)?;
        Ok(Some(ReprojectionDriver { transform }))
    }

    /// Rewrite every coordinate in the store and recompute its extent.
    pub fn run(&self, gs: &mut GeomStore, reporter: &Reporter) -> Result<(), Error> {
        if gs.is_empty() {
            reporter.warning("Empty geometry store. Reprojection skipped.");
            return Ok(());
        }

        reporter.note(format!(
            "Reprojecting {} point(s) in current geometry store.",
            gs.points().len()
        ));
        for (i, p) in gs.points_mut().iter_mut().enumerate() {
            let (nx, ny) = Self::convert(&self.transform, p.x, p.y)
                .map_err(|reason| Self::fatal(format!("point #{}", i + 1), reason))?;
            p.x = nx;
            p.y = ny;
            if let Some((lx, ly)) = p.label {
                p.label = Some(
                    Self::convert(&self.transform, lx, ly).map_err(|reason| {
                        Self::fatal(format!("label of point #{}", i + 1), reason)
                    })?,
                );
            }
        }

        reporter.note(format!(
            "Reprojecting {} raw vertex(es) in current geometry store.",
            gs.points_raw().len()
        ));
        for (i, p) in gs.points_raw_mut().iter_mut().enumerate() {
            let (nx, ny) = Self::convert(&self.transform, p.x, p.y)
                .map_err(|reason| Self::fatal(format!("raw vertex #{}", i + 1), reason))?;
            p.x = nx;
            p.y = ny;
        }

        reporter.note(format!(
            "Reprojecting {} line(s) in current geometry store.",
            gs.lines().len()
        ));
        for (i, line) in gs.lines_mut().iter_mut().enumerate() {
            for (j, part) in line.parts.iter_mut().enumerate() {
                Self::convert_part(&self.transform, part).map_err(|reason| {
                    Self::fatal(format!("line #{}, part #{}", i + 1, j + 1), reason)
                })?;
            }
        }

        reporter.note(format!(
            "Reprojecting {} polygon(s) in current geometry store.",
            gs.polygons().len()
        ));
        for (i, poly) in gs.polygons_mut().iter_mut().enumerate() {
            for (j, part) in poly.parts.iter_mut().enumerate() {
                Self::convert_part(&self.transform, part).map_err(|reason| {
                    Self::fatal(format!("polygon #{}, part #{}", i + 1, j + 1), reason)
                })?;
            }
        }

        reporter.note("Recomputing data extents after reprojection.");
        gs.extent_recompute();
        Ok(())
    }

    fn convert(transform: &Proj, x: f64, y: f64) -> Result<(f64, f64), String> {
        transform.convert((x, y)).map_err(|e| e.to_string())
    }

    fn convert_part(transform: &Proj, part: &mut crate::Part) -> Result<(), String> {
        for v in &mut part.vertices {
            let (nx, ny) = Self::convert(transform, v.x, v.y)?;
            v.x = nx;
            v.y = ny;
        }
        if let Some((lx, ly)) = part.label {
            part.label = Some(Self::convert(transform, lx, ly)?);
        }
        Ok(())
    }

    fn fatal(feature: String, reason: String) -> Error {
        Error::ReprojectRuntime { feature, reason }
    }
}
