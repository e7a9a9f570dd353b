// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Geometry features: points, lines, polygons and their parts.
//!
//! Features own their vertex data; attribute rows are reference-counted so
//! that the parts of a multi-part feature and its raw vertices can share
//! one row. All coordinates are the already-offset values produced by the
//! record validator.
//!

mod store;

pub use store::{Extent, GeomStore};

use std::rc::Rc;

/// One attribute row, indexed like the schema's field list.
pub type AttRow = Rc<Vec<Option<String>>>;

/// A single coordinate triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
    /// Elevation.
    pub z: f64,
}

/// One connected vertex sequence inside a line or polygon.
#[derive(Debug, Clone)]
pub struct Part {
    /// Ordered vertices.
    pub vertices: Vec<Vertex>,
    /// Optional label anchor.
    pub label: Option<(f64, f64)>,
}

impl Part {
    /// New part from a vertex sequence, w/o a label anchor.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Part {
            vertices,
            label: None,
        }
    }

    /// First vertex, if the part is non-empty.
    pub fn first(&self) -> Option<&Vertex> {
        self.vertices.first()
    }

    /// Last vertex, if the part is non-empty.
    pub fn last(&self) -> Option<&Vertex> {
        self.vertices.last()
    }

    /// Point at half the accumulated 2D length of the sequence.
    pub fn midpoint(&self) -> Option<(f64, f64)> {
        let first = self.first()?;
        let total: f64 = self
            .vertices
            .windows(2)
            .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
            .sum();
        if total == 0.0 {
            return Some((first.x, first.y));
        }
        let mut remaining = total / 2.0;
        for w in self.vertices.windows(2) {
            let seg = ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt();
            if seg >= remaining && seg > 0.0 {
                let t = remaining / seg;
                return Some((w[0].x + t * (w[1].x - w[0].x), w[0].y + t * (w[1].y - w[0].y)));
            }
            remaining -= seg;
        }
        self.last().map(|v| (v.x, v.y))
    }

    /// Area centroid of the ring described by this part. Falls back to the
    /// vertex mean for degenerate rings.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len();
        let mut area2 = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % n];
            let cross = a.x * b.y - b.x * a.y;
            area2 += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        if area2.abs() < f64::EPSILON {
            let mx = self.vertices.iter().map(|v| v.x).sum::<f64>() / n as f64;
            let my = self.vertices.iter().map(|v| v.y).sum::<f64>() / n as f64;
            return Some((mx, my));
        }
        Some((cx / (3.0 * area2), cy / (3.0 * area2)))
    }
}

/// A point feature (also used for raw vertices).
#[derive(Debug, Clone)]
pub struct PointFeature {
    /// Stable feature id assigned by the multiplexer.
    pub geom_id: u32,
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
    /// Elevation.
    pub z: f64,
    /// Attribute row.
    pub atts: AttRow,
    /// Optional label anchor.
    pub label: Option<(f64, f64)>,
    /// Selection state.
    pub is_selected: bool,
}

/// A line feature composed of one or more parts.
#[derive(Debug, Clone)]
pub struct LineFeature {
    /// Stable feature id assigned by the multiplexer.
    pub geom_id: u32,
    /// Ordered parts.
    pub parts: Vec<Part>,
    /// Attribute row, shared by all parts.
    pub atts: AttRow,
    /// Selection state.
    pub is_selected: bool,
}

/// A polygon feature composed of one or more parts (rings).
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    /// Stable feature id assigned by the multiplexer.
    pub geom_id: u32,
    /// Ordered parts.
    pub parts: Vec<Part>,
    /// Attribute row, shared by all parts.
    pub atts: AttRow,
    /// Selection state.
    pub is_selected: bool,
}
