// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! The geometry store: insertion-ordered feature arrays plus extent
//! tracking.
//!

use super::{LineFeature, PointFeature, PolygonFeature};

/// Bounding box of all stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Smallest X.
    pub min_x: f64,
    /// Largest X.
    pub max_x: f64,
    /// Smallest Y.
    pub min_y: f64,
    /// Largest Y.
    pub max_y: f64,
    /// Smallest Z.
    pub min_z: f64,
    /// Largest Z.
    pub max_z: f64,
}

impl Extent {
    fn seed(x: f64, y: f64, z: f64) -> Self {
        Extent {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
            min_z: z,
            max_z: z,
        }
    }

    fn grow(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }
}

/// All emitted features of one run, in insertion order per geometry type.
#[derive(Debug, Default)]
pub struct GeomStore {
    points: Vec<PointFeature>,
    points_raw: Vec<PointFeature>,
    lines: Vec<LineFeature>,
    polygons: Vec<PolygonFeature>,
    extent: Option<Extent>,
}

impl GeomStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point feature.
    pub fn add_point(&mut self, point: PointFeature) {
        self.grow_extent(point.x, point.y, point.z);
        self.points.push(point);
    }

    /// Append a raw vertex.
    pub fn add_raw_vertex(&mut self, point: PointFeature) {
        // raw vertices duplicate feature coordinates, so they do not
        // contribute to the extent
        self.points_raw.push(point);
    }

    /// Append a line feature.
    pub fn add_line(&mut self, line: LineFeature) {
        for part in &line.parts {
            for v in &part.vertices {
                self.grow_extent(v.x, v.y, v.z);
            }
        }
        self.lines.push(line);
    }

    /// Append a polygon feature.
    pub fn add_polygon(&mut self, polygon: PolygonFeature) {
        for part in &polygon.parts {
            for v in &part.vertices {
                self.grow_extent(v.x, v.y, v.z);
            }
        }
        self.polygons.push(polygon);
    }

    /// Point features, in insertion order.
    pub fn points(&self) -> &[PointFeature] {
        &self.points
    }

    /// Point features, mutable.
    pub fn points_mut(&mut self) -> &mut [PointFeature] {
        &mut self.points
    }

    /// Raw vertices, in insertion order.
    pub fn points_raw(&self) -> &[PointFeature] {
        &self.points_raw
    }

    /// Raw vertices, mutable.
    pub fn points_raw_mut(&mut self) -> &mut [PointFeature] {
        &mut self.points_raw
    }

    /// Line features, in insertion order.
    pub fn lines(&self) -> &[LineFeature] {
        &self.lines
    }

    /// Line features, mutable.
    pub fn lines_mut(&mut self) -> &mut [LineFeature] {
        &mut self.lines
    }

    /// Polygon features, in insertion order.
    pub fn polygons(&self) -> &[PolygonFeature] {
        &self.polygons
    }

    /// Polygon features, mutable.
    pub fn polygons_mut(&mut self) -> &mut [PolygonFeature] {
        &mut self.polygons
    }

    /// Whether no feature was stored.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
            && self.points_raw.is_empty()
            && self.lines.is_empty()
            && self.polygons.is_empty()
    }

    /// Current bounding box, if any coordinate was stored.
    pub fn extent(&self) -> Option<&Extent> {
        self.extent.as_ref()
    }

    /// Recompute the bounding box from scratch, e.g. after reprojection.
    pub fn extent_recompute(&mut self) {
        self.extent = None;
        let mut grow = |x: f64, y: f64, z: f64, extent: &mut Option<Extent>| match extent {
            Some(e) => e.grow(x, y, z),
            None => *extent = Some(Extent::seed(x, y, z)),
        };
        let mut extent = None;
        for p in &self.points {
            grow(p.x, p.y, p.z, &mut extent);
        }
        let all_parts = self
            .lines
            .iter()
            .flat_map(|l| &l.parts)
            .chain(self.polygons.iter().flat_map(|p| &p.parts));
        for part in all_parts {
            for v in &part.vertices {
                grow(v.x, v.y, v.z, &mut extent);
            }
        }
        self.extent = extent;
    }

    fn grow_extent(&mut self, x: f64, y: f64, z: f64) {
        match &mut self.extent {
            Some(e) => e.grow(x, y, z),
            None => self.extent = Some(Extent::seed(x, y, z)),
        }
    }
}
