// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Geometry multiplexer: the state machine over the validated record
//! stream that decides which records form which features.
//!
//! Assignment works in two passes. `assign()` walks all records in
//! traversal order (all records of input 0 in line order, then input 1,
//! ...) and stamps geometry type, feature id and part id onto each record
//! according to the schema's tagging mode. After fusion and the
//! uniqueness check have run on those ids, `build()` emits the actual
//! [`GeomStore`].
//!

use crate::{
    AttRow, DataStore, Error, GeomStore, GeomType, LabelMode, LineFeature, Options, Part,
    PointFeature, PolygonFeature, Reporter, Schema, Vertex,
    record::Record,
    schema::{GeomTag, TagMode},
};
use std::collections::HashMap;
use std::rc::Rc;

/// Assembles validated records into features.
#[derive(Debug)]
pub struct Multiplexer<'a> {
    schema: &'a Schema,
    opts: &'a Options,
}

// an accumulating line/polygon feature during assignment
struct Open {
    geom_type: GeomType,
    geom_id: u32,
    key: Option<String>,
}

// per-store feature counters, applied after the assignment loop
#[derive(Default)]
struct Counts {
    points: u32,
    lines: u32,
    polygons: u32,
}

impl Counts {
    fn emit_point(&mut self, rec: &mut Record, next_id: &mut u32) {
        rec.geom_type = GeomType::Point;
        rec.geom_id = *next_id;
        *next_id += 1;
        self.points += 1;
    }

    fn apply(&self, ds: &mut DataStore) {
        ds.num_points += self.points;
        ds.num_lines += self.lines;
        ds.num_polygons += self.polygons;
    }
}

impl<'a> Multiplexer<'a> {
    /// New multiplexer borrowing the schema and run options.
    pub fn new(schema: &'a Schema, opts: &'a Options) -> Self {
        Multiplexer { schema, opts }
    }

    /// Stamp geometry type, feature id and part id onto every valid
    /// record. Records whose tag does not fit the mode's state machine
    /// are invalidated w/ a `TagConflict` warning.
    pub fn assign(&self, stores: &mut [DataStore], reporter: &Reporter) {
        let mut next_id: u32 = 1;
        for ds in stores.iter_mut() {
            // features never span input files at this stage; fusion joins
            // them across files later
            match self.schema.tag_mode {
                TagMode::None => Self::assign_none(ds, &mut next_id),
                TagMode::Min => self.assign_min(ds, &mut next_id, reporter),
                TagMode::Max => self.assign_max(ds, &mut next_id, reporter),
                TagMode::End => self.assign_end(ds, &mut next_id, reporter),
            }
        }
    }

    fn assign_none(ds: &mut DataStore, next_id: &mut u32) {
        let mut points = 0;
        for rec in ds.records_mut() {
            if !rec.is_valid {
                continue;
            }
            rec.geom_type = GeomType::Point;
            rec.geom_id = *next_id;
            *next_id += 1;
            points += 1;
        }
        ds.num_points += points;
    }

    fn assign_min(&self, ds: &mut DataStore, next_id: &mut u32, reporter: &Reporter) {
        let input = ds.display_name().to_owned();
        let mut counts = Counts::default();
        let mut open: Option<Open> = None;
        for rec in ds.records_mut() {
            if !rec.is_valid {
                continue;
            }
            match rec.tag {
                Some(GeomTag::Line) | Some(GeomTag::Polygon) => {
                    let geom_type = if rec.tag == Some(GeomTag::Line) {
                        counts.lines += 1;
                        GeomType::Line
                    } else {
                        counts.polygons += 1;
                        GeomType::Polygon
                    };
                    open = Some(Open {
                        geom_type,
                        geom_id: *next_id,
                        key: None,
                    });
                    rec.geom_type = geom_type;
                    rec.geom_id = *next_id;
                    *next_id += 1;
                }
                Some(GeomTag::Point) => {
                    open = None;
                    counts.emit_point(rec, next_id);
                }
                None | Some(GeomTag::End) => match &open {
                    Some(o) => {
                        rec.geom_type = o.geom_type;
                        rec.geom_id = o.geom_id;
                    }
                    None if self.schema.tag_strict => {
                        Self::tag_conflict(rec, &input, reporter, "untagged vertex outside any open feature");
                    }
                    None => counts.emit_point(rec, next_id),
                },
            }
        }
        // end of the record stream closes any open feature
        counts.apply(ds);
    }

    fn assign_max(&self, ds: &mut DataStore, next_id: &mut u32, reporter: &Reporter) {
        let input = ds.display_name().to_owned();
        let key_idx = self.schema.key_idx();
        let mut counts = Counts::default();
        let mut open: Option<Open> = None;
        for rec in ds.records_mut() {
            if !rec.is_valid {
                continue;
            }
            let key = key_idx.and_then(|i| rec.contents[i].clone());
            match rec.tag {
                Some(GeomTag::Point) => counts.emit_point(rec, next_id),
                Some(GeomTag::Line) | Some(GeomTag::Polygon) => {
                    let geom_type = if rec.tag == Some(GeomTag::Line) {
                        GeomType::Line
                    } else {
                        GeomType::Polygon
                    };
                    let same_run = open
                        .as_ref()
                        .is_some_and(|o| o.geom_type == geom_type && o.key == key);
                    if !same_run {
                        if geom_type == GeomType::Line {
                            counts.lines += 1;
                        } else {
                            counts.polygons += 1;
                        }
                        open = Some(Open {
                            geom_type,
                            geom_id: *next_id,
                            key,
                        });
                        *next_id += 1;
                    }
                    let o = open.as_ref().expect("run opened above");
                    rec.geom_type = o.geom_type;
                    rec.geom_id = o.geom_id;
                }
                None | Some(GeomTag::End) => {
                    // mode "max": every vertex must carry an explicit tag
                    Self::tag_conflict(rec, &input, reporter, "record carries no valid geometry tag");
                }
            }
        }
        counts.apply(ds);
    }

    fn assign_end(&self, ds: &mut DataStore, next_id: &mut u32, reporter: &Reporter) {
        let input = ds.display_name().to_owned();
        let key_idx = self.schema.key_idx();
        let mut counts = Counts::default();
        let mut open: Option<Open> = None;
        for rec in ds.records_mut() {
            if !rec.is_valid {
                continue;
            }
            let key = key_idx.and_then(|i| rec.contents[i].clone());

            // a key change always closes the accumulating feature
            if open.as_ref().is_some_and(|o| o.key != key) {
                open = None;
            }

            match rec.tag {
                Some(GeomTag::Line) | Some(GeomTag::Polygon) => {
                    let geom_type = if rec.tag == Some(GeomTag::Line) {
                        counts.lines += 1;
                        GeomType::Line
                    } else {
                        counts.polygons += 1;
                        GeomType::Polygon
                    };
                    open = Some(Open {
                        geom_type,
                        geom_id: *next_id,
                        key,
                    });
                    rec.geom_type = geom_type;
                    rec.geom_id = *next_id;
                    *next_id += 1;
                }
                Some(GeomTag::Point) => {
                    open = None;
                    counts.emit_point(rec, next_id);
                }
                Some(GeomTag::End) => match open.take() {
                    // the end marker contributes the feature's last vertex
                    Some(o) => {
                        rec.geom_type = o.geom_type;
                        rec.geom_id = o.geom_id;
                    }
                    None if self.schema.tag_strict => {
                        Self::tag_conflict(rec, &input, reporter, "end marker without an open feature");
                    }
                    None => counts.emit_point(rec, next_id),
                },
                None => match &open {
                    Some(o) => {
                        rec.geom_type = o.geom_type;
                        rec.geom_id = o.geom_id;
                    }
                    None if self.schema.tag_strict => {
                        Self::tag_conflict(rec, &input, reporter, "untagged vertex outside any open feature");
                    }
                    None => counts.emit_point(rec, next_id),
                },
            }
        }
        counts.apply(ds);
    }

    fn tag_conflict(rec: &mut Record, input: &str, reporter: &Reporter, reason: &str) {
        rec.is_valid = false;
        reporter.record_skipped(&Error::TagConflict {
            input: input.to_owned(),
            line: rec.line,
            reason: reason.into(),
        });
    }

    /// Emit the geometry store from the stamped records of all stores.
    pub fn build(&self, stores: &[DataStore]) -> GeomStore {
        let mut gs = GeomStore::new();

        // line/polygon features keyed by geom_id, in first-seen order
        struct Accum {
            geom_type: GeomType,
            // part id -> vertices + owning attribute rows, stream order
            parts: HashMap<u32, Vec<Vertex>>,
            part_order: Vec<u32>,
            atts: AttRow,
        }
        let mut order: Vec<u32> = Vec::new();
        let mut accums: HashMap<u32, Accum> = HashMap::new();

        for ds in stores {
            for rec in ds.records() {
                if !rec.is_valid {
                    continue;
                }
                let vertex = self.vertex_of(rec);
                match rec.geom_type {
                    GeomType::None => {}
                    GeomType::Point => {
                        let label = self.point_label(&vertex, self.opts.label_mode_point);
                        gs.add_point(PointFeature {
                            geom_id: rec.geom_id,
                            x: vertex.x,
                            y: vertex.y,
                            z: vertex.z,
                            atts: Rc::new(rec.contents.clone()),
                            label,
                            is_selected: true,
                        });
                    }
                    GeomType::Line | GeomType::Polygon => {
                        let acc = accums.entry(rec.geom_id).or_insert_with(|| {
                            order.push(rec.geom_id);
                            Accum {
                                geom_type: rec.geom_type,
                                parts: HashMap::new(),
                                part_order: Vec::new(),
                                atts: Rc::new(rec.contents.clone()),
                            }
                        });
                        if !acc.parts.contains_key(&rec.part_id) {
                            acc.part_order.push(rec.part_id);
                        }
                        acc.parts.entry(rec.part_id).or_default().push(vertex);
                        if self.opts.dump_raw {
                            gs.add_raw_vertex(PointFeature {
                                geom_id: rec.geom_id,
                                x: vertex.x,
                                y: vertex.y,
                                z: vertex.z,
                                atts: Rc::new(rec.contents.clone()),
                                label: None,
                                is_selected: true,
                            });
                        }
                    }
                }
            }
        }

        for geom_id in order {
            let mut acc = accums.remove(&geom_id).expect("accum exists for ordered id");
            // parts sorted by part id: part 0 is the feature master
            acc.part_order.sort_unstable();
            let label_mode = match acc.geom_type {
                GeomType::Line => self.opts.label_mode_line,
                _ => self.opts.label_mode_poly,
            };
            let parts: Vec<Part> = acc
                .part_order
                .iter()
                .map(|pid| {
                    let mut part = Part::new(acc.parts.remove(pid).expect("ordered part exists"));
                    part.label = self.part_label(&part, acc.geom_type, label_mode);
                    part
                })
                .collect();
            match acc.geom_type {
                GeomType::Line => gs.add_line(LineFeature {
                    geom_id,
                    parts,
                    atts: acc.atts,
                    is_selected: true,
                }),
                GeomType::Polygon => gs.add_polygon(PolygonFeature {
                    geom_id,
                    parts,
                    atts: acc.atts,
                    is_selected: true,
                }),
                _ => unreachable!("only lines and polygons accumulate"),
            }
        }

        gs
    }

    fn vertex_of(&self, rec: &Record) -> Vertex {
        Vertex {
            x: rec.x,
            y: rec.y,
            z: if self.opts.force_2d { 0.0 } else { rec.z },
        }
    }

    fn point_label(&self, vertex: &Vertex, mode: LabelMode) -> Option<(f64, f64)> {
        match mode {
            // for a point, every placement is the point itself
            LabelMode::Center | LabelMode::First | LabelMode::Last => Some((vertex.x, vertex.y)),
            LabelMode::None => None,
        }
    }

    fn part_label(
        &self,
        part: &Part,
        geom_type: GeomType,
        mode: LabelMode,
    ) -> Option<(f64, f64)> {
        match mode {
            LabelMode::None => None,
            LabelMode::First => part.first().map(|v| (v.x, v.y)),
            LabelMode::Last => part.last().map(|v| (v.x, v.y)),
            LabelMode::Center => match geom_type {
                GeomType::Line => part.midpoint(),
                _ => part.centroid(),
            },
        }
    }
}
