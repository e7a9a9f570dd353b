// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Convenience re-exports of the types most callers need.
//!

pub use crate::{
    DataStore, DatumShift, Error, GeomStore, GeomType, LabelMode, LineFeature, Multiplexer,
    NumericFormat, Options, PointFeature, PolygonFeature, RawLine, RecordReader, ReprojAction,
    ReprojectionDriver, Reporter, Schema, Selection, SelectionEngine, SelectionGeom,
    SrsResolution, TagMode,
};
