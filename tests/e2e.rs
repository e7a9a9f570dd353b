// SPDX-License-Identifier: Apache-2.0

//! End-to-end runs over the sample schema and data files.
//!

use approx::assert_relative_eq;
use survey_gis::prelude::*;
use walkdir::WalkDir;

const TOLERANCE: f64 = 1.0E-9;

fn opts(schema: &str, inputs: &[&str]) -> Options {
    let mut o = Options::default();
    o.schema_file = format!("tests/samples/{schema}");
    o.inputs = inputs
        .iter()
        .map(|i| format!("tests/samples/{i}"))
        .collect();
    o
}

#[test]
fn test_sample_schemas_all_load() {
    let mut count = 0;
    for entry in WalkDir::new("tests/samples") {
        let entry = entry.unwrap();
        if entry.file_type().is_dir()
            || entry.path().extension().is_none_or(|e| e != "schema")
        {
            continue;
        }
        let path = entry.path().to_str().unwrap();
        let schema = Schema::load(path, &NumericFormat::plain(), &Reporter::to_console())
            .expect("sample schema must load");
        assert!(schema.num_fields() > 0);
        count += 1;
    }
    assert_eq!(count, 4);
}

#[test]
fn test_points_mode_none() {
    let reporter = Reporter::to_console();
    let gs = survey_gis::run(&opts("points.schema", &["points.dat"]), &reporter).unwrap();

    assert_eq!(gs.points().len(), 2);
    assert!(gs.lines().is_empty());
    assert!(gs.polygons().is_empty());

    let p1 = &gs.points()[0];
    assert_relative_eq!(p1.x, 100.0, epsilon = TOLERANCE);
    assert_relative_eq!(p1.y, 200.0, epsilon = TOLERANCE);
    assert_relative_eq!(p1.z, 0.0, epsilon = TOLERANCE);
    assert_eq!(p1.atts[0].as_deref(), Some("1"));

    let p2 = &gs.points()[1];
    assert_relative_eq!(p2.x, 101.5, epsilon = TOLERANCE);
    assert_relative_eq!(p2.y, 200.5, epsilon = TOLERANCE);
    assert_eq!(p2.atts[0].as_deref(), Some("2"));

    assert!(!reporter.has_errors());
    assert!(!reporter.has_warnings());
}

#[test]
fn test_polygon_mode_min() {
    let reporter = Reporter::to_console();
    let gs = survey_gis::run(&opts("trench.schema", &["trench.dat"]), &reporter).unwrap();

    assert_eq!(gs.polygons().len(), 1);
    assert!(gs.points().is_empty());
    let poly = &gs.polygons()[0];
    assert_eq!(poly.atts[1].as_deref(), Some("A"));
    assert_eq!(poly.parts.len(), 1);
    let xy: Vec<(f64, f64)> = poly.parts[0]
        .vertices
        .iter()
        .map(|v| (v.x, v.y))
        .collect();
    assert_eq!(
        xy,
        vec![(10.0, 10.0), (11.0, 10.0), (11.0, 11.0), (10.0, 11.0)]
    );
}

#[test]
fn test_selection_replace_then_replace() {
    let mut o = opts("points.schema", &["points.dat"]);
    o.selections = vec!["eq:pt:id:1".into(), "eq:pt:id:2".into()];
    let gs = survey_gis::run(&o, &Reporter::to_console()).unwrap();

    // the second command replaces the first selection
    let selected: Vec<&str> = gs
        .points()
        .iter()
        .filter(|p| p.is_selected)
        .map(|p| p.atts[0].as_deref().unwrap())
        .collect();
    assert_eq!(selected, vec!["2"]);
}

#[test]
fn test_selection_replace_then_add() {
    let mut o = opts("points.schema", &["points.dat"]);
    o.selections = vec!["eq:pt:id:1".into(), "eq+:pt:id:2".into()];
    let gs = survey_gis::run(&o, &Reporter::to_console()).unwrap();
    assert_eq!(gs.points().iter().filter(|p| p.is_selected).count(), 2);
}

#[test]
fn test_invalid_selection_is_fatal_before_reading() {
    let mut o = opts("points.schema", &["points.dat"]);
    o.selections = vec!["regexp:pt:id:[".into()];
    let e = survey_gis::run(&o, &Reporter::to_console()).unwrap_err();
    assert!(matches!(
        e,
        Error::SelectionSemantic { .. } | Error::SelectionSyntax { .. }
    ));
}

#[test]
fn test_unique_violation_across_files() {
    let reporter = Reporter::to_console();
    let gs = survey_gis::run(
        &opts("unique.schema", &["dup_a.dat", "dup_b.dat"]),
        &reporter,
    )
    .unwrap();

    // one warning citing both records, both points stay in the store
    assert_eq!(gs.points().len(), 2);
    assert_eq!(reporter.warning_count(), 1);
    assert!(!reporter.has_errors());
}

#[test]
fn test_short_record_rejected_in_mode_max() {
    let reporter = Reporter::to_console();
    let gs = survey_gis::run(&opts("maximal.schema", &["maximal.dat"]), &reporter).unwrap();

    // the short line is skipped w/ a warning; the line keeps 3 vertices
    assert!(reporter.has_warnings());
    assert_eq!(gs.lines().len(), 1);
    assert_eq!(gs.lines()[0].parts[0].vertices.len(), 3);
}

#[test]
fn test_missing_schema_file() {
    let e = survey_gis::run(
        &opts("no-such.schema", &["points.dat"]),
        &Reporter::to_console(),
    )
    .unwrap_err();
    assert!(matches!(e, Error::IoOpen { .. }));
}

#[test]
fn test_missing_input_file() {
    let e = survey_gis::run(
        &opts("points.schema", &["no-such.dat"]),
        &Reporter::to_console(),
    )
    .unwrap_err();
    assert!(matches!(e, Error::IoOpen { .. }));
}

#[test]
fn test_offsets_and_force_2d() {
    let mut o = opts("points.schema", &["points.dat"]);
    o.offset_x = 1000.0;
    o.offset_y = 500.0;
    o.force_2d = true;
    let gs = survey_gis::run(&o, &Reporter::to_console()).unwrap();
    let p1 = &gs.points()[0];
    assert_relative_eq!(p1.x, 1100.0, epsilon = TOLERANCE);
    assert_relative_eq!(p1.y, 700.0, epsilon = TOLERANCE);
    assert_relative_eq!(p1.z, 0.0, epsilon = TOLERANCE);
}

#[test]
fn test_label_anchor_modes() {
    let mut o = opts("trench.schema", &["trench.dat"]);
    o.label_mode_poly = LabelMode::Last;
    let gs = survey_gis::run(&o, &Reporter::to_console()).unwrap();
    assert_eq!(gs.polygons()[0].parts[0].label, Some((10.0, 11.0)));

    o.label_mode_poly = LabelMode::None;
    let gs = survey_gis::run(&o, &Reporter::to_console()).unwrap();
    assert_eq!(gs.polygons()[0].parts[0].label, None);
}

#[test]
fn test_extent_covers_all_features() {
    let gs = survey_gis::run(
        &opts("points.schema", &["points.dat"]),
        &Reporter::to_console(),
    )
    .unwrap();
    let e = gs.extent().unwrap();
    assert_relative_eq!(e.min_x, 100.0, epsilon = TOLERANCE);
    assert_relative_eq!(e.max_x, 101.5, epsilon = TOLERANCE);
    assert_relative_eq!(e.min_y, 200.0, epsilon = TOLERANCE);
    assert_relative_eq!(e.max_y, 200.5, epsilon = TOLERANCE);
}
