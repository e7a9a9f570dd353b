// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Multi-part fusion and cross-store uniqueness checking.
//!
//! Fusion joins features that share a primary key value and a (non-point)
//! geometry type into one multi-part feature, whether the parts come from
//! one input file or from several. It rewrites the feature and part ids
//! stamped on the records; the geometry build afterwards groups by those
//! ids. The pass is quadratic over features, which is fine for survey
//! sized inputs and keeps an index structure out of the picture.
//!

use crate::{DataStore, Error, GeomType, Reporter, Schema};

// one distinct feature, in traversal order
struct Feat {
    geom_id: u32,
    geom_type: GeomType,
    key: Option<String>,
    input: String,
    line: u64,
}

fn collect_features(stores: &[DataStore], key_idx: usize) -> Vec<Feat> {
    let mut feats: Vec<Feat> = Vec::new();
    for ds in stores {
        for rec in ds.records() {
            if !rec.is_valid || rec.geom_type == GeomType::None {
                continue;
            }
            if feats.iter().any(|f| f.geom_id == rec.geom_id) {
                continue;
            }
            feats.push(Feat {
                geom_id: rec.geom_id,
                geom_type: rec.geom_type,
                key: rec.contents[key_idx].clone(),
                input: ds.display_name().to_owned(),
                line: rec.line,
            });
        }
    }
    feats
}

/// Fuse same-key, same-type features into multi-part geometries.
/// A no-op unless the schema declares a unique key field. Returns the
/// number of merged-away features.
pub fn fuse(stores: &mut [DataStore], schema: &Schema, reporter: &Reporter) -> u32 {
    // only a unique primary key makes same-key records one feature
    if !schema.key_unique {
        return 0;
    }
    let Some(key_idx) = schema.key_idx() else {
        return 0;
    };

    let feats = collect_features(stores, key_idx);
    let mut merged: Vec<u32> = Vec::new();
    let mut num_fused = 0;

    for a in 0..feats.len() {
        let fa = &feats[a];
        if fa.geom_type == GeomType::Point || merged.contains(&fa.geom_id) {
            continue;
        }
        let Some(key_a) = fa.key.as_deref() else {
            continue;
        };
        let mut part: u32 = 0;
        for fb in &feats[a + 1..] {
            if fb.geom_type != fa.geom_type
                || fb.geom_id == fa.geom_id
                || merged.contains(&fb.geom_id)
                || fb.key.as_deref() != Some(key_a)
            {
                continue;
            }
            part += 1;
            reporter.note(format!(
                "Merging geometry #'{key_a}' (read from '{}', line {}+) with geometry read from '{}', line {}+, as part {part}",
                fa.input, fa.line, fb.input, fb.line
            ));
            for ds in stores.iter_mut() {
                for rec in ds.records_mut() {
                    if rec.geom_id == fb.geom_id {
                        rec.geom_id = fa.geom_id;
                        rec.part_id = part;
                    }
                }
            }
            merged.push(fb.geom_id);
            num_fused += 1;
        }
    }
    num_fused
}

/// Report every pair of distinct geometries sharing a value in a field
/// declared `unique`. Returns the number of collisions; the records stay
/// in the store.
pub fn check_unique(stores: &[DataStore], schema: &Schema, reporter: &Reporter) -> u32 {
    let mut num_duplicates = 0;
    for (idx, field) in schema.fields.iter().enumerate() {
        if !field.unique {
            continue;
        }
        // flat view of all candidate records across stores
        let recs: Vec<(&DataStore, &crate::record::Record)> = stores
            .iter()
            .flat_map(|ds| ds.records().iter().map(move |r| (ds, r)))
            .filter(|(_, r)| r.is_valid)
            .collect();
        for (i, (ds_a, a)) in recs.iter().enumerate() {
            let Some(content_a) = a.contents[idx].as_deref() else {
                continue;
            };
            for (ds_b, b) in &recs[i + 1..] {
                if a.geom_id == b.geom_id {
                    continue;
                }
                if b.contents[idx].as_deref() == Some(content_a) {
                    num_duplicates += 1;
                    reporter.warning(
                        Error::UniqueViolation {
                            field: field.name.clone(),
                            input_a: ds_a.display_name().to_owned(),
                            line_a: a.line,
                            input_b: ds_b.display_name().to_owned(),
                            line_b: b.line,
                        }
                        .to_string(),
                    );
                }
            }
        }
    }
    num_duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Multiplexer, NumericFormat, Options, RawLine, RecordReader, validator,
    };

    const MAX_MODE: &str = "\
[parser]
tag_mode = max
coor_x = x
coor_y = y
tag_field = tag
key_field = key
key_unique = yes
geom_tag_point = \"X\"
geom_tag_line = \"L\"
geom_tag_poly = \"P\"

[field]
name = tag
type = text
separator = \",\"

[field]
name = key
type = text
separator = \",\"

[field]
name = id
type = int
unique = yes
separator = \",\"

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";

    fn schema(text: &str) -> Schema {
        Schema::from_text(
            "test.schema",
            text,
            &NumericFormat::plain(),
            &crate::Reporter::to_console(),
        )
        .unwrap()
    }

    fn load_store(schema: &Schema, input: &str, lines: &[&str]) -> DataStore {
        let opts = Options::default();
        let mut ds = DataStore::new(input, schema, &opts);
        let mut reader = RecordReader::new(schema);
        for (no, line) in lines.iter().enumerate() {
            if let RawLine::Tuple(t) = reader.read_line(line) {
                let slot = ds.append((no + 1) as u64, t.contents, t.skip, t.fields_read);
                if validator::validate_record(&mut ds, slot, schema, &NumericFormat::plain())
                    .is_ok()
                {
                    ds.records_mut()[slot].is_valid = true;
                }
            }
        }
        ds
    }

    #[test]
    fn test_fuse_across_files() {
        let s = schema(MAX_MODE);
        let opts = Options::default();
        let mut stores = vec![
            load_store(&s, "a.dat", &["L,W1,1,0,0", "L,W1,2,1,0"]),
            load_store(&s, "b.dat", &["L,W1,3,5,5", "L,W1,4,6,5"]),
        ];
        let mux = Multiplexer::new(&s, &opts);
        let reporter = crate::Reporter::to_console();
        mux.assign(&mut stores, &reporter);
        let fused = fuse(&mut stores, &s, &reporter);
        assert_eq!(fused, 1);

        let gs = mux.build(&stores);
        assert_eq!(gs.lines().len(), 1);
        let line = &gs.lines()[0];
        assert_eq!(line.parts.len(), 2);
        assert_eq!(line.parts[0].vertices.len(), 2);
        assert_eq!(line.parts[1].vertices.len(), 2);
    }

    #[test]
    fn test_fuse_same_file_interrupted_runs() {
        let s = schema(MAX_MODE);
        let opts = Options::default();
        let mut stores = vec![load_store(
            &s,
            "a.dat",
            &[
                "L,W1,1,0,0",
                "L,W1,2,1,0",
                "L,W2,3,9,9", // different key interrupts the run
                "L,W1,4,2,0",
            ],
        )];
        let mux = Multiplexer::new(&s, &opts);
        let reporter = crate::Reporter::to_console();
        mux.assign(&mut stores, &reporter);
        assert_eq!(fuse(&mut stores, &s, &reporter), 1);

        let gs = mux.build(&stores);
        assert_eq!(gs.lines().len(), 2);
        let w1 = &gs.lines()[0];
        assert_eq!(w1.parts.len(), 2);
    }

    #[test]
    fn test_fuse_requires_unique_key() {
        let text = MAX_MODE.replace("key_unique = yes", "key_unique = no");
        let s = schema(&text);
        let opts = Options::default();
        let mut stores = vec![
            load_store(&s, "a.dat", &["L,W1,1,0,0"]),
            load_store(&s, "b.dat", &["L,W1,2,5,5"]),
        ];
        let mux = Multiplexer::new(&s, &opts);
        let reporter = crate::Reporter::to_console();
        mux.assign(&mut stores, &reporter);
        assert_eq!(fuse(&mut stores, &s, &reporter), 0);
        let gs = mux.build(&stores);
        assert_eq!(gs.lines().len(), 2);
    }

    #[test]
    fn test_fuse_skips_points() {
        let s = schema(MAX_MODE);
        let opts = Options::default();
        let mut stores = vec![
            load_store(&s, "a.dat", &["X,K,1,0,0"]),
            load_store(&s, "b.dat", &["X,K,2,5,5"]),
        ];
        let mux = Multiplexer::new(&s, &opts);
        let reporter = crate::Reporter::to_console();
        mux.assign(&mut stores, &reporter);
        assert_eq!(fuse(&mut stores, &s, &reporter), 0);
    }

    #[test]
    fn test_unique_violation_reported_once() {
        let s = schema(MAX_MODE);
        let opts = Options::default();
        let mut stores = vec![
            load_store(&s, "a.dat", &["X,K1,7,0,0"]),
            load_store(&s, "b.dat", &["X,K2,7,5,5"]),
        ];
        let mux = Multiplexer::new(&s, &opts);
        let reporter = crate::Reporter::to_console();
        mux.assign(&mut stores, &reporter);
        let dupes = check_unique(&stores, &s, &reporter);
        assert_eq!(dupes, 1);
        assert_eq!(reporter.warning_count(), 1);

        // both points stay in the store
        let gs = mux.build(&stores);
        assert_eq!(gs.points().len(), 2);
    }

    #[test]
    fn test_unique_ignores_same_feature() {
        let s = schema(MAX_MODE);
        let opts = Options::default();
        // two vertices of one line share the id value; that is one feature
        let mut stores = vec![load_store(&s, "a.dat", &["L,W1,7,0,0", "L,W1,7,1,0"])];
        let mux = Multiplexer::new(&s, &opts);
        let reporter = crate::Reporter::to_console();
        mux.assign(&mut stores, &reporter);
        assert_eq!(check_unique(&stores, &s, &reporter), 0);
    }
}
