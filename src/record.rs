// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Records and the per-input data store.
//!

use crate::{GeomType, Options, Schema, schema::GeomTag};

/// Growth granularity of a data store, in records.
pub const DATA_STORE_CHUNK: usize = 256;

/// One line of input, after tokenization and (possibly) validation.
#[derive(Debug, Clone)]
pub struct Record {
    /// 1-based source line number.
    pub line: u64,
    /// Per-field content; `None` for empty or skipped positions.
    pub contents: Vec<Option<String>>,
    /// Fields excluded from validation (reduced records, mode `min`).
    pub skip: Vec<bool>,
    /// Number of tokens the reader produced for this line.
    pub fields_read: usize,
    /// Extracted X coordinate, offset applied.
    pub x: f64,
    /// Extracted Y coordinate, offset applied.
    pub y: f64,
    /// Extracted Z coordinate, offset applied (offset only if no Z field).
    pub z: f64,
    /// Geometry this record belongs to; 0 until multiplexed.
    pub geom_id: u32,
    /// Part within a multi-part geometry.
    pub part_id: u32,
    /// Geometry tag found in the tag field, if any.
    pub tag: Option<GeomTag>,
    /// Resolved geometry type, set by the multiplexer.
    pub geom_type: GeomType,
    /// Whether the record passed validation.
    pub is_valid: bool,
}

impl Record {
    fn new(line: u64, contents: Vec<Option<String>>, skip: Vec<bool>, fields_read: usize) -> Self {
        Record {
            line,
            contents,
            skip,
            fields_read,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            geom_id: 0,
            part_id: 0,
            tag: None,
            geom_type: GeomType::None,
            is_valid: false,
        }
    }

    /// Borrow the key field's content, if a key field is declared and the
    /// record has content there.
    pub fn key<'a>(&'a self, schema: &Schema) -> Option<&'a str> {
        let idx = schema.key_idx()?;
        self.contents.get(idx)?.as_deref()
    }
}

/// Per-input-file, growable vector of records.
///
/// Capacity grows in chunks of [`DATA_STORE_CHUNK`]; slot indices
/// `0..len()` are stable for the lifetime of the store.
#[derive(Debug)]
pub struct DataStore {
    input: String,
    offset_x: f64,
    offset_y: f64,
    offset_z: f64,
    num_fields: usize,
    records: Vec<Record>,
    /// Point features found in this store (set by the multiplexer).
    pub num_points: u32,
    /// Line features found in this store (set by the multiplexer).
    pub num_lines: u32,
    /// Polygon features found in this store (set by the multiplexer).
    pub num_polygons: u32,
}

impl DataStore {
    /// Create an empty store for one input source.
    pub fn new(input: &str, schema: &Schema, opts: &Options) -> Self {
        DataStore {
            input: input.to_owned(),
            offset_x: opts.offset_x,
            offset_y: opts.offset_y,
            offset_z: opts.offset_z,
            num_fields: schema.num_fields(),
            records: Vec::with_capacity(DATA_STORE_CHUNK),
            num_points: 0,
            num_lines: 0,
            num_polygons: 0,
        }
    }

    /// Input source name; `-` reads the console stream.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Input source name as shown in diagnostics.
    pub fn display_name(&self) -> &str {
        if self.input == "-" {
            "<console input stream>"
        } else {
            &self.input
        }
    }

    /// X offset this store was created with.
    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    /// Y offset this store was created with.
    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    /// Z offset this store was created with.
    pub fn offset_z(&self) -> f64 {
        self.offset_z
    }

    /// Declared field count.
    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// Store a freshly read raw tuple in the next free slot and return its
    /// index. Indices never move afterwards.
    pub fn append(
        &mut self,
        line: u64,
        contents: Vec<Option<String>>,
        skip: Vec<bool>,
        fields_read: usize,
    ) -> usize {
        debug_assert_eq!(contents.len(), self.num_fields);
        if self.records.len() == self.records.capacity() {
            self.records.reserve_exact(DATA_STORE_CHUNK);
        }
        self.records
            .push(Record::new(line, contents, skip, fields_read));
        self.records.len() - 1
    }

    /// All stored records, in input order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// All stored records, mutable.
    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record was stored yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NumericFormat, Reporter};

    fn schema() -> Schema {
        const TEXT: &str = "\
[parser]
tag_mode = none
coor_x = x
coor_y = y

[field]
name = id
type = int
separator = \",\"

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";
        Schema::from_text(
            "test.schema",
            TEXT,
            &NumericFormat::plain(),
            &Reporter::to_console(),
        )
        .unwrap()
    }

    fn tuple(vals: &[&str]) -> (Vec<Option<String>>, Vec<bool>) {
        let contents: Vec<Option<String>> = vals.iter().map(|v| Some((*v).to_owned())).collect();
        let skip = vec![false; vals.len()];
        (contents, skip)
    }

    #[test]
    fn test_append_keeps_indices_stable() {
        let schema = schema();
        let mut ds = DataStore::new("test.dat", &schema, &Options::default());

        // grow well past one chunk
        for i in 0..(DATA_STORE_CHUNK * 2 + 10) {
            let (contents, skip) = tuple(&[&i.to_string(), "1.0", "2.0"]);
            let slot = ds.append((i + 1) as u64, contents, skip, 3);
            assert_eq!(slot, i);
        }
        assert_eq!(ds.len(), DATA_STORE_CHUNK * 2 + 10);
        assert_eq!(ds.records()[0].contents[0].as_deref(), Some("0"));
        assert_eq!(ds.records()[DATA_STORE_CHUNK].line, (DATA_STORE_CHUNK + 1) as u64);
    }

    #[test]
    fn test_display_name_for_stdin() {
        let schema = schema();
        let ds = DataStore::new("-", &schema, &Options::default());
        assert_eq!(ds.display_name(), "<console input stream>");
        let ds = DataStore::new("a.dat", &schema, &Options::default());
        assert_eq!(ds.display_name(), "a.dat");
    }

    #[test]
    fn test_key_borrow() {
        const TEXT: &str = "\
[parser]
tag_mode = max
coor_x = x
coor_y = y
tag_field = tag
key_field = id
geom_tag_point = \"X\"
geom_tag_line = \"L\"
geom_tag_poly = \"P\"

[field]
name = id
type = text
separator = \",\"

[field]
name = tag
type = text
separator = \",\"

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";
        let schema = Schema::from_text(
            "test.schema",
            TEXT,
            &NumericFormat::plain(),
            &Reporter::to_console(),
        )
        .unwrap();
        let mut ds = DataStore::new("t.dat", &schema, &Options::default());
        let (contents, skip) = tuple(&["A7", "L", "1.0", "2.0"]);
        let slot = ds.append(1, contents, skip, 4);
        assert_eq!(ds.records()[slot].key(&schema), Some("A7"));
    }
}
