// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Record reader: turns one raw input line into a vector of nullable
//! field tokens according to the schema's per-field separator rules.
//!
//! The reader does not validate types; that is the validator's job. It
//! does apply the declared string transforms (case conversion first, then
//! lookup substitution) to text fields, so stored content is already in
//! its final shape.
//!

use crate::{
    DataStore, Error, MAX_LINE_LEN, Options, Reporter, Schema,
    schema::{FieldDesc, FieldType, TagMode},
    validator,
};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};

/// A tokenized input line, before validation.
#[derive(Debug, PartialEq, Eq)]
pub struct RawTuple {
    /// Per-field content at declared positions; `None` where empty or
    /// skipped.
    pub contents: Vec<Option<String>>,
    /// Positions excluded from validation (reduced records only).
    pub skip: Vec<bool>,
    /// Number of field positions actually produced.
    pub fields_read: usize,
    /// Whether the reduced-record pass produced this tuple.
    pub reduced: bool,
}

/// Outcome of reading one line.
#[derive(Debug, PartialEq, Eq)]
pub enum RawLine {
    /// Comment or blank line; nothing to store.
    Discard,
    /// A tokenized tuple to store and validate.
    Tuple(RawTuple),
}

/// Tokenizer for one input source. Carries the "a full record was seen"
/// state that arms the reduced-record pass in mode `min`.
#[derive(Debug)]
pub struct RecordReader<'a> {
    schema: &'a Schema,
    saw_full_record: bool,
}

impl<'a> RecordReader<'a> {
    /// New reader at the start of an input source.
    pub fn new(schema: &'a Schema) -> Self {
        RecordReader {
            schema,
            saw_full_record: false,
        }
    }

    /// Tokenize one line.
    pub fn read_line(&mut self, line: &str) -> RawLine {
        let packed = line.trim();
        if packed.is_empty() || self.schema.is_comment_line(packed) {
            return RawLine::Discard;
        }

        let n = self.schema.num_fields();
        let (mut contents, mut fields_read) = self.full_pass(packed);
        let mut skip = vec![false; n];
        let mut reduced = false;

        if fields_read == n {
            self.saw_full_record = true;
        } else if self.schema.tag_mode == TagMode::Min
            && self.saw_full_record
            && fields_read == self.schema.reduced_field_count()
        {
            // exactly the reduced token count after at least one full
            // record: re-tokenize against the persistent and coordinate
            // fields only, at their declared positions. Any other short
            // read goes to the validator as-is and fails the shape check.
            let (r_contents, r_skip, r_read) = self.reduced_pass(packed);
            contents = r_contents;
            skip = r_skip;
            fields_read = r_read;
            reduced = true;
        }

        self.apply_transforms(&mut contents);

        RawLine::Tuple(RawTuple {
            contents,
            skip,
            fields_read,
            reduced,
        })
    }

    // Tokenize against the complete field list.
    fn full_pass(&self, packed: &str) -> (Vec<Option<String>>, usize) {
        let fields = &self.schema.fields;
        let n = fields.len();
        let mut contents: Vec<Option<String>> = vec![None; n];
        let mut produced = vec![false; n];

        let mut rest = packed;
        let mut cur = 0;
        while cur < n {
            let field = &fields[cur];
            if field.is_pseudo() {
                contents[cur] = field.value.clone();
                produced[cur] = true;
                cur += 1;
                continue;
            }
            if rest.is_empty() {
                break;
            }
            let (token, used, found_sep) = scan_field(rest, field);
            rest = &rest[used..];
            contents[cur] = token;
            produced[cur] = true;
            cur += 1;
            if !found_sep {
                // token was the line remainder
                break;
            }
        }

        // fill any trailing pseudo fields from their constants
        for k in cur..n {
            if fields[k].is_pseudo() {
                contents[k] = fields[k].value.clone();
                produced[k] = true;
            }
        }

        let fields_read = produced.iter().filter(|p| **p).count();
        (contents, fields_read)
    }

    // Tokenize using only persistent and coordinate fields; every other
    // position gets no content and is flagged for the validator to skip.
    fn reduced_pass(&self, packed: &str) -> (Vec<Option<String>>, Vec<bool>, usize) {
        let fields = &self.schema.fields;
        let n = fields.len();
        let mut contents: Vec<Option<String>> = vec![None; n];
        let mut skip = vec![false; n];

        let mut rest = packed;
        for cur in 0..n {
            let field = &fields[cur];
            let included =
                !field.is_pseudo() && (field.persistent || self.schema.is_coordinate_field(cur));
            if !included {
                skip[cur] = true;
                continue;
            }
            if rest.is_empty() {
                continue;
            }
            let (token, used, _) = scan_field(rest, field);
            rest = &rest[used..];
            contents[cur] = token;
        }

        let fields_read = contents.iter().filter(|c| c.is_some()).count();
        (contents, skip, fields_read)
    }

    // Case conversion first, then lookup substitution. Text fields only.
    fn apply_transforms(&self, contents: &mut [Option<String>]) {
        for (field, slot) in self.schema.fields.iter().zip(contents.iter_mut()) {
            if field.ftype != FieldType::Text || field.is_pseudo() {
                continue;
            }
            if let Some(content) = slot {
                let converted = field.case_conversion.apply(content);
                let replaced = match field.lookup_replacement(&converted) {
                    Some(new) => new.to_owned(),
                    None => converted,
                };
                *slot = Some(replaced);
            }
        }
    }
}

// Scan one field token from the start of `rest`. Returns the token (`None`
// when empty), the number of bytes consumed including the terminating
// separator, and whether a separator terminated the token (false means the
// token ran to the end of the line).
fn scan_field(rest: &str, field: &FieldDesc) -> (Option<String>, usize, bool) {
    let mut token = String::new();
    let mut in_quotes = false;
    let mut i = 0;

    while i < rest.len() {
        let r = &rest[i..];
        if !in_quotes {
            // longest separator match wins
            let sep = field
                .separators
                .iter()
                .filter(|s| r.starts_with(s.as_str()))
                .max_by_key(|s| s.len());
            if let Some(sep) = sep {
                i += sep.len();
                if field.merge_separators {
                    if token.is_empty() {
                        continue;
                    }
                    // collapse the whole separator run
                    loop {
                        let next = field
                            .separators
                            .iter()
                            .filter(|s| rest[i..].starts_with(s.as_str()))
                            .max_by_key(|s| s.len());
                        match next {
                            Some(s) => i += s.len(),
                            None => break,
                        }
                    }
                }
                return (non_empty(token), i, true);
            }
        }
        let c = r.chars().next().expect("non-empty remainder");
        if Some(c) == field.quote {
            in_quotes = !in_quotes;
        } else {
            token.push(c);
        }
        i += c.len_utf8();
    }

    (non_empty(token), i, false)
}

fn non_empty(token: String) -> Option<String> {
    if token.is_empty() { None } else { Some(token) }
}

/// Read all lines of one input source into `ds`, validating each stored
/// record in place. Input name `-` reads the console stream.
pub fn consume_input(
    input: &str,
    schema: &Schema,
    opts: &Options,
    reporter: &Reporter,
    ds: &mut DataStore,
) -> Result<(), Error> {
    let stream: Box<dyn Read> = if input == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(File::open(input).map_err(|source| Error::IoOpen {
            path: input.into(),
            source,
        })?)
    };

    let mut reader = RecordReader::new(schema);
    let mut line_no: u64 = 0;
    for line in BufReader::new(stream).lines() {
        line_no += 1;
        let line = line.map_err(|source| Error::IoOpen {
            path: input.into(),
            source,
        })?;
        if line.chars().count() > MAX_LINE_LEN {
            return Err(Error::RecordShape {
                input: ds.display_name().to_owned(),
                line: line_no,
                reason: format!(
                    "line exceeds the maximum length of {MAX_LINE_LEN} characters"
                ),
            });
        }

        let RawLine::Tuple(tuple) = reader.read_line(&line) else {
            continue;
        };
        let slot = ds.append(line_no, tuple.contents, tuple.skip, tuple.fields_read);
        match validator::validate_record(ds, slot, schema, &opts.numeric_format) {
            Ok(()) => ds.records_mut()[slot].is_valid = true,
            Err(defect) => reporter.record_skipped(&defect),
        }
    }
    reporter.note(format!(
        "Read {} record(s) from \"{}\".",
        ds.len(),
        ds.display_name()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NumericFormat, Reporter};

    fn schema(text: &str) -> Schema {
        Schema::from_text(
            "test.schema",
            text,
            &NumericFormat::plain(),
            &Reporter::to_console(),
        )
        .unwrap()
    }

    const SIMPLE: &str = "\
[parser]
tag_mode = none
comment_mark = \"#\"
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

    fn tokens(reader: &mut RecordReader, line: &str) -> Vec<Option<String>> {
        match reader.read_line(line) {
            RawLine::Tuple(t) => t.contents,
            RawLine::Discard => panic!("line was discarded"),
        }
    }

    fn owned(vals: &[Option<&str>]) -> Vec<Option<String>> {
        vals.iter().map(|v| v.map(str::to_owned)).collect()
    }

    #[test]
    fn test_simple_round_trip() {
        let s = schema(SIMPLE);
        let mut r = RecordReader::new(&s);
        assert_eq!(
            tokens(&mut r, "1,100.0,200.0"),
            owned(&[Some("1"), Some("100.0"), Some("200.0")])
        );
    }

    #[test]
    fn test_comment_and_blank_lines_discarded() {
        let s = schema(SIMPLE);
        let mut r = RecordReader::new(&s);
        assert_eq!(r.read_line("# heading"), RawLine::Discard);
        assert_eq!(r.read_line("   # indented"), RawLine::Discard);
        assert_eq!(r.read_line("   "), RawLine::Discard);
        assert_eq!(r.read_line(""), RawLine::Discard);
    }

    #[test]
    fn test_short_line_counts_fields() {
        let s = schema(SIMPLE);
        let mut r = RecordReader::new(&s);
        match r.read_line("1,100.0") {
            RawLine::Tuple(t) => {
                assert_eq!(t.fields_read, 2);
                assert!(!t.reduced);
            }
            _ => panic!("expected tuple"),
        }
    }

    #[test]
    fn test_empty_token_is_null() {
        let s = schema(SIMPLE);
        let mut r = RecordReader::new(&s);
        assert_eq!(
            tokens(&mut r, ",100.0,200.0"),
            owned(&[None, Some("100.0"), Some("200.0")])
        );
    }

    const QUOTED: &str = "\
[parser]
tag_mode = none
coor_x = x
coor_y = y

[field]
name = label
type = text
separator = \",\"
quotation = \"'\"

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";

    #[test]
    fn test_quoted_token_protects_separator() {
        let s = schema(QUOTED);
        let mut r = RecordReader::new(&s);
        assert_eq!(
            tokens(&mut r, "'a,b',1.0,2.0"),
            owned(&[Some("a,b"), Some("1.0"), Some("2.0")])
        );
    }

    const MERGED: &str = "\
[parser]
tag_mode = none
coor_x = x
coor_y = y

[field]
name = id
type = int
separator = space
merge_separators = yes

[field]
name = x
type = double
separator = space
merge_separators = yes

[field]
name = y
type = double
";

    #[test]
    fn test_merge_separators() {
        let s = schema(MERGED);
        let mut r = RecordReader::new(&s);
        assert_eq!(
            tokens(&mut r, "7   1.0    2.0"),
            owned(&[Some("7"), Some("1.0"), Some("2.0")])
        );
    }

    const PSEUDO: &str = "\
[parser]
tag_mode = none
coor_x = x
coor_y = y

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
separator = \",\"

[field]
name = site
type = text
value = \"TR-9\"
";

    #[test]
    fn test_trailing_pseudo_field_filled() {
        let s = schema(PSEUDO);
        let mut r = RecordReader::new(&s);
        match r.read_line("1.0,2.0") {
            RawLine::Tuple(t) => {
                assert_eq!(
                    t.contents,
                    owned(&[Some("1.0"), Some("2.0"), Some("TR-9")])
                );
                assert_eq!(t.fields_read, 3);
            }
            _ => panic!("expected tuple"),
        }
    }

    const TRANSFORM: &str = "\
[parser]
tag_mode = none
coor_x = x
coor_y = y

[field]
name = code
type = text
change_case = upper
separator = \",\"
@abc = X
@FND = Find

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";

    #[test]
    fn test_case_conversion_runs_before_lookup() {
        let s = schema(TRANSFORM);
        let mut r = RecordReader::new(&s);
        // "abc" is uppercased to "ABC" first; the lookup key match is
        // case-insensitive, so the "abc" rule still fires
        assert_eq!(
            tokens(&mut r, "abc,1.0,2.0")[0].as_deref(),
            Some("X")
        );
        // lookup result is stored verbatim, not case-converted
        assert_eq!(
            tokens(&mut r, "fnd,1.0,2.0")[0].as_deref(),
            Some("Find")
        );
        assert_eq!(
            tokens(&mut r, "other,1.0,2.0")[0].as_deref(),
            Some("OTHER")
        );
    }

    const MIN: &str = "\
[parser]
tag_mode = min
coor_x = x
coor_y = y
tag_field = tag
geom_tag_line = \"L\"
geom_tag_poly = \"P\"

[field]
name = tag
type = text
empty_allowed = yes
separator = \",\"

[field]
name = desc
type = text
empty_allowed = yes
separator = \",\"

[field]
name = key
type = text
persistent = yes
empty_allowed = yes
separator = \",\"

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";

    #[test]
    fn test_reduced_record_isolation() {
        let s = schema(MIN);
        let mut r = RecordReader::new(&s);

        // a full record arms the reduced pass
        match r.read_line("P,pit,A,10.0,10.0") {
            RawLine::Tuple(t) => {
                assert_eq!(t.fields_read, 5);
                assert!(!t.reduced);
            }
            _ => panic!("expected tuple"),
        }

        // reduced record: key + x + y only
        match r.read_line("A,11.0,10.0") {
            RawLine::Tuple(t) => {
                assert!(t.reduced);
                assert_eq!(t.fields_read, 3);
                assert_eq!(
                    t.contents,
                    owned(&[None, None, Some("A"), Some("11.0"), Some("10.0")])
                );
                assert_eq!(t.skip, vec![true, true, false, false, false]);
            }
            _ => panic!("expected tuple"),
        }
    }

    #[test]
    fn test_reduced_pass_not_armed_without_full_record() {
        let s = schema(MIN);
        let mut r = RecordReader::new(&s);
        match r.read_line("A,11.0,10.0") {
            RawLine::Tuple(t) => {
                assert!(!t.reduced);
                assert_eq!(t.fields_read, 3);
            }
            _ => panic!("expected tuple"),
        }
    }

    #[test]
    fn test_reduced_pass_requires_exact_token_count() {
        let s = schema(MIN);
        let mut r = RecordReader::new(&s);
        // arm w/ a full record
        match r.read_line("P,pit,A,10.0,10.0") {
            RawLine::Tuple(t) => assert_eq!(t.fields_read, 5),
            _ => panic!("expected tuple"),
        }
        // four tokens is neither the full (5) nor the reduced (3) count:
        // the tuple must be kept as read, not remapped onto the
        // persistent positions
        match r.read_line("A,B,11.0,10.0") {
            RawLine::Tuple(t) => {
                assert!(!t.reduced);
                assert_eq!(t.fields_read, 4);
                assert_eq!(t.skip, vec![false; 5]);
                assert_eq!(t.contents[0].as_deref(), Some("A"));
            }
            _ => panic!("expected tuple"),
        }
    }
}
