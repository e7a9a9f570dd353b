// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Parser schema: the declarative description of the expected field
//! layout, coordinate/tag/key roles and geometry-tag vocabulary.
//!
//! A schema is loaded once from an INI-style description file, validated
//! against every structural invariant, and then treated as immutable for
//! the rest of the run.
//!

mod field;
mod load;

pub use field::{CaseConversion, FieldDesc, FieldType, RESERVED_FIELD_NAMES, is_valid_field_name};
pub use load::parse_enabled;

use crate::{Error, NumericFormat, Reporter, numeric};
use load::RawSchema;
use std::fs;
use unicase::UniCase;

/// Strategy for grouping the vertex stream into features.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// No grouping: every record is an independent point.
    #[default]
    None,
    /// Minimal markup: a tag opens a feature, untagged records extend it.
    Min,
    /// Maximal markup: every record carries a tag; the key field groups.
    Max,
    /// Features accumulate until an end marker or a key change.
    End,
}

impl TagMode {
    /// Parse a mode name from the schema file (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(TagMode::None),
            "min" => Some(TagMode::Min),
            "max" => Some(TagMode::Max),
            "end" => Some(TagMode::End),
            _ => None,
        }
    }
}

impl core::fmt::Display for TagMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TagMode::None => write!(f, "none"),
            TagMode::Min => write!(f, "min"),
            TagMode::Max => write!(f, "max"),
            TagMode::End => write!(f, "end"),
        }
    }
}

/// Which geometry-tag string was found in a record's tag field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeomTag {
    /// The point tag.
    Point,
    /// The line tag.
    Line,
    /// The polygon tag.
    Polygon,
    /// The end-of-feature tag (mode `end` only).
    End,
}

/// Validated parser description.
#[derive(Debug)]
pub struct Schema {
    /// Display name.
    pub name: Option<String>,
    /// Free-form description.
    pub info: Option<String>,
    /// Geometry tagging mode.
    pub tag_mode: TagMode,
    /// Strict tagging: untagged vertices outside features are defects.
    pub tag_strict: bool,
    /// The key field holds a unique primary key (enables fusion).
    pub key_unique: bool,
    /// Sentinel for empty numeric attribute values in output.
    pub no_data: i32,
    /// Comment mark strings, checked against the first token of a line.
    pub comment_marks: Vec<String>,
    /// Ordered field declarations.
    pub fields: Vec<FieldDesc>,

    x_idx: usize,
    y_idx: usize,
    z_idx: Option<usize>,
    tag_idx: Option<usize>,
    key_idx: Option<usize>,

    geom_tag_point: Option<String>,
    geom_tag_line: Option<String>,
    geom_tag_poly: Option<String>,
    geom_tag_end: Option<String>,
}

impl Schema {
    /// Read and validate a schema file.
    pub fn load(path: &str, fmt: &NumericFormat, reporter: &Reporter) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|source| Error::IoOpen {
            path: path.into(),
            source,
        })?;
        Self::from_text(path, &text, fmt, reporter)
    }

    /// Parse and validate schema text; `file` only labels diagnostics.
    pub fn from_text(
        file: &str,
        text: &str,
        fmt: &NumericFormat,
        reporter: &Reporter,
    ) -> Result<Self, Error> {
        let raw = load::load_raw(file, text, reporter)?;
        Self::from_raw(raw, file, fmt, reporter)
    }

    /// Number of declared fields.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Index of the field w/ the given name (case-insensitive).
    pub fn field_idx(&self, name: &str) -> Option<usize> {
        let wanted = UniCase::new(name);
        self.fields
            .iter()
            .position(|f| UniCase::new(f.name.as_str()) == wanted)
    }

    /// X coordinate field index.
    pub fn x_idx(&self) -> usize {
        self.x_idx
    }

    /// Y coordinate field index.
    pub fn y_idx(&self) -> usize {
        self.y_idx
    }

    /// Z coordinate field index; `None` means Z is constant zero.
    pub fn z_idx(&self) -> Option<usize> {
        self.z_idx
    }

    /// Tag field index, if a tag field was declared.
    pub fn tag_idx(&self) -> Option<usize> {
        self.tag_idx
    }

    /// Key field index, if a key field was declared.
    pub fn key_idx(&self) -> Option<usize> {
        self.key_idx
    }

    /// Whether field `idx` is one of the coordinate fields.
    pub fn is_coordinate_field(&self, idx: usize) -> bool {
        idx == self.x_idx || idx == self.y_idx || Some(idx) == self.z_idx
    }

    /// Number of tokens in a reduced record (mode `min`): the persistent
    /// fields, which by then include the coordinate fields.
    pub fn reduced_field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.persistent).count()
    }

    /// Search `content` for a geometry-tag substring. Precedence is fixed:
    /// point, then line, then polygon, then the end marker.
    pub fn recognize_tag(&self, content: &str) -> Option<GeomTag> {
        let hit = |tag: &Option<String>| {
            tag.as_deref()
                .is_some_and(|t| !t.is_empty() && content.contains(t))
        };
        if hit(&self.geom_tag_point) {
            return Some(GeomTag::Point);
        }
        if hit(&self.geom_tag_line) {
            return Some(GeomTag::Line);
        }
        if hit(&self.geom_tag_poly) {
            return Some(GeomTag::Polygon);
        }
        if hit(&self.geom_tag_end) {
            return Some(GeomTag::End);
        }
        None
    }

    /// Whether the first token of `line` is one of the comment marks.
    pub fn is_comment_line(&self, line: &str) -> bool {
        let packed = line.trim_start();
        self.comment_marks.iter().any(|m| packed.starts_with(m.as_str()))
    }

    /// Dump the parser and field definitions as notes.
    pub fn describe(&self, reporter: &Reporter) {
        reporter.note("* PARSER AND FIELD DEFINITIONS *");
        if let Some(name) = &self.name {
            reporter.note(format!("Parser: {name}"));
        }
        reporter.note(format!("Tagging mode: {}", self.tag_mode));
        for (i, f) in self.fields.iter().enumerate() {
            let role = if self.is_coordinate_field(i) {
                " (coordinate)"
            } else if Some(i) == self.tag_idx {
                " (tag)"
            } else if Some(i) == self.key_idx {
                " (key)"
            } else {
                ""
            };
            reporter.note(format!("Field {}: '{}' {}{role}", i + 1, f.name, f.ftype));
        }
    }

    // Finalize the raw form and run every schema invariant. Any defect is
    // fatal; warnings flag options that have no effect in the chosen mode.
    fn from_raw(
        raw: RawSchema,
        file: &str,
        fmt: &NumericFormat,
        reporter: &Reporter,
    ) -> Result<Self, Error> {
        let fatal = |reason: String| Error::SchemaSemantic {
            file: file.into(),
            reason,
        };

        if raw.fields.is_empty() {
            return Err(fatal("There are no field definitions.".into()));
        }

        let tag_mode = raw.tag_mode.unwrap_or_default();
        let num_fields = raw.fields.len();

        // finalize fields; every one needs at least a name and a type
        let mut fields = Vec::with_capacity(num_fields);
        for rf in &raw.fields {
            let Some(name) = rf.name.clone() else {
                return Err(fatal(format!(
                    "Field defined after line {} has no name.",
                    rf.definition_line
                )));
            };
            let Some(ftype) = rf.ftype else {
                return Err(fatal(format!(
                    "Field defined after line {} has no type.",
                    rf.definition_line
                )));
            };
            fields.push(FieldDesc {
                name,
                info: rf.info.clone(),
                ftype,
                empty_allowed: rf.empty_allowed.unwrap_or(false),
                unique: rf.unique.unwrap_or(false),
                persistent: rf.persistent.unwrap_or(false),
                skip: rf.skip.unwrap_or(false),
                case_conversion: rf.case_conversion.unwrap_or_default(),
                value: rf.value.clone(),
                separators: rf.separators.clone(),
                merge_separators: rf.merge_separators.unwrap_or(false),
                quote: rf.quote,
                lookup: rf.lookup.clone(),
                definition_line: rf.definition_line,
            });
        }

        // unique names
        for (i, f) in fields.iter().enumerate() {
            if fields[..i]
                .iter()
                .any(|o| UniCase::new(o.name.as_str()) == UniCase::new(f.name.as_str()))
            {
                return Err(fatal(format!(
                    "A field with name \"{}\" was already defined.",
                    f.name
                )));
            }
        }

        Self::check_field_options(&raw, &fields, fmt, &fatal)?;
        Self::check_separators(&raw, &fields, &fatal)?;

        // coordinate fields
        let Some(coor_x) = raw.coor_x.as_deref() else {
            return Err(fatal("No X coordinate field defined.".into()));
        };
        let Some(coor_y) = raw.coor_y.as_deref() else {
            return Err(fatal("No Y coordinate field defined.".into()));
        };
        let coor_z = raw.coor_z.as_deref();
        if coor_z.is_none() {
            reporter.note(format!(
                "No Z field defined in parser schema ({file}). Z assumed to be constant 0."
            ));
        }
        if coor_x.eq_ignore_ascii_case(coor_y)
            || coor_z.is_some_and(|z| z.eq_ignore_ascii_case(coor_x))
            || coor_z.is_some_and(|z| z.eq_ignore_ascii_case(coor_y))
        {
            return Err(fatal("Coordinate fields are not unique.".into()));
        }

        let find = |name: &str| {
            fields
                .iter()
                .position(|f| UniCase::new(f.name.as_str()) == UniCase::new(name))
        };

        let Some(x_idx) = find(coor_x) else {
            return Err(fatal("X coordinate field does not exist.".into()));
        };
        let Some(y_idx) = find(coor_y) else {
            return Err(fatal("Y coordinate field does not exist.".into()));
        };
        let z_idx = match coor_z {
            Some(z) => Some(
                find(z).ok_or_else(|| fatal("Z coordinate field does not exist.".into()))?,
            ),
            None => None,
        };

        for (axis, idx) in [("X", Some(x_idx)), ("Y", Some(y_idx)), ("Z", z_idx)] {
            let Some(idx) = idx else { continue };
            let f = &fields[idx];
            if f.ftype != FieldType::Double {
                return Err(fatal(format!(
                    "Field \"{}\" is {axis} coordinate field, but not of type 'double'.",
                    f.name
                )));
            }
            if f.empty_allowed {
                return Err(fatal(format!(
                    "Field \"{}\" is {axis} coordinate field, but \"empty_allowed\" was set to \"Yes\".",
                    f.name
                )));
            }
            if raw
                .key_field
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(&f.name))
            {
                return Err(fatal(format!(
                    "Field \"{}\" is {axis} coordinate field, and cannot be used as key field.",
                    f.name
                )));
            }
            if raw
                .tag_field
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(&f.name))
            {
                return Err(fatal(format!(
                    "Field \"{}\" is {axis} coordinate field, and cannot be used as tag field.",
                    f.name
                )));
            }
        }

        // tag/key field resolution and mode-specific requirements
        if raw.tag_field.is_none() && tag_mode != TagMode::None {
            return Err(fatal("No geometry tag field provided.".into()));
        }
        if raw.key_field.is_none() && matches!(tag_mode, TagMode::Max | TagMode::End) {
            return Err(fatal("No key field specified.".into()));
        }

        let tag_idx = match raw.tag_field.as_deref() {
            Some(t) => Some(
                find(t).ok_or_else(|| {
                    fatal("Tag field is not set to the name of a valid field.".into())
                })?,
            ),
            None => None,
        };
        let key_idx = match raw.key_field.as_deref() {
            Some(k) => Some(
                find(k).ok_or_else(|| {
                    fatal("Key field is not set to the name of a valid field.".into())
                })?,
            ),
            None => None,
        };

        if tag_mode == TagMode::Max
            && raw
                .key_field
                .as_deref()
                .zip(raw.tag_field.as_deref())
                .is_some_and(|(k, t)| k.eq_ignore_ascii_case(t))
        {
            return Err(fatal(
                "Tag field and key field must not be identical.".into(),
            ));
        }

        Self::check_geom_tags(&raw, &fields, tag_mode, &fatal)?;

        // superfluous settings only warn
        if tag_mode == TagMode::None {
            if raw.key_field.is_some() {
                reporter.warning(format!(
                    "Unneeded setting in parser schema ({file}). Setting for key field will be ignored."
                ));
            }
            if raw.tag_field.is_some() {
                reporter.warning(format!(
                    "Unneeded setting in parser schema ({file}). Setting for tag field will be ignored."
                ));
            }
            if raw.tag_strict.is_some() {
                reporter.warning(format!(
                    "Unneeded setting in parser schema ({file}). Setting for \"tag_strict\" will be ignored."
                ));
            }
            if raw.key_unique.is_some() {
                reporter.warning(format!(
                    "Unneeded setting in parser schema ({file}). Setting for \"key_unique\" will be ignored."
                ));
            }
            if raw.geom_tag_point.is_some()
                || raw.geom_tag_line.is_some()
                || raw.geom_tag_poly.is_some()
                || raw.geom_tag_end.is_some()
            {
                reporter.warning(format!(
                    "Unneeded setting(s) in parser schema ({file}). Setting(s) for geometry tags will be ignored."
                ));
            }
        } else if tag_mode == TagMode::Min && raw.key_field.is_some() {
            reporter.warning(format!(
                "Unneeded setting in parser schema ({file}). Setting for key field will be ignored."
            ));
        }

        // mode "min": coordinate fields are persistent by definition, and
        // reduced records must actually be shorter than full ones
        if tag_mode == TagMode::Min {
            for idx in [Some(x_idx), Some(y_idx), z_idx].into_iter().flatten() {
                fields[idx].persistent = true;
            }
            let reduced = fields.iter().filter(|f| f.persistent).count();
            if reduced >= num_fields {
                return Err(fatal(
                    "Number of fields in reduced records must be smaller than in full records."
                        .into(),
                ));
            }
        }

        Ok(Schema {
            name: raw.name,
            info: raw.info,
            tag_mode,
            tag_strict: raw.tag_strict.unwrap_or(false),
            key_unique: raw.key_unique.unwrap_or(false),
            no_data: raw.no_data.unwrap_or(0),
            comment_marks: raw.comment_marks,
            fields,
            x_idx,
            y_idx,
            z_idx,
            tag_idx,
            key_idx,
            geom_tag_point: raw.geom_tag_point,
            geom_tag_line: raw.geom_tag_line,
            geom_tag_poly: raw.geom_tag_poly,
            geom_tag_end: raw.geom_tag_end,
        })
    }

    fn check_field_options(
        raw: &RawSchema,
        fields: &[FieldDesc],
        fmt: &NumericFormat,
        fatal: &impl Fn(String) -> Error,
    ) -> Result<(), Error> {
        for (rf, f) in raw.fields.iter().zip(fields) {
            if f.is_pseudo() {
                // pseudo fields accept only "info", "name", "type", "value"
                if rf.case_conversion.is_some()
                    || rf.empty_allowed.is_some()
                    || rf.merge_separators.is_some()
                    || rf.persistent.is_some()
                    || rf.skip.is_some()
                    || rf.unique.is_some()
                {
                    return Err(fatal(format!(
                        "Field defined after line {} has too many options. This special field only accepts \"info\", \"name\", \"type\" and \"value\".",
                        f.definition_line
                    )));
                }
                // the constant must parse as the declared type, once
                let value = f.value.as_deref().unwrap_or_default();
                let defect = match f.ftype {
                    FieldType::Double => numeric::parse_double(value, fmt).err(),
                    FieldType::Int => numeric::parse_int(value).err(),
                    FieldType::Text => None,
                };
                if let Some(d) = defect {
                    let what = match d {
                        numeric::NumDefect::Overflow => "overflows its type",
                        numeric::NumDefect::Malformed => "is not a valid number",
                    };
                    return Err(fatal(format!(
                        "Value of field \"{}\" {what}.",
                        f.name
                    )));
                }
            }
            if f.ftype != FieldType::Text {
                if rf.case_conversion.is_some() {
                    return Err(fatal(format!(
                        "Field \"{}\" is not a text field. Therefore, \"change_case\" is not a valid option.",
                        f.name
                    )));
                }
                if !f.lookup.is_empty() {
                    return Err(fatal(format!(
                        "String replacement not allowed for field \"{}\" (wrong type).",
                        f.name
                    )));
                }
            }
            if f.empty_allowed && f.merge_separators {
                return Err(fatal(format!(
                    "Field \"{}\": \"empty_allowed\" and \"merge_separators\" are mutually exclusive.",
                    f.name
                )));
            }
            if f.empty_allowed
                && f.separators
                    .iter()
                    .any(|s| s.as_str() == " " || s.as_str() == "\t")
            {
                return Err(fatal(format!(
                    "Field \"{}\": Must not combine whitespace separators and \"empty_allowed\".",
                    f.name
                )));
            }
        }
        Ok(())
    }

    fn check_separators(
        raw: &RawSchema,
        fields: &[FieldDesc],
        fatal: &impl Fn(String) -> Error,
    ) -> Result<(), Error> {
        let num_fields = fields.len();
        for (i, f) in fields.iter().enumerate() {
            if i + 1 < num_fields && f.separators.is_empty() && !f.is_pseudo() {
                return Err(fatal(format!(
                    "Field \"{}\" has no separator(s).",
                    f.name
                )));
            }
            if i + 1 == num_fields && !f.separators.is_empty() {
                return Err(fatal(format!(
                    "Field \"{}\": Last field must not have a separator.",
                    f.name
                )));
            }

            // quoting, comment and separator characters must be disjoint
            if let Some(q) = f.quote {
                if f.separators.iter().any(|s| s.contains(q)) {
                    return Err(fatal(format!(
                        "Field \"{}\": quoting character matches separator.",
                        f.name
                    )));
                }
                if raw.comment_marks.iter().any(|m| m.contains(q)) {
                    return Err(fatal(format!(
                        "Field \"{}\": quoting character matches comment char.",
                        f.name
                    )));
                }
            }
            for sep in &f.separators {
                for mark in &raw.comment_marks {
                    if sep.chars().any(|c| mark.contains(c)) {
                        return Err(fatal(format!(
                            "Field \"{}\": separator matches comment character.",
                            f.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_geom_tags(
        raw: &RawSchema,
        fields: &[FieldDesc],
        tag_mode: TagMode,
        fatal: &impl Fn(String) -> Error,
    ) -> Result<(), Error> {
        if tag_mode == TagMode::None {
            return Ok(());
        }

        if raw.geom_tag_line.is_none() {
            return Err(fatal(
                "No tag string for line type geometries given.".into(),
            ));
        }
        if raw.geom_tag_poly.is_none() {
            return Err(fatal(
                "No tag string for polygon type geometries given.".into(),
            ));
        }
        if raw.geom_tag_point.is_none() && (raw.tag_strict.unwrap_or(false) || tag_mode == TagMode::Max)
        {
            return Err(fatal(
                "No tag string for point type geometries given.".into(),
            ));
        }
        if raw.geom_tag_end.is_none() && tag_mode == TagMode::End {
            return Err(fatal(
                "No tag string for end-of-feature markers given. Set \"geom_tag_end\".".into(),
            ));
        }

        let tags: Vec<&str> = [
            raw.geom_tag_point.as_deref(),
            raw.geom_tag_line.as_deref(),
            raw.geom_tag_poly.as_deref(),
            raw.geom_tag_end.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                if a.eq_ignore_ascii_case(b) {
                    return Err(fatal("Geometry tags are not unique.".into()));
                }
            }
        }

        // geometry tags may not share characters w/ separators, comment
        // marks or quote chars of any field
        for tag in &tags {
            for f in fields {
                for sep in &f.separators {
                    if sep.chars().any(|c| tag.contains(c)) {
                        return Err(fatal(format!(
                            "Field \"{}\": separator matches geometry tag.",
                            f.name
                        )));
                    }
                }
                if f.quote.is_some_and(|q| tag.contains(q)) {
                    return Err(fatal(format!(
                        "Field \"{}\": quoting char matches geometry tag.",
                        f.name
                    )));
                }
            }
            for mark in &raw.comment_marks {
                if mark.chars().any(|c| tag.contains(c)) {
                    return Err(fatal("Comment mark matches geometry tag.".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> NumericFormat {
        NumericFormat::plain()
    }

    /// Minimal valid schema: id, x, y w/ comma separators, mode none.
    const POINTS: &str = "\
# simple point survey
[parser]
name = \"points\"
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

    fn load(text: &str) -> Result<Schema, Error> {
        Schema::from_text("test.schema", text, &fmt(), &Reporter::to_console())
    }

    #[test]
    fn test_valid_schema_loads() {
        let s = load(POINTS).unwrap();
        assert_eq!(s.num_fields(), 3);
        assert_eq!(s.tag_mode, TagMode::None);
        assert_eq!(s.x_idx(), 1);
        assert_eq!(s.y_idx(), 2);
        assert_eq!(s.z_idx(), None);
        assert_eq!(s.field_idx("ID"), Some(0));
        assert!(s.is_comment_line("  # remark"));
        assert!(!s.is_comment_line("1,2,3"));
    }

    #[test]
    fn test_field_names_lowercased() {
        let text = POINTS.replace("name = id", "name = ID");
        let s = load(&text).unwrap();
        assert_eq!(s.fields[0].name, "id");
        assert_eq!(s.field_idx("Id"), Some(0));
    }

    #[test]
    fn test_missing_x_field() {
        let text = POINTS.replace("coor_x = x\n", "");
        assert!(matches!(
            load(&text),
            Err(Error::SchemaSemantic { .. })
        ));
    }

    #[test]
    fn test_coordinate_field_must_be_double() {
        let text = POINTS.replace("name = x\ntype = double", "name = x\ntype = int");
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("not of type 'double'"));
    }

    #[test]
    fn test_last_field_must_not_have_separator() {
        let text = POINTS.replace("name = y\ntype = double", "name = y\ntype = double\nseparator = \",\"");
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("Last field"));
    }

    #[test]
    fn test_empty_allowed_and_merge_exclusive() {
        let text = POINTS.replace(
            "name = id\ntype = int\nseparator = \",\"",
            "name = id\ntype = int\nseparator = \",\"\nempty_allowed = yes\nmerge_separators = yes",
        );
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_empty_allowed_rejects_whitespace_separator() {
        let text = POINTS.replace(
            "name = id\ntype = int\nseparator = \",\"",
            "name = id\ntype = int\nseparator = space\nempty_allowed = yes",
        );
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("whitespace"));
    }

    #[test]
    fn test_pseudo_field_value_type_check() {
        let text = POINTS.replace(
            "name = id\ntype = int\nseparator = \",\"",
            "name = id\ntype = int\nvalue = abc\nseparator = \",\"",
        );
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("not a valid number"));
    }

    #[test]
    fn test_pseudo_field_rejects_extra_options() {
        let text = POINTS.replace(
            "name = id\ntype = int\nseparator = \",\"",
            "name = id\ntype = int\nvalue = 1\nunique = yes\nseparator = \",\"",
        );
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("too many options"));
    }

    const MIN_POLY: &str = "\
[parser]
name = \"minimal polygons\"
tag_mode = min
comment_mark = \"#\"
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
    fn test_min_mode_marks_coords_persistent() {
        let s = load(MIN_POLY).unwrap();
        assert_eq!(s.tag_mode, TagMode::Min);
        assert!(s.fields[s.x_idx()].persistent);
        assert!(s.fields[s.y_idx()].persistent);
        // key + x + y
        assert_eq!(s.reduced_field_count(), 3);
    }

    #[test]
    fn test_min_mode_needs_reduction() {
        // all fields persistent -> reduced == full -> defect
        let text = MIN_POLY.replace(
            "name = tag\ntype = text\nempty_allowed = yes",
            "name = tag\ntype = text\npersistent = yes\nempty_allowed = yes",
        );
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("reduced records"));
    }

    #[test]
    fn test_tag_recognition_precedence() {
        let s = load(MIN_POLY).unwrap();
        assert_eq!(s.recognize_tag("P"), Some(GeomTag::Polygon));
        assert_eq!(s.recognize_tag("L"), Some(GeomTag::Line));
        assert_eq!(s.recognize_tag("xxLxx"), Some(GeomTag::Line));
        // line beats polygon when both substrings are present
        assert_eq!(s.recognize_tag("LP"), Some(GeomTag::Line));
        assert_eq!(s.recognize_tag("v"), None);
    }

    #[test]
    fn test_mode_max_requires_key() {
        let text = MIN_POLY.replace("tag_mode = min", "tag_mode = max");
        let e = load(&text).unwrap_err();
        // max also needs a point tag, but the key check runs on the way
        let msg = e.to_string();
        assert!(
            msg.contains("key field") || msg.contains("point type"),
            "{msg}"
        );
    }

    #[test]
    fn test_mode_end_requires_end_tag() {
        let text = MIN_POLY
            .replace("tag_mode = min", "tag_mode = end")
            .replace(
                "name = key\ntype = text\npersistent = yes",
                "name = key\ntype = text",
            )
            + "";
        // add key_field to parser section
        let text = text.replace(
            "tag_field = tag",
            "tag_field = tag\nkey_field = key",
        );
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("geom_tag_end"), "{e}");
    }

    #[test]
    fn test_geom_tag_separator_collision() {
        let text = MIN_POLY.replace("geom_tag_poly = \"P\"", "geom_tag_poly = \",\"");
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("separator matches geometry tag"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_mode_none_superfluous_settings_warn() {
        let text = POINTS.replace("tag_mode = none", "tag_mode = none\nkey_field = id");
        let s = load(&text).unwrap();
        assert_eq!(s.tag_mode, TagMode::None);
        assert!(logs_contain("Setting for key field will be ignored"));
    }

    #[test]
    fn test_duplicate_field_name() {
        let text = POINTS.replace("name = y\n", "name = x\n");
        let e = load(&text).unwrap_err();
        assert!(e.to_string().contains("already defined"));
    }
}
