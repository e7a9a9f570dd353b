// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Schema file reader: INI-style sections, `option = value` lines and the
//! flat option dispatch keyed by `(section, name)`.
//!

use crate::{
    Error, MAX_COMMENT_MARKS, MAX_FIELDS, MAX_LINE_LEN, MAX_LOOKUP_PAIRS, MAX_SEPARATORS,
    MAX_STR_LEN, Reporter,
    numeric::parse_int,
    schema::{
        TagMode,
        field::{CaseConversion, FieldType, is_valid_field_name},
    },
};

/// Leading character marking a lookup pair in a `[field]` section.
const LOOKUP_TAG: char = '@';

/// Truth vocabulary for boolean option values (case-insensitive).
pub fn parse_enabled(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "on" | "1" | "enable" | "true" => Some(true),
        "n" | "no" | "off" | "0" | "disable" | "false" => Some(false),
        _ => None,
    }
}

/// Strip one outer pair of double quotes, if present, after trimming.
pub(crate) fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[derive(Debug, Default)]
pub(crate) struct RawField {
    pub name: Option<String>,
    pub info: Option<String>,
    pub ftype: Option<FieldType>,
    pub empty_allowed: Option<bool>,
    pub unique: Option<bool>,
    pub persistent: Option<bool>,
    pub skip: Option<bool>,
    pub case_conversion: Option<CaseConversion>,
    pub value: Option<String>,
    pub separators: Vec<String>,
    pub merge_separators: Option<bool>,
    pub quote: Option<char>,
    pub lookup: Vec<(String, String)>,
    pub definition_line: u32,
}

#[derive(Debug, Default)]
pub(crate) struct RawSchema {
    pub name: Option<String>,
    pub info: Option<String>,
    pub tag_mode: Option<TagMode>,
    pub comment_marks: Vec<String>,
    pub coor_x: Option<String>,
    pub coor_y: Option<String>,
    pub coor_z: Option<String>,
    pub tag_field: Option<String>,
    pub key_field: Option<String>,
    pub key_unique: Option<bool>,
    pub tag_strict: Option<bool>,
    pub no_data: Option<i32>,
    pub geom_tag_point: Option<String>,
    pub geom_tag_line: Option<String>,
    pub geom_tag_poly: Option<String>,
    pub geom_tag_end: Option<String>,
    pub fields: Vec<RawField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Parser,
    Field,
}

fn syntax(file: &str, line: u32, reason: impl Into<String>) -> Error {
    Error::SchemaSyntax {
        file: file.into(),
        line,
        reason: reason.into(),
    }
}

// duplicate "option = value" for a single-shot key
fn dup(file: &str, line: u32, name: &str) -> Error {
    syntax(
        file,
        line,
        format!("\"{name}\" has already been set in this context"),
    )
}

/// Parse the schema file text into its raw form. Purely syntactic; the
/// semantic invariants run afterwards in [`Schema::validate`].
///
/// [`Schema::validate`]: crate::Schema
pub(crate) fn load_raw(file: &str, text: &str, reporter: &Reporter) -> Result<RawSchema, Error> {
    let mut raw = RawSchema::default();
    let mut section = Section::None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        if line.chars().count() > MAX_LINE_LEN {
            return Err(syntax(
                file,
                line_no,
                format!("line exceeds the maximum length of {MAX_LINE_LEN} characters"),
            ));
        }

        let packed = line.trim();
        if packed.is_empty() || packed.starts_with('#') {
            continue;
        }
        if !packed.is_empty() && packed.len() < 3 {
            reporter.warning(format!(
                "Garbage encountered in parser schema ({file}).\nSkipping line #{line_no}"
            ));
            continue;
        }

        if let Some(rest) = packed.strip_prefix('[') {
            let Some(name) = rest.rfind(']').map(|i| rest[..i].trim()) else {
                return Err(syntax(file, line_no, "missing ']'"));
            };
            if name.eq_ignore_ascii_case("parser") {
                section = Section::Parser;
            } else if name.eq_ignore_ascii_case("field") {
                if raw.fields.len() >= MAX_FIELDS {
                    return Err(syntax(
                        file,
                        line_no,
                        format!("exceeds limit of {MAX_FIELDS} field definitions"),
                    ));
                }
                raw.fields.push(RawField {
                    definition_line: line_no,
                    ..Default::default()
                });
                section = Section::Field;
            } else {
                return Err(syntax(
                    file,
                    line_no,
                    format!("\"{name}\" is not a valid section identifier"),
                ));
            }
            continue;
        }

        // must be an "option = value" line
        let Some((lhs, rhs)) = packed.split_once('=') else {
            return Err(syntax(
                file,
                line_no,
                "missing '=' (expected 'option=value' line)",
            ));
        };
        if section == Section::None {
            return Err(syntax(file, line_no, "option/value out of context"));
        }

        let name = strip_quotes(lhs);
        let value = strip_quotes(rhs);
        if name.is_empty() || value.is_empty() {
            return Err(syntax(file, line_no, "empty option name or value"));
        }
        if value.chars().count() > MAX_STR_LEN {
            return Err(syntax(
                file,
                line_no,
                format!("option values cannot be longer than {MAX_STR_LEN} characters"),
            ));
        }

        match section {
            Section::Parser => parser_option(&mut raw, file, line_no, name, value)?,
            Section::Field => {
                let field = raw
                    .fields
                    .last_mut()
                    .expect("field section opener pushes a field");
                field_option(field, file, line_no, name, value)?
            }
            Section::None => unreachable!(),
        }
    }

    Ok(raw)
}

fn parser_option(
    raw: &mut RawSchema,
    file: &str,
    line: u32,
    name: &str,
    value: &str,
) -> Result<(), Error> {
    // single-shot string options share one treatment
    fn set_str(
        slot: &mut Option<String>,
        file: &str,
        line: u32,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        if slot.is_some() {
            return Err(dup(file, line, name));
        }
        *slot = Some(value.to_owned());
        Ok(())
    }
    fn set_bool(
        slot: &mut Option<bool>,
        file: &str,
        line: u32,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        if slot.is_some() {
            return Err(dup(file, line, name));
        }
        *slot = Some(parse_enabled(value).ok_or_else(|| {
            syntax(
                file,
                line,
                format!("\"{value}\" is not a valid boolean value for \"{name}\""),
            )
        })?);
        Ok(())
    }
    fn field_name(file: &str, line: u32, value: &str) -> Result<String, Error> {
        if !is_valid_field_name(value) {
            return Err(syntax(
                file,
                line,
                format!("\"{value}\" is not a valid field name"),
            ));
        }
        Ok(value.to_lowercase())
    }

    match name.to_ascii_lowercase().as_str() {
        "name" => set_str(&mut raw.name, file, line, name, value),
        "info" | "description" => set_str(&mut raw.info, file, line, name, value),
        "tag_mode" | "tagging_mode" => {
            if raw.tag_mode.is_some() {
                return Err(dup(file, line, name));
            }
            raw.tag_mode = Some(TagMode::from_name(value).ok_or_else(|| {
                syntax(
                    file,
                    line,
                    format!("\"{value}\" is not a valid geometry tagging mode"),
                )
            })?);
            Ok(())
        }
        "comment_mark" => {
            if raw.comment_marks.len() >= MAX_COMMENT_MARKS {
                return Err(syntax(
                    file,
                    line,
                    format!("limit of {MAX_COMMENT_MARKS} distinct comment marks exceeded"),
                ));
            }
            raw.comment_marks.push(value.to_owned());
            Ok(())
        }
        "coor_x" => {
            if raw.coor_x.is_some() {
                return Err(dup(file, line, name));
            }
            raw.coor_x = Some(field_name(file, line, value)?);
            Ok(())
        }
        "coor_y" => {
            if raw.coor_y.is_some() {
                return Err(dup(file, line, name));
            }
            raw.coor_y = Some(field_name(file, line, value)?);
            Ok(())
        }
        "coor_z" => {
            if raw.coor_z.is_some() {
                return Err(dup(file, line, name));
            }
            raw.coor_z = Some(field_name(file, line, value)?);
            Ok(())
        }
        "tag_field" => {
            if raw.tag_field.is_some() {
                return Err(dup(file, line, name));
            }
            raw.tag_field = Some(value.to_lowercase());
            Ok(())
        }
        "key_field" => {
            if raw.key_field.is_some() {
                return Err(dup(file, line, name));
            }
            raw.key_field = Some(value.to_lowercase());
            Ok(())
        }
        "tag_strict" => set_bool(&mut raw.tag_strict, file, line, name, value),
        "key_unique" => set_bool(&mut raw.key_unique, file, line, name, value),
        "no_data" => {
            if raw.no_data.is_some() {
                return Err(dup(file, line, name));
            }
            raw.no_data = Some(parse_int(value).map_err(|_| {
                syntax(
                    file,
                    line,
                    format!("value for \"{name}\" is not a valid integer number"),
                )
            })?);
            Ok(())
        }
        "geom_tag_point" => set_str(&mut raw.geom_tag_point, file, line, name, value),
        "geom_tag_line" => set_str(&mut raw.geom_tag_line, file, line, name, value),
        "geom_tag_poly" => set_str(&mut raw.geom_tag_poly, file, line, name, value),
        "geom_tag_end" => set_str(&mut raw.geom_tag_end, file, line, name, value),
        _ => Err(syntax(
            file,
            line,
            format!("\"{name}\" is not a valid option in this context"),
        )),
    }
}

fn field_option(
    field: &mut RawField,
    file: &str,
    line: u32,
    name: &str,
    value: &str,
) -> Result<(), Error> {
    fn set_bool(
        slot: &mut Option<bool>,
        file: &str,
        line: u32,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        if slot.is_some() {
            return Err(dup(file, line, name));
        }
        *slot = Some(parse_enabled(value).ok_or_else(|| {
            syntax(
                file,
                line,
                format!("\"{value}\" is not a valid boolean value for \"{name}\""),
            )
        })?);
        Ok(())
    }

    // lookup pairs keep the original key spelling (minus the tag char)
    if let Some(old) = name.strip_prefix(LOOKUP_TAG) {
        if field.lookup.len() >= MAX_LOOKUP_PAIRS {
            return Err(syntax(
                file,
                line,
                format!("maximum number of lookup pairs ({MAX_LOOKUP_PAIRS}) exceeded"),
            ));
        }
        if old.chars().count() > MAX_STR_LEN {
            return Err(syntax(
                file,
                line,
                format!("string to be replaced exceeds {MAX_STR_LEN} characters"),
            ));
        }
        field.lookup.push((old.to_owned(), value.to_owned()));
        return Ok(());
    }

    match name.to_ascii_lowercase().as_str() {
        "name" => {
            if field.name.is_some() {
                return Err(dup(file, line, name));
            }
            if !is_valid_field_name(value) {
                return Err(syntax(
                    file,
                    line,
                    format!("\"{value}\" is not a valid field name"),
                ));
            }
            field.name = Some(value.to_lowercase());
            Ok(())
        }
        "info" => {
            if field.info.is_some() {
                return Err(dup(file, line, name));
            }
            field.info = Some(value.to_owned());
            Ok(())
        }
        "type" => {
            if field.ftype.is_some() {
                return Err(dup(file, line, name));
            }
            field.ftype = Some(FieldType::from_name(value).ok_or_else(|| {
                syntax(
                    file,
                    line,
                    format!("\"{value}\" is not a valid field type"),
                )
            })?);
            Ok(())
        }
        "value" => {
            if field.value.is_some() {
                return Err(dup(file, line, name));
            }
            field.value = Some(value.to_owned());
            Ok(())
        }
        "empty_allowed" => set_bool(&mut field.empty_allowed, file, line, name, value),
        "unique" => set_bool(&mut field.unique, file, line, name, value),
        "persistent" => set_bool(&mut field.persistent, file, line, name, value),
        "skip" => set_bool(&mut field.skip, file, line, name, value),
        "change_case" => {
            if field.case_conversion.is_some() {
                return Err(dup(file, line, name));
            }
            field.case_conversion = Some(CaseConversion::from_name(value).ok_or_else(|| {
                syntax(
                    file,
                    line,
                    format!("\"{value}\" is not a valid case conversion mode"),
                )
            })?);
            Ok(())
        }
        "separator" => {
            if value == "\n" {
                return Err(syntax(
                    file,
                    line,
                    "line break is not a valid field separator",
                ));
            }
            if field.separators.len() >= MAX_SEPARATORS {
                return Err(syntax(
                    file,
                    line,
                    format!("limit of {MAX_SEPARATORS} distinct field separators exceeded"),
                ));
            }
            // "space" and "tab" stand for the literal characters
            let sep = if value.eq_ignore_ascii_case("space") {
                " ".to_owned()
            } else if value.eq_ignore_ascii_case("tab") {
                "\t".to_owned()
            } else {
                value.to_owned()
            };
            field.separators.push(sep);
            Ok(())
        }
        "merge_separators" => set_bool(&mut field.merge_separators, file, line, name, value),
        "quotation" => {
            if field.quote.is_some() {
                return Err(dup(file, line, name));
            }
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    field.quote = Some(c);
                    Ok(())
                }
                _ => Err(syntax(
                    file,
                    line,
                    "quotation mark must be a single character",
                )),
            }
        }
        _ => Err(syntax(
            file,
            line,
            format!("\"{name}\" is not a valid option in this context"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_vocabulary() {
        for t in ["y", "Yes", "ON", "1", "enable", "TRUE"] {
            assert_eq!(parse_enabled(t), Some(true), "{t}");
        }
        for f in ["n", "No", "OFF", "0", "disable", "FALSE"] {
            assert_eq!(parse_enabled(f), Some(false), "{f}");
        }
        assert_eq!(parse_enabled("maybe"), None);
        assert_eq!(parse_enabled(""), None);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"a b\""), "a b");
        assert_eq!(strip_quotes("  \"a\"  "), "a");
        assert_eq!(strip_quotes("plain"), "plain");
        assert_eq!(strip_quotes("\"unbalanced"), "\"unbalanced");
        assert_eq!(strip_quotes("\"\""), "");
    }

    #[test]
    fn test_duplicate_option_is_fatal() {
        let text = "[parser]\nname = a\nname = b\n";
        let r = load_raw("t.schema", text, &Reporter::to_console());
        assert!(matches!(r, Err(Error::SchemaSyntax { line: 3, .. })));
    }

    #[test]
    fn test_unknown_option_is_fatal() {
        let text = "[parser]\nbogus = 1\n";
        let r = load_raw("t.schema", text, &Reporter::to_console());
        assert!(matches!(r, Err(Error::SchemaSyntax { line: 2, .. })));
    }

    #[test]
    fn test_option_out_of_context() {
        let text = "name = a\n";
        let r = load_raw("t.schema", text, &Reporter::to_console());
        assert!(matches!(r, Err(Error::SchemaSyntax { line: 1, .. })));
    }

    #[test]
    fn test_separator_aliases_and_lookup() {
        let text = concat!(
            "[parser]\nname = t\n",
            "[field]\nname = code\ntype = text\nseparator = space\nseparator = \"\t\"\n",
            "@old = new\n@Pit = Grube\n",
        );
        let raw = load_raw("t.schema", text, &Reporter::to_console()).unwrap();
        let f = &raw.fields[0];
        assert_eq!(f.separators, vec![" ".to_owned(), "\t".to_owned()]);
        assert_eq!(
            f.lookup,
            vec![
                ("old".to_owned(), "new".to_owned()),
                ("Pit".to_owned(), "Grube".to_owned())
            ]
        );
    }
}
