// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Selection engine: an ordered chain of tagged filters applied to the
//! geometry store.
//!
//! One command has the shape
//! `[!]type[+|-]:geom:[field:expr]`
//! w/ `:` as the token separator. The modifier decides how a command
//! combines w/ the current selection (replace, `+` add, `-` subtract), a
//! leading `!` inverts the raw match, and the spelling of the type token
//! picks case handling: an all-uppercase token compares case-sensitively,
//! anything else ignores case.
//!

use crate::{
    Error, GeomStore, NumericFormat, Reporter, Schema,
    numeric::parse_double,
    schema::FieldType,
};
use unicase::UniCase;

/// Filter type of one selection command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionType {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Lte,
    /// Greater than or equal.
    Gte,
    /// Substring containment (text fields).
    Sub,
    /// Regular expression match (text fields).
    Regexp,
    /// Closed numeric interval `min;max` (numeric fields).
    Range,
    /// Matches every feature; field and expression are ignored.
    All,
}

impl SelectionType {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "eq" => Some(SelectionType::Eq),
            "neq" => Some(SelectionType::Neq),
            "lt" => Some(SelectionType::Lt),
            "gt" => Some(SelectionType::Gt),
            "lte" => Some(SelectionType::Lte),
            "gte" => Some(SelectionType::Gte),
            "sub" => Some(SelectionType::Sub),
            "regexp" => Some(SelectionType::Regexp),
            "range" => Some(SelectionType::Range),
            "all" => Some(SelectionType::All),
            _ => None,
        }
    }
}

/// Geometry classes a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionGeom {
    /// Point features.
    Point,
    /// Raw vertices.
    Raw,
    /// Line features.
    Line,
    /// Polygon features.
    Polygon,
    /// Every geometry class.
    All,
}

impl SelectionGeom {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "pt" => Some(SelectionGeom::Point),
            "raw" => Some(SelectionGeom::Raw),
            "ln" => Some(SelectionGeom::Line),
            "py" => Some(SelectionGeom::Polygon),
            "all" => Some(SelectionGeom::All),
            _ => None,
        }
    }
}

/// How a command combines w/ the selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Replace the selection (non-targeted features are deselected).
    Replace,
    /// Add matches to the selection.
    Add,
    /// Subtract matches from the selection.
    Subtract,
}

// raw parse result, before schema validation
#[derive(Debug)]
struct ParsedCmd {
    invert: bool,
    stype: SelectionType,
    case_sensitive: bool,
    mode: SelectionMode,
    geom: SelectionGeom,
    field: Option<String>,
    expr: Option<String>,
}

peg::parser! {
    grammar selection_cmd() for str {
        pub rule command() -> ParsedCmd
        = inv:"!"? t:sel_type() m:['+' | '-']? ":" g:geom() fe:field_expr()? ![_] {
            let (stype, case_sensitive) = t;
            let mode = match m {
                Some('+') => SelectionMode::Add,
                Some('-') => SelectionMode::Subtract,
                _ => SelectionMode::Replace,
            };
            let (field, expr) = match fe {
                Some((f, e)) => (Some(f), Some(e)),
                None => (None, None),
            };
            ParsedCmd {
                invert: inv.is_some(),
                stype,
                case_sensitive,
                mode,
                geom: g,
                field,
                expr,
            }
        }

        rule sel_type() -> (SelectionType, bool)
        = t:$(['a'..='z' | 'A'..='Z']+) {?
            let stype = SelectionType::from_token(t).ok_or("selection type")?;
            // an all-uppercase spelling selects case-sensitive matching
            Ok((stype, t.chars().all(|c| c.is_ascii_uppercase())))
        }

        rule geom() -> SelectionGeom
        = g:$(['a'..='z' | 'A'..='Z']+) {?
            SelectionGeom::from_token(g).ok_or("geometry type")
        }

        rule field_expr() -> (String, String)
        = ":" f:$([^':']+) ":" e:$([_]+) { (f.into(), e.into()) }
    }
}

/// One validated selection command, ready to apply.
#[derive(Debug)]
pub struct Selection {
    raw: String,
    stype: SelectionType,
    case_sensitive: bool,
    mode: SelectionMode,
    invert: bool,
    geom: SelectionGeom,
    field_idx: usize,
    field_type: FieldType,
    expr: String,
    regex: Option<regress::Regex>,
    range: Option<(f64, f64)>,
}

impl Selection {
    /// Parse one command string and validate it against the schema.
    pub fn compile(command: &str, schema: &Schema) -> Result<Self, Error> {
        let parsed = selection_cmd::command(command).map_err(|e| Error::SelectionSyntax {
            command: command.to_owned(),
            reason: e.to_string(),
        })?;

        let semantic = |reason: String| Error::SelectionSemantic {
            command: command.to_owned(),
            reason,
        };

        // "all" ignores field and expression; everything else needs both
        let (field_idx, field_type, expr) = if parsed.stype == SelectionType::All {
            (0, schema.fields[0].ftype, String::new())
        } else {
            let Some(field) = parsed.field.as_deref() else {
                return Err(semantic("empty field name in selection".into()));
            };
            let Some(expr) = parsed.expr.clone() else {
                return Err(semantic("empty selection expression".into()));
            };
            let Some(idx) = schema.field_idx(field) else {
                return Err(semantic(format!("unknown field name '{field}'")));
            };
            let ftype = schema.fields[idx].ftype;
            if matches!(parsed.stype, SelectionType::Sub | SelectionType::Regexp)
                && ftype != FieldType::Text
            {
                return Err(semantic(format!(
                    "'{field}' is not a text field"
                )));
            }
            if parsed.stype == SelectionType::Range && !ftype.is_numeric() {
                return Err(semantic(format!(
                    "'{field}' is not a numeric field"
                )));
            }
            (idx, ftype, expr)
        };

        let regex = if parsed.stype == SelectionType::Regexp {
            let flags = if parsed.case_sensitive { "" } else { "i" };
            Some(
                regress::Regex::with_flags(&expr, flags).map_err(|e| {
                    semantic(format!("invalid regular expression: {e}"))
                })?,
            )
        } else {
            None
        };

        let range = if parsed.stype == SelectionType::Range {
            let Some((min, max)) = expr.split_once(';') else {
                return Err(semantic("range expects 'min;max'".into()));
            };
            let fmt = NumericFormat::plain();
            let min = parse_double(min.trim(), &fmt)
                .map_err(|_| semantic(format!("malformed range minimum '{min}'")))?;
            let max = parse_double(max.trim(), &fmt)
                .map_err(|_| semantic(format!("malformed range maximum '{max}'")))?;
            if max < min {
                return Err(semantic("range minimum exceeds maximum".into()));
            }
            Some((min, max))
        } else {
            None
        };

        Ok(Selection {
            raw: command.to_owned(),
            stype: parsed.stype,
            case_sensitive: parsed.case_sensitive,
            mode: parsed.mode,
            invert: parsed.invert,
            geom: parsed.geom,
            field_idx,
            field_type,
            expr,
            regex,
            range,
        })
    }

    /// The command string as given.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    // raw attribute match, before invert and geometry targeting
    fn matches(&self, content: Option<&str>) -> Result<bool, Error> {
        if self.stype == SelectionType::All {
            return Ok(true);
        }
        let Some(content) = content else {
            return Ok(false);
        };

        let semantic = |reason: String| Error::SelectionSemantic {
            command: self.raw.clone(),
            reason,
        };
        let num = |s: &str| {
            parse_double(s, &NumericFormat::plain())
                .map_err(|_| semantic(format!("malformed numeric value '{s}'")))
        };

        let result = match self.stype {
            SelectionType::Eq
            | SelectionType::Neq
            | SelectionType::Lt
            | SelectionType::Gt
            | SelectionType::Lte
            | SelectionType::Gte => {
                let ordering = if self.field_type == FieldType::Text {
                    if self.case_sensitive {
                        content.cmp(self.expr.as_str())
                    } else {
                        UniCase::new(content).cmp(&UniCase::new(self.expr.as_str()))
                    }
                } else {
                    num(content)?
                        .partial_cmp(&num(&self.expr)?)
                        .unwrap_or(std::cmp::Ordering::Equal)
                };
                match self.stype {
                    SelectionType::Eq => ordering.is_eq(),
                    SelectionType::Neq => ordering.is_ne(),
                    SelectionType::Lt => ordering.is_lt(),
                    SelectionType::Gt => ordering.is_gt(),
                    SelectionType::Lte => ordering.is_le(),
                    SelectionType::Gte => ordering.is_ge(),
                    _ => unreachable!(),
                }
            }
            SelectionType::Sub => {
                if self.case_sensitive {
                    content.contains(self.expr.as_str())
                } else {
                    UniCase::unicode(content)
                        .to_folded_case()
                        .contains(&UniCase::unicode(self.expr.as_str()).to_folded_case())
                }
            }
            SelectionType::Regexp => self
                .regex
                .as_ref()
                .expect("regexp selections carry a compiled pattern")
                .find(content)
                .is_some(),
            SelectionType::Range => {
                let (min, max) = self.range.expect("range selections carry bounds");
                let v = num(content)?;
                v >= min && v <= max
            }
            SelectionType::All => unreachable!(),
        };
        Ok(result)
    }

    // update one feature's selection flag; returns whether it counted as
    // a match for this command
    fn update(&self, is_selected: &mut bool, content: Option<&str>, targeted: bool) -> Result<bool, Error> {
        let m = self.matches(content)? != self.invert;
        let effective = m && targeted;
        match self.mode {
            SelectionMode::Replace => {
                *is_selected = if targeted { m } else { false };
            }
            SelectionMode::Add => {
                if effective {
                    *is_selected = true;
                }
            }
            SelectionMode::Subtract => {
                if effective {
                    *is_selected = false;
                }
            }
        }
        Ok(effective)
    }
}

/// The ordered, validated selection chain of one run.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    selections: Vec<Selection>,
}

impl SelectionEngine {
    /// Validate every command against the schema, in order. Any defect is
    /// fatal before a single feature is touched.
    pub fn compile(commands: &[String], schema: &Schema) -> Result<Self, Error> {
        if commands.len() > crate::MAX_SELECTIONS {
            return Err(Error::SelectionSemantic {
                command: String::new(),
                reason: format!(
                    "more than {} selection commands given",
                    crate::MAX_SELECTIONS
                ),
            });
        }
        let selections = commands
            .iter()
            .map(|c| Selection::compile(c, schema))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SelectionEngine { selections })
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Apply all commands in order, reporting per-command match counts.
    pub fn apply(
        &self,
        gs: &mut GeomStore,
        _schema: &Schema,
        reporter: &Reporter,
    ) -> Result<(), Error> {
        for sel in &self.selections {
            reporter.note(format!("Applying selection: '{}'", sel.raw()));

            let mut matched = 0u32;
            let targeted =
                matches!(sel.geom, SelectionGeom::Point | SelectionGeom::All);
            for p in gs.points_mut() {
                let content = p.atts[sel.field_idx].as_deref();
                if sel.update(&mut p.is_selected, content, targeted)? {
                    matched += 1;
                }
            }
            reporter.note(format!("\tMatched {matched} point(s)."));

            let mut matched = 0u32;
            let targeted = matches!(sel.geom, SelectionGeom::Raw | SelectionGeom::All);
            for p in gs.points_raw_mut() {
                let content = p.atts[sel.field_idx].as_deref();
                if sel.update(&mut p.is_selected, content, targeted)? {
                    matched += 1;
                }
            }
            reporter.note(format!("\tMatched {matched} raw vertex(es)."));

            let mut matched = 0u32;
            let targeted = matches!(sel.geom, SelectionGeom::Line | SelectionGeom::All);
            for l in gs.lines_mut() {
                let content = l.atts[sel.field_idx].as_deref();
                if sel.update(&mut l.is_selected, content, targeted)? {
                    matched += 1;
                }
            }
            reporter.note(format!("\tMatched {matched} line(s)."));

            let mut matched = 0u32;
            let targeted =
                matches!(sel.geom, SelectionGeom::Polygon | SelectionGeom::All);
            for p in gs.polygons_mut() {
                let content = p.atts[sel.field_idx].as_deref();
                if sel.update(&mut p.is_selected, content, targeted)? {
                    matched += 1;
                }
            }
            reporter.note(format!("\tMatched {matched} polygon(s)."));
        }
        Ok(())
    }

    /// Total number of selected features of the requested class.
    pub fn num_selected(gs: &GeomStore, geom: SelectionGeom) -> usize {
        let mut count = 0;
        if matches!(geom, SelectionGeom::Point | SelectionGeom::All) {
            count += gs.points().iter().filter(|p| p.is_selected).count();
        }
        if matches!(geom, SelectionGeom::Raw | SelectionGeom::All) {
            count += gs.points_raw().iter().filter(|p| p.is_selected).count();
        }
        if matches!(geom, SelectionGeom::Line | SelectionGeom::All) {
            count += gs.lines().iter().filter(|l| l.is_selected).count();
        }
        if matches!(geom, SelectionGeom::Polygon | SelectionGeom::All) {
            count += gs.polygons().iter().filter(|p| p.is_selected).count();
        }
        count
    }
}
