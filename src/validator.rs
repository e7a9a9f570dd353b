// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Record validation: shape, emptiness, coordinate extraction, type
//! coercion, tag recognition and key linking.
//!
//! Runs on a just-appended record and either promotes it (typed
//! coordinates and tag populated) or returns the defect for the caller to
//! report as a warning. A defect never aborts the run; the record is
//! skipped.
//!

use crate::{
    DataStore, Error, NumericFormat, Schema,
    error::Axis,
    numeric::{self, NumDefect},
    schema::{FieldType, TagMode},
};

/// Validate the record in `slot` of `ds`, storing typed coordinates and
/// the recognized geometry tag on success.
pub fn validate_record(
    ds: &mut DataStore,
    slot: usize,
    schema: &Schema,
    fmt: &NumericFormat,
) -> Result<(), Error> {
    let input = ds.display_name().to_owned();
    let (offset_x, offset_y, offset_z) = (ds.offset_x(), ds.offset_y(), ds.offset_z());
    let num_fields = ds.num_fields();
    let rec = &mut ds.records_mut()[slot];
    let line = rec.line;

    // 1: number of fields read
    let reduced_count = schema.reduced_field_count();
    if schema.tag_mode != TagMode::Min {
        if rec.fields_read < num_fields {
            return Err(Error::RecordShape {
                input,
                line,
                reason: format!(
                    "found only {} out of {} expected fields",
                    rec.fields_read, num_fields
                ),
            });
        }
    } else if rec.fields_read < num_fields && rec.fields_read != reduced_count {
        return Err(Error::RecordShape {
            input,
            line,
            reason: format!(
                "found {} instead of either {} or {} fields",
                rec.fields_read, num_fields, reduced_count
            ),
        });
    }

    // 2: reduced records must have tokens exactly at the persistent and
    // coordinate positions
    if schema.tag_mode == TagMode::Min && rec.fields_read == reduced_count {
        for (i, field) in schema.fields.iter().enumerate() {
            let excluded =
                field.is_pseudo() || (!field.persistent && !schema.is_coordinate_field(i));
            let has_content = rec.contents[i].is_some();
            if excluded == has_content {
                return Err(Error::RecordShape {
                    input,
                    line,
                    reason: "this is neither a valid reduced nor full record".into(),
                });
            }
        }
    }

    // 3: fields that must not be empty
    for (i, field) in schema.fields.iter().enumerate() {
        if !rec.skip[i] && !field.empty_allowed && rec.contents[i].is_none() {
            return Err(Error::RecordEmpty {
                input,
                line,
                field: field.name.clone(),
            });
        }
    }

    // 4: coordinate extraction, offsets applied
    let axes = [
        (Axis::X, Some(schema.x_idx()), offset_x),
        (Axis::Y, Some(schema.y_idx()), offset_y),
        (Axis::Z, schema.z_idx(), offset_z),
    ];
    let mut coords = [0.0f64; 3];
    for (slot_idx, (axis, idx, offset)) in axes.into_iter().enumerate() {
        let Some(idx) = idx else {
            // no Z field: constant zero plus offset
            coords[slot_idx] = offset;
            continue;
        };
        let content = rec.contents[idx].as_deref().unwrap_or_default();
        match numeric::parse_double(content, fmt) {
            Ok(v) => coords[slot_idx] = v + offset,
            Err(NumDefect::Malformed) => {
                return Err(Error::CoordBad {
                    input,
                    line,
                    axis,
                    content: content.to_owned(),
                });
            }
            Err(NumDefect::Overflow) => {
                return Err(Error::CoordOverflow {
                    input,
                    line,
                    axis,
                    content: content.to_owned(),
                });
            }
        }
    }

    // 5: type coercion for every non-skipped field
    for (i, field) in schema.fields.iter().enumerate() {
        if rec.skip[i] {
            continue;
        }
        let Some(content) = rec.contents[i].as_deref() else {
            continue;
        };
        let defect = match field.ftype {
            FieldType::Double => numeric::parse_double(content, fmt).err(),
            FieldType::Int => numeric::parse_int(content).err(),
            FieldType::Text => None,
        };
        match defect {
            None => {}
            Some(NumDefect::Malformed) => {
                return Err(Error::FieldType {
                    input,
                    line,
                    field: field.name.clone(),
                    content: content.to_owned(),
                });
            }
            Some(NumDefect::Overflow) => {
                return Err(Error::FieldOverflow {
                    input,
                    line,
                    field: field.name.clone(),
                });
            }
        }
    }

    // 6: geometry tag, substring search w/ fixed precedence
    let tag = schema.tag_idx().and_then(|idx| {
        if rec.skip[idx] {
            return None;
        }
        rec.contents[idx]
            .as_deref()
            .and_then(|c| schema.recognize_tag(c))
    });

    // all checks passed: store the typed values
    rec.x = coords[0];
    rec.y = coords[1];
    rec.z = coords[2];
    rec.tag = tag;
    // 7: the key value is borrowed on demand via Record::key()

    Ok(())
}
