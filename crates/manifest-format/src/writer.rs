//! Manifest writer
//!
//! Every attribute becomes one logical `Key: value` record. A record longer
//! than `line_width` bytes is cut into physical lines; each continuation line
//! starts with exactly one space and carries at most `line_width - 1` bytes
//! of the record. Cuts ignore word boundaries but never split a UTF-8
//! character.
//!
//! The main block comes first. Every block, main and sections alike, is
//! terminated by one blank line, and every section opens with `Name: <name>`.

use crate::document::{Attributes, Document};
use crate::error::FormatError;
use crate::key::{validate_section_name, validate_value};
use crate::options::FormatOptions;
use crate::SECTION_NAME_KEY;

/// Serialize a document to manifest bytes.
pub fn write_document(doc: &Document, options: &FormatOptions) -> Result<Vec<u8>, FormatError> {
    options.validate()?;

    let mut out = Vec::new();
    write_block(&mut out, &doc.main, options)?;
    out.extend_from_slice(options.line_ending.as_bytes());

    for (name, attrs) in &doc.sections {
        validate_section_name(name)?;
        write_record(&mut out, SECTION_NAME_KEY, name, options);
        write_block(&mut out, attrs, options)?;
        out.extend_from_slice(options.line_ending.as_bytes());
    }

    Ok(out)
}

fn write_block(out: &mut Vec<u8>, attrs: &Attributes, options: &FormatOptions) -> Result<(), FormatError> {
    for (key, value) in attrs {
        if key.is_section_header() {
            return Err(FormatError::InvalidKey {
                key: key.to_string(),
                reason: "Name is reserved for section headers".to_string(),
            });
        }
        validate_value(value).map_err(|reason| FormatError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        })?;
        write_record(out, key.as_str(), value, options);
    }
    Ok(())
}

/// Append one `key: value` record, wrapped to the line budget.
///
/// The caller is responsible for `key` and `value` being valid.
pub fn write_record(out: &mut Vec<u8>, key: &str, value: &str, options: &FormatOptions) {
    let record = format!("{}: {}", key, value);
    let eol = options.line_ending.as_bytes();

    let mut rest = record.as_str();
    let mut budget = options.line_width;
    loop {
        if rest.len() <= budget {
            out.extend_from_slice(rest.as_bytes());
            out.extend_from_slice(eol);
            return;
        }

        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.extend_from_slice(&rest.as_bytes()[..cut]);
        out.extend_from_slice(eol);
        out.push(b' ');

        rest = &rest[cut..];
        budget = options.line_width - 1;
    }
}
