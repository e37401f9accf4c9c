//! Manifest reader
//!
//! Strict inverse of the writer. Physical lines are joined into logical
//! records (a line starting with one space continues the previous record),
//! blank lines close blocks, the first block is the main section and every
//! later block must open with a `Name:` record.
//!
//! Bytes are only decoded after continuation lines are joined, so a record
//! cut inside a multi-byte character by another writer still reads back.

use indexmap::map::Entry;

use crate::document::{Attributes, Document};
use crate::error::FormatError;
use crate::key::{validate_section_name, validate_value, Key};
use crate::options::FormatOptions;

/// A logical record and the physical line it started on.
struct Record {
    line: usize,
    bytes: Vec<u8>,
}

/// Parse manifest bytes into a document.
pub fn parse_document(input: &[u8], options: &FormatOptions) -> Result<Document, FormatError> {
    options.validate()?;

    let blocks = split_blocks(input)?;
    let mut blocks = blocks.into_iter();

    let mut doc = Document::new();
    if let Some(main) = blocks.next() {
        doc.main = parse_attributes(&main, options)?;
    }

    for block in blocks {
        let (header, rest) = match block.split_first() {
            Some(split) => split,
            None => continue,
        };
        let (key, name) = parse_record(header, options)?;
        if !key.is_section_header() {
            return Err(FormatError::malformed(
                header.line,
                format!("section must begin with a Name record, found {:?}", key.as_str()),
            ));
        }
        validate_section_name(&name).map_err(|e| FormatError::malformed(header.line, e.to_string()))?;

        let attrs = parse_attributes(rest, options)?;
        match doc.sections.entry(name) {
            Entry::Occupied(entry) => {
                return Err(FormatError::malformed(
                    header.line,
                    format!("duplicate section {:?}", entry.key()),
                ));
            }
            Entry::Vacant(entry) => {
                entry.insert(attrs);
            }
        }
    }

    Ok(doc)
}

/// Join continuation lines and group records into blank-line separated
/// blocks. The first block is always present (possibly empty) and is the
/// main section.
fn split_blocks(input: &[u8]) -> Result<Vec<Vec<Record>>, FormatError> {
    let mut blocks: Vec<Vec<Record>> = Vec::new();
    let mut current: Vec<Record> = Vec::new();
    let mut main_closed = false;

    for (index, raw) in input.split(|b| *b == b'\n').enumerate() {
        let line_no = index + 1;
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);

        if line.is_empty() {
            if !main_closed {
                blocks.push(std::mem::take(&mut current));
                main_closed = true;
            } else if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line[0] == b' ' {
            match current.last_mut() {
                Some(record) => record.bytes.extend_from_slice(&line[1..]),
                None => {
                    return Err(FormatError::malformed(
                        line_no,
                        "continuation line without a preceding record",
                    ));
                }
            }
            continue;
        }

        current.push(Record {
            line: line_no,
            bytes: line.to_vec(),
        });
    }

    if !main_closed || !current.is_empty() {
        blocks.push(current);
    }
    Ok(blocks)
}

fn parse_attributes(records: &[Record], options: &FormatOptions) -> Result<Attributes, FormatError> {
    let mut attrs = Attributes::new();
    for record in records {
        let (key, value) = parse_record(record, options)?;
        if key.is_section_header() {
            return Err(FormatError::malformed(
                record.line,
                "Name record is only allowed as the first record of a section",
            ));
        }
        match attrs.entry(key) {
            Entry::Occupied(entry) => {
                return Err(FormatError::malformed(
                    record.line,
                    format!("duplicate key {:?}", entry.key().as_str()),
                ));
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }
    Ok(attrs)
}

fn parse_record(record: &Record, options: &FormatOptions) -> Result<(Key, String), FormatError> {
    let text = std::str::from_utf8(&record.bytes)
        .map_err(|e| FormatError::malformed(record.line, format!("invalid UTF-8: {}", e)))?;

    let colon = text
        .find(':')
        .ok_or_else(|| FormatError::malformed(record.line, "record without a colon"))?;
    let (name, rest) = (&text[..colon], &text[colon + 1..]);

    let value = if rest.is_empty() {
        ""
    } else if let Some(value) = rest.strip_prefix(' ') {
        value
    } else {
        return Err(FormatError::malformed(
            record.line,
            "expected a space after the colon",
        ));
    };

    let key = Key::with_max_length(name, options.max_key_length)
        .map_err(|e| FormatError::malformed(record.line, e.to_string()))?;
    validate_value(value).map_err(|reason| FormatError::malformed(record.line, reason))?;

    Ok((key, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Document, FormatError> {
        parse_document(text.as_bytes(), &FormatOptions::default())
    }

    fn malformed_line(result: Result<Document, FormatError>) -> usize {
        match result {
            Err(FormatError::Malformed { line, .. }) => line,
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_main_and_sections() {
        let doc = parse("Manifest-Version: 1.0\r\nCreated-By: me\r\n\r\nName: foo\r\nX: 1\r\n\r\n").unwrap();

        assert_eq!(doc.main.len(), 2);
        assert_eq!(doc.main_value("Manifest-Version"), Some("1.0"));
        assert_eq!(doc.section_value("foo", "X"), Some("1"));
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn test_parse_without_trailing_newline() {
        let doc = parse("A: 1\n\nName: s\nB: 2").unwrap();
        assert_eq!(doc.section_value("s", "B"), Some("2"));
    }

    #[test]
    fn test_continuation_joined() {
        let doc = parse("Class-Path: a.jar b.j\n ar c.jar\n").unwrap();
        assert_eq!(doc.main_value("Class-Path"), Some("a.jar b.jar c.jar"));
    }

    #[test]
    fn test_continuation_keeps_extra_spaces() {
        let doc = parse("K: a\n  b\n").unwrap();
        assert_eq!(doc.main_value("K"), Some("a b"));
    }

    #[test]
    fn test_continuation_split_inside_character() {
        let mut bytes = b"K: ".to_vec();
        let euro = "€".as_bytes();
        bytes.extend_from_slice(&euro[..1]);
        bytes.extend_from_slice(b"\n ");
        bytes.extend_from_slice(&euro[1..]);
        bytes.push(b'\n');

        let doc = parse_document(&bytes, &FormatOptions::default()).unwrap();
        assert_eq!(doc.main_value("K"), Some("€"));
    }

    #[test]
    fn test_empty_value() {
        let doc = parse("Empty: \nAlso-Empty:\n").unwrap();
        assert_eq!(doc.main_value("Empty"), Some(""));
        assert_eq!(doc.main_value("Also-Empty"), Some(""));
    }

    #[test]
    fn test_empty_input() {
        let doc = parse("").unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_empty_main_block() {
        let doc = parse("\nName: s\nA: 1\n").unwrap();
        assert!(doc.main.is_empty());
        assert_eq!(doc.section_value("s", "A"), Some("1"));
    }

    #[test]
    fn test_multiple_blank_lines_between_sections() {
        let doc = parse("A: 1\n\n\n\nName: s\nB: 2\n\n\n").unwrap();
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn test_leading_continuation_rejected() {
        assert_eq!(malformed_line(parse(" orphan\nA: 1\n")), 1);
    }

    #[test]
    fn test_continuation_after_blank_rejected() {
        assert_eq!(malformed_line(parse("A: 1\n\n orphan\n")), 3);
    }

    #[test]
    fn test_missing_colon_rejected() {
        assert_eq!(malformed_line(parse("A: 1\nno colon here\n")), 2);
    }

    #[test]
    fn test_missing_space_rejected() {
        assert_eq!(malformed_line(parse("A:1\n")), 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        assert_eq!(malformed_line(parse("A: 1\nB: 2\nA: 3\n")), 3);
    }

    #[test]
    fn test_duplicate_reserved_key_any_case_rejected() {
        assert_eq!(
            malformed_line(parse("Manifest-Version: 1.0\nmanifest-version: 2.0\n")),
            2
        );
    }

    #[test]
    fn test_duplicate_key_in_section_rejected() {
        assert_eq!(malformed_line(parse("\nName: s\nA: 1\nA: 2\n")), 4);
    }

    #[test]
    fn test_same_key_in_different_sections_allowed() {
        let doc = parse("A: 0\n\nName: s\nA: 1\n\nName: t\nA: 2\n").unwrap();
        assert_eq!(doc.main_value("A"), Some("0"));
        assert_eq!(doc.section_value("s", "A"), Some("1"));
        assert_eq!(doc.section_value("t", "A"), Some("2"));
    }

    #[test]
    fn test_section_without_name_rejected() {
        assert_eq!(malformed_line(parse("A: 1\n\nB: 2\n")), 3);
    }

    #[test]
    fn test_name_in_main_rejected() {
        assert_eq!(malformed_line(parse("A: 1\nName: s\n")), 2);
    }

    #[test]
    fn test_duplicate_section_rejected() {
        assert_eq!(malformed_line(parse("\nName: s\nA: 1\n\nName: s\nB: 2\n")), 5);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let result = parse_document(b"A: \xff\xfe\n", &FormatOptions::default());
        assert_eq!(malformed_line(result), 1);
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert_eq!(malformed_line(parse("Bad Key: 1\n")), 1);
    }
}
