//! Delimited text (`.csv` / `.txt`) loading.
//!
//! The parser is a single pass over the lines of the file. The first line is the header; its
//! content alone decides the delimiter. Every other line is split on that delimiter and kept
//! only when it yields exactly one cell per column. Quoted fields, escaped delimiters and
//! embedded newlines are not interpreted: `"a;b"` under a `;` header is two cells.

use crate::error::ImportError;
use common::model::table::{Column, TableBuffer};
use log::debug;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Reads and parses the delimited file at `path`.
pub fn load_delimited(path: &Path) -> Result<TableBuffer, ImportError> {
    let bytes = fs::read(path)?;
    parse_delimited(&decode_text(&bytes))
}

/// Decodes file bytes as UTF-8, dropping a leading BOM and replacing invalid sequences.
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// `;` when the header contains one, `,` otherwise.
pub fn detect_delimiter(header: &str) -> char {
    if header.contains(';') {
        ';'
    } else {
        ','
    }
}

/// Parses delimited text into a buffer. Fails only when the text has no lines at all.
pub fn parse_delimited(text: &str) -> Result<TableBuffer, ImportError> {
    let lines = split_lines(text);
    let Some((header, data)) = lines.split_first() else {
        return Err(ImportError::EmptyFile);
    };

    let delimiter = detect_delimiter(header);
    let columns = header
        .split(delimiter)
        .map(|name| Column::new(name.trim()))
        .collect();
    let mut buffer = TableBuffer::with_columns(columns);

    let mut dropped = 0usize;
    for line in data {
        let cells = line
            .split(delimiter)
            .map(|cell| Some(cell.to_string()))
            .collect();
        if !buffer.push_row(cells) {
            dropped += 1;
        }
    }

    debug!(
        "Delimiter '{}': {} rows kept, {} dropped for cell count mismatch",
        delimiter,
        buffer.row_count(),
        dropped
    );
    Ok(buffer)
}

/// Splits on `\r\n`, `\n` or `\r`. A trailing terminator does not produce an empty last line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(|c: char| c == '\r' || c == '\n') {
            Some(pos) => {
                lines.push(&rest[..pos]);
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(buffer: &TableBuffer, row: usize) -> Vec<Option<&str>> {
        buffer.rows()[row]
            .cells()
            .iter()
            .map(|c| c.as_deref())
            .collect()
    }

    fn names(buffer: &TableBuffer) -> Vec<&str> {
        buffer.columns().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn mismatched_lines_are_dropped() {
        let buffer = parse_delimited("a,b,c\n1,2,3\n4,5,6\n7,8\n").unwrap();

        assert_eq!(names(&buffer), vec!["a", "b", "c"]);
        assert_eq!(buffer.row_count(), 2);
        assert_eq!(cells(&buffer, 0), vec![Some("1"), Some("2"), Some("3")]);
        assert_eq!(cells(&buffer, 1), vec![Some("4"), Some("5"), Some("6")]);
    }

    #[test]
    fn dropped_line_does_not_affect_neighbours() {
        let buffer = parse_delimited("a,b\n1,2\n3,4,5\n6,7\n").unwrap();

        assert_eq!(buffer.row_count(), 2);
        assert_eq!(cells(&buffer, 1), vec![Some("6"), Some("7")]);
    }

    #[test]
    fn semicolon_header_wins_over_commas_in_data() {
        let buffer = parse_delimited("x;y\nGarcía, Ana;Madrid, España\n1,5;2\n").unwrap();

        assert_eq!(names(&buffer), vec!["x", "y"]);
        assert_eq!(buffer.row_count(), 2);
        assert_eq!(
            cells(&buffer, 0),
            vec![Some("García, Ana"), Some("Madrid, España")]
        );
        assert_eq!(cells(&buffer, 1), vec![Some("1,5"), Some("2")]);
    }

    #[test]
    fn comma_header_ignores_semicolons_in_data() {
        let buffer = parse_delimited("x,y\na;b,c\na;b;c\n").unwrap();

        assert_eq!(buffer.row_count(), 1);
        assert_eq!(cells(&buffer, 0), vec![Some("a;b"), Some("c")]);
    }

    #[test]
    fn header_names_are_trimmed_but_cells_are_not() {
        let buffer = parse_delimited(" nombre ; fecha alta \n Ana ; 2024 \n").unwrap();

        assert_eq!(names(&buffer), vec!["nombre", "fecha alta"]);
        assert_eq!(cells(&buffer, 0), vec![Some(" Ana "), Some(" 2024 ")]);
    }

    #[test]
    fn quotes_are_not_interpreted() {
        let buffer = parse_delimited("a,b\n\"1,2\",3\n\"4\",5\n").unwrap();

        assert_eq!(buffer.row_count(), 1);
        assert_eq!(cells(&buffer, 0), vec![Some("\"4\""), Some("5")]);
    }

    #[test]
    fn empty_text_is_an_error() {
        assert!(matches!(
            parse_delimited("").unwrap_err(),
            ImportError::EmptyFile
        ));
    }

    #[test]
    fn header_only_gives_no_rows() {
        let buffer = parse_delimited("a,b,c\r\n").unwrap();

        assert_eq!(buffer.column_count(), 3);
        assert_eq!(buffer.row_count(), 0);
    }

    #[test]
    fn line_endings() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), vec!["a"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn bom_is_stripped() {
        let text = decode_text(b"\xEF\xBB\xBFid,nombre\n1,Ana\n");
        let buffer = parse_delimited(&text).unwrap();

        assert_eq!(names(&buffer), vec!["id", "nombre"]);
    }

    #[test]
    fn detect_delimiter_uses_header_only() {
        assert_eq!(detect_delimiter("a;b,c"), ';');
        assert_eq!(detect_delimiter("a,b"), ',');
        assert_eq!(detect_delimiter("solo"), ',');
    }
}
