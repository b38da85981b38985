use serde::{Deserialize, Serialize};
use std::fmt;

/// A single grid value. `None` stands for a missing value and is stored as SQL `NULL`,
/// never as the text `"null"`.
pub type Cell = Option<String>;

/// A column of the grid as it was read from the source file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// The column name taken from the file header (trimmed for delimited files).
    /// The database writer derives the SQL column name from it.
    pub name: String,
    /// The text shown above the column in the grid. Currently always equal to `name`.
    pub label: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Column {
            label: name.clone(),
            name,
        }
    }
}

/// An ordered sequence of cells. Only a `TableBuffer` decides whether a row fits.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct Row(Vec<Cell>);

impl Row {
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Row(cells)
    }
}

/// The in-memory grid shared between the file loader and the database writer.
///
/// A buffer is created fresh for every loaded file and consumed by a save. Every row it
/// holds has exactly as many cells as there are columns: rows with a different arity are
/// rejected by [`TableBuffer::push_row`], and a buffer deserialized from JSON is checked
/// the same way before it can reach the writer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(try_from = "TableBufferParts")]
pub struct TableBuffer {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

/// Unchecked wire shape of a `TableBuffer`.
#[derive(Deserialize)]
struct TableBufferParts {
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<Row>,
}

/// Returned when a deserialized buffer contains a row whose arity differs from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowArityError {
    pub row_index: usize,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for RowArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} has {} cells but the table has {} columns",
            self.row_index, self.found, self.expected
        )
    }
}

impl std::error::Error for RowArityError {}

impl TryFrom<TableBufferParts> for TableBuffer {
    type Error = RowArityError;

    fn try_from(parts: TableBufferParts) -> Result<Self, Self::Error> {
        let expected = parts.columns.len();
        if let Some((row_index, row)) = parts
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != expected)
        {
            return Err(RowArityError {
                row_index,
                expected,
                found: row.len(),
            });
        }
        Ok(TableBuffer {
            columns: parts.columns,
            rows: parts.rows,
        })
    }
}

impl TableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with the given header.
    pub fn with_columns(columns: Vec<Column>) -> Self {
        TableBuffer {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when there is nothing a save could persist: no columns or no rows.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// Appends a row if its arity matches the header. Returns `false` and drops the row otherwise.
    pub fn push_row(&mut self, cells: Vec<Cell>) -> bool {
        if cells.len() != self.columns.len() {
            return false;
        }
        self.rows.push(Row(cells));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<Column> {
        names.iter().map(|n| Column::new(*n)).collect()
    }

    #[test]
    fn column_label_matches_name() {
        let column = Column::new("Fecha alta");
        assert_eq!(column.name, "Fecha alta");
        assert_eq!(column.label, "Fecha alta");
    }

    #[test]
    fn push_row_rejects_mismatched_arity() {
        let mut buffer = TableBuffer::with_columns(header(&["a", "b"]));

        assert!(buffer.push_row(vec![Some("1".into()), Some("2".into())]));
        assert!(!buffer.push_row(vec![Some("1".into())]));
        assert!(!buffer.push_row(vec![None, None, None]));

        assert_eq!(buffer.row_count(), 1);
        assert!(buffer.rows().iter().all(|r| r.len() == buffer.column_count()));
    }

    #[test]
    fn empty_when_no_rows_or_no_columns() {
        assert!(TableBuffer::new().is_empty());

        let mut buffer = TableBuffer::with_columns(header(&["a"]));
        assert!(buffer.is_empty());
        buffer.push_row(vec![None]);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn deserialize_keeps_nulls() {
        let json = r#"{"columns":[{"name":"a","label":"a"},{"name":"b","label":"b"}],
                       "rows":[["1",null]]}"#;
        let buffer: TableBuffer = serde_json::from_str(json).unwrap();

        assert_eq!(buffer.row_count(), 1);
        assert_eq!(buffer.rows()[0].cells(), &[Some("1".to_string()), None]);
    }

    #[test]
    fn deserialize_rejects_ragged_rows() {
        let json = r#"{"columns":[{"name":"a","label":"a"}],"rows":[["1"],["1","2"]]}"#;
        let err = serde_json::from_str::<TableBuffer>(json).unwrap_err();

        assert!(err.to_string().contains("row 1 has 2 cells"));
    }
}
