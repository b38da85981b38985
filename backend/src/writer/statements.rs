//! SQL templates for the writer. Identifiers are always double-quoted, with embedded quotes
//! doubled, so column names taken from arbitrary file headers cannot break a statement.

use common::model::table::Column;

/// Primary key column added in front of the imported columns.
pub const ID_COLUMN: &str = "ID";

/// `"name"` with every `"` doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL column name for a grid column: spaces become underscores.
pub fn column_name(column: &Column) -> String {
    column.name.replace(' ', "_")
}

fn quoted_columns(columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .map(|c| quote_identifier(&column_name(c)))
        .collect()
}

/// `CREATE TABLE IF NOT EXISTS` with an autoincrement `ID` followed by one TEXT column per grid column.
pub fn create_table_sql(table_name: &str, columns: &[Column]) -> String {
    let mut definitions = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_identifier(ID_COLUMN)
    )];
    definitions.extend(quoted_columns(columns).into_iter().map(|c| format!("{} TEXT", c)));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table_name),
        definitions.join(", ")
    )
}

/// `INSERT` listing every grid column with one positional parameter each.
pub fn insert_sql(table_name: &str, columns: &[Column]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table_name),
        quoted_columns(columns).join(", "),
        placeholders.join(", ")
    )
}
