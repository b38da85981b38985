//! Generic tabular XML loading.
//!
//! The document is read into a small element tree and a table is inferred from its shape:
//!
//! - The document element is itself the table (with a single row) when it has attributes or
//!   a child that looks like a column: a leaf element without attributes that occurs once.
//! - Otherwise the first child of the document element that looks like a table (it has
//!   attributes, has child elements, or repeats) names the table, and every child of the
//!   document element with that name is a row.
//!
//! Columns of a row are its attributes and its leaf children, in order of first appearance
//! over all rows. A row that only holds text gets a `<name>_Text` column. Children that are
//! tables themselves are not imported; only the first table of the document is loaded.

use crate::error::ImportError;
use common::model::table::{Cell, Column, TableBuffer};
use log::debug;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Element tree node. Text holds the concatenated character data directly under the element.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart) -> Result<Self, ImportError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            if attribute.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            ..Default::default()
        })
    }

    /// No attributes and no child elements.
    fn is_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    fn count_children(&self, name: &str) -> usize {
        self.children.iter().filter(|c| c.name == name).count()
    }

    fn has_text(&self) -> bool {
        self.children.is_empty() && !self.text.trim().is_empty()
    }
}

/// Reads the XML file at `path` and returns its first table.
pub fn load_xml(path: &Path) -> Result<TableBuffer, ImportError> {
    let file = File::open(path)?;
    parse_xml(BufReader::new(file))
}

/// Parses an XML document and infers its first table.
pub fn parse_xml<R: BufRead>(source: R) -> Result<TableBuffer, ImportError> {
    let root = read_tree(source)?.ok_or(ImportError::NoRecognizableData)?;
    let buffer = first_table(&root)?.ok_or(ImportError::NoRecognizableData)?;
    if buffer.column_count() == 0 {
        return Err(ImportError::NoRecognizableData);
    }
    Ok(buffer)
}

fn read_tree<R: BufRead>(source: R) -> Result<Option<Element>, ImportError> {
    let mut reader = Reader::from_reader(source);
    let config = reader.config_mut();
    config.expand_empty_elements = true;
    config.trim_text(false);

    let mut buffer = Vec::with_capacity(1024);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        buffer.clear();
        match reader.read_event_into(&mut buffer)? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => {
                            root.get_or_insert(element);
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.xml_content()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(current) = stack.last_mut() {
                    push_reference(&mut current.text, &reference)?;
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(root)
}

/// Appends the character or predefined entity named by `reference`.
fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), ImportError> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| ImportError::XmlEntity(raw.to_string()))?;
        let character =
            char::from_u32(code).ok_or_else(|| ImportError::XmlEntity(raw.to_string()))?;
        text.push(character);
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        return Err(ImportError::XmlEntity(raw.to_string()));
    }
    Ok(())
}

fn first_table(root: &Element) -> Result<Option<TableBuffer>, ImportError> {
    let root_is_table = !root.attributes.is_empty()
        || root
            .children
            .iter()
            .any(|c| c.is_leaf() && root.count_children(&c.name) == 1);

    if root_is_table {
        debug!("XML document element '{}' is the table", root.name);
        return build_table(&[root]).map(Some);
    }

    let Some(table) = root
        .children
        .iter()
        .find(|c| !c.is_leaf() || root.count_children(&c.name) > 1)
    else {
        return Ok(None);
    };
    let rows: Vec<&Element> = root
        .children
        .iter()
        .filter(|c| c.name == table.name)
        .collect();
    debug!("XML table '{}' with {} rows", table.name, rows.len());
    build_table(&rows).map(Some)
}

/// Where a column's value is found in a row element.
#[derive(PartialEq, Eq)]
enum Source {
    Attribute(String),
    Child(String),
    Text,
}

/// Fails when one name is used by two different sources (an attribute and a child element),
/// since a single column cannot hold both values.
fn build_table(rows: &[&Element]) -> Result<TableBuffer, ImportError> {
    // Child names that are tables in any row never become columns.
    let nested: Vec<&str> = rows
        .iter()
        .flat_map(|row| {
            row.children
                .iter()
                .filter(|c| !c.is_leaf() || row.count_children(&c.name) > 1)
                .map(|c| c.name.as_str())
        })
        .collect();

    let mut names: Vec<String> = Vec::new();
    let mut sources: Vec<Source> = Vec::new();
    let mut add = |name: String, source: Source| match names.iter().position(|n| *n == name) {
        Some(index) if sources[index] != source => Err(ImportError::XmlNameCollision(name)),
        Some(_) => Ok(()),
        None => {
            names.push(name);
            sources.push(source);
            Ok(())
        }
    };

    for row in rows {
        for (key, _) in &row.attributes {
            add(key.clone(), Source::Attribute(key.clone()))?;
        }
        for child in row.children.iter().filter(|c| !nested.contains(&c.name.as_str())) {
            add(child.name.clone(), Source::Child(child.name.clone()))?;
        }
        if row.has_text() {
            add(format!("{}_Text", row.name), Source::Text)?;
        }
    }

    let mut buffer = TableBuffer::with_columns(names.into_iter().map(Column::new).collect());
    for row in rows {
        let cells: Vec<Cell> = sources.iter().map(|source| cell_value(row, source)).collect();
        buffer.push_row(cells);
    }
    Ok(buffer)
}

fn cell_value(row: &Element, source: &Source) -> Cell {
    match source {
        Source::Attribute(key) => row
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()),
        Source::Child(name) => row
            .children
            .iter()
            .find(|c| &c.name == name)
            .map(|c| c.text.clone()),
        Source::Text => row.has_text().then(|| row.text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<TableBuffer, ImportError> {
        parse_xml(xml.as_bytes())
    }

    fn names(buffer: &TableBuffer) -> Vec<&str> {
        buffer.columns().iter().map(|c| c.name.as_str()).collect()
    }

    fn cells(buffer: &TableBuffer, row: usize) -> Vec<Option<&str>> {
        buffer.rows()[row]
            .cells()
            .iter()
            .map(|c| c.as_deref())
            .collect()
    }

    #[test]
    fn element_rows_under_root() {
        let buffer = parse(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <NewDataSet>
              <Clientes>
                <Id>1</Id>
                <Nombre>Ana</Nombre>
              </Clientes>
              <Clientes>
                <Id>2</Id>
                <Nombre>Luis</Nombre>
              </Clientes>
            </NewDataSet>"#,
        )
        .unwrap();

        assert_eq!(names(&buffer), vec!["Id", "Nombre"]);
        assert_eq!(buffer.row_count(), 2);
        assert_eq!(cells(&buffer, 1), vec![Some("2"), Some("Luis")]);
    }

    #[test]
    fn attribute_rows_and_missing_values() {
        let buffer = parse(
            r#"<datos>
                 <fila id="1" ciudad="Lima"/>
                 <fila id="2"/>
                 <fila id="3" pais="Perú"/>
               </datos>"#,
        )
        .unwrap();

        assert_eq!(names(&buffer), vec!["id", "ciudad", "pais"]);
        assert_eq!(buffer.row_count(), 3);
        assert_eq!(cells(&buffer, 0), vec![Some("1"), Some("Lima"), None]);
        assert_eq!(cells(&buffer, 1), vec![Some("2"), None, None]);
        assert_eq!(cells(&buffer, 2), vec![Some("3"), None, Some("Perú")]);
    }

    #[test]
    fn attributes_come_before_child_columns() {
        let buffer = parse(r#"<r><item id="7"><nombre>x</nombre></item><item id="8"/></r>"#).unwrap();

        assert_eq!(names(&buffer), vec!["id", "nombre"]);
        assert_eq!(cells(&buffer, 1), vec![Some("8"), None]);
    }

    #[test]
    fn root_with_columns_is_a_single_row_table() {
        let buffer = parse("<config><host>localhost</host><puerto>8080</puerto></config>").unwrap();

        assert_eq!(names(&buffer), vec!["host", "puerto"]);
        assert_eq!(buffer.row_count(), 1);
        assert_eq!(cells(&buffer, 0), vec![Some("localhost"), Some("8080")]);
    }

    #[test]
    fn repeated_leaves_become_text_column() {
        let buffer = parse("<lista><item>a</item><item>b</item></lista>").unwrap();

        assert_eq!(names(&buffer), vec!["item_Text"]);
        assert_eq!(cells(&buffer, 0), vec![Some("a")]);
        assert_eq!(cells(&buffer, 1), vec![Some("b")]);
    }

    #[test]
    fn only_first_table_is_loaded() {
        let buffer = parse(
            r#"<ds>
                 <a><x>1</x></a>
                 <b><y>2</y></b>
                 <a><x>3</x></a>
               </ds>"#,
        )
        .unwrap();

        assert_eq!(names(&buffer), vec!["x"]);
        assert_eq!(buffer.row_count(), 2);
    }

    #[test]
    fn nested_tables_are_not_columns() {
        let buffer = parse(
            r#"<ds>
                 <pedido><num>1</num><linea><art>A</art></linea><linea><art>B</art></linea></pedido>
               </ds>"#,
        )
        .unwrap();

        assert_eq!(names(&buffer), vec!["num"]);
        assert_eq!(buffer.row_count(), 1);
    }

    #[test]
    fn entities_and_cdata_are_resolved() {
        let buffer =
            parse("<r><f><t>a &amp; b &#241;</t><c><![CDATA[<x>]]></c></f><f><t/><c/></f></r>")
                .unwrap();

        assert_eq!(cells(&buffer, 0), vec![Some("a & b ñ"), Some("<x>")]);
        assert_eq!(cells(&buffer, 1), vec![Some(""), Some("")]);
    }

    #[test]
    fn attribute_and_child_with_same_name_is_rejected() {
        let err = parse(r#"<ds><a x="1"/><a><x>2</x></a></ds>"#).unwrap_err();
        assert!(matches!(err, ImportError::XmlNameCollision(ref name) if name == "x"));

        let err = parse(r#"<ds><a x="1"><x>2</x></a></ds>"#).unwrap_err();
        assert!(matches!(err, ImportError::XmlNameCollision(_)));
    }

    #[test]
    fn empty_root_has_no_data() {
        assert!(matches!(
            parse("<vacio/>").unwrap_err(),
            ImportError::NoRecognizableData
        ));
        assert!(matches!(
            parse("<vacio>   </vacio>").unwrap_err(),
            ImportError::NoRecognizableData
        ));
    }

    #[test]
    fn no_elements_has_no_data() {
        assert!(matches!(
            parse("").unwrap_err(),
            ImportError::NoRecognizableData
        ));
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = parse("<a><b></a>").unwrap_err();
        assert!(matches!(err, ImportError::Xml(_)));
    }
}
