//! Table extraction
//!
//! Turns an HTML document into the ordered rows of its primary data table.
//! Pure and deterministic: the same HTML always yields the same rows.

use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Table selector used when none is configured
pub const DEFAULT_TABLE_SELECTOR: &str = "table";

/// One extracted table row: trimmed, whitespace-collapsed cell strings
pub type Row = Vec<String>;

/// Collapses every run of whitespace (including newlines and tabs) to a
/// single space and trims both ends
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts rows from the first table matching a selector
#[derive(Debug, Clone)]
pub struct TableExtractor {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl TableExtractor {
    /// Creates an extractor for tables matching `table_selector`
    pub fn new(table_selector: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            table: parse_selector(table_selector)?,
            row: parse_selector("tr")?,
            cell: parse_selector("th, td")?,
        })
    }

    /// Returns the rows of the primary table in document order
    ///
    /// Rows whose cells are all empty are dropped. A document without a
    /// matching table yields no rows.
    pub fn extract(&self, html: &str) -> Vec<Row> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.table).next() else {
            return Vec::new();
        };

        table
            .select(&self.row)
            .map(|tr| self.row_cells(tr))
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect()
    }

    fn row_cells(&self, tr: ElementRef<'_>) -> Row {
        tr.select(&self.cell)
            .map(|cell| normalize_text(&cell.text().collect::<String>()))
            .collect()
    }
}

/// Extracts rows from the first `<table>` of a document
///
/// # Example
///
/// ```
/// use tablecrawl::crawler::extract_rows;
///
/// let html = "<table><tr><th>Id</th><th>Title</th></tr><tr><td>1</td><td> CR\n one </td></tr></table>";
/// let rows = extract_rows(html);
/// assert_eq!(rows, vec![vec!["Id", "Title"], vec!["1", "CR one"]]);
/// ```
pub fn extract_rows(html: &str) -> Vec<Row> {
    static DEFAULT_EXTRACTOR: OnceLock<Option<TableExtractor>> = OnceLock::new();

    DEFAULT_EXTRACTOR
        .get_or_init(|| TableExtractor::new(DEFAULT_TABLE_SELECTOR).ok())
        .as_ref()
        .map_or_else(Vec::new, |extractor| extractor.extract(html))
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
