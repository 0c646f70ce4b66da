//! Chunk building
//!
//! Partitions extracted rows into fixed-size, contiguous chunks and renders
//! each chunk as a standalone HTML table document.

use crate::crawler::extractor::Row;
use serde::Serialize;
use std::num::NonZeroUsize;

/// Rows per chunk unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// A contiguous slice of a page's rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// 1-based position of the chunk within its page
    pub index: usize,

    /// The rows, in extraction order
    pub rows: Vec<Row>,
}

impl Chunk {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders the chunk as a self-contained HTML document
    ///
    /// Each row becomes a `<tr>` of `<td>` cells. Cell text is escaped so
    /// that it round-trips as text, never as markup.
    pub fn to_html(&self) -> String {
        render_chunk_html(&self.rows)
    }
}

/// Splits `rows` into chunks of at most `size` rows
///
/// Every chunk except possibly the last holds exactly `size` rows, and
/// concatenating the chunks in index order gives back `rows`. No rows means
/// no chunks.
pub fn build_chunks(rows: &[Row], size: NonZeroUsize) -> Vec<Chunk> {
    rows.chunks(size.get())
        .enumerate()
        .map(|(i, rows)| Chunk {
            index: i + 1,
            rows: rows.to_vec(),
        })
        .collect()
}

/// Renders rows as `<table>` markup inside a minimal HTML document
pub fn render_chunk_html(rows: &[Row]) -> String {
    let mut html = String::from(
        "<!doctype html><html><head><meta charset=\"utf-8\"></head><body><table>",
    );

    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            html.push_str(&escape_html(cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }

    html.push_str("</table></body></html>");
    html
}

/// Escapes text for use inside HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::extractor::extract_rows;

    fn rows(n: usize) -> Vec<Row> {
        (0..n).map(|i| vec![format!("r{}", i), "x".to_string()]).collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_fifty_rows_in_chunks_of_twenty() {
        let chunks = build_chunks(&rows(50), size(20));
        let counts: Vec<usize> = chunks.iter().map(Chunk::row_count).collect();
        assert_eq!(counts, vec![20, 20, 10]);
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = build_chunks(&rows(40), size(20));
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.row_count() == 20));
    }

    #[test]
    fn test_no_rows_no_chunks() {
        assert!(build_chunks(&[], size(20)).is_empty());
    }

    #[test]
    fn test_concatenation_restores_rows() {
        let input = rows(23);
        for n in [1, 5, 22, 23, 100] {
            let joined: Vec<Row> = build_chunks(&input, size(n))
                .into_iter()
                .flat_map(|c| c.rows)
                .collect();
            assert_eq!(joined, input, "chunk size {}", n);
        }
    }

    #[test]
    fn test_render_structure() {
        let chunk = Chunk {
            index: 1,
            rows: vec![vec!["a".into(), "b".into()], vec!["c".into()]],
        };
        assert_eq!(
            chunk.to_html(),
            "<!doctype html><html><head><meta charset=\"utf-8\"></head><body><table>\
             <tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table></body></html>"
        );
    }

    #[test]
    fn test_markup_in_cells_is_escaped() {
        let html = render_chunk_html(&[vec!["<script>alert(1)</script>".into()]]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_rendered_chunk_round_trips_through_extraction() {
        let original = vec![
            vec!["R2-1 & R2-2".to_string(), "\"quoted\" <b>".to_string()],
            vec!["it's".to_string(), "plain".to_string()],
        ];
        assert_eq!(extract_rows(&render_chunk_html(&original)), original);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a&b<c>d\"e'f"), "a&amp;b&lt;c&gt;d&quot;e&#39;f");
        assert_eq!(escape_html("plain"), "plain");
    }
}
