//! Parsing of portal page snapshots

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

const DETAIL_ROW_SELECTOR: &str = "table tbody tr";
const DETAIL_CELL_SELECTOR: &str = "td";
const DETAIL_LINK_SELECTOR: &str = "table a";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {}", css, e))
}

/// Collapse runs of whitespace into single spaces and trim the ends
fn normalize_text(text: &str) -> String {
    let mut cleaned = String::new();
    let mut prev_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_was_space && !cleaned.is_empty() {
                cleaned.push(' ');
                prev_was_space = true;
            }
        } else {
            cleaned.push(c);
            prev_was_space = false;
        }
    }
    cleaned.trim_end().to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

/// Cell texts of every detail table body row, top to bottom
pub fn detail_rows(html: &str) -> Result<Vec<Vec<String>>> {
    let document = Html::parse_document(html);
    let rows = selector(DETAIL_ROW_SELECTOR)?;
    let cells = selector(DETAIL_CELL_SELECTOR)?;

    Ok(document
        .select(&rows)
        .map(|row| row.select(&cells).map(element_text).collect())
        .collect())
}

/// Texts of the anchors inside result tables, in document order
pub fn detail_links(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let links = selector(DETAIL_LINK_SELECTOR)?;
    Ok(document.select(&links).map(element_text).collect())
}
