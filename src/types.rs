//! Core record types shared by every stage of the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// RUC code identifying one export declaration record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Build an identifier from raw cell text, trimming whitespace.
    /// Returns None for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the portal's detail table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub timestamp: Option<String>,
    pub label: Option<String>,
}

impl Event {
    pub fn new(timestamp: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            label: Some(label.into()),
        }
    }

    /// Cell 0 is the timestamp, cell 1 the label. Short rows leave the
    /// missing fields unset.
    pub fn from_cells(cells: &[String]) -> Self {
        Self {
            timestamp: cells.first().cloned(),
            label: cells.get(1).cloned(),
        }
    }
}

/// Long-form extraction record: one per event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "RUC")]
    pub ruc: String,
    #[serde(rename = "Data / hora")]
    pub timestamp: Option<String>,
    #[serde(rename = "Evento")]
    pub label: Option<String>,
}

/// Ordered event history for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierEvents {
    pub identifier: Identifier,
    pub events: Vec<Event>,
}

impl IdentifierEvents {
    pub fn empty(identifier: Identifier) -> Self {
        Self {
            identifier,
            events: Vec::new(),
        }
    }

    /// Flatten into long-form records, preserving event order
    pub fn to_raw_records(&self) -> Vec<RawRecord> {
        self.events
            .iter()
            .map(|event| RawRecord {
                ruc: self.identifier.to_string(),
                timestamp: event.timestamp.clone(),
                label: event.label.clone(),
            })
            .collect()
    }
}

/// Spreadsheet cell value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// Excel date serial: days since 1899-12-30, time of day as the fraction
    Date(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Optional text, `None` becomes an empty cell
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some(v) => Cell::Text(v.to_string()),
            None => Cell::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text form used for identifier matching and headers.
    /// Integral numbers drop their fractional part ("123", not "123.0").
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) | Cell::Date(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Cell::Number(n) | Cell::Date(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}
