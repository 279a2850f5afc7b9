//! Input sheet: the master table and the identifiers to query

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{Cell, Identifier};
use crate::workbook::{self, Sheet};

/// Input rows in original order, keyed by the first column
#[derive(Debug, Clone, PartialEq)]
pub struct MasterTable {
    pub headers: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
    /// 0-based position of each kept row among the sheet's data rows,
    /// before duplicates were dropped
    pub source_rows: Vec<usize>,
}

impl MasterTable {
    pub fn load(path: &Path) -> Result<Self> {
        let table = Self::from_sheet(workbook::read_first_sheet(path)?)?;
        info!("Loaded {} rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    /// Split off the header row and drop rows repeating an earlier
    /// identifier (first occurrence wins). Rows with a blank identifier are
    /// kept as they are.
    pub fn from_sheet(sheet: Sheet) -> Result<Self> {
        let mut rows = sheet.rows.into_iter();
        let Some(headers) = rows.next() else {
            bail!("Input sheet is empty; expected a header row with the RUC column first");
        };

        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut source_rows = Vec::new();
        for (i, row) in rows.enumerate() {
            match row.first().and_then(|c| Identifier::parse(&c.as_text())) {
                Some(id) if !seen.insert(id.clone()) => {
                    debug!("Dropping duplicate row for RUC {}", id);
                }
                _ => {
                    kept.push(row);
                    source_rows.push(i);
                }
            }
        }

        Ok(Self {
            headers,
            rows: kept,
            source_rows,
        })
    }

    pub fn identifier_at(&self, row: usize) -> Option<Identifier> {
        self.rows
            .get(row)
            .and_then(|r| r.first())
            .and_then(|c| Identifier::parse(&c.as_text()))
    }

    /// Identifiers found in the first `limit` data rows of the sheet, in
    /// order. Duplicates and blanks inside that window are skipped; rows
    /// past it are never queried.
    pub fn identifiers(&self, limit: usize) -> Vec<Identifier> {
        self.source_rows
            .iter()
            .take_while(|&&source| source < limit)
            .enumerate()
            .filter_map(|(i, _)| self.identifier_at(i))
            .collect()
    }
}
