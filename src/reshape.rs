//! Long-to-wide pivot of per-identifier event histories
//!
//! Events stay as an ordered list per identifier; numbered slot columns only
//! appear when a row is rendered into cells.

use std::collections::HashMap;

use crate::types::{Cell, Event, Identifier, IdentifierEvents, RawRecord};

pub const TIMESTAMP_COLUMN: &str = "Data / Hora";
pub const EVENT_COLUMN: &str = "Evento";

/// One row per distinct identifier, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideTable {
    rows: Vec<IdentifierEvents>,
    index: HashMap<Identifier, usize>,
}

impl WideTable {
    /// Group per-identifier histories. Repeated identifiers have their
    /// events appended to the first entry, keeping emission order.
    pub fn from_events(histories: impl IntoIterator<Item = IdentifierEvents>) -> Self {
        let mut table = WideTable::default();
        for history in histories {
            table.push(history.identifier, history.events);
        }
        table
    }

    /// Group long-form records by identifier
    pub fn from_raw(records: &[RawRecord]) -> Self {
        let mut table = WideTable::default();
        for record in records {
            let Some(identifier) = Identifier::parse(&record.ruc) else {
                continue;
            };
            table.push(
                identifier,
                vec![Event {
                    timestamp: record.timestamp.clone(),
                    label: record.label.clone(),
                }],
            );
        }
        table
    }

    fn push(&mut self, identifier: Identifier, events: Vec<Event>) {
        match self.index.get(&identifier) {
            Some(&i) => self.rows[i].events.extend(events),
            None => {
                self.index.insert(identifier.clone(), self.rows.len());
                self.rows.push(IdentifierEvents { identifier, events });
            }
        }
    }

    pub fn rows(&self) -> &[IdentifierEvents] {
        &self.rows
    }

    pub fn get(&self, identifier: &Identifier) -> Option<&IdentifierEvents> {
        self.index.get(identifier).map(|&i| &self.rows[i])
    }

    /// k: the largest event count of any identifier
    pub fn slots(&self) -> usize {
        self.rows.iter().map(|r| r.events.len()).max().unwrap_or(0)
    }

    /// Numbered column names, `Data / Hora_1, Evento_1, Data / Hora_2, ...`
    pub fn slot_headers(&self) -> Vec<String> {
        slot_header_names(self.slots())
    }

    /// Slot cells for one identifier, padded with empty cells to 2k
    pub fn slot_cells(&self, history: &IdentifierEvents) -> Vec<Cell> {
        let width = self.slots() * 2;
        let mut cells: Vec<Cell> = history
            .events
            .iter()
            .flat_map(|event| {
                [
                    Cell::from_option(event.timestamp.as_deref()),
                    Cell::from_option(event.label.as_deref()),
                ]
            })
            .collect();
        cells.resize(width, Cell::Empty);
        cells
    }
}

/// Sheet header for a numbered slot column: the suffix is dropped, so every
/// slot shows as plain `Data / Hora` / `Evento`.
pub fn display_header(slot_header: &str) -> &str {
    match slot_header.rsplit_once('_') {
        Some((base, n))
            if (base == TIMESTAMP_COLUMN || base == EVENT_COLUMN)
                && !n.is_empty()
                && n.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => slot_header,
    }
}

pub fn slot_header_names(slots: usize) -> Vec<String> {
    (1..=slots)
        .flat_map(|i| {
            [
                format!("{}_{}", TIMESTAMP_COLUMN, i),
                format!("{}_{}", EVENT_COLUMN, i),
            ]
        })
        .collect()
}
