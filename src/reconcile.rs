//! Merge extracted event histories back into the master table

use crate::reshape::{display_header, slot_header_names, WideTable, EVENT_COLUMN, TIMESTAMP_COLUMN};
use crate::source::MasterTable;
use crate::types::{Cell, Identifier};
use crate::workbook::Sheet;

/// Start of the trailing `Data / Hora`, `Evento` column pairs written by an
/// earlier run, or `width` when the sheet has none. Event-named columns
/// elsewhere in the sheet belong to the user and are left alone.
fn prior_event_start(headers: &[Cell], width: usize) -> usize {
    if headers.len() != width {
        return width;
    }
    let is = |c: usize, name: &str| display_header(&headers[c].as_text()) == name;

    let mut start = width;
    while start >= 2 && is(start - 2, TIMESTAMP_COLUMN) && is(start - 1, EVENT_COLUMN) {
        start -= 2;
    }
    start
}

/// Build the output sheet: every master row, in order, followed by the
/// event slot columns of its identifier.
///
/// Event columns left by an earlier run are replaced by the new history,
/// so running twice never appends a second copy. Identifiers with no new
/// history keep the cells the earlier run wrote (blank on a first run).
pub fn reconcile(master: &MasterTable, wide: &WideTable) -> Sheet {
    let width = master
        .rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(master.headers.len());
    let prior = prior_event_start(&master.headers, width);
    let slots = wide.slots().max((width - prior) / 2);
    let slot_width = slots * 2;

    let mut header: Vec<Cell> = master.headers[..prior.min(master.headers.len())].to_vec();
    header.resize(prior, Cell::Empty);
    header.extend(
        slot_header_names(slots)
            .iter()
            .map(|h| Cell::text(display_header(h))),
    );

    let mut rows = Vec::with_capacity(master.rows.len() + 1);
    rows.push(header);

    for row in &master.rows {
        let mut out: Vec<Cell> = (0..prior)
            .map(|c| row.get(c).cloned().unwrap_or_default())
            .collect();

        let history = row
            .first()
            .and_then(|c| Identifier::parse(&c.as_text()))
            .and_then(|id| wide.get(&id));
        let mut slot_cells = match history {
            Some(history) => wide.slot_cells(history),
            None => row.get(prior..).map(<[Cell]>::to_vec).unwrap_or_default(),
        };
        slot_cells.resize(slot_width, Cell::Empty);
        out.extend(slot_cells);
        rows.push(out);
    }

    Sheet { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, IdentifierEvents};

    fn master(ids: &[&str]) -> MasterTable {
        MasterTable {
            headers: vec![Cell::text("RUC"), Cell::text("Cliente")],
            rows: ids
                .iter()
                .map(|id| vec![Cell::text(*id), Cell::text(format!("cliente {}", id))])
                .collect(),
            source_rows: (0..ids.len()).collect(),
        }
    }

    fn history(id: &str, events: Vec<Event>) -> IdentifierEvents {
        IdentifierEvents {
            identifier: Identifier::parse(id).unwrap(),
            events,
        }
    }

    #[test]
    fn test_row_count_and_order_preserved() {
        let master = master(&["A", "B", "C", "D"]);
        let wide = WideTable::from_events(vec![
            history("C", vec![Event::new("t1", "e1")]),
            history("A", vec![Event::new("t2", "e2"), Event::new("t3", "e3")]),
            history("Z", vec![Event::new("t9", "e9")]),
        ]);

        let sheet = reconcile(&master, &wide);

        assert_eq!(sheet.rows.len(), master.rows.len() + 1);
        let ids: Vec<String> = sheet.rows[1..].iter().map(|r| r[0].as_text()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert!(sheet.rows.iter().all(|r| r.len() == 2 + 4));
    }

    #[test]
    fn test_failed_identifier_left_blank() {
        let master = master(&["A", "B", "C"]);
        let wide = WideTable::from_events(vec![
            history("A", vec![Event::new("ta", "ea")]),
            history("C", vec![Event::new("tc", "ec")]),
        ]);

        let sheet = reconcile(&master, &wide);

        assert_eq!(sheet.rows[1][2], Cell::text("ta"));
        assert_eq!(sheet.rows[1][3], Cell::text("ea"));
        assert_eq!(sheet.rows[2][0], Cell::text("B"));
        assert_eq!(sheet.rows[2][1], Cell::text("cliente B"));
        assert!(sheet.rows[2][2..].iter().all(Cell::is_empty));
        assert_eq!(sheet.rows[3][3], Cell::text("ec"));
    }

    #[test]
    fn test_headers_renamed() {
        let master = master(&["A"]);
        let wide = WideTable::from_events(vec![history(
            "A",
            vec![Event::new("t1", "e1"), Event::new("t2", "e2")],
        )]);

        let header: Vec<String> = reconcile(&master, &wide).rows[0]
            .iter()
            .map(Cell::as_text)
            .collect();
        assert_eq!(
            header,
            vec!["RUC", "Cliente", "Data / Hora", "Evento", "Data / Hora", "Evento"]
        );
    }

    #[test]
    fn test_previous_event_columns_replaced() {
        let mut master = master(&["A"]);
        master.headers.extend([Cell::text("Data / Hora"), Cell::text("Evento")]);
        master.rows[0].extend([Cell::text("old t"), Cell::text("old e")]);

        let wide = WideTable::from_events(vec![history("A", vec![Event::new("new t", "new e")])]);
        let sheet = reconcile(&master, &wide);

        assert_eq!(sheet.rows[0].len(), 4);
        assert_eq!(
            sheet.rows[1],
            vec![
                Cell::text("A"),
                Cell::text("cliente A"),
                Cell::text("new t"),
                Cell::text("new e")
            ]
        );
    }

    #[test]
    fn test_earlier_history_kept_without_new_result() {
        let mut master = master(&["A", "B"]);
        master.headers.extend([
            Cell::text("Data / Hora"),
            Cell::text("Evento"),
            Cell::text("Data / Hora"),
            Cell::text("Evento"),
        ]);
        master.rows[0].extend([Cell::text("old ta"), Cell::text("old ea")]);
        master.rows[1].extend([
            Cell::text("old tb1"),
            Cell::text("old eb1"),
            Cell::text("old tb2"),
            Cell::text("old eb2"),
        ]);

        let wide = WideTable::from_events(vec![history("A", vec![Event::new("new t", "new e")])]);
        let sheet = reconcile(&master, &wide);

        assert!(sheet.rows.iter().all(|r| r.len() == 6));
        assert_eq!(
            sheet.rows[1][2..],
            [Cell::text("new t"), Cell::text("new e"), Cell::Empty, Cell::Empty]
        );
        assert_eq!(sheet.rows[2][2], Cell::text("old tb1"));
        assert_eq!(sheet.rows[2][5], Cell::text("old eb2"));
    }

    #[test]
    fn test_user_evento_column_is_not_event_output() {
        let mut master = master(&["A"]);
        master.headers.insert(1, Cell::text("Evento"));
        master.rows[0].insert(1, Cell::text("embarque"));

        let wide = WideTable::from_events(vec![history("A", vec![Event::new("t1", "e1")])]);
        let sheet = reconcile(&master, &wide);

        assert_eq!(
            sheet.rows[1],
            vec![
                Cell::text("A"),
                Cell::text("embarque"),
                Cell::text("cliente A"),
                Cell::text("t1"),
                Cell::text("e1")
            ]
        );
    }

    #[test]
    fn test_no_results_at_all() {
        let master = master(&["A", "B"]);
        let sheet = reconcile(&master, &WideTable::default());
        assert_eq!(sheet.rows.len(), 3);
        assert!(sheet.rows.iter().all(|r| r.len() == 2));
    }
}
