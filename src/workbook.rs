//! Reading and writing `.xlsx` workbooks

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Color, Format, FormatBorder, FormatPattern, Workbook};
use std::collections::HashMap;
use std::path::Path;

use crate::format::{CellStyle, StyledSheet};
use crate::types::Cell;

const DATE_FORMAT: &str = "dd/mm/yyyy";
const DATETIME_FORMAT: &str = "dd/mm/yyyy hh:mm";

/// Plain grid of cell values, header first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Date(dt.as_f64()),
        other => Cell::Text(other.to_string()),
    }
}

/// Load the first worksheet. Cells are placed at their absolute position,
/// so a sheet whose used range starts below or right of A1 keeps its layout.
pub fn read_first_sheet(path: &Path) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("Workbook has no sheets: {}", path.display()))?
        .with_context(|| format!("Failed to read first sheet of {}", path.display()))?;

    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); first_row as usize];

    for data_row in range.rows() {
        let mut row = vec![Cell::Empty; first_col as usize];
        row.extend(data_row.iter().map(to_cell));
        while row.last().is_some_and(Cell::is_empty) {
            row.pop();
        }
        rows.push(row);
    }

    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }

    Ok(Sheet { rows })
}

/// Number format for cells that need one; dates with no time of day drop
/// the clock.
fn num_format(cell: &Cell) -> Option<&'static str> {
    match cell {
        Cell::Date(serial) if serial.fract() == 0.0 => Some(DATE_FORMAT),
        Cell::Date(_) => Some(DATETIME_FORMAT),
        _ => None,
    }
}

fn to_format(style: &CellStyle, num_format: Option<&str>) -> Format {
    let mut format = Format::new();
    if let Some(num_format) = num_format {
        format = format.set_num_format(num_format);
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill.0));
    }
    if let Some(font) = style.font {
        format = format.set_font_color(Color::RGB(font.0));
    }
    if let Some(border) = style.border {
        format = format
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(border.0));
    }
    format
}

/// Write a styled sheet as the only worksheet of a new workbook,
/// replacing any file at `path`.
pub fn write_styled(path: &Path, sheet: &StyledSheet) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let mut formats: HashMap<(CellStyle, Option<&str>), Format> = HashMap::new();

    for (r, (cells, styles)) in sheet.rows().iter().zip(sheet.styles()).enumerate() {
        let row = u32::try_from(r).context("Too many rows for a worksheet")?;
        for (c, (cell, style)) in cells.iter().zip(styles).enumerate() {
            let col = u16::try_from(c).context("Too many columns for a worksheet")?;
            let number_format = num_format(cell);
            let format = formats
                .entry((*style, number_format))
                .or_insert_with(|| to_format(style, number_format));

            match cell {
                Cell::Empty => worksheet.write_blank(row, col, format)?,
                Cell::Text(s) => worksheet.write_string_with_format(row, col, s, format)?,
                Cell::Number(n) | Cell::Date(n) => {
                    worksheet.write_number_with_format(row, col, *n, format)?
                }
                Cell::Bool(b) => worksheet.write_boolean_with_format(row, col, *b, format)?,
            };
        }
    }
    worksheet.autofit();

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Theme;
    use rust_xlsxwriter::ExcelDateTime;

    #[test]
    fn test_sheet_width() {
        let sheet = Sheet {
            rows: vec![vec![Cell::text("a")], vec![Cell::Empty, Cell::Empty, Cell::text("c")]],
        };
        assert_eq!(sheet.width(), 3);
        assert_eq!(Sheet::default().width(), 0);
    }

    #[test]
    fn test_to_cell() {
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(to_cell(&Data::String(String::new())), Cell::Empty);
        assert_eq!(to_cell(&Data::String("x".into())), Cell::text("x"));
        assert_eq!(to_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(to_cell(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(to_cell(&Data::Bool(true)), Cell::Bool(true));
        assert_eq!(num_format(&Cell::Date(45366.0)), Some(DATE_FORMAT));
        assert_eq!(num_format(&Cell::Date(45366.25)), Some(DATETIME_FORMAT));
        assert_eq!(num_format(&Cell::Number(45366.0)), None);
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let sheet = Sheet {
            rows: vec![
                vec![Cell::text("RUC"), Cell::text("Data / Hora"), Cell::text("Evento")],
                vec![Cell::text("24BR01"), Cell::text("t1"), Cell::text("e1")],
                vec![Cell::Number(42.0), Cell::Empty, Cell::Empty],
            ],
        };
        let styled = Theme::new(71).apply(sheet);
        write_styled(&path, &styled).unwrap();

        let back = read_first_sheet(&path).unwrap();
        assert_eq!(back.rows[0][0], Cell::text("RUC"));
        assert_eq!(back.rows[1], vec![Cell::text("24BR01"), Cell::text("t1"), Cell::text("e1")]);
        assert_eq!(back.rows[2][0], Cell::Number(42.0));
        assert_eq!(back.rows.len(), 3);
    }

    #[test]
    fn test_dates_survive_read_and_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dates.xlsx");
        let output = dir.path().join("restyled.xlsx");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date = ExcelDateTime::from_ymd(2024, 3, 15).unwrap();
        let stamp = ExcelDateTime::from_ymd(2024, 3, 15)
            .unwrap()
            .and_hms(12, 0, 0)
            .unwrap();
        worksheet.write_string(0, 0, "RUC").unwrap();
        worksheet.write_string(0, 1, "Embarque").unwrap();
        worksheet.write_string(0, 2, "Chegada").unwrap();
        worksheet.write_string(1, 0, "24BR01").unwrap();
        let day = Format::new().set_num_format("dd/mm/yyyy");
        let day_and_time = Format::new().set_num_format(DATETIME_FORMAT);
        worksheet.write_datetime_with_format(1, 1, &date, &day).unwrap();
        worksheet.write_datetime_with_format(1, 2, &stamp, &day_and_time).unwrap();
        workbook.save(&input).unwrap();

        let first = read_first_sheet(&input).unwrap();
        assert_eq!(first.rows[1][1], Cell::Date(45366.0));
        assert_eq!(first.rows[1][2], Cell::Date(45366.5));

        write_styled(&output, &Theme::new(71).apply(first.clone())).unwrap();
        let second = read_first_sheet(&output).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_missing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_first_sheet(&dir.path().join("missing.xlsx")).is_err());
    }
}
