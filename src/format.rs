//! Fixed visual theme for the output sheet
//!
//! Styles are computed from the grid shape alone, never from existing cell
//! styles, so formatting an already formatted sheet changes nothing.

use crate::types::Cell;
use crate::workbook::Sheet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

pub const BLACK: Rgb = Rgb(0x000000);
pub const WHITE: Rgb = Rgb(0xFFFFFF);
pub const PINK: Rgb = Rgb(0xE75480);
pub const LIGHT_GREEN: Rgb = Rgb(0x90EE90);

/// Visual attributes of one cell. `border` is the color of a thin border
/// on all four sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellStyle {
    pub fill: Option<Rgb>,
    pub font: Option<Rgb>,
    pub border: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub key_header_fill: Rgb,
    pub header_fill: Rgb,
    pub header_font: Rgb,
    pub key_tint: Rgb,
    pub border: Rgb,
    /// Alternate-row tint stops at this 1-based sheet row (exclusive)
    pub tint_bound: usize,
}

impl Theme {
    pub fn new(tint_bound: usize) -> Self {
        Self {
            key_header_fill: PINK,
            header_fill: BLACK,
            header_font: WHITE,
            key_tint: LIGHT_GREEN,
            border: BLACK,
            tint_bound,
        }
    }

    /// Style for a 0-based grid position (row 0 is the header)
    pub fn style_at(&self, row: usize, col: usize) -> CellStyle {
        let sheet_row = row + 1;
        let mut style = CellStyle {
            border: Some(self.border),
            ..CellStyle::default()
        };

        if row == 0 {
            style.fill = Some(if col == 0 {
                self.key_header_fill
            } else {
                self.header_fill
            });
            style.font = Some(self.header_font);
        } else if col == 0 && sheet_row % 2 == 0 && sheet_row < self.tint_bound {
            style.fill = Some(self.key_tint);
        }
        style
    }

    /// Style the whole populated grid. Ragged rows are padded with empty
    /// cells so every position gets a border.
    pub fn apply(&self, sheet: Sheet) -> StyledSheet {
        let width = sheet.width();
        let mut rows = sheet.rows;
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }

        let styles = (0..rows.len())
            .map(|r| (0..width).map(|c| self.style_at(r, c)).collect())
            .collect();

        StyledSheet { rows, styles }
    }
}

/// Sheet values plus a style for every cell
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSheet {
    rows: Vec<Vec<Cell>>,
    styles: Vec<Vec<CellStyle>>,
}

impl StyledSheet {
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn styles(&self) -> &[Vec<CellStyle>] {
        &self.styles
    }

    /// Drop the styles, keeping the values
    pub fn into_sheet(self) -> Sheet {
        Sheet { rows: self.rows }
    }

    pub fn restyle(self, theme: &Theme) -> StyledSheet {
        theme.apply(self.into_sheet())
    }
}
