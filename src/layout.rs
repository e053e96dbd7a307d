// inspection-report: two-phase table layout
//
// Phase one computes the geometry of every cell, split into pages. Overlay
// resolution and drawing happen afterwards by walking the result.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::Rect;
use crate::metrics::{line_height, wrap_text, FontStyle};
use crate::request::{CellValue, DataTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSection {
    Head,
    Body,
}

/// One laid-out cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub section: TableSection,
    pub row_index: usize,
    pub column_index: usize,
    pub bounds: Rect,
    pub raw: Option<CellValue>,
    /// Wrapped text lines
    pub lines: Vec<String>,
}

impl TableCell {
    pub fn body(row_index: usize, column_index: usize, bounds: Rect, raw: Option<CellValue>) -> Self {
        Self {
            section: TableSection::Body,
            row_index,
            column_index,
            bounds,
            raw,
            lines: Vec::new(),
        }
    }
}

/// Visual settings of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableStyle {
    /// Font size in points
    pub font_size: f32,
    pub cell_padding: f32,
    pub head_min_height: f32,
    pub body_min_height: f32,
    /// Border thickness in points, 0 for no grid
    pub line_width: f32,
    pub show_head: bool,
    pub head_bold: bool,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_size: 6.0,
            cell_padding: 1.5,
            head_min_height: 0.0,
            body_min_height: 0.0,
            line_width: 0.3,
            show_head: true,
            head_bold: true,
        }
    }
}

/// Vertical band available to a table on every page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub left: f32,
    /// Where continuation pages start
    pub top: f32,
    /// Lowest y a row may reach
    pub bottom: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutPage {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub pages: Vec<LaidOutPage>,
    /// Bottom of the last drawn row
    pub final_y: f32,
}

impl TableLayout {
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.pages.iter().flat_map(|p| p.cells.iter())
    }
}

/// Resolve the width of every column. Columns without a configured width
/// share what is left of `available`.
pub fn column_widths(configured: &[f32], columns: usize, available: f32) -> Vec<f32> {
    let fixed: f32 = configured.iter().take(columns).sum();
    let unset = columns.saturating_sub(configured.len());
    let share = if unset > 0 {
        ((available - fixed) / unset as f32).max(5.0)
    } else {
        0.0
    };

    (0..columns)
        .map(|i| configured.get(i).copied().unwrap_or(share))
        .collect()
}

struct RowPlan {
    height: f32,
    cells: Vec<(Option<CellValue>, Vec<String>)>,
}

fn plan_row(
    values: Vec<Option<CellValue>>,
    widths: &[f32],
    style: &TableStyle,
    font_style: FontStyle,
    min_height: f32,
) -> RowPlan {
    let line_h = line_height(style.font_size);
    let mut height = min_height;

    let cells = values
        .into_iter()
        .zip(widths)
        .map(|(value, width)| {
            let text = value.as_ref().map(CellValue::display_text).unwrap_or("");
            let inner = (width - 2.0 * style.cell_padding).max(1.0);
            let lines = wrap_text(text, style.font_size, font_style, inner);
            let needed = lines.len() as f32 * line_h + 2.0 * style.cell_padding;
            height = height.max(needed);
            (value, lines)
        })
        .collect();

    RowPlan { height, cells }
}

fn emit_row(
    page: &mut LaidOutPage,
    plan: &RowPlan,
    section: TableSection,
    row_index: usize,
    widths: &[f32],
    left: f32,
    y: f32,
) {
    let mut x = left;
    for (column_index, ((value, lines), width)) in plan.cells.iter().zip(widths).enumerate() {
        page.cells.push(TableCell {
            section,
            row_index,
            column_index,
            bounds: Rect::new(x, y, *width, plan.height),
            raw: value.clone(),
            lines: lines.clone(),
        });
        x += width;
    }
}

/// Lay out `table` starting at `start_y` on the current page. The head row is
/// repeated at the top of every page when `style.show_head` is set.
pub fn layout_table(
    table: &DataTable,
    widths: &[f32],
    style: &TableStyle,
    frame: PageFrame,
    start_y: f32,
) -> TableLayout {
    let columns = widths.len();

    let head_font = if style.head_bold {
        FontStyle::Bold
    } else {
        FontStyle::Regular
    };
    let head = style.show_head.then(|| {
        let values = (0..columns)
            .map(|i| table.head.get(i).map(|h| CellValue::Text(h.clone())))
            .collect();
        plan_row(values, widths, style, head_font, style.head_min_height)
    });

    let mut pages = vec![LaidOutPage::default()];
    let mut y = start_y;
    let mut rows_on_page = 0usize;

    if let Some(head) = &head {
        if let Some(page) = pages.last_mut() {
            emit_row(page, head, TableSection::Head, 0, widths, frame.left, y);
        }
        y += head.height;
    }

    for row_index in 0..table.rows.len() {
        let values = (0..columns).map(|i| table.cell(row_index, i).cloned()).collect();
        let plan = plan_row(values, widths, style, FontStyle::Regular, style.body_min_height);

        // Keep rows whole; a row taller than a page is placed anyway
        let first_on_page = rows_on_page == 0;
        if y + plan.height > frame.bottom && !(first_on_page && y <= frame.top + head_height(&head)) {
            debug!(row_index, y, "table row moves to a new page");
            if rows_on_page == 0 {
                // The head goes along with the row it belongs to
                if let Some(page) = pages.last_mut() {
                    page.cells.clear();
                }
            }
            pages.push(LaidOutPage::default());
            y = frame.top;
            rows_on_page = 0;
            if let Some(head) = &head {
                if let Some(page) = pages.last_mut() {
                    emit_row(page, head, TableSection::Head, 0, widths, frame.left, y);
                }
                y += head.height;
            }
        }

        if let Some(page) = pages.last_mut() {
            emit_row(page, &plan, TableSection::Body, row_index, widths, frame.left, y);
        }
        y += plan.height;
        rows_on_page += 1;
    }

    TableLayout { pages, final_y: y }
}

fn head_height(head: &Option<RowPlan>) -> f32 {
    head.as_ref().map_or(0.0, |h| h.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<CellValue> {
        Some(CellValue::Text(s.to_string()))
    }

    fn table(rows: usize) -> DataTable {
        DataTable {
            head: vec!["No".into(), "Lokasi".into(), "Foto".into()],
            rows: (0..rows)
                .map(|i| vec![text(&(i + 1).to_string()), text("KM 10+200"), None])
                .collect(),
        }
    }

    fn style() -> TableStyle {
        TableStyle {
            head_min_height: 10.0,
            body_min_height: 50.0,
            ..TableStyle::default()
        }
    }

    fn frame() -> PageFrame {
        PageFrame {
            left: 14.0,
            top: 55.0,
            bottom: 420.0 - 44.0,
        }
    }

    #[test]
    fn unset_columns_share_remaining_width() {
        assert_eq!(column_widths(&[9.0, 20.0], 4, 69.0), vec![9.0, 20.0, 20.0, 20.0]);
        assert_eq!(column_widths(&[9.0, 20.0, 30.0], 2, 100.0), vec![9.0, 20.0]);
    }

    #[test]
    fn cells_are_positioned_on_a_grid() {
        let layout = layout_table(&table(2), &[9.0, 20.0, 50.0], &style(), frame(), 55.0);
        assert_eq!(layout.pages.len(), 1);

        let cells: Vec<&TableCell> = layout.cells().collect();
        assert_eq!(cells.len(), 9);

        let head = cells[0];
        assert_eq!(head.section, TableSection::Head);
        assert_eq!(head.bounds, Rect::new(14.0, 55.0, 9.0, 10.0));

        let second_row_photo = cells[8];
        assert_eq!(second_row_photo.section, TableSection::Body);
        assert_eq!(second_row_photo.row_index, 1);
        assert_eq!(second_row_photo.column_index, 2);
        assert_eq!(second_row_photo.bounds, Rect::new(43.0, 115.0, 50.0, 50.0));
        assert_eq!(layout.final_y, 165.0);
    }

    #[test]
    fn rows_never_cross_the_bottom_margin() {
        let layout = layout_table(&table(20), &[9.0, 20.0, 50.0], &style(), frame(), 55.0);
        assert!(layout.pages.len() > 1);

        for page in &layout.pages {
            assert_eq!(page.cells[0].section, TableSection::Head);
            assert_eq!(page.cells[0].bounds.y, 55.0);
            for cell in &page.cells {
                assert!(cell.bounds.bottom() <= frame().bottom + 1e-3);
            }
        }

        let body_rows: usize = layout
            .cells()
            .filter(|c| c.section == TableSection::Body && c.column_index == 0)
            .count();
        assert_eq!(body_rows, 20);
    }

    #[test]
    fn oversized_row_is_placed_instead_of_looping() {
        let tall = TableStyle {
            body_min_height: 500.0,
            ..style()
        };
        let layout = layout_table(&table(2), &[9.0, 20.0, 50.0], &tall, frame(), 55.0);
        assert_eq!(layout.pages.len(), 2);
    }

    #[test]
    fn head_moves_with_a_first_row_that_does_not_fit() {
        // Starts low on the page, below a caption
        let layout = layout_table(&table(2), &[9.0, 20.0, 50.0], &style(), frame(), 330.0);
        assert_eq!(layout.pages.len(), 2);
        assert!(layout.pages[0].cells.is_empty());

        let moved = &layout.pages[1].cells;
        assert_eq!(moved[0].section, TableSection::Head);
        assert_eq!(moved[0].bounds.y, 55.0);
        assert_eq!(moved[3].section, TableSection::Body);
        assert_eq!(moved[3].row_index, 0);
        assert_eq!(moved[3].bounds.y, 65.0);
        assert_eq!(layout.final_y, 165.0);
    }

    #[test]
    fn long_text_grows_the_row() {
        let mut t = table(1);
        t.rows[0][1] = text("Retak memanjang pada bahu jalan sisi kiri dekat gorong-gorong");
        let compact = TableStyle {
            body_min_height: 0.0,
            ..style()
        };
        let layout = layout_table(&t, &[9.0, 20.0, 50.0], &compact, frame(), 55.0);
        let lokasi = layout
            .cells()
            .find(|c| c.section == TableSection::Body && c.column_index == 1)
            .unwrap();
        assert!(lokasi.lines.len() > 1);
        assert!(lokasi.bounds.height > line_height(6.0) * 2.0);
    }

    #[test]
    fn hidden_head_starts_with_body() {
        let no_head = TableStyle {
            show_head: false,
            ..style()
        };
        let layout = layout_table(&table(1), &[9.0, 20.0, 50.0], &no_head, frame(), 30.0);
        let first = layout.cells().next().unwrap();
        assert_eq!(first.section, TableSection::Body);
        assert_eq!(first.bounds.y, 30.0);
    }
}
