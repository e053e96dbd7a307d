// inspection-report: per-page header
//
// Drawn once for every physical page before any other content: the
// letterhead grid (logo, company, title, optional metadata column) followed
// by the optional info block.

use tracing::debug;

use crate::document::{centered_baseline, first_baseline, Align, Document};
use crate::error::ReportResult;
use crate::fit::fit_into;
use crate::geometry::{Padding, Rect};
use crate::layout::{layout_table, PageFrame, TableSection};
use crate::metrics::FontStyle;
use crate::overlay::{FieldKind, NameScope};
use crate::request::{CellValue, DataTable, ReportData, ReportSpec};
use crate::template::{InfoBlock, Letterhead, Margins, PageHeader};

/// Offset of a metadata value from the start of its key
const METADATA_VALUE_OFFSET: f32 = 20.0;

/// Left inset of the blank-value field in a metadata cell
const METADATA_FIELD_INSET: f32 = 25.0;

const LETTERHEAD_LINE_WIDTH: f32 = 0.3;
const REPORT_ID_FONT_SIZE: f32 = 7.0;

/// Values the header placeholders expand to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderValues {
    pub start: String,
    pub end: String,
    pub site: String,
    pub weather: String,
    pub inspectors: String,
    pub report_id: Option<String>,
}

impl HeaderValues {
    pub fn new(spec: &ReportSpec, data: &ReportData) -> Self {
        Self {
            start: spec.start_display(),
            end: spec.end_display(),
            site: data.site.clone().unwrap_or_default(),
            weather: data.weather.clone().unwrap_or_default(),
            inspectors: data.inspectors.join(", "),
            report_id: None,
        }
    }

    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{start}", &self.start)
            .replace("{end}", &self.end)
            .replace("{site}", &self.site)
            .replace("{weather}", &self.weather)
            .replace("{inspectors}", &self.inspectors)
    }
}

/// A decoded logo with its natural size in pixels.
#[derive(Debug, Clone, Copy)]
pub struct Logo<'a> {
    pub source: &'a str,
    pub width: u32,
    pub height: u32,
}

/// Draw the header on the current page and return the y where content may
/// start.
pub fn draw_page_header(
    doc: &mut Document,
    header: &PageHeader,
    margins: &Margins,
    values: &HeaderValues,
    logo: Option<Logo<'_>>,
) -> ReportResult<f32> {
    let bottom = draw_letterhead(doc, &header.letterhead, margins, values, logo)?;
    match &header.info {
        Some(info) => draw_info_block(doc, info, margins, values, bottom),
        None => Ok(bottom),
    }
}

fn draw_letterhead(
    doc: &mut Document,
    letterhead: &Letterhead,
    margins: &Margins,
    values: &HeaderValues,
    logo: Option<Logo<'_>>,
) -> ReportResult<f32> {
    let top = margins.top;
    let left = margins.left;
    let content_width = doc.page_size.width - margins.left - margins.right;
    let height = letterhead.height();
    let size = letterhead.font_size;

    let meta_width = if letterhead.metadata.is_empty() {
        0.0
    } else {
        letterhead.metadata_column_width
    };
    let middle_x = left + letterhead.logo_column_width;
    let middle_width = content_width - letterhead.logo_column_width - meta_width;

    // Logo cell spans every row
    let logo_cell = Rect::new(left, top, letterhead.logo_column_width, height);
    doc.rect_outline(logo_cell, LETTERHEAD_LINE_WIDTH);
    if let Some(logo) = logo {
        let (box_w, box_h) = letterhead.logo_box;
        let slot = Rect::new(
            logo_cell.center_x() - box_w / 2.0,
            logo_cell.center_y() - box_h / 2.0,
            box_w,
            box_h,
        );
        let placed = fit_into(logo.width as f32, logo.height as f32, slot)?;
        doc.image(logo.source, placed);
    }

    let company_height = letterhead.company_rows as f32 * letterhead.row_height;
    let company_cell = Rect::new(middle_x, top, middle_width, company_height);
    let title_cell = Rect::new(middle_x, top + company_height, middle_width, height - company_height);
    for (cell, text) in [(company_cell, &letterhead.company), (title_cell, &letterhead.title)] {
        doc.rect_outline(cell, LETTERHEAD_LINE_WIDTH);
        doc.text(
            text,
            cell.center_x(),
            centered_baseline(cell.center_y(), size),
            size,
            FontStyle::Bold,
            Align::Center,
        );
    }

    if meta_width > 0.0 {
        let meta_x = middle_x + middle_width;
        let row_height = height / letterhead.metadata.len() as f32;
        for (i, entry) in letterhead.metadata.iter().enumerate() {
            let cell = Rect::new(meta_x, top + row_height * i as f32, meta_width, row_height);
            doc.rect_outline(cell, LETTERHEAD_LINE_WIDTH);

            let baseline = centered_baseline(cell.center_y(), size);
            let text_x = cell.x + 1.5;
            doc.text(&entry.key, text_x, baseline, size, FontStyle::Regular, Align::Left);

            let mut value = values.expand(&entry.value);
            if value.trim().is_empty() {
                value = entry.fallback.clone();
            }
            doc.text(
                &format!(": {}", value),
                text_x + METADATA_VALUE_OFFSET,
                baseline,
                size,
                FontStyle::Regular,
                Align::Left,
            );

            if value.trim().is_empty() {
                let field = cell.shrink(Padding::new(METADATA_FIELD_INSET, 0.0));
                doc.add_text_field(&entry.key, field, true)?;
            }
        }
    }

    if let Some(id) = &values.report_id {
        doc.text(
            &format!("ID: {}", id),
            left + content_width,
            top - 2.0,
            REPORT_ID_FONT_SIZE,
            FontStyle::Regular,
            Align::Right,
        );
    }

    Ok(top + height)
}

fn draw_info_block(
    doc: &mut Document,
    info: &InfoBlock,
    margins: &Margins,
    values: &HeaderValues,
    top: f32,
) -> ReportResult<f32> {
    let table = DataTable {
        head: Vec::new(),
        rows: info
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| Some(CellValue::Text(values.expand(cell))))
                    .collect()
            })
            .collect(),
    };

    let frame = PageFrame {
        left: margins.left,
        top,
        bottom: doc.page_size.height - margins.bottom,
    };
    let layout = layout_table(&table, &info.widths, &info.style, frame, top);

    // The block is small; anything past the first page is dropped
    if layout.pages.len() > 1 {
        debug!(pages = layout.pages.len(), "info block truncated to one page");
    }
    let Some(page) = layout.pages.first() else {
        return Ok(top);
    };

    let mut bottom = top;
    for cell in &page.cells {
        doc.table_cell(cell, &info.style);
        bottom = bottom.max(cell.bounds.bottom());
        if cell.section != TableSection::Body {
            continue;
        }

        let spec = info.fields.resolve(cell, NameScope::default());
        match spec.kind {
            FieldKind::TextField => doc.add_text_field(&spec.name, spec.bounds, true)?,
            FieldKind::Checkbox => doc.add_checkbox(&spec.name, spec.bounds, true)?,
            FieldKind::Label { text } => doc.text(
                &text,
                cell.bounds.x + info.style.cell_padding,
                first_baseline(cell.bounds.y + info.style.cell_padding, info.style.font_size),
                info.style.font_size,
                FontStyle::Regular,
                Align::Left,
            ),
            _ => {}
        }
    }
    Ok(bottom)
}
