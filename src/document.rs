// inspection-report: in-memory paginated document
//
// The composer fills a Document with draw operations and form fields; the
// writer turns it into PDF bytes. Keeping the two apart lets the layout be
// inspected without parsing a PDF.

use std::collections::HashMap;

use crate::error::{ReportError, ReportResult};
use crate::geometry::{PageSize, Rect};
use crate::layout::{TableCell, TableSection, TableStyle};
use crate::metrics::{line_height, text_width, FontStyle};

/// Millimetres per point
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Helvetica ascent as a fraction of the font size
const ASCENT: f32 = 0.72;

/// Baseline that vertically centres a single line on `center_y`.
pub fn centered_baseline(center_y: f32, font_size: f32) -> f32 {
    center_y + font_size * MM_PER_PT * 0.35
}

/// Baseline of the first line of text below `top`.
pub fn first_baseline(top: f32, font_size: f32) -> f32 {
    top + font_size * MM_PER_PT * ASCENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Text with its baseline at `y`; `x` is already adjusted for alignment
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        /// Thickness in points
        width: f32,
    },
    Image {
        source: String,
        rect: Rect,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Text { multiline: bool },
    Checkbox,
}

/// One visible occurrence of a form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    /// Zero-based page index
    pub page: usize,
    pub rect: Rect,
}

/// An AcroForm field. Fields shared by the page header carry one widget per
/// page; every other field has exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub kind: WidgetKind,
    pub shared: bool,
    pub widgets: Vec<Widget>,
}

/// Text fields taller than this accept several lines
const MULTILINE_MIN_HEIGHT: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub page_size: PageSize,
    /// Short identifier stamped in the header and the PDF metadata
    pub report_id: Option<String>,
    pages: Vec<Page>,
    fields: Vec<FormField>,
    field_index: HashMap<String, usize>,
}

impl Document {
    pub fn new(title: impl Into<String>, page_size: PageSize) -> Self {
        Self {
            title: title.into(),
            page_size,
            report_id: None,
            pages: Vec::new(),
            fields: Vec::new(),
            field_index: HashMap::new(),
        }
    }

    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.pages.len() - 1
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.add_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn text(&mut self, text: &str, x: f32, y: f32, size: f32, style: FontStyle, align: Align) {
        if text.is_empty() {
            return;
        }
        let width = text_width(text, size, style);
        let x = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        self.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            size,
            style,
        });
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
        });
    }

    /// Outline of a rect as four lines
    pub fn rect_outline(&mut self, rect: Rect, width: f32) {
        self.line(rect.x, rect.y, rect.right(), rect.y, width);
        self.line(rect.right(), rect.y, rect.right(), rect.bottom(), width);
        self.line(rect.right(), rect.bottom(), rect.x, rect.bottom(), width);
        self.line(rect.x, rect.bottom(), rect.x, rect.y, width);
    }

    /// Grid border and wrapped text of a laid-out table cell.
    pub fn table_cell(&mut self, cell: &TableCell, style: &TableStyle) {
        if style.line_width > 0.0 {
            self.rect_outline(cell.bounds, style.line_width);
        }

        let font_style = if cell.section == TableSection::Head && style.head_bold {
            FontStyle::Bold
        } else {
            FontStyle::Regular
        };
        let x = cell.bounds.x + style.cell_padding;
        let mut y = first_baseline(cell.bounds.y + style.cell_padding, style.font_size);
        for line in &cell.lines {
            self.text(line, x, y, style.font_size, font_style, Align::Left);
            y += line_height(style.font_size);
        }
    }

    pub fn image(&mut self, source: &str, rect: Rect) {
        self.push(DrawOp::Image {
            source: source.to_string(),
            rect,
        });
    }

    pub fn add_text_field(&mut self, name: &str, rect: Rect, shared: bool) -> ReportResult<()> {
        let multiline = rect.height > MULTILINE_MIN_HEIGHT;
        self.add_widget(name, WidgetKind::Text { multiline }, rect, shared)
    }

    pub fn add_checkbox(&mut self, name: &str, rect: Rect, shared: bool) -> ReportResult<()> {
        self.add_widget(name, WidgetKind::Checkbox, rect, shared)
    }

    /// Register a widget on the current page. A name may only repeat when
    /// both registrations are shared header fields of the same kind, and then
    /// only once per page.
    fn add_widget(
        &mut self,
        name: &str,
        kind: WidgetKind,
        rect: Rect,
        shared: bool,
    ) -> ReportResult<()> {
        if self.pages.is_empty() {
            self.add_page();
        }
        let page = self.current_page();
        let widget = Widget { page, rect };

        if let Some(&index) = self.field_index.get(name) {
            let field = &mut self.fields[index];
            let same_kind = std::mem::discriminant(&field.kind) == std::mem::discriminant(&kind);
            let on_page = field.widgets.iter().any(|w| w.page == page);
            if !(shared && field.shared && same_kind) || on_page {
                return Err(ReportError::DuplicateField(name.to_string()));
            }
            field.widgets.push(widget);
            return Ok(());
        }

        self.field_index.insert(name.to_string(), self.fields.len());
        self.fields.push(FormField {
            name: name.to_string(),
            kind,
            shared,
            widgets: vec![widget],
        });
        Ok(())
    }

    /// All text drawn on a page, in drawing order.
    pub fn page_text(&self, page: usize) -> Vec<&str> {
        self.pages
            .get(page)
            .map(|p| {
                p.ops
                    .iter()
                    .filter_map(|op| match op {
                        DrawOp::Text { text, .. } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
