// inspection-report: section sequencing and pagination
//
// Runs the sections of a ReportTemplate in order against one Document. The
// vertical cursor is the only state passed from one section to the next.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::{centered_baseline, first_baseline, Align, Document};
use crate::error::{ReportError, ReportResult};
use crate::fit::fit_into;
use crate::geometry::Rect;
use crate::images::ImageLibrary;
use crate::layout::{column_widths, layout_table, PageFrame, TableCell, TableSection, TableStyle};
use crate::letterhead::{draw_page_header, HeaderValues, Logo};
use crate::metrics::{line_height, FontStyle};
use crate::overlay::{expand_name, ColumnFieldMap, FieldKind, NameScope};
use crate::request::{AssetGroup, AssetSection, ChartSet, DataTable, ReportData, ReportSpec};
use crate::signature::{draw_signature, plan_signature, SignatureSlot, SIGNATURE_BLOCK_HEIGHT};
use crate::template::{AssetTemplate, ReportTemplate, Section};

/// Closest a signature block may come to the bottom page edge
const SIGNATURE_EDGE_CLEARANCE: f32 = 5.0;

/// Space between a group caption and what follows it
const CAPTION_GAP: f32 = 2.0;

/// Short identifier for one generated report
pub fn generate_report_id() -> String {
    let uuid = Uuid::new_v4();
    let hex = format!("{:x}", uuid);
    hex[..8].to_uppercase()
}

/// A table and where it may go on each page.
struct TablePlacement<'a> {
    table: &'a DataTable,
    widths: &'a [f32],
    style: &'a TableStyle,
    fields: &'a ColumnFieldMap,
    /// Top of the table area on continuation pages
    top: f32,
    /// Lowest y a row may reach
    bottom: f32,
}

pub struct ReportComposer<'a> {
    spec: &'a ReportSpec,
    template: &'a ReportTemplate,
    data: &'a ReportData,
    images: &'a ImageLibrary,
    values: HeaderValues,
    doc: Document,
    /// Bottom of the last drawn section, unknown until a table has run
    cursor: Option<f32>,
    /// Bottom of the header on the current page
    content_start: f32,
}

impl<'a> ReportComposer<'a> {
    pub fn new(
        spec: &'a ReportSpec,
        template: &'a ReportTemplate,
        data: &'a ReportData,
        images: &'a ImageLibrary,
    ) -> ReportResult<Self> {
        template.validate()?;

        let page_size = spec.page_format.size_mm(spec.orientation);
        let content_width = page_size.width - template.margins.left - template.margins.right;
        let required = template.required_width();
        if required > content_width + 0.01 {
            return Err(ReportError::TemplateError(format!(
                "template needs {:.1} mm but the page holds {:.1} mm",
                required, content_width
            )));
        }
        let mut doc = Document::new(template.document_title.clone(), page_size);
        let report_id = generate_report_id();
        doc.report_id = Some(report_id.clone());

        let mut values = HeaderValues::new(spec, data);
        values.report_id = Some(report_id);

        Ok(Self {
            spec,
            template,
            data,
            images,
            values,
            doc,
            cursor: None,
            content_start: template.margins.top,
        })
    }

    pub fn compose(mut self) -> ReportResult<Document> {
        info!(
            kind = %self.spec.kind,
            start = %self.spec.start_date,
            end = %self.spec.end_date,
            "composing report"
        );

        self.begin_page()?;

        let template = self.template;
        for section in &template.sections {
            match section {
                Section::MainTable => self.main_table()?,
                Section::AssetGroups => self.asset_groups()?,
                Section::Signatures { slots } => self.signatures(slots, NameScope::default())?,
            }
        }

        info!(
            pages = self.doc.page_count(),
            fields = self.doc.fields().len(),
            "report composed"
        );
        Ok(self.doc)
    }

    fn page_height(&self) -> f32 {
        self.doc.page_size.height
    }

    fn content_width(&self) -> f32 {
        let margins = &self.template.margins;
        self.doc.page_size.width - margins.left - margins.right
    }

    fn logo(&self) -> ReportResult<Option<Logo<'a>>> {
        let data = self.data;
        let Some(source) = data.logo.as_deref() else {
            return Ok(None);
        };
        let (width, height) = self.images.dimensions(source)?;
        Ok(Some(Logo {
            source,
            width,
            height,
        }))
    }

    /// Start a physical page and draw its header.
    fn begin_page(&mut self) -> ReportResult<()> {
        let page = self.doc.add_page();
        let logo = self.logo()?;
        let template = self.template;
        self.content_start = draw_page_header(
            &mut self.doc,
            &template.header,
            &template.margins,
            &self.values,
            logo,
        )?;
        debug!(page, content_start = self.content_start, "page started");
        Ok(())
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn main_table(&mut self) -> ReportResult<()> {
        let template = self.template;
        let Some(table_template) = template.table.as_ref() else {
            return Err(ReportError::TemplateError("main_table section without a table template".into()));
        };
        let table = self
            .data
            .table
            .as_ref()
            .ok_or_else(|| ReportError::NotFound("main table data".into()))?;

        let top = table_template.content_top.max(self.content_start);
        let placement = TablePlacement {
            table,
            widths: &table_template.widths,
            style: &table_template.style,
            fields: &table_template.fields,
            top,
            bottom: self.page_height() - table_template.reserve_bottom,
        };
        let final_y = self.draw_table(&placement, top, NameScope::default())?;
        self.cursor = Some(final_y);
        Ok(())
    }

    /// Lay out and draw a table starting at `start_y` on the current page.
    /// Returns the bottom of the last row.
    fn draw_table(
        &mut self,
        placement: &TablePlacement<'_>,
        start_y: f32,
        scope: NameScope<'_>,
    ) -> ReportResult<f32> {
        let widths = column_widths(
            placement.widths,
            placement.table.column_count(),
            self.content_width(),
        );
        let frame = PageFrame {
            left: self.template.margins.left,
            top: placement.top,
            bottom: placement.bottom,
        };
        let layout = layout_table(placement.table, &widths, placement.style, frame, start_y);
        debug!(
            rows = placement.table.rows.len(),
            pages = layout.pages.len(),
            "table laid out"
        );

        for (i, page) in layout.pages.iter().enumerate() {
            if i > 0 {
                self.begin_page()?;
            }
            for cell in &page.cells {
                self.doc.table_cell(cell, placement.style);
                if cell.section == TableSection::Body {
                    self.emit_overlay(cell, placement.fields, placement.style, scope)?;
                }
            }
        }
        Ok(layout.final_y)
    }

    fn emit_overlay(
        &mut self,
        cell: &TableCell,
        fields: &ColumnFieldMap,
        style: &TableStyle,
        scope: NameScope<'_>,
    ) -> ReportResult<()> {
        let spec = fields.resolve(cell, scope);
        match spec.kind {
            FieldKind::None => {}
            FieldKind::TextField => self.doc.add_text_field(&spec.name, spec.bounds, false)?,
            FieldKind::Checkbox => self.doc.add_checkbox(&spec.name, spec.bounds, false)?,
            FieldKind::CheckboxGroup(bands) => {
                for band in bands {
                    self.doc.text(
                        &band.label,
                        band.label_right,
                        centered_baseline(band.center_y, style.font_size),
                        style.font_size,
                        FontStyle::Regular,
                        Align::Right,
                    );
                    self.doc.add_checkbox(&band.name, band.checkbox, false)?;
                }
            }
            FieldKind::Image { source } => {
                let (width, height) = self.images.dimensions(&source)?;
                let slot = spec.bounds.inset(style.cell_padding);
                let rect = fit_into(width as f32, height as f32, slot)?;
                self.doc.image(&source, rect);
            }
            FieldKind::Label { text } => self.doc.text(
                &text,
                cell.bounds.x + style.cell_padding,
                first_baseline(cell.bounds.y + style.cell_padding, style.font_size),
                style.font_size,
                FontStyle::Regular,
                Align::Left,
            ),
        }
        Ok(())
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    fn signatures(&mut self, slots: &[SignatureSlot], scope: NameScope<'_>) -> ReportResult<()> {
        let Some(mut cursor) = self.cursor else {
            debug!("no cursor before signature block, skipping");
            return Ok(());
        };

        let limit = self.page_height() - SIGNATURE_EDGE_CLEARANCE;
        if cursor + SIGNATURE_BLOCK_HEIGHT > limit {
            debug!(cursor, "signature block moves to a new page");
            self.begin_page()?;
            cursor = self.content_start;
        }

        for slot in slots {
            let signer = self.data.signers.get(&slot.key).map(String::as_str);
            let field_name = expand_name(&slot.field_name, 0, scope);
            if let Some(plan) = plan_signature(slot, signer, &field_name, Some(cursor)) {
                draw_signature(&mut self.doc, &plan)?;
            }
        }
        self.cursor = Some(cursor + SIGNATURE_BLOCK_HEIGHT);
        Ok(())
    }

    // ========================================================================
    // Asset groups
    // ========================================================================

    fn asset_groups(&mut self) -> ReportResult<()> {
        let template = self.template;
        let Some(assets) = template.assets.as_ref() else {
            return Err(ReportError::TemplateError("asset_groups section without an asset template".into()));
        };
        if self.data.assets.is_empty() {
            warn!("monthly report has no asset groups");
        }

        let data = self.data;
        for (i, group) in data.assets.iter().enumerate() {
            if i > 0 {
                self.begin_page()?;
            }
            debug!(asset = %group.asset_id, "asset group");
            self.asset_group(assets, group)?;
        }
        Ok(())
    }

    fn asset_group(&mut self, assets: &AssetTemplate, group: &AssetGroup) -> ReportResult<()> {
        let top = assets.content_top.max(self.content_start);
        self.doc.text(
            group.caption(),
            self.template.margins.left,
            first_baseline(top, assets.caption_size),
            assets.caption_size,
            FontStyle::Bold,
            Align::Left,
        );
        let y = top + line_height(assets.caption_size) + CAPTION_GAP;
        let bottom = self.page_height() - self.template.margins.bottom;
        let scope = NameScope {
            asset: Some(group.asset_id.as_str()),
        };

        match &group.section {
            AssetSection::Severity { table } => {
                let placement = TablePlacement {
                    table,
                    widths: &assets.severity_widths,
                    style: &assets.severity_style,
                    fields: &assets.severity_fields,
                    top,
                    bottom,
                };
                let final_y = self.draw_table(&placement, y, scope)?;
                self.cursor = Some(final_y);
                self.signatures(&assets.signatures, scope)
            }
            AssetSection::Charts {
                charts,
                summary_table,
            } => {
                let y = self.draw_charts(assets, charts, y)?;
                let no_fields = ColumnFieldMap::new();
                let placement = TablePlacement {
                    table: summary_table,
                    widths: &assets.summary_widths,
                    style: &assets.summary_style,
                    fields: &no_fields,
                    top,
                    bottom,
                };
                let final_y = self.draw_table(&placement, y, scope)?;
                self.cursor = Some(final_y);
                Ok(())
            }
        }
    }

    /// Three charts side by side in equal slots. Returns the y below them.
    fn draw_charts(&mut self, assets: &AssetTemplate, charts: &ChartSet, y: f32) -> ReportResult<f32> {
        let gap = assets.chart_gap;
        let slot_width = (self.content_width() - 2.0 * gap) / 3.0;
        let bottom = self.page_height() - self.template.margins.bottom;

        let mut y = y;
        if y + assets.chart_height > bottom {
            debug!(y, "charts move to a new page");
            self.begin_page()?;
            y = assets.content_top.max(self.content_start);
        }

        let mut x = self.template.margins.left;
        for source in charts.sources() {
            let (width, height) = self.images.dimensions(source)?;
            let slot = Rect::new(x, y, slot_width, assets.chart_height);
            let rect = fit_into(width as f32, height as f32, slot)?;
            self.doc.image(source, rect);
            x += slot_width + gap;
        }
        Ok(y + assets.chart_height + gap)
    }
}

/// Compose a report into a paginated document. Templates wider than the
/// page are shrunk to fit first.
pub fn compose(
    spec: &ReportSpec,
    template: &ReportTemplate,
    data: &ReportData,
    images: &ImageLibrary,
) -> ReportResult<Document> {
    let page_size = spec.page_format.size_mm(spec.orientation);
    let content_width = page_size.width - template.margins.left - template.margins.right;
    let fitted = template.fitted_to(content_width);
    ReportComposer::new(spec, &fitted, data, images)?.compose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DrawOp;
    use crate::geometry::{Orientation, PageFormat};
    use crate::request::{parse_date, CellValue, ReportKind};
    use ::image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn spec(kind: ReportKind) -> ReportSpec {
        ReportSpec::new(
            kind,
            parse_date("2024-06-17").unwrap(),
            Some(parse_date("2024-06-23").unwrap()),
            PageFormat::A3,
            Orientation::Portrait,
        )
        .unwrap()
    }

    fn text(s: &str) -> Option<CellValue> {
        Some(CellValue::Text(s.to_string()))
    }

    fn rows(count: usize, columns: usize) -> DataTable {
        DataTable {
            head: (0..columns).map(|i| format!("K{}", i)).collect(),
            rows: (0..count)
                .map(|r| {
                    let mut row = vec![text(&(r + 1).to_string())];
                    row.resize(columns, text("-"));
                    row
                })
                .collect(),
        }
    }

    fn picture(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 200, 200])))
    }

    fn field_names(doc: &Document) -> Vec<&str> {
        doc.fields().iter().map(|f| f.name.as_str()).collect()
    }

    fn images(doc: &Document, page: usize) -> Vec<(String, Rect)> {
        doc.pages()[page]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { source, rect } => Some((source.clone(), *rect)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn daily_table_repeats_header_on_every_page() {
        let data = ReportData {
            table: Some(rows(10, 16)),
            ..ReportData::default()
        };
        let doc = compose(
            &spec(ReportKind::Daily),
            &ReportTemplate::daily(),
            &data,
            &ImageLibrary::new(),
        )
        .unwrap();

        assert_eq!(doc.page_count(), 2);
        for page in 0..doc.page_count() {
            assert!(doc.page_text(page).contains(&"LAPORAN INSPEKSI HARIAN"));
            assert!(doc.page_text(page).contains(&"K0"));
        }

        let jangkauan = doc.field("Jangkauan").unwrap();
        assert_eq!(jangkauan.widgets.len(), 2);
        for row in 0..10 {
            assert!(doc.field(&format!("Fungsi_{}", row)).is_some());
        }
        // Checker has no configured name, so the signature is a field
        assert_eq!(doc.field("Signer").unwrap().widgets[0].page, 1);
    }

    #[test]
    fn weekly_rows_get_indexed_fields() {
        let data = ReportData {
            table: Some(rows(2, 12)),
            ..ReportData::default()
        };
        let doc = compose(
            &spec(ReportKind::Weekly),
            &ReportTemplate::weekly(),
            &data,
            &ImageLibrary::new(),
        )
        .unwrap();

        assert_eq!(
            field_names(&doc),
            vec![
                "inspektor_1",
                "inspektor_2",
                "inspektor_3",
                "Rekomendasi_PS_0",
                "Rekomendasi_PP_0",
                "PS_0",
                "PP_0",
                "Catatan_0",
                "Rekomendasi_PS_1",
                "Rekomendasi_PP_1",
                "PS_1",
                "PP_1",
                "Catatan_1",
                "Signer",
            ]
        );

        let text = doc.page_text(0);
        assert!(text.contains(&": 17-Jun-24 s/d 23-Jun-24"));
        assert!(text.contains(&"Haries Istyawan"));
        assert!(text.contains(&"Diperiksa oleh,"));
    }

    #[test]
    fn supplied_signer_replaces_placeholder() {
        let mut data = ReportData {
            table: Some(rows(1, 12)),
            ..ReportData::default()
        };
        data.signers.insert("checker".into(), "Budi Santoso".into());
        let doc = compose(
            &spec(ReportKind::Weekly),
            &ReportTemplate::weekly(),
            &data,
            &ImageLibrary::new(),
        )
        .unwrap();
        assert!(doc.field("Signer").is_none());
        assert!(doc.page_text(0).contains(&"Budi Santoso"));
    }

    #[test]
    fn signature_block_overflowing_the_page_moves_down_a_page() {
        let mut template = ReportTemplate::weekly();
        if let Some(table) = template.table.as_mut() {
            table.reserve_bottom = 14.0;
        }
        let data = ReportData {
            table: Some(rows(8, 12)),
            ..ReportData::default()
        };
        let doc = compose(&spec(ReportKind::Weekly), &template, &data, &ImageLibrary::new()).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(!doc.page_text(0).contains(&"Diperiksa oleh,"));
        assert!(doc.page_text(1).contains(&"Diperiksa oleh,"));
        assert_eq!(doc.field("Signer").unwrap().widgets[0].page, 1);
        assert_eq!(doc.field("inspektor_1").unwrap().widgets.len(), 2);
    }

    #[test]
    fn signatures_without_a_cursor_are_skipped() {
        let mut template = ReportTemplate::weekly();
        template.sections.reverse();
        let data = ReportData {
            table: Some(rows(1, 12)),
            ..ReportData::default()
        };
        let doc = compose(&spec(ReportKind::Weekly), &template, &data, &ImageLibrary::new()).unwrap();
        assert!(doc.field("Signer").is_none());
        assert!(!doc.page_text(0).contains(&"Disetujui oleh,"));
    }

    #[test]
    fn missing_table_is_not_found() {
        let result = compose(
            &spec(ReportKind::Daily),
            &ReportTemplate::daily(),
            &ReportData::default(),
            &ImageLibrary::new(),
        );
        assert!(matches!(result, Err(ReportError::NotFound(_))));
    }

    #[test]
    fn photo_cells_are_fitted_inside_their_cell() {
        let mut table = rows(2, 16);
        table.rows[0][15] = Some(CellValue::Image {
            image: "foto/km10.jpg".into(),
        });
        let data = ReportData {
            table: Some(table),
            ..ReportData::default()
        };
        let mut library = ImageLibrary::new();
        library.insert("foto/km10.jpg", picture(400, 300));

        let doc = compose(&spec(ReportKind::Daily), &ReportTemplate::daily(), &data, &library).unwrap();
        let placed = images(&doc, 0);
        assert_eq!(placed.len(), 1);

        let (source, rect) = &placed[0];
        assert_eq!(source, "foto/km10.jpg");
        // Column 15 spans x 233..283 on a 50mm row
        assert!(rect.x >= 233.0 && rect.right() <= 283.0 + 1e-3);
        assert!((rect.width / rect.height - 4.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn missing_photo_is_not_found() {
        let mut table = rows(1, 16);
        table.rows[0][15] = Some(CellValue::Image {
            image: "foto/hilang.jpg".into(),
        });
        let data = ReportData {
            table: Some(table),
            ..ReportData::default()
        };
        let result = compose(
            &spec(ReportKind::Daily),
            &ReportTemplate::daily(),
            &data,
            &ImageLibrary::new(),
        );
        assert!(matches!(result, Err(ReportError::NotFound(_))));
    }

    fn severity_group(asset: &str) -> AssetGroup {
        AssetGroup {
            asset_id: asset.into(),
            title: None,
            section: AssetSection::Severity { table: rows(2, 6) },
        }
    }

    fn chart_group(asset: &str) -> AssetGroup {
        AssetGroup {
            asset_id: asset.into(),
            title: Some("Rekap Marka".into()),
            section: AssetSection::Charts {
                charts: ChartSet {
                    summary: "pie.png".into(),
                    volume: "volume.png".into(),
                    risk: "risk.png".into(),
                },
                summary_table: rows(3, 4),
            },
        }
    }

    fn chart_library() -> ImageLibrary {
        let mut library = ImageLibrary::new();
        library.insert("pie.png", picture(300, 300));
        library.insert("volume.png", picture(600, 300));
        library.insert("risk.png", picture(300, 600));
        library
    }

    #[test]
    fn monthly_groups_break_between_but_not_after() {
        let data = ReportData {
            assets: vec![severity_group("rambu"), severity_group("marka"), chart_group("rekap")],
            ..ReportData::default()
        };
        let doc = compose(
            &spec(ReportKind::Monthly),
            &ReportTemplate::monthly(),
            &data,
            &chart_library(),
        )
        .unwrap();

        assert_eq!(doc.page_count(), 3);
        assert!(doc.page_text(0).contains(&"rambu"));
        assert!(doc.page_text(1).contains(&"marka"));
        assert!(doc.page_text(2).contains(&"Rekap Marka"));

        for name in [
            "rambu_Ringan_0",
            "rambu_Berat_1",
            "rambu_Project Based_0",
            "Catatan_rambu_1",
            "marka_Sedang_0",
            "Signer_rambu",
            "Signer_marka",
        ] {
            assert!(doc.field(name).is_some(), "missing {}", name);
        }
        assert!(doc.field("Signer_rekap").is_none());
    }

    #[test]
    fn charts_share_the_row_in_equal_slots() {
        let data = ReportData {
            assets: vec![chart_group("rekap")],
            ..ReportData::default()
        };
        let doc = compose(
            &spec(ReportKind::Monthly),
            &ReportTemplate::monthly(),
            &data,
            &chart_library(),
        )
        .unwrap();

        let placed = images(&doc, 0);
        assert_eq!(placed.len(), 3);
        let slot_width = (269.0 - 10.0) / 3.0;
        for (i, (_, rect)) in placed.iter().enumerate() {
            let slot_x = 14.0 + i as f32 * (slot_width + 5.0);
            assert!(rect.x >= slot_x - 1e-3);
            assert!(rect.right() <= slot_x + slot_width + 1e-3);
            assert!(rect.height <= 80.0 + 1e-3);
        }
        // Square chart in a wide slot is height bound
        assert!((placed[0].1.height - 80.0).abs() < 1e-3);
    }

    #[test]
    fn missing_chart_is_not_found() {
        let data = ReportData {
            assets: vec![chart_group("rekap")],
            ..ReportData::default()
        };
        let result = compose(
            &spec(ReportKind::Monthly),
            &ReportTemplate::monthly(),
            &data,
            &ImageLibrary::new(),
        );
        assert!(matches!(result, Err(ReportError::NotFound(_))));
    }

    #[test]
    fn a4_portrait_daily_stays_inside_the_page() {
        let a4 = ReportSpec::new(
            ReportKind::Daily,
            parse_date("2024-06-19").unwrap(),
            None,
            PageFormat::A4,
            Orientation::Portrait,
        )
        .unwrap();
        let data = ReportData {
            table: Some(rows(2, 16)),
            ..ReportData::default()
        };
        let doc = compose(&a4, &ReportTemplate::daily(), &data, &ImageLibrary::new()).unwrap();

        let right = 210.0 - 14.0 + 0.01;
        for page in doc.pages() {
            for op in &page.ops {
                if let DrawOp::Line { x1, x2, .. } = op {
                    assert!(x1.max(*x2) <= right, "line reaches x {}", x1.max(*x2));
                }
            }
        }
        for field in doc.fields() {
            for widget in &field.widgets {
                assert!(widget.rect.right() <= right, "{} ends at {}", field.name, widget.rect.right());
            }
        }
        let signer = &doc.field("Signer").unwrap().widgets[0].rect;
        assert!(signer.x > 105.0, "checker stays on the right half");
    }

    #[test]
    fn composer_rejects_a_template_wider_than_the_page() {
        let a4 = ReportSpec::new(
            ReportKind::Weekly,
            parse_date("2024-06-17").unwrap(),
            None,
            PageFormat::A4,
            Orientation::Portrait,
        )
        .unwrap();
        let data = ReportData::default();
        let images = ImageLibrary::new();
        let template = ReportTemplate::weekly();
        let result = ReportComposer::new(&a4, &template, &data, &images);
        assert!(matches!(result, Err(ReportError::TemplateError(_))));
    }

    #[test]
    fn report_id_is_short_uppercase_hex() {
        let id = generate_report_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
