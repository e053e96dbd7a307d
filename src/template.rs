// inspection-report: declarative report templates
//
// A report kind is data, not a type: the page header, the ordered sections
// and the column-to-field maps all live in a ReportTemplate. The built-in
// templates reproduce the daily, weekly and monthly road inspection forms;
// others can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};
use crate::layout::TableStyle;
use crate::overlay::{ColumnFieldMap, FieldTemplate};
use crate::request::ReportKind;
use crate::signature::SignatureSlot;

const COMPANY: &str = "PT ASTRA TOL NUSANTARA - ASTRA INFRA SOLUTIONS";

/// Page margins in mm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 14.0,
            right: 14.0,
            top: 14.0,
            bottom: 14.0,
        }
    }
}

/// A key/value line in the letterhead's right-hand column. An empty value
/// becomes a fillable field named after the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    /// May use `{start}`, `{end}`, `{site}`, `{weather}`, `{inspectors}`
    #[serde(default)]
    pub value: String,
    /// Used when `value` expands to nothing
    #[serde(default)]
    pub fallback: String,
}

impl MetadataEntry {
    fn new(key: &str, value: &str, fallback: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            fallback: fallback.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Letterhead {
    pub company: String,
    pub title: String,
    /// Total grid rows; the company takes the first `company_rows`
    pub rows: usize,
    pub company_rows: usize,
    pub row_height: f32,
    pub logo_column_width: f32,
    /// Box the logo is fitted into
    pub logo_box: (f32, f32),
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default)]
    pub metadata_column_width: f32,
    pub font_size: f32,
}

impl Letterhead {
    fn new(title: &str, rows: usize, company_rows: usize) -> Self {
        Self {
            company: COMPANY.to_string(),
            title: title.to_string(),
            rows,
            company_rows,
            row_height: 7.5,
            logo_column_width: 70.0,
            logo_box: (60.0, 15.0),
            metadata: Vec::new(),
            metadata_column_width: 0.0,
            font_size: 10.0,
        }
    }

    pub fn height(&self) -> f32 {
        self.rows as f32 * self.row_height
    }
}

/// Borderless key/value table drawn under the letterhead on every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoBlock {
    pub widths: Vec<f32>,
    pub style: TableStyle,
    /// Cell text, may use the same placeholders as metadata values
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub fields: ColumnFieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageHeader {
    pub letterhead: Letterhead,
    #[serde(default)]
    pub info: Option<InfoBlock>,
}

/// The main data table of daily and weekly reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTemplate {
    #[serde(default)]
    pub widths: Vec<f32>,
    pub style: TableStyle,
    /// Where the table starts on every page
    pub content_top: f32,
    /// Space kept free at the bottom of every page
    pub reserve_bottom: f32,
    #[serde(default)]
    pub fields: ColumnFieldMap,
}

/// Per-asset sections of the monthly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTemplate {
    pub content_top: f32,
    pub caption_size: f32,
    #[serde(default)]
    pub severity_widths: Vec<f32>,
    pub severity_style: TableStyle,
    #[serde(default)]
    pub severity_fields: ColumnFieldMap,
    #[serde(default)]
    pub signatures: Vec<SignatureSlot>,
    #[serde(default)]
    pub summary_widths: Vec<f32>,
    pub summary_style: TableStyle,
    pub chart_height: f32,
    pub chart_gap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    MainTable,
    AssetGroups,
    Signatures { slots: Vec<SignatureSlot> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub kind: ReportKind,
    pub document_title: String,
    #[serde(default)]
    pub margins: Margins,
    pub header: PageHeader,
    #[serde(default)]
    pub table: Option<TableTemplate>,
    #[serde(default)]
    pub assets: Option<AssetTemplate>,
    pub sections: Vec<Section>,
}

fn slot(key: &str, preamble: &str, name: Option<&str>, role: &str, center_x: f32, field: &str) -> SignatureSlot {
    SignatureSlot {
        key: key.to_string(),
        preamble: preamble.to_string(),
        name: name.map(String::from),
        role: role.to_string(),
        center_x,
        field_name: field.to_string(),
    }
}

fn approver(field: &str) -> SignatureSlot {
    slot(
        "approver",
        "Disetujui oleh,",
        Some("Haries Istyawan"),
        "Kasie Layanan Pemeliharaan",
        70.0,
        field,
    )
}

fn checker(field: &str) -> SignatureSlot {
    slot("checker", "Diperiksa oleh,", None, "Staff Inspeksi", 230.0, field)
}

fn period_info_block() -> InfoBlock {
    InfoBlock {
        widths: vec![30.0, 50.0],
        style: TableStyle {
            font_size: 8.0,
            cell_padding: 1.0,
            line_width: 0.0,
            show_head: false,
            ..TableStyle::default()
        },
        rows: vec![
            vec!["Periode Inspeksi".into(), ": {start} s/d {end}".into()],
            vec!["Inspektor".into(), ": 1. ".into()],
            vec![String::new(), ": 2. ".into()],
            vec![String::new(), ": 3. ".into()],
        ],
        fields: ColumnFieldMap::new().with(
            1,
            FieldTemplate::text("inspektor").with_padding(6.0, 0.0).from_row(1),
        ),
    }
}

impl ReportTemplate {
    pub fn for_kind(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Daily => Self::daily(),
            ReportKind::Weekly => Self::weekly(),
            ReportKind::Monthly => Self::monthly(),
        }
    }

    pub fn daily() -> Self {
        let mut letterhead = Letterhead::new("LAPORAN INSPEKSI HARIAN", 5, 2);
        letterhead.metadata_column_width = 70.0;
        letterhead.metadata = vec![
            MetadataEntry::new("Hari/Tanggal", "{start}", ""),
            MetadataEntry::new("Cuaca", "{weather}", "Cerah/Hujan"),
            MetadataEntry::new("Inspektor", "{inspectors}", ""),
            MetadataEntry::new("Jangkauan", "", ""),
            MetadataEntry::new("Site/Lokasi", "{site}", "Jombang - Mojokerto"),
        ];

        Self {
            kind: ReportKind::Daily,
            document_title: "Laporan Inspeksi Harian".to_string(),
            margins: Margins::default(),
            header: PageHeader {
                letterhead,
                info: None,
            },
            table: Some(TableTemplate {
                widths: vec![
                    9.0, 20.0, 20.0, 15.0, 15.0, 15.0, 15.0, 15.0, 10.0, 10.0, 10.0, 10.0, 15.0,
                    15.0, 25.0, 50.0,
                ],
                style: TableStyle {
                    head_min_height: 10.0,
                    body_min_height: 50.0,
                    ..TableStyle::default()
                },
                content_top: 55.0,
                reserve_bottom: 44.0,
                fields: ColumnFieldMap::new()
                    .with(13, FieldTemplate::text("Fungsi"))
                    .with(15, FieldTemplate::image()),
            }),
            assets: None,
            sections: vec![
                Section::MainTable,
                Section::Signatures {
                    slots: vec![checker("Signer")],
                },
            ],
        }
    }

    pub fn weekly() -> Self {
        Self {
            kind: ReportKind::Weekly,
            document_title: "Laporan Inspeksi Mingguan".to_string(),
            margins: Margins::default(),
            header: PageHeader {
                letterhead: Letterhead::new("LAPORAN INSPEKSI MINGGUAN", 2, 1),
                info: Some(period_info_block()),
            },
            table: Some(TableTemplate {
                widths: vec![9.0, 25.0, 30.0, 15.0, 15.0, 15.0, 30.0, 40.0, 40.0, 10.0, 10.0, 30.0],
                style: TableStyle {
                    head_min_height: 10.0,
                    body_min_height: 42.0,
                    ..TableStyle::default()
                },
                content_top: 60.0,
                reserve_bottom: 45.0,
                fields: ColumnFieldMap::new()
                    .with(7, FieldTemplate::text("Rekomendasi_PS"))
                    .with(8, FieldTemplate::text("Rekomendasi_PP"))
                    .with(9, FieldTemplate::checkbox("PS"))
                    .with(10, FieldTemplate::checkbox("PP"))
                    .with(11, FieldTemplate::text("Catatan")),
            }),
            assets: None,
            sections: vec![
                Section::MainTable,
                Section::Signatures {
                    slots: vec![approver("Approver"), checker("Signer")],
                },
            ],
        }
    }

    pub fn monthly() -> Self {
        Self {
            kind: ReportKind::Monthly,
            document_title: "Laporan Inspeksi Bulanan".to_string(),
            margins: Margins::default(),
            header: PageHeader {
                letterhead: Letterhead::new("LAPORAN INSPEKSI BULANAN", 2, 1),
                info: Some(period_info_block()),
            },
            table: None,
            assets: Some(AssetTemplate {
                content_top: 60.0,
                caption_size: 12.0,
                severity_widths: vec![9.0, 50.0, 60.0, 45.0, 55.0, 50.0],
                severity_style: TableStyle {
                    font_size: 7.0,
                    head_min_height: 10.0,
                    body_min_height: 20.0,
                    ..TableStyle::default()
                },
                severity_fields: ColumnFieldMap::new()
                    .with(
                        3,
                        FieldTemplate::checkbox_group(&["Ringan", "Sedang", "Berat"])
                            .with_prefix("{asset}"),
                    )
                    .with(
                        4,
                        FieldTemplate::checkbox_group(&["Rutin", "RR", "Project Based"])
                            .with_prefix("{asset}"),
                    )
                    .with(5, FieldTemplate::text("Catatan_{asset}")),
                signatures: vec![approver("Approver_{asset}"), checker("Signer_{asset}")],
                summary_widths: Vec::new(),
                summary_style: TableStyle {
                    font_size: 8.0,
                    head_min_height: 8.0,
                    body_min_height: 7.0,
                    ..TableStyle::default()
                },
                chart_height: 80.0,
                chart_gap: 5.0,
            }),
            sections: vec![Section::AssetGroups],
        }
    }

    pub fn from_json(json: &str) -> ReportResult<Self> {
        let template: Self = serde_json::from_str(json)
            .map_err(|e| ReportError::TemplateError(format!("Invalid JSON: {}", e)))?;
        template.validate()?;
        Ok(template)
    }

    /// Width the fixed geometry needs: the widest of the table columns,
    /// the info block and the letterhead side columns.
    pub fn required_width(&self) -> f32 {
        let letterhead = &self.header.letterhead;
        let mut widths = vec![letterhead.logo_column_width + letterhead.metadata_column_width];
        if let Some(info) = &self.header.info {
            widths.push(info.widths.iter().sum());
        }
        if let Some(table) = &self.table {
            widths.push(table.widths.iter().sum());
        }
        if let Some(assets) = &self.assets {
            widths.push(assets.severity_widths.iter().sum());
            widths.push(assets.summary_widths.iter().sum());
        }
        widths.into_iter().fold(0.0, f32::max)
    }

    /// Copy of the template shrunk to `content_width`. Column widths, the
    /// letterhead side columns and signature positions all scale by the
    /// same factor; a template that already fits comes back unchanged.
    pub fn fitted_to(&self, content_width: f32) -> Self {
        let required = self.required_width();
        let mut fitted = self.clone();
        if required <= content_width || required <= 0.0 {
            return fitted;
        }

        let factor = content_width / required;
        let left = self.margins.left;
        let scale = |widths: &mut Vec<f32>| widths.iter_mut().for_each(|w| *w *= factor);
        let place = |slots: &mut Vec<SignatureSlot>| {
            for slot in slots {
                slot.center_x = left + (slot.center_x - left) * factor;
            }
        };

        let letterhead = &mut fitted.header.letterhead;
        letterhead.logo_column_width *= factor;
        letterhead.metadata_column_width *= factor;
        letterhead.logo_box = (letterhead.logo_box.0 * factor, letterhead.logo_box.1);
        if let Some(info) = fitted.header.info.as_mut() {
            scale(&mut info.widths);
        }
        if let Some(table) = fitted.table.as_mut() {
            scale(&mut table.widths);
        }
        if let Some(assets) = fitted.assets.as_mut() {
            scale(&mut assets.severity_widths);
            scale(&mut assets.summary_widths);
            place(&mut assets.signatures);
        }
        for section in &mut fitted.sections {
            if let Section::Signatures { slots } = section {
                place(slots);
            }
        }
        fitted
    }

    /// Reject templates whose sections reference missing parts.
    pub fn validate(&self) -> ReportResult<()> {
        let letterhead = &self.header.letterhead;
        if letterhead.rows == 0 || letterhead.company_rows >= letterhead.rows {
            return Err(ReportError::TemplateError(format!(
                "letterhead needs more rows ({}) than company rows ({})",
                letterhead.rows, letterhead.company_rows
            )));
        }
        if letterhead.row_height <= 0.0 {
            return Err(ReportError::TemplateError("letterhead row height must be positive".into()));
        }

        for section in &self.sections {
            match section {
                Section::MainTable if self.table.is_none() => {
                    return Err(ReportError::TemplateError(
                        "main_table section without a table template".into(),
                    ));
                }
                Section::AssetGroups if self.assets.is_none() => {
                    return Err(ReportError::TemplateError(
                        "asset_groups section without an asset template".into(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
