// inspection-report: report input model

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};
use crate::geometry::{Orientation, PageFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

/// What was requested: kind, period and paper. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSpec {
    pub kind: ReportKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub page_format: PageFormat,
    pub orientation: Orientation,
}

impl ReportSpec {
    pub fn new(
        kind: ReportKind,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        page_format: PageFormat,
        orientation: Orientation,
    ) -> ReportResult<Self> {
        let end_date = end_date.unwrap_or(start_date);
        if end_date < start_date {
            return Err(ReportError::InvalidDateRange {
                start: start_date.format("%Y-%m-%d").to_string(),
                end: end_date.format("%Y-%m-%d").to_string(),
            });
        }
        Ok(Self {
            kind,
            start_date,
            end_date,
            page_format,
            orientation,
        })
    }

    pub fn start_display(&self) -> String {
        format_date_display(&self.start_date)
    }

    pub fn end_display(&self) -> String {
        format_date_display(&self.end_date)
    }
}

pub fn parse_date(s: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ReportError::DateError(s.to_string()))
}

/// Short date as printed on the reports, e.g. `19-Jun-24`
pub fn format_date_display(date: &NaiveDate) -> String {
    date.format("%d-%b-%y").to_string()
}

/// Raw content of one table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Image { image: String },
}

impl CellValue {
    /// Text drawn inside the cell. Image references are never printed.
    pub fn display_text(&self) -> &str {
        match self {
            CellValue::Text(s) => s,
            CellValue::Image { .. } => "",
        }
    }

    /// Image source carried by the cell. Plain text is never an image.
    pub fn image_source(&self) -> Option<&str> {
        match self {
            CellValue::Image { image } if !image.trim().is_empty() => Some(image.trim()),
            _ => None,
        }
    }
}

/// A data table: one head row and any number of body rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    #[serde(default)]
    pub head: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Option<CellValue>>>,
}

impl DataTable {
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.head.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column)).and_then(Option::as_ref)
    }

    /// Every image source referenced by the body.
    pub fn image_sources(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flatten()
            .flatten()
            .filter_map(CellValue::image_source)
    }
}

/// Three chart renderings of one asset type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSet {
    pub summary: String,
    pub volume: String,
    pub risk: String,
}

impl ChartSet {
    pub fn sources(&self) -> [&str; 3] {
        [&self.summary, &self.volume, &self.risk]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetSection {
    Severity {
        table: DataTable,
    },
    Charts {
        charts: ChartSet,
        summary_table: DataTable,
    },
}

/// One asset type in the monthly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGroup {
    pub asset_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub section: AssetSection,
}

impl AssetGroup {
    pub fn caption(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.asset_id)
    }
}

/// Business data for one report, read from the input JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub inspectors: Vec<String>,
    #[serde(default)]
    pub table: Option<DataTable>,
    #[serde(default)]
    pub assets: Vec<AssetGroup>,
    /// Signer name per signature slot key
    #[serde(default)]
    pub signers: BTreeMap<String, String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl ReportData {
    pub fn from_json(json: &str) -> ReportResult<Self> {
        serde_json::from_str(json).map_err(|e| ReportError::InputError(format!("Invalid JSON: {}", e)))
    }

    /// Every image source the report will need, logo included.
    pub fn image_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        let mut push = |s: &str| {
            if !sources.iter().any(|existing| existing == s) {
                sources.push(s.to_string());
            }
        };

        if let Some(logo) = self.logo.as_deref() {
            push(logo);
        }
        if let Some(table) = &self.table {
            table.image_sources().for_each(&mut push);
        }
        for group in &self.assets {
            match &group.section {
                AssetSection::Severity { table } => table.image_sources().for_each(&mut push),
                AssetSection::Charts {
                    charts,
                    summary_table,
                } => {
                    charts.sources().into_iter().for_each(&mut push);
                    summary_table.image_sources().for_each(&mut push);
                }
            }
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn end_date_defaults_to_start() {
        let d = parse_date("2024-06-19").unwrap();
        let spec = ReportSpec::new(ReportKind::Daily, d, None, PageFormat::A3, Orientation::Portrait)
            .unwrap();
        assert_eq!(spec.end_date, d);
        assert_eq!(spec.start_display(), "19-Jun-24");
    }

    #[test]
    fn rejects_reversed_period() {
        let start = parse_date("2024-06-23").unwrap();
        let end = parse_date("2024-06-17").unwrap();
        let err = ReportSpec::new(
            ReportKind::Weekly,
            start,
            Some(end),
            PageFormat::A3,
            Orientation::Portrait,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidDateRange { .. }));
    }

    #[test]
    fn rejects_bad_date() {
        assert!(matches!(parse_date("19/06/2024"), Err(ReportError::DateError(_))));
    }

    #[test]
    fn parses_cells_and_asset_groups() {
        let json = r#"{
            "site": "Jombang - Mojokerto",
            "table": {
                "head": ["No", "Foto"],
                "rows": [["1", {"image": "photos/a.jpg"}], ["2", null]]
            },
            "assets": [
                {"asset_id": "rambu", "section": {"kind": "severity", "table": {"head": ["No"], "rows": []}}},
                {"asset_id": "marka", "title": "Marka Jalan", "section": {
                    "kind": "charts",
                    "charts": {"summary": "charts/s.png", "volume": "charts/v.png", "risk": "charts/r.png"},
                    "summary_table": {"head": ["Item"], "rows": [["Panjang"]]}
                }}
            ],
            "signers": {"checker": "Budi"}
        }"#;

        let data = ReportData::from_json(json).unwrap();
        let table = data.table.as_ref().unwrap();
        assert_eq!(table.cell(0, 0), Some(&CellValue::Text("1".into())));
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(data.assets[0].caption(), "rambu");
        assert_eq!(data.assets[1].caption(), "Marka Jalan");
        assert_eq!(
            data.image_sources(),
            vec![
                "photos/a.jpg".to_string(),
                "charts/s.png".to_string(),
                "charts/v.png".to_string(),
                "charts/r.png".to_string(),
            ]
        );
    }

    #[test]
    fn empty_image_reference_has_no_source() {
        let v = CellValue::Image { image: "  ".into() };
        assert_eq!(v.image_source(), None);
        assert_eq!(v.display_text(), "");
    }
}
