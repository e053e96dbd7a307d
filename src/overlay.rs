// inspection-report: column-driven form field overlays
//
// A ColumnFieldMap says which form control sits on top of the cells of a
// column. Resolution is pure: it only computes names and geometry, the
// composer decides what to emit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Padding, Rect};
use crate::layout::TableCell;

/// Side length of a checkbox widget in mm
pub const CHECKBOX_SIZE: f32 = 5.0;

/// Gap between a checkbox group label and its box
const GROUP_LABEL_GAP: f32 = 1.5;

/// Placeholder replaced by the row index
const ROW_PLACEHOLDER: &str = "{row}";

/// Placeholder replaced by the asset id of monthly sections
const ASSET_PLACEHOLDER: &str = "{asset}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldTemplate {
    TextField {
        name: String,
        #[serde(default)]
        padding: Padding,
        #[serde(default)]
        from_row: usize,
    },
    Checkbox {
        name: String,
        #[serde(default)]
        from_row: usize,
    },
    CheckboxGroup {
        options: Vec<String>,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        from_row: usize,
    },
    Image {
        #[serde(default)]
        padding: Padding,
    },
    Label {
        text: String,
        #[serde(default)]
        from_row: usize,
    },
}

impl FieldTemplate {
    /// Text field named `<label>_<row>`.
    pub fn text(label: &str) -> Self {
        FieldTemplate::TextField {
            name: format!("{}_{}", label, ROW_PLACEHOLDER),
            padding: Padding::NONE,
            from_row: 0,
        }
    }

    /// Checkbox named `<label>_<row>`.
    pub fn checkbox(label: &str) -> Self {
        FieldTemplate::Checkbox {
            name: format!("{}_{}", label, ROW_PLACEHOLDER),
            from_row: 0,
        }
    }

    pub fn checkbox_group(options: &[&str]) -> Self {
        FieldTemplate::CheckboxGroup {
            options: options.iter().map(|o| o.to_string()).collect(),
            prefix: None,
            from_row: 0,
        }
    }

    pub fn image() -> Self {
        FieldTemplate::Image {
            padding: Padding::NONE,
        }
    }

    pub fn with_padding(mut self, x: f32, y: f32) -> Self {
        match &mut self {
            FieldTemplate::TextField { padding, .. } | FieldTemplate::Image { padding } => {
                *padding = Padding::new(x, y);
            }
            _ => {}
        }
        self
    }

    pub fn from_row(mut self, first: usize) -> Self {
        match &mut self {
            FieldTemplate::TextField { from_row, .. }
            | FieldTemplate::Checkbox { from_row, .. }
            | FieldTemplate::CheckboxGroup { from_row, .. }
            | FieldTemplate::Label { from_row, .. } => *from_row = first,
            FieldTemplate::Image { .. } => {}
        }
        self
    }

    pub fn with_prefix(mut self, value: &str) -> Self {
        if let FieldTemplate::CheckboxGroup { prefix, .. } = &mut self {
            *prefix = Some(value.to_string());
        }
        self
    }

    fn first_row(&self) -> usize {
        match self {
            FieldTemplate::TextField { from_row, .. }
            | FieldTemplate::Checkbox { from_row, .. }
            | FieldTemplate::CheckboxGroup { from_row, .. }
            | FieldTemplate::Label { from_row, .. } => *from_row,
            FieldTemplate::Image { .. } => 0,
        }
    }
}

/// Values substituted into name templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameScope<'a> {
    pub asset: Option<&'a str>,
}

/// Expand `{row}` and `{asset}` in a name template.
pub fn expand_name(template: &str, row: usize, scope: NameScope<'_>) -> String {
    let name = template.replace(ROW_PLACEHOLDER, &row.to_string());
    match scope.asset {
        Some(asset) => name.replace(ASSET_PLACEHOLDER, asset),
        None => name,
    }
}

/// One checkbox of a group with the label drawn beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckboxBand {
    pub label: String,
    pub name: String,
    /// The band's share of the cell
    pub band: Rect,
    /// The checkbox widget
    pub checkbox: Rect,
    /// Right edge of the label text
    pub label_right: f32,
    /// Vertical centre of the band
    pub center_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    None,
    TextField,
    Checkbox,
    CheckboxGroup(Vec<CheckboxBand>),
    Image { source: String },
    Label { text: String },
}

/// What to place over one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub name: String,
    pub bounds: Rect,
}

impl FieldSpec {
    pub fn none(bounds: Rect) -> Self {
        Self {
            kind: FieldKind::None,
            name: String::new(),
            bounds,
        }
    }

    pub fn text_field(name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            kind: FieldKind::TextField,
            name: name.into(),
            bounds,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, FieldKind::None)
    }
}

/// Column index to field template, fixed per report template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnFieldMap(BTreeMap<usize, FieldTemplate>);

impl ColumnFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: usize, template: FieldTemplate) -> Self {
        self.0.insert(column, template);
        self
    }

    pub fn get(&self, column: usize) -> Option<&FieldTemplate> {
        self.0.get(&column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve the overlay for a laid-out body cell.
    pub fn resolve(&self, cell: &TableCell, scope: NameScope<'_>) -> FieldSpec {
        let Some(template) = self.get(cell.column_index) else {
            return FieldSpec::none(cell.bounds);
        };
        if cell.row_index < template.first_row() {
            return FieldSpec::none(cell.bounds);
        }

        let row = cell.row_index;
        let bounds = cell.bounds;
        match template {
            FieldTemplate::TextField { name, padding, .. } => FieldSpec {
                kind: FieldKind::TextField,
                name: expand_name(name, row, scope),
                bounds: bounds.shrink(*padding),
            },
            FieldTemplate::Checkbox { name, .. } => FieldSpec {
                kind: FieldKind::Checkbox,
                name: expand_name(name, row, scope),
                bounds: centered_checkbox(bounds),
            },
            FieldTemplate::CheckboxGroup {
                options, prefix, ..
            } => FieldSpec {
                kind: FieldKind::CheckboxGroup(checkbox_bands(
                    bounds,
                    options,
                    prefix.as_deref(),
                    row,
                    scope,
                )),
                name: String::new(),
                bounds,
            },
            FieldTemplate::Image { padding } => {
                match cell.raw.as_ref().and_then(|v| v.image_source()) {
                    Some(source) => FieldSpec {
                        kind: FieldKind::Image {
                            source: source.to_string(),
                        },
                        name: String::new(),
                        bounds: bounds.shrink(*padding),
                    },
                    // No photo for this row
                    None => FieldSpec::none(bounds),
                }
            }
            FieldTemplate::Label { text, .. } => FieldSpec {
                kind: FieldKind::Label {
                    text: expand_name(text, row, scope),
                },
                name: String::new(),
                bounds,
            },
        }
    }
}

/// Resolve by indices alone, for callers that only know the grid position.
pub fn resolve(
    column_index: usize,
    row_index: usize,
    bounds: Rect,
    map: &ColumnFieldMap,
) -> FieldSpec {
    let cell = TableCell::body(row_index, column_index, bounds, None);
    map.resolve(&cell, NameScope::default())
}

fn centered_checkbox(cell: Rect) -> Rect {
    let size = CHECKBOX_SIZE.min(cell.width).min(cell.height);
    Rect::new(
        cell.center_x() - size / 2.0,
        cell.center_y() - size / 2.0,
        size,
        size,
    )
}

fn checkbox_bands(
    cell: Rect,
    options: &[String],
    prefix: Option<&str>,
    row: usize,
    scope: NameScope<'_>,
) -> Vec<CheckboxBand> {
    if options.is_empty() {
        return Vec::new();
    }

    let band_height = cell.height / options.len() as f32;
    let size = CHECKBOX_SIZE.min(band_height).min(cell.width);

    options
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let band = Rect::new(cell.x, cell.y + band_height * i as f32, cell.width, band_height);
            let center_y = band.center_y();
            let checkbox_x = cell.right() - size - GROUP_LABEL_GAP;
            let name = match prefix {
                Some(p) => format!("{}_{}_{}", expand_name(p, row, scope), label, row),
                None => format!("{}_{}", label, row),
            };
            CheckboxBand {
                label: label.clone(),
                name,
                band,
                checkbox: Rect::new(checkbox_x, center_y - size / 2.0, size, size),
                label_right: checkbox_x - GROUP_LABEL_GAP,
                center_y,
            }
        })
        .collect()
}
