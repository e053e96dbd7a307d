// inspection-report: signature blocks

use serde::{Deserialize, Serialize};

use crate::document::{Align, Document};
use crate::error::ReportResult;
use crate::geometry::Rect;
use crate::metrics::{text_width, FontStyle};

/// Width of the placeholder field when nobody is named
pub const PLACEHOLDER_WIDTH: f32 = 40.0;
const PLACEHOLDER_HEIGHT: f32 = 5.0;

/// Vertical offsets below the cursor
const PREAMBLE_OFFSET: f32 = 10.0;
const FIELD_OFFSET: f32 = 25.0;
const NAME_OFFSET: f32 = 30.0;
const UNDERLINE_OFFSET: f32 = 31.0;
const ROLE_OFFSET: f32 = 35.0;

/// Height the block occupies below the cursor
pub const SIGNATURE_BLOCK_HEIGHT: f32 = 38.0;

pub const SIGNATURE_FONT_SIZE: f32 = 10.0;

/// One signing position, e.g. "Diperiksa oleh, ... Staff Inspeksi".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureSlot {
    /// Key used to supply the signer's name with the report data
    pub key: String,
    pub preamble: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    /// Horizontal centre of the block in mm
    pub center_x: f32,
    /// Name template of the placeholder field, may use `{asset}`
    #[serde(default = "default_field_name")]
    pub field_name: String,
}

fn default_field_name() -> String {
    "Signer".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignerMark {
    /// Printed name with an underline matching its width
    Named { name: String, underline: (f32, f32) },
    /// Empty field to sign or type into later
    Placeholder { field_name: String, field: Rect, underline: (f32, f32) },
}

/// Resolved geometry of a signature block.
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePlan {
    pub center_x: f32,
    pub preamble: (String, f32),
    pub role: (String, f32),
    pub mark: SignerMark,
    pub name_y: f32,
    pub underline_y: f32,
}

impl SignaturePlan {
    pub fn underline_length(&self) -> f32 {
        let (x1, x2) = match &self.mark {
            SignerMark::Named { underline, .. } | SignerMark::Placeholder { underline, .. } => *underline,
        };
        x2 - x1
    }
}

/// Plan a slot below `cursor`. Returns `None` when the previous section left
/// no cursor to anchor to.
pub fn plan_signature(
    slot: &SignatureSlot,
    signer: Option<&str>,
    field_name: &str,
    cursor: Option<f32>,
) -> Option<SignaturePlan> {
    let y = cursor?;
    let x = slot.center_x;

    let name = signer
        .or(slot.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let mark = match name {
        Some(name) => {
            let width = text_width(name, SIGNATURE_FONT_SIZE, FontStyle::Bold);
            SignerMark::Named {
                name: name.to_string(),
                underline: (x - width / 2.0, x + width / 2.0),
            }
        }
        None => SignerMark::Placeholder {
            field_name: field_name.to_string(),
            field: Rect::new(
                x - PLACEHOLDER_WIDTH / 2.0,
                y + FIELD_OFFSET,
                PLACEHOLDER_WIDTH,
                PLACEHOLDER_HEIGHT,
            ),
            underline: (x - PLACEHOLDER_WIDTH / 2.0, x + PLACEHOLDER_WIDTH / 2.0),
        },
    };

    Some(SignaturePlan {
        center_x: x,
        preamble: (slot.preamble.clone(), y + PREAMBLE_OFFSET),
        role: (slot.role.clone(), y + ROLE_OFFSET),
        mark,
        name_y: y + NAME_OFFSET,
        underline_y: y + UNDERLINE_OFFSET,
    })
}

/// Emit a planned block into the document.
pub fn draw_signature(doc: &mut Document, plan: &SignaturePlan) -> ReportResult<()> {
    let x = plan.center_x;
    doc.text(&plan.preamble.0, x, plan.preamble.1, SIGNATURE_FONT_SIZE, FontStyle::Regular, Align::Center);
    doc.text(&plan.role.0, x, plan.role.1, SIGNATURE_FONT_SIZE, FontStyle::Regular, Align::Center);

    match &plan.mark {
        SignerMark::Named { name, underline } => {
            doc.text(name, x, plan.name_y, SIGNATURE_FONT_SIZE, FontStyle::Bold, Align::Center);
            doc.line(underline.0, plan.underline_y, underline.1, plan.underline_y, 0.5);
        }
        SignerMark::Placeholder {
            field_name,
            field,
            underline,
        } => {
            doc.add_text_field(field_name, *field, false)?;
            doc.line(underline.0, plan.underline_y, underline.1, plan.underline_y, 0.5);
        }
    }
    Ok(())
}
