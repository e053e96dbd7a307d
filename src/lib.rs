//! Paginated road-maintenance inspection reports with fillable form fields.
//!
//! A report is built in two steps. [`compose`] runs the sections of a
//! [`ReportTemplate`] against typed [`ReportData`] and produces a
//! [`Document`]: draw operations per page plus the form field registry.
//! [`write_pdf`] renders that document to PDF bytes.

pub mod compose;
pub mod document;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod images;
pub mod layout;
pub mod letterhead;
pub mod metrics;
pub mod overlay;
pub mod request;
pub mod signature;
pub mod template;
pub mod writer;

pub use compose::{compose, ReportComposer};
pub use document::Document;
pub use error::{ReportError, ReportResult};
pub use fit::{fit, FitResult};
pub use geometry::{Orientation, PageFormat, Rect};
pub use images::ImageLibrary;
pub use overlay::{ColumnFieldMap, FieldKind, FieldSpec, FieldTemplate};
pub use request::{ReportData, ReportKind, ReportSpec};
pub use template::ReportTemplate;
pub use writer::{save_pdf, write_pdf};

