// inspection-report: PDF output
//
// Page content is rendered with printpdf. printpdf has no notion of form
// fields, so the bytes are reopened with lopdf to add the AcroForm, the
// widget annotations and the report id.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ::image::{DynamicImage, Rgba, RgbImage};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef,
    Line, Mm, PdfDocument, PdfLayerReference, Point, Px, Rgb,
};
use tracing::{debug, info};

use crate::document::{Document, DrawOp, FormField, WidgetKind};
use crate::error::{ReportError, ReportResult};
use crate::geometry::{mm_to_pt, Rect};
use crate::images::ImageLibrary;
use crate::metrics::FontStyle;

/// Embedded rasters are downsampled to this resolution
const IMAGE_DPI: f32 = 200.0;

const TEXT_FIELD_FONT_SIZE: f32 = 8.0;

/// Field flag for multiline text fields
const FF_MULTILINE: i64 = 1 << 12;

/// Annotation flag: print
const ANNOT_PRINT: i64 = 4;

// ============================================================================
// Public API
// ============================================================================

/// Render a composed document to PDF bytes.
pub fn write_pdf(doc: &Document, images: &ImageLibrary) -> ReportResult<Vec<u8>> {
    let content = render_pages(doc, images)?;
    let bytes = add_form_fields(doc, &content)?;
    info!(
        pages = doc.page_count(),
        fields = doc.fields().len(),
        bytes = bytes.len(),
        "pdf written"
    );
    Ok(bytes)
}

/// Render and write to `path`. Nothing is written if rendering fails.
pub fn save_pdf(doc: &Document, images: &ImageLibrary, path: &Path) -> ReportResult<()> {
    let bytes = write_pdf(doc, images)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Page Content
// ============================================================================

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
        }
    }
}

fn render_pages(doc: &Document, images: &ImageLibrary) -> ReportResult<Vec<u8>> {
    let width = doc.page_size.width;
    let height = doc.page_size.height;
    let (pdf, page1, layer1) = PdfDocument::new(doc.title.as_str(), Mm(width), Mm(height), "Layer 1");

    let fonts = Fonts {
        regular: pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::PdfError(e.to_string()))?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::PdfError(e.to_string()))?,
    };

    for (index, page) in doc.pages().iter().enumerate() {
        let layer = if index == 0 {
            pdf.get_page(page1).get_layer(layer1)
        } else {
            let (page_index, layer_index) = pdf.add_page(Mm(width), Mm(height), "Layer 1");
            pdf.get_page(page_index).get_layer(layer_index)
        };
        layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    text,
                    x,
                    y,
                    size,
                    style,
                } => {
                    layer.use_text(text.as_str(), *size, Mm(*x), Mm(height - y), fonts.get(*style));
                }
                DrawOp::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    width,
                } => {
                    layer.set_outline_thickness(*width);
                    draw_line(&layer, *x1, height - y1, *x2, height - y2);
                }
                DrawOp::Image { source, rect } => {
                    let image = images.get(source)?;
                    embed_image(&layer, image, *rect, height);
                }
            }
        }
        debug!(page = index, ops = page.ops.len(), "page rendered");
    }

    pdf.save_to_bytes()
        .map_err(|e| ReportError::PdfError(e.to_string()))
}

fn draw_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
    let points = vec![
        (Point::new(Mm(x1), Mm(y1)), false),
        (Point::new(Mm(x2), Mm(y2)), false),
    ];
    let line = Line {
        points,
        is_closed: false,
    };
    layer.add_line(line);
}

/// Flatten transparency onto white and cap the resolution at IMAGE_DPI.
fn prepare_image(source: &DynamicImage, rect: Rect) -> RgbImage {
    let max_width = ((rect.width / 25.4) * IMAGE_DPI).ceil().max(1.0) as u32;
    let max_height = ((rect.height / 25.4) * IMAGE_DPI).ceil().max(1.0) as u32;
    let scaled;
    let source = if source.width() > max_width || source.height() > max_height {
        scaled = source.thumbnail(max_width, max_height);
        &scaled
    } else {
        source
    };

    let rgba_image = source.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();
    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([out_r, out_g, out_b]));
    }
    rgb_image
}

/// Place an image so that it exactly covers `rect`. The rect must already
/// have the image's aspect ratio.
fn embed_image(layer: &PdfLayerReference, source: &DynamicImage, rect: Rect, page_height: f32) {
    let rgb_image = prepare_image(source, rect);
    let (width_px, height_px) = rgb_image.dimensions();

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI = pixels / (mm / 25.4)
    let dpi = (width_px as f32) / (rect.width / 25.4);

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(rect.x)),
            translate_y: Some(Mm(page_height - rect.bottom())),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

// ============================================================================
// Form Fields
// ============================================================================

/// Resources shared by every field appearance.
struct FormFonts {
    helv: ObjectId,
    zadb: ObjectId,
}

impl FormFonts {
    fn add(pdf: &mut lopdf::Document) -> Self {
        let mut helv = Dictionary::new();
        helv.set("Type", Object::Name(b"Font".to_vec()));
        helv.set("Subtype", Object::Name(b"Type1".to_vec()));
        helv.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        helv.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

        let mut zadb = Dictionary::new();
        zadb.set("Type", Object::Name(b"Font".to_vec()));
        zadb.set("Subtype", Object::Name(b"Type1".to_vec()));
        zadb.set("BaseFont", Object::Name(b"ZapfDingbats".to_vec()));

        Self {
            helv: pdf.add_object(Object::Dictionary(helv)),
            zadb: pdf.add_object(Object::Dictionary(zadb)),
        }
    }

    fn resources(&self) -> Dictionary {
        let mut font_dict = Dictionary::new();
        font_dict.set("Helv", Object::Reference(self.helv));
        font_dict.set("ZaDb", Object::Reference(self.zadb));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));
        resources
    }
}

fn add_form_fields(doc: &Document, content: &[u8]) -> ReportResult<Vec<u8>> {
    let mut pdf = lopdf::Document::load_mem(content)?;
    let page_ids: Vec<ObjectId> = pdf.get_pages().into_values().collect();
    if page_ids.len() != doc.page_count() {
        return Err(ReportError::PdfError(format!(
            "expected {} pages, found {}",
            doc.page_count(),
            page_ids.len()
        )));
    }

    let page_height = mm_to_pt(doc.page_size.height);
    let fonts = FormFonts::add(&mut pdf);
    let mut field_ids = Vec::with_capacity(doc.fields().len());

    for field in doc.fields() {
        let (field_id, widgets) = add_field(&mut pdf, field, &page_ids, page_height, &fonts)?;
        for (page, widget_id) in widgets {
            push_annotation(&mut pdf, page_ids[page], widget_id)?;
        }
        field_ids.push(Object::Reference(field_id));
    }

    if !field_ids.is_empty() {
        let mut acroform = Dictionary::new();
        acroform.set("Fields", Object::Array(field_ids));
        acroform.set("NeedAppearances", Object::Boolean(true));
        acroform.set("DA", Object::string_literal(text_appearance()));
        acroform.set("DR", Object::Dictionary(fonts.resources()));
        let acroform_id = pdf.add_object(Object::Dictionary(acroform));

        let root_id = pdf.trailer.get(b"Root")?.as_reference()?;
        pdf.get_object_mut(root_id)?
            .as_dict_mut()?
            .set("AcroForm", Object::Reference(acroform_id));
    }

    if let Some(id) = &doc.report_id {
        set_subject(&mut pdf, id)?;
    }

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes)?;
    Ok(bytes)
}

fn text_appearance() -> String {
    format!("/Helv {} Tf 0 g", TEXT_FIELD_FONT_SIZE)
}

/// Add one field and its widgets. A field with a single widget is written as
/// one merged dictionary; repeated header fields get a parent with kids.
fn add_field(
    pdf: &mut lopdf::Document,
    field: &FormField,
    page_ids: &[ObjectId],
    page_height: f32,
    fonts: &FormFonts,
) -> ReportResult<(ObjectId, Vec<(usize, ObjectId)>)> {
    let mut field_dict = Dictionary::new();
    field_dict.set("T", Object::string_literal(field.name.as_str()));
    match field.kind {
        WidgetKind::Text { multiline } => {
            field_dict.set("FT", Object::Name(b"Tx".to_vec()));
            field_dict.set("DA", Object::string_literal(text_appearance()));
            field_dict.set("V", Object::string_literal(""));
            if multiline {
                field_dict.set("Ff", Object::Integer(FF_MULTILINE));
            }
        }
        WidgetKind::Checkbox => {
            field_dict.set("FT", Object::Name(b"Btn".to_vec()));
            field_dict.set("DA", Object::string_literal("/ZaDb 0 Tf 0 g"));
            field_dict.set("V", Object::Name(b"Off".to_vec()));
        }
    }

    let widget_dict = |pdf: &mut lopdf::Document, page: usize, rect: Rect| -> ReportResult<Dictionary> {
        let page_id = *page_ids
            .get(page)
            .ok_or_else(|| ReportError::NotFound(format!("page {} for field {}", page + 1, field.name)))?;
        let mut widget = Dictionary::new();
        widget.set("Type", Object::Name(b"Annot".to_vec()));
        widget.set("Subtype", Object::Name(b"Widget".to_vec()));
        widget.set("Rect", pdf_rect(rect, page_height));
        widget.set("P", Object::Reference(page_id));
        widget.set("F", Object::Integer(ANNOT_PRINT));
        if field.kind == WidgetKind::Checkbox {
            widget.set("AS", Object::Name(b"Off".to_vec()));
            widget.set("MK", Object::Dictionary(checkbox_characteristics()));
            let appearance = checkbox_appearance(pdf, rect, fonts);
            widget.set("AP", Object::Dictionary(appearance));
        }
        Ok(widget)
    };

    if let [single] = field.widgets.as_slice() {
        // Field and widget share one dictionary
        let mut merged = widget_dict(pdf, single.page, single.rect)?;
        for (key, value) in field_dict.iter() {
            merged.set(key.clone(), value.clone());
        }
        let id = pdf.add_object(Object::Dictionary(merged));
        return Ok((id, vec![(single.page, id)]));
    }

    let parent_id = pdf.new_object_id();
    let mut kids = Vec::with_capacity(field.widgets.len());
    let mut widgets = Vec::with_capacity(field.widgets.len());
    for w in &field.widgets {
        let mut widget = widget_dict(pdf, w.page, w.rect)?;
        widget.set("Parent", Object::Reference(parent_id));
        let id = pdf.add_object(Object::Dictionary(widget));
        kids.push(Object::Reference(id));
        widgets.push((w.page, id));
    }
    field_dict.set("Kids", Object::Array(kids));
    pdf.objects.insert(parent_id, Object::Dictionary(field_dict));
    Ok((parent_id, widgets))
}

/// Top-left millimetres to a PDF rectangle in points.
fn pdf_rect(rect: Rect, page_height: f32) -> Object {
    Object::Array(vec![
        Object::Real(mm_to_pt(rect.x)),
        Object::Real(page_height - mm_to_pt(rect.bottom())),
        Object::Real(mm_to_pt(rect.right())),
        Object::Real(page_height - mm_to_pt(rect.y)),
    ])
}

fn checkbox_characteristics() -> Dictionary {
    let mut mk = Dictionary::new();
    mk.set("BC", Object::Array(vec![Object::Integer(0)]));
    // ZapfDingbats check mark
    mk.set("CA", Object::string_literal("4"));
    mk
}

/// On and off appearance streams: a thin frame, plus a check mark when on.
fn checkbox_appearance(pdf: &mut lopdf::Document, rect: Rect, fonts: &FormFonts) -> Dictionary {
    let w = mm_to_pt(rect.width);
    let h = mm_to_pt(rect.height);
    let frame = format!("0 G 0.5 w 0.25 0.25 {:.2} {:.2} re S\n", w - 0.5, h - 0.5);
    let size = h * 0.8;
    let check = format!(
        "{frame}q 0 g BT /ZaDb {size:.2} Tf {x:.2} {y:.2} Td (4) Tj ET Q",
        frame = frame,
        size = size,
        x = (w - size * 0.846) / 2.0,
        y = (h - size * 0.7) / 2.0,
    );

    let mut normal = Dictionary::new();
    let yes = appearance_stream(check, w, h, fonts);
    let off = appearance_stream(frame, w, h, fonts);
    normal.set("Yes", Object::Reference(pdf.add_object(yes)));
    normal.set("Off", Object::Reference(pdf.add_object(off)));

    let mut ap = Dictionary::new();
    ap.set("N", Object::Dictionary(normal));
    ap
}

fn appearance_stream(content: String, width: f32, height: f32, fonts: &FormFonts) -> Object {
    let mut stream_dict = Dictionary::new();
    stream_dict.set("Type", Object::Name(b"XObject".to_vec()));
    stream_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    stream_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ]),
    );
    stream_dict.set("Resources", Object::Dictionary(fonts.resources()));
    Object::Stream(Stream::new(stream_dict, content.into_bytes()))
}

/// Append a widget to the page's Annots, which may be a direct array or a
/// reference to one.
fn push_annotation(pdf: &mut lopdf::Document, page_id: ObjectId, widget_id: ObjectId) -> ReportResult<()> {
    let annots_ref = pdf
        .get_object(page_id)?
        .as_dict()?
        .get(b"Annots")
        .ok()
        .and_then(|annots| annots.as_reference().ok());

    if let Some(annots_id) = annots_ref {
        pdf.get_object_mut(annots_id)?
            .as_array_mut()?
            .push(Object::Reference(widget_id));
        return Ok(());
    }

    let page = pdf.get_object_mut(page_id)?.as_dict_mut()?;
    let mut annots = match page.get(b"Annots") {
        Ok(existing) => existing.as_array()?.clone(),
        Err(_) => Vec::new(),
    };
    annots.push(Object::Reference(widget_id));
    page.set("Annots", Object::Array(annots));
    Ok(())
}

/// Record the report id as the document subject.
fn set_subject(pdf: &mut lopdf::Document, report_id: &str) -> ReportResult<()> {
    let subject = Object::string_literal(format!("Report ID {}", report_id));
    let info_ref = pdf
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| info.as_reference().ok());

    match info_ref {
        Some(info_id) => {
            pdf.get_object_mut(info_id)?.as_dict_mut()?.set("Subject", subject);
        }
        None => {
            let mut info = Dictionary::new();
            info.set("Subject", subject);
            let info_id = pdf.add_object(Object::Dictionary(info));
            pdf.trailer.set("Info", Object::Reference(info_id));
        }
    }
    Ok(())
}
