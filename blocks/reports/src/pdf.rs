use chrono::{DateTime, Utc};
use dentcheck_atoms::submissions::Submission;
use image::DynamicImage;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::utils::calculate_points_for_circle;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
    Polygon, Pt, Rgb as PdfRgb,
};

use crate::error::ReportError;
use crate::layout::{
    compose_layout, Element, ImageSize, ImageSlot, ImageSlots, ReportLayout, ReportSettings, Rgb, PAGE_HEIGHT,
    PAGE_WIDTH,
};

/// Share of the font size between the top of the line box and the baseline.
const ASCENT: f32 = 0.8;

/// Decoded images available to the renderer.
#[derive(Default)]
pub struct ReportImages {
    pub original: Option<DynamicImage>,
    pub annotated: Option<DynamicImage>,
}

impl ReportImages {
    /// Decode whatever bytes were fetched. Anything that does not decode is
    /// treated as absent.
    pub fn decode(original: Option<&[u8]>, annotated: Option<&[u8]>) -> Self {
        Self {
            original: original.and_then(|bytes| decode_image(bytes, "original")),
            annotated: annotated.and_then(|bytes| decode_image(bytes, "annotated")),
        }
    }

    pub fn slots(&self) -> ImageSlots {
        let size = |img: &DynamicImage| ImageSize {
            width: img.width(),
            height: img.height(),
        };
        ImageSlots {
            original: self.original.as_ref().map(size),
            annotated: self.annotated.as_ref().map(size),
        }
    }

    fn get(&self, slot: ImageSlot) -> Option<&DynamicImage> {
        match slot {
            ImageSlot::Original => self.original.as_ref(),
            ImageSlot::Annotated => self.annotated.as_ref(),
        }
    }
}

fn decode_image(bytes: &[u8], which: &str) -> Option<DynamicImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            tracing::warn!("Skipping {} image in report, decode failed: {}", which, e);
            None
        }
    }
}

/// Build the report PDF for `submission`. Missing images leave their slot
/// empty; only document encoding failures are errors.
pub fn compose_report(
    submission: &Submission,
    original: Option<&[u8]>,
    annotated: Option<&[u8]>,
    settings: &ReportSettings,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ReportError> {
    let images = ReportImages::decode(original, annotated);
    render_report(submission, &images, settings, generated_at)
}

/// Lay out the report around whichever images decoded.
pub fn report_layout(
    submission: &Submission,
    images: &ReportImages,
    settings: &ReportSettings,
    generated_at: DateTime<Utc>,
) -> ReportLayout {
    compose_layout(submission, &images.slots(), settings, generated_at)
}

/// Lay out and render the report for already decoded images.
pub fn render_report(
    submission: &Submission,
    images: &ReportImages,
    settings: &ReportSettings,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ReportError> {
    let layout = report_layout(submission, images, settings, generated_at);
    let title = format!("Report {}", submission.id_excerpt());
    render_pdf(&layout, images, &title)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render a laid-out report onto A4 pages.
pub fn render_pdf(layout: &ReportLayout, images: &ReportImages, title: &str) -> Result<Vec<u8>, ReportError> {
    let doc = PdfDocument::empty(title);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Font(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Font(e.to_string()))?,
    };

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_idx, layer_idx) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), format!("Page {}", index + 1));
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        for element in &page.elements {
            draw_element(&layer, element, &fonts, images);
        }
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| ReportError::Serialize(e.to_string()))?;
    tracing::info!("Rendered report with {} page(s), {} bytes", layout.pages.len(), bytes.len());
    Ok(bytes)
}

fn draw_element(layer: &PdfLayerReference, element: &Element, fonts: &Fonts, images: &ReportImages) {
    match element {
        Element::Text {
            text,
            x,
            y,
            size,
            bold,
            color,
        } => {
            let font = if *bold { &fonts.bold } else { &fonts.regular };
            layer.set_fill_color(color_of(*color));
            layer.use_text(text.as_str(), *size, mm(*x), mm(flip(*y + size * ASCENT)), font);
        }
        Element::Rule { from, to, width, color } => {
            layer.set_outline_color(color_of(*color));
            layer.set_outline_thickness(*width);
            layer.add_line(Line {
                points: vec![(point(*from), false), (point(*to), false)],
                is_closed: false,
            });
        }
        Element::Dot { center, radius, color } => {
            layer.set_fill_color(color_of(*color));
            let ring = calculate_points_for_circle(Pt(*radius), Pt(center.0), Pt(flip(center.1)));
            layer.add_polygon(Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        Element::Image {
            slot,
            x,
            y,
            width,
            height,
        } => {
            let Some(source) = images.get(*slot) else {
                return;
            };
            // Alpha is dropped; the report is printed on white.
            let rgb = DynamicImage::ImageRgb8(source.to_rgb8());
            let dpi = rgb.width().max(1) as f32 * 72.0 / width.max(1.0);
            Image::from_dynamic_image(&rgb).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(*x)),
                    translate_y: Some(mm(flip(*y + *height))),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
        }
    }
}

fn mm(points: f32) -> Mm {
    Pt(points).into()
}

fn flip(y: f32) -> f32 {
    PAGE_HEIGHT - y
}

fn point((x, y): (f32, f32)) -> Point {
    Point::new(mm(x), mm(flip(y)))
}

fn color_of(rgb: Rgb) -> Color {
    Color::Rgb(PdfRgb::new(
        rgb.0 as f32 / 255.0,
        rgb.1 as f32 / 255.0,
        rgb.2 as f32 / 255.0,
        None,
    ))
}
