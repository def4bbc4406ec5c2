use dentcheck_atoms::shapes::{AnnotationSet, Shape, ShapeKind, SurfaceSize};
use image::{DynamicImage, Rgba, RgbaImage};
use tiny_skia::{ColorU8, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Stroke width in surface pixels.
pub const STROKE_WIDTH: f32 = 3.0;
/// Arrow head length and width in surface pixels.
pub const ARROW_POINTER: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub width: f32,
}

/// Cosmetic per-kind styling. Not part of the stored data.
pub fn stroke_style(kind: ShapeKind) -> StrokeStyle {
    let color = match kind {
        ShapeKind::Rectangle => Rgba([255, 0, 0, 255]),
        ShapeKind::Ellipse => Rgba([0, 0, 255, 255]),
        ShapeKind::Arrow => Rgba([0, 128, 0, 255]),
    };
    StrokeStyle {
        color,
        width: STROKE_WIDTH,
    }
}

/// Draw `shapes` over a copy of `base`, in order.
pub fn flatten<'a>(base: &RgbaImage, shapes: impl IntoIterator<Item = &'a Shape>) -> RgbaImage {
    let mut canvas = base.clone();
    paint_shapes(&mut canvas, shapes, 1.0);
    canvas
}

/// Flatten annotations over the full-resolution original. Coordinates are
/// mapped from the display `surface` they were captured on to the image's
/// native pixel grid; without a recorded surface they are used as-is.
pub fn flatten_native(original: &DynamicImage, set: &AnnotationSet, surface: Option<SurfaceSize>) -> RgbaImage {
    let mut canvas = original.to_rgba8();
    let native = SurfaceSize::new(canvas.width() as f64, canvas.height() as f64);

    let (shapes, scale) = match surface {
        Some(surface) if surface.width > 0.0 && surface.height > 0.0 => {
            let scale = (native.width / surface.width) as f32;
            (set.rescaled(surface, native), scale)
        }
        _ => (set.clone(), 1.0),
    };

    paint_shapes(&mut canvas, &shapes, scale);
    canvas
}

/// Rasterize onto `canvas` through a pixmap copy. `scale` multiplies stroke
/// width and arrow head size.
fn paint_shapes<'a>(canvas: &mut RgbaImage, shapes: impl IntoIterator<Item = &'a Shape>, scale: f32) {
    let Some(mut pixmap) = to_pixmap(canvas) else {
        return;
    };
    for shape in shapes {
        draw_shape(&mut pixmap, shape, stroke_style(shape.tool), scale);
    }
    write_back(&pixmap, canvas);
}

fn to_pixmap(canvas: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(canvas.width(), canvas.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(canvas.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn write_back(pixmap: &Pixmap, canvas: &mut RgbaImage) {
    for (dst, src) in canvas.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
}

fn draw_shape(pixmap: &mut Pixmap, shape: &Shape, style: StrokeStyle, scale: f32) {
    let width = style.width * scale.max(f32::MIN_POSITIVE);
    let [x1, y1, x2, y2] = shape.points.map(|v| v as f32);

    let [r, g, b, a] = style.color.0;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    // Hard edges keep the stroke a single flat colour.
    paint.anti_alias = false;
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };

    match shape.tool {
        ShapeKind::Rectangle => {
            // An axis-aligned rectangle clamped to a box around the canvas
            // has the same visible outline.
            let margin = width * 2.0;
            let (max_x, max_y) = (pixmap.width() as f32 + margin, pixmap.height() as f32 + margin);
            let (x1, x2) = (x1.clamp(-margin, max_x), x2.clamp(-margin, max_x));
            let (y1, y2) = (y1.clamp(-margin, max_y), y2.clamp(-margin, max_y));

            let mut pb = PathBuilder::new();
            pb.move_to(x1, y1);
            pb.line_to(x2, y1);
            pb.line_to(x2, y2);
            pb.line_to(x1, y2);
            pb.close();
            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }
        ShapeKind::Ellipse => {
            let center = shape.ellipse_center();
            let radius = shape.ellipse_radius() as f32;
            if let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius) {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }
        ShapeKind::Arrow => {
            let mut pb = PathBuilder::new();
            pb.move_to(x1, y1);
            pb.line_to(x2, y2);
            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }

            let (dx, dy) = (x2 - x1, y2 - y1);
            let len = (dx * dx + dy * dy).sqrt();
            if len > 0.0 {
                let pointer = ARROW_POINTER * scale;
                let dir = (dx / len, dy / len);
                let perp = (-dir.1, dir.0);
                let base = (x2 - dir.0 * pointer, y2 - dir.1 * pointer);
                let half = pointer / 2.0;

                let mut head = PathBuilder::new();
                head.move_to(x2, y2);
                head.line_to(base.0 + perp.0 * half, base.1 + perp.1 * half);
                head.line_to(base.0 - perp.0 * half, base.1 - perp.1 * half);
                head.close();
                if let Some(path) = head.finish() {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }
    }
}
