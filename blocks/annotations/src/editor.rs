use dentcheck_atoms::shapes::{AnnotationSet, Point, Shape, ShapeIdGenerator, ShapeKind, SurfaceSize};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::export::{self, EditorSnapshot};
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Drawing,
}

/// Resize `original` to `display_width`, keeping its aspect ratio. This is
/// the surface shapes are drawn on and whose pixel space they are stored in.
pub fn display_surface(original: &DynamicImage, display_width: u32) -> RgbaImage {
    let display_width = display_width.max(1);
    let scale = display_width as f64 / original.width().max(1) as f64;
    let display_height = ((original.height() as f64 * scale).round() as u32).max(1);
    imageops::resize(&original.to_rgba8(), display_width, display_height, FilterType::Triangle)
}

/// Freehand annotation surface for one submission.
///
/// Pointer gestures build a single in-progress shape; it joins the committed
/// set only when the gesture ends. Every mutation re-renders `frame`.
pub struct AnnotationEditor {
    base: RgbaImage,
    frame: RgbaImage,
    tool: ShapeKind,
    state: EditorState,
    committed: AnnotationSet,
    in_progress: Option<Shape>,
    ids: ShapeIdGenerator,
    revision: u64,
}

impl AnnotationEditor {
    pub fn new(base: RgbaImage) -> Self {
        Self::with_annotations(base, AnnotationSet::new())
    }

    /// Resume editing a previously saved set.
    pub fn with_annotations(base: RgbaImage, annotations: AnnotationSet) -> Self {
        let last_id = annotations.iter().map(|s| s.id).max().unwrap_or(0);
        let mut editor = Self {
            frame: base.clone(),
            base,
            tool: ShapeKind::Rectangle,
            state: EditorState::Idle,
            committed: annotations,
            in_progress: None,
            ids: ShapeIdGenerator::after(last_id),
            revision: 0,
        };
        editor.rerender();
        editor
    }

    pub fn tool(&self) -> ShapeKind {
        self.tool
    }

    /// Affects only the next shape started.
    pub fn select_tool(&mut self, tool: ShapeKind) {
        self.tool = tool;
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.base.width() as f64, self.base.height() as f64)
    }

    /// Committed shapes only.
    pub fn annotations(&self) -> &AnnotationSet {
        &self.committed
    }

    pub fn in_progress(&self) -> Option<&Shape> {
        self.in_progress.as_ref()
    }

    /// Everything currently visible, bottom to top.
    pub fn overlay(&self) -> impl Iterator<Item = &Shape> {
        self.committed.iter().chain(self.in_progress.iter())
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    /// Bumped on every re-render.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Start a shape of the selected kind. Presses outside the image are
    /// ignored. A press while a gesture is still open finishes that gesture
    /// first.
    pub fn pointer_down(&mut self, at: Point) {
        if !self.surface_size().contains(at) {
            tracing::debug!("Ignoring pointer down outside image at ({}, {})", at.x, at.y);
            return;
        }
        let Some(shape) = Shape::begin(self.ids.next_id(), self.tool, at) else {
            return;
        };
        if let Some(open) = self.in_progress.take() {
            self.committed.push(open);
        }
        self.in_progress = Some(shape);
        self.state = EditorState::Drawing;
        self.rerender();
    }

    /// Move the end of the in-progress shape. Points outside the image are
    /// taken as-is; non-finite ones are dropped.
    pub fn pointer_move(&mut self, to: Point) {
        if self.state != EditorState::Drawing {
            return;
        }
        let moved = self.in_progress.as_mut().is_some_and(|shape| shape.extend_to(to));
        if moved {
            self.rerender();
        }
    }

    /// Finish the gesture. Zero-area shapes are kept.
    pub fn pointer_up(&mut self) {
        if self.state != EditorState::Drawing {
            return;
        }
        if let Some(shape) = self.in_progress.take() {
            self.committed.push(shape);
        }
        self.state = EditorState::Idle;
        self.rerender();
    }

    /// Drop every shape, including one being drawn.
    pub fn clear_all(&mut self) {
        self.committed.clear();
        self.in_progress = None;
        self.state = EditorState::Idle;
        self.rerender();
    }

    /// Flattened PNG of exactly what is on screen.
    pub fn export_png(&self) -> Result<Vec<u8>, image::ImageError> {
        export::encode_png(&self.frame)
    }

    /// Everything the save operation needs: the encoded committed set, the
    /// surface it was drawn on, and the flattened image.
    pub fn snapshot(&self) -> Result<EditorSnapshot, image::ImageError> {
        Ok(EditorSnapshot {
            annotations: self.committed.encode(),
            surface: self.surface_size(),
            image_png: self.export_png()?,
        })
    }

    fn rerender(&mut self) {
        self.frame = render::flatten(&self.base, self.overlay());
        self.revision += 1;
    }
}
