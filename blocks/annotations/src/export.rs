use base64::{engine::general_purpose::STANDARD, Engine as _};
use dentcheck_atoms::shapes::SurfaceSize;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};

use crate::submissions::AnnotatePayload;

/// Encode a flattened frame as PNG. The same pixels always give the same bytes.
pub fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(frame.as_raw(), frame.width(), frame.height(), ColorType::Rgba8)?;
    Ok(buf)
}

/// `annotated-<submissionId>.<ext>`
pub fn annotated_file_name(submission_id: &str, ext: &str) -> String {
    format!("annotated-{}.{}", submission_id, ext)
}

pub fn annotated_image_key(submission_id: &str, ext: &str) -> String {
    format!("annotated/{}", annotated_file_name(submission_id, ext))
}

/// State captured from the editor when the admin saves.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub annotations: String,
    pub surface: SurfaceSize,
    pub image_png: Vec<u8>,
}

impl EditorSnapshot {
    /// Request body for `PUT /api/submissions/{id}/annotate`.
    pub fn into_payload(self) -> AnnotatePayload {
        AnnotatePayload {
            annotations: self.annotations,
            surface: Some(self.surface),
            annotated_image: Some(STANDARD.encode(&self.image_png)),
            extension: Some("png".to_string()),
        }
    }
}
