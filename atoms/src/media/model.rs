/// Content type for an image or document extension. Unknown extensions are
/// stored as opaque bytes.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Lowercased extension of `file_name`, or `fallback` when there is none.
pub fn extension_of(file_name: Option<&str>, fallback: &str) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| fallback.to_string())
}

/// Storage key for a freshly uploaded patient photo.
pub fn original_image_key(ext: &str) -> String {
    format!("images/image-{}.{}", uuid::Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_falls_back_when_missing_or_odd() {
        assert_eq!(extension_of(Some("mouth.JPG"), "png"), "jpg");
        assert_eq!(extension_of(Some("mouth"), "png"), "png");
        assert_eq!(extension_of(Some("a.p/ng"), "png"), "png");
        assert_eq!(extension_of(None, "png"), "png");
    }

    #[test]
    fn original_keys_are_unique() {
        assert_ne!(original_image_key("png"), original_image_key("png"));
        assert!(original_image_key("jpg").starts_with("images/image-"));
    }
}
