//! Filename and file content helpers.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Extensions kept as-is by [`guess_extension`].
pub const KNOWN_IMAGE_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp"];

/// Reduce a client-supplied name to a safe file name.
///
/// Drops any directory part and replaces everything outside
/// `[A-Za-z0-9._-]` with `_`. At most 200 characters are kept.
pub fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(200)
        .collect()
}

/// Extension (with leading dot) for an image file.
///
/// A known image extension on `filename` wins (lowercased). Otherwise the
/// content is sniffed for PNG, JPEG, GIF or WEBP magic bytes, then for an
/// `<svg` tag. Returns an empty string when nothing matches.
pub fn guess_extension(filename: &str, data: &[u8]) -> String {
    if let Some((_, ext)) = filename.rsplit_once('.') {
        let ext = ext.to_ascii_lowercase();
        if KNOWN_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return format!(".{ext}");
        }
    }

    if infer::image::is_png(data) {
        return ".png".to_string();
    }
    if infer::image::is_jpeg(data) {
        return ".jpg".to_string();
    }
    if infer::image::is_gif(data) {
        return ".gif".to_string();
    }
    if infer::image::is_webp(data) {
        return ".webp".to_string();
    }

    let head = &data[..data.len().min(1024)];
    if String::from_utf8_lossy(head).to_ascii_lowercase().contains("<svg") {
        return ".svg".to_string();
    }
    String::new()
}

/// Hex SHA-256 of file contents.
pub fn file_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
