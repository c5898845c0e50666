//! Inline `data:image/<fmt>;base64,<payload>` layout images.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use vshort_models::sanitize_filename;

use crate::error::{MediaError, MediaResult};

/// A decoded inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// File extension derived from the MIME subtype
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decode a `data:image/...;base64,...` URI.
pub fn decode_data_uri(uri: &str) -> MediaResult<InlineImage> {
    let rest = uri
        .strip_prefix("data:image/")
        .ok_or_else(|| MediaError::InvalidDataUri("not a data:image URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::InvalidDataUri("missing payload separator".to_string()))?;
    let subtype = header
        .strip_suffix(";base64")
        .ok_or_else(|| MediaError::InvalidDataUri("only base64 payloads are supported".to_string()))?;

    let extension = extension_for(subtype)
        .ok_or_else(|| MediaError::InvalidDataUri(format!("unsupported image type '{subtype}'")))?;

    // Editors sometimes wrap long payloads
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| MediaError::InvalidDataUri(e.to_string()))?;
    if bytes.is_empty() {
        return Err(MediaError::InvalidDataUri("empty payload".to_string()));
    }

    Ok(InlineImage { extension, bytes })
}

fn extension_for(subtype: &str) -> Option<String> {
    let subtype = subtype.split(';').next().unwrap_or_default();
    let subtype = subtype.split('+').next().unwrap_or_default();
    let ext: String = subtype
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Decode an inline image and write it to `<dir>/inline_<index>_<id>.<fmt>`.
///
/// `index` is the item's position in the layout; sanitized ids alone can collide.
pub async fn write_inline_image(
    index: usize,
    id: &str,
    uri: &str,
    dir: &Path,
) -> MediaResult<PathBuf> {
    let image = decode_data_uri(uri)?;
    let stem = sanitize_filename(id).replace(char::is_whitespace, "_");
    let path = dir.join(format!("inline_{index}_{stem}.{}", image.extension));

    tokio::fs::write(&path, &image.bytes).await?;
    debug!(
        id = %id,
        path = %path.display(),
        bytes = image.bytes.len(),
        "Wrote inline image"
    );
    Ok(path)
}
