//! Small helpers shared across crates.

/// Characters that are not allowed in output file names.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Strip characters that are invalid in file names on common platforms.
///
/// Only the characters `\ / * ? : " < > |` are removed; everything else,
/// including non-ASCII letters and whitespace, is preserved.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c))
        .collect()
}
