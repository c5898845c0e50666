//! Escaping for values embedded in FFmpeg filter expressions.

/// Color used when a hex string cannot be converted.
pub const FALLBACK_COLOR: &str = "0xFFFFFFFF";

/// Default alpha byte for opaque colors.
pub const OPAQUE_ALPHA: &str = "ff";

/// Convert `#RRGGBB` plus an alpha byte into FFmpeg's `0xRRGGBBAA` notation.
///
/// Anything that is not exactly six characters after an optional leading `#`
/// yields [`FALLBACK_COLOR`]. The digits are passed through as written.
pub fn hex_to_ffmpeg_color(hex: &str, alpha: &str) -> String {
    let digits = hex.trim_start_matches('#');
    if digits.chars().count() != 6 {
        return FALLBACK_COLOR.to_string();
    }
    format!("0x{digits}{alpha}")
}

/// Normalize a filesystem path for use inside a filter option.
///
/// Backslashes become forward slashes; on Windows the drive colon is escaped
/// so it is not read as an option separator.
pub fn ffmpeg_safe_path(path: &str) -> String {
    safe_path_for(path, cfg!(windows))
}

fn safe_path_for(path: &str, windows: bool) -> String {
    let path = path.replace('\\', "/");
    if windows {
        path.replace(':', "\\:")
    } else {
        path
    }
}

/// Escape text for `drawtext=text='...'`.
///
/// Single quotes cannot be escaped inside a quoted filter value, so they are
/// replaced with a typographic apostrophe. Colons and percent signs are
/// backslash-escaped.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\'', "\u{2019}")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

/// Escape a font file name before it is joined into a path.
pub fn escape_font_name(name: &str) -> String {
    name.replace('\'', "").replace(':', "\\:")
}
