//! Text style for layout text items.
//!
//! Every field is optional in the layout file; the accessor methods resolve
//! the documented default for each one.

use serde::{Deserialize, Serialize};

/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: f64 = 70.0;
/// Default font color.
pub const DEFAULT_FONT_COLOR: &str = "#FFFFFF";
/// Default outline (stroke) width.
pub const DEFAULT_OUTLINE_WIDTH: f64 = 2.0;
/// Default outline color.
pub const DEFAULT_OUTLINE_COLOR: &str = "#000000";
/// Default drop-shadow color.
pub const DEFAULT_SHADOW_COLOR: &str = "#000000";
/// Alpha byte applied to the shadow color.
pub const SHADOW_ALPHA: &str = "80";
/// Default drop-shadow offset, used for both axes.
pub const DEFAULT_SHADOW_DEPTH: f64 = 2.0;
/// Font file used when none is configured.
pub const DEFAULT_FONT_FILE: &str = "arial.ttf";
/// Default background box color.
pub const DEFAULT_BOX_COLOR: &str = "#000000";
/// Default background box opacity.
pub const DEFAULT_BOX_OPACITY: f64 = 0.5;
/// Default background box padding.
pub const DEFAULT_BOX_PADDING: f64 = 10.0;

/// Text style as written by the layout editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub outline_width: Option<f64>,
    pub outline_color: Option<String>,
    pub shadow_color: Option<String>,
    pub shadow_depth: Option<f64>,
    pub font_family: Option<String>,
    pub box_color: Option<String>,
    pub box_opacity: Option<f64>,
    pub box_padding: Option<f64>,
}

impl TextStyle {
    /// Check value ranges. Called once when the layout is loaded.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(opacity) = self.box_opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(format!("boxOpacity {opacity} outside [0, 1]"));
            }
        }
        if let Some(size) = self.font_size {
            if size <= 0.0 {
                return Err(format!("fontSize {size} must be positive"));
            }
        }
        Ok(())
    }

    pub fn font_size(&self) -> f64 {
        self.font_size.unwrap_or(DEFAULT_FONT_SIZE)
    }

    pub fn font_color(&self) -> &str {
        self.font_color.as_deref().unwrap_or(DEFAULT_FONT_COLOR)
    }

    pub fn outline_width(&self) -> f64 {
        self.outline_width.unwrap_or(DEFAULT_OUTLINE_WIDTH)
    }

    pub fn outline_color(&self) -> &str {
        self.outline_color.as_deref().unwrap_or(DEFAULT_OUTLINE_COLOR)
    }

    pub fn shadow_color(&self) -> &str {
        self.shadow_color.as_deref().unwrap_or(DEFAULT_SHADOW_COLOR)
    }

    pub fn shadow_depth(&self) -> f64 {
        self.shadow_depth.unwrap_or(DEFAULT_SHADOW_DEPTH)
    }

    /// Font file name, with single quotes stripped. Empty names fall back to the default.
    pub fn font_file(&self) -> String {
        let name = self
            .font_family
            .as_deref()
            .unwrap_or(DEFAULT_FONT_FILE)
            .replace('\'', "");
        if name.is_empty() {
            DEFAULT_FONT_FILE.to_string()
        } else {
            name
        }
    }

    pub fn box_color(&self) -> &str {
        self.box_color.as_deref().unwrap_or(DEFAULT_BOX_COLOR)
    }

    pub fn box_opacity(&self) -> f64 {
        self.box_opacity.unwrap_or(DEFAULT_BOX_OPACITY)
    }

    /// Box opacity as a two-digit lowercase hex alpha byte (truncated).
    pub fn box_alpha_hex(&self) -> String {
        let alpha = (self.box_opacity().clamp(0.0, 1.0) * 255.0) as u8;
        format!("{alpha:02x}")
    }

    pub fn box_padding(&self) -> f64 {
        self.box_padding.unwrap_or(DEFAULT_BOX_PADDING)
    }
}
