//! Canvas layout definitions.
//!
//! A layout is the ordered list of visual elements exported by the layout
//! editor as JSON. It is parsed and validated once at job start; afterwards it
//! is only ever read, and z-ordering is applied through a non-destructive view.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::text_style::TextStyle;

/// Output canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 720;
/// Output canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 1280;

/// Text box height used when the layout omits it (or sets it to zero).
pub const DEFAULT_TEXT_HEIGHT: f64 = 100.0;

/// Placeholder bound to the video track of a single-video job.
pub const VIDEO_PLACEHOLDER: &str = "video-placeholder";
/// Placeholder bound to the first video track of a dual-video job.
pub const VIDEO_PLACEHOLDER_1: &str = "video-placeholder-1";
/// Placeholder bound to the second video track of a dual-video job.
pub const VIDEO_PLACEHOLDER_2: &str = "video-placeholder-2";
/// Placeholder bound to the downloaded thumbnail image.
pub const THUMBNAIL_PLACEHOLDER: &str = "thumbnail-placeholder";
/// Text item that always renders `Part {n}`.
pub const TEXT_PLACEHOLDER: &str = "text-placeholder";

const DATA_IMAGE_PREFIX: &str = "data:image";
const DEFAULT_TEXT_CONTENT: &str = " ";

/// Errors raised while loading a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Failed to read layout file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid layout JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid layout item: {0}")]
    InvalidItem(String),
}

/// Result type for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Canvas-space bounding box of an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// What an item draws.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutElement {
    /// A video window bound to a downloaded video track.
    Video,
    /// A still image; `source` may carry an inline `data:image` URI.
    Image { source: Option<String> },
    /// The thumbnail slot, composited like a still image.
    Thumbnail,
    /// Styled text.
    Text { content: String, style: TextStyle },
}

/// One visual element on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub id: String,
    pub z_index: i64,
    pub frame: Frame,
    pub element: LayoutElement,
}

impl LayoutItem {
    pub fn is_text(&self) -> bool {
        matches!(self.element, LayoutElement::Text { .. })
    }

    pub fn is_video(&self) -> bool {
        matches!(self.element, LayoutElement::Video)
    }

    /// The inline `data:image/...` URI of an image item, if it has one.
    pub fn inline_image_source(&self) -> Option<&str> {
        match &self.element {
            LayoutElement::Image {
                source: Some(source),
            } if source.starts_with(DATA_IMAGE_PREFIX) => Some(source.as_str()),
            _ => None,
        }
    }
}

/// An ordered, validated set of layout items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    items: Vec<LayoutItem>,
}

impl Layout {
    /// Load a layout from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> LayoutResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Parse a layout from the editor's JSON array.
    pub fn from_json(json: &str) -> LayoutResult<Self> {
        let raw: Vec<RawItem> = serde_json::from_str(json)?;
        let items = raw
            .into_iter()
            .enumerate()
            .map(|(position, item)| item.into_item(position))
            .collect::<LayoutResult<Vec<_>>>()?;
        Self::from_items(items)
    }

    /// Build a layout from already-constructed items, checking id uniqueness.
    pub fn from_items(items: Vec<LayoutItem>) -> LayoutResult<Self> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(LayoutError::InvalidItem(format!(
                    "duplicate item id '{}'",
                    item.id
                )));
            }
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items ordered by ascending z-index. Ties keep their declaration order.
    pub fn sorted_by_z(&self) -> Vec<&LayoutItem> {
        let mut sorted: Vec<&LayoutItem> = self.items.iter().collect();
        // `sort_by_key` is stable
        sorted.sort_by_key(|item| item.z_index);
        sorted
    }

    /// Image items whose source is an inline base64 payload, with their
    /// position in the layout.
    pub fn inline_images(&self) -> impl Iterator<Item = (usize, &LayoutItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.inline_image_source().is_some())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Video,
    Image,
    Thumbnail,
    Text,
}

/// Item as written by the editor. Unknown keys (`ui`, `aspectRatio`, ...) are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: RawKind,
    #[serde(default, deserialize_with = "deserialize_z_index")]
    z_index: i64,
    x: Option<f64>,
    y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    source: Option<String>,
    content: Option<Value>,
    text_style: Option<TextStyle>,
}

impl RawItem {
    fn into_item(self, position: usize) -> LayoutResult<LayoutItem> {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(LayoutError::InvalidItem(format!(
                    "item at position {position} has no id"
                )))
            }
        };

        let x = self.x.unwrap_or(0.0);
        let y = self.y.unwrap_or(0.0);

        let (frame, element) = match self.kind {
            RawKind::Text => {
                let style = self.text_style.unwrap_or_default();
                style
                    .validate()
                    .map_err(|reason| LayoutError::InvalidItem(format!("{id}: {reason}")))?;
                let frame = Frame::new(
                    x,
                    y,
                    non_zero_or(self.width, f64::from(CANVAS_WIDTH)),
                    non_zero_or(self.height, DEFAULT_TEXT_HEIGHT),
                );
                let content = content_to_string(self.content);
                (frame, LayoutElement::Text { content, style })
            }
            kind => {
                let frame = Frame::new(
                    x,
                    y,
                    self.width.unwrap_or(f64::from(CANVAS_WIDTH)),
                    self.height.unwrap_or(f64::from(CANVAS_HEIGHT)),
                );
                let element = match kind {
                    RawKind::Video => LayoutElement::Video,
                    RawKind::Thumbnail => LayoutElement::Thumbnail,
                    _ => LayoutElement::Image {
                        source: self.source,
                    },
                };
                (frame, element)
            }
        };

        Ok(LayoutItem {
            id,
            z_index: self.z_index,
            frame,
            element,
        })
    }
}

fn non_zero_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v != 0.0 => v,
        _ => default,
    }
}

fn content_to_string(content: Option<Value>) -> String {
    match content {
        None | Some(Value::Null) => DEFAULT_TEXT_CONTENT.to_string(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

/// The editor writes z-index as a number, but older templates stored strings.
fn deserialize_z_index<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom(format!("invalid zIndex {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid zIndex {s:?}"))),
        other => Err(de::Error::custom(format!("invalid zIndex {other}"))),
    }
}
