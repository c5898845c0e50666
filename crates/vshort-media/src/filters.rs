//! Filter-graph compilation for layout rendering.
//!
//! A layout is compiled into one `-filter_complex` expression:
//!
//! ```text
//! color=s=720x1280:c=black[canvas];
//! [0:v]trim=start=S:duration=D,setpts=PTS-STARTPTS,scale=W:H,setsar=1[s0];
//! [canvas][s0]overlay=X:Y[bg1];
//! [bg1]drawtext=...[txt1];
//! [txt1]copy[final_v];
//! [0:a]atrim=start=S:duration=D,asetpts=PTS-STARTPTS[final_a]
//! ```
//!
//! Visual layers (video, image, thumbnail) are overlaid first and text is
//! drawn in a second pass, so text always sits above every visual layer.
//! z-index only orders items within each pass.

use std::collections::HashMap;
use std::path::Path;

use vshort_models::layout::{CANVAS_HEIGHT, CANVAS_WIDTH, TEXT_PLACEHOLDER};
use vshort_models::{Layout, LayoutElement, LayoutItem, TextStyle};

use crate::command::InputHandle;
use crate::escape::{
    escape_drawtext, escape_font_name, ffmpeg_safe_path, hex_to_ffmpeg_color, OPAQUE_ALPHA,
};

/// Pad holding the background canvas.
pub const CANVAS_PAD: &str = "canvas";
/// Pad holding the composited video.
pub const FINAL_VIDEO_PAD: &str = "final_v";
/// Pad holding the trimmed audio.
pub const FINAL_AUDIO_PAD: &str = "final_a";
/// Audio source reference emitted before the audio input is known.
pub const AUDIO_SOURCE_PLACEHOLDER: &str = "[0:a]";

/// A compiled filter graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    /// The `-filter_complex` expression
    pub expression: String,
    /// Name of the final video pad
    pub video_pad: String,
    /// Name of the final audio pad
    pub audio_pad: String,
}

impl FilterGraph {
    /// Point the audio trim at the real audio input.
    pub fn bind_audio(mut self, audio: InputHandle) -> Self {
        self.expression = self
            .expression
            .replace(AUDIO_SOURCE_PLACEHOLDER, &audio.audio_pad());
        self
    }

    /// `-map` argument for the video output.
    pub fn video_map(&self) -> String {
        format!("[{}]", self.video_pad)
    }

    /// `-map` argument for the audio output.
    pub fn audio_map(&self) -> String {
        format!("[{}]", self.audio_pad)
    }
}

/// Compile a layout into a filter graph for one segment.
///
/// `inputs` maps layout item ids to the input carrying their media. Visual
/// items without an entry are skipped. Fonts resolve to
/// `<assets_root>/assets/<fontFamily>`; their existence is not checked here.
pub fn compile_layout(
    layout: &Layout,
    inputs: &HashMap<String, InputHandle>,
    start: f64,
    duration: f64,
    part_number: usize,
    assets_root: &Path,
) -> FilterGraph {
    let sorted = layout.sorted_by_z();
    let mut filters = vec![format!(
        "color=s={CANVAS_WIDTH}x{CANVAS_HEIGHT}:c=black[{CANVAS_PAD}]"
    )];
    let mut last = CANVAS_PAD.to_string();
    let mut count = 0usize;

    for item in sorted.iter().filter(|item| !item.is_text()) {
        let Some(input) = inputs.get(&item.id) else {
            continue;
        };

        let scaled = format!("s{count}");
        let output = format!("bg{}", count + 1);
        let scale = format!("scale={}:{},setsar=1", item.frame.width, item.frame.height);

        if item.is_video() {
            filters.push(format!(
                "{}trim=start={start}:duration={duration},setpts=PTS-STARTPTS,{scale}[{scaled}]",
                input.video_pad()
            ));
        } else {
            filters.push(format!("{}{scale}[{scaled}]", input.video_pad()));
        }
        filters.push(format!(
            "[{last}][{scaled}]overlay={}:{}[{output}]",
            item.frame.x, item.frame.y
        ));

        last = output;
        count += 1;
    }

    for item in &sorted {
        let LayoutElement::Text { content, style } = &item.element else {
            continue;
        };

        let text = display_text(item, content, part_number);
        let output = format!("txt{count}");
        filters.push(format!(
            "[{last}]{}[{output}]",
            drawtext(item, &text, style, assets_root)
        ));

        last = output;
        count += 1;
    }

    filters.push(format!("[{last}]copy[{FINAL_VIDEO_PAD}]"));
    filters.push(format!(
        "{AUDIO_SOURCE_PLACEHOLDER}atrim=start={start}:duration={duration},asetpts=PTS-STARTPTS[{FINAL_AUDIO_PAD}]"
    ));

    FilterGraph {
        expression: filters.join(";"),
        video_pad: FINAL_VIDEO_PAD.to_string(),
        audio_pad: FINAL_AUDIO_PAD.to_string(),
    }
}

/// The part label replaces the placeholder's configured content.
fn display_text(item: &LayoutItem, content: &str, part_number: usize) -> String {
    if item.id == TEXT_PLACEHOLDER {
        format!("Part {part_number}")
    } else {
        content.to_string()
    }
}

fn drawtext(item: &LayoutItem, text: &str, style: &TextStyle, assets_root: &Path) -> String {
    let (center_x, center_y) = item.frame.center();

    let font_path = assets_root
        .join("assets")
        .join(escape_font_name(&style.font_file()));
    let font_path = ffmpeg_safe_path(&font_path.to_string_lossy());

    let box_color = hex_to_ffmpeg_color(style.box_color(), &style.box_alpha_hex());
    let shadow_depth = style.shadow_depth();

    [
        format!("drawtext=fontfile='{font_path}'"),
        format!("text='{}'", escape_drawtext(text)),
        format!("fontsize={}", style.font_size()),
        format!(
            "fontcolor={}",
            hex_to_ffmpeg_color(style.font_color(), OPAQUE_ALPHA)
        ),
        format!("x={center_x}-(text_w/2)"),
        format!("y={center_y}-(text_h/2)"),
        format!("borderw={}", style.outline_width()),
        format!(
            "bordercolor={}",
            hex_to_ffmpeg_color(style.outline_color(), OPAQUE_ALPHA)
        ),
        format!(
            "shadowcolor={}",
            hex_to_ffmpeg_color(style.shadow_color(), vshort_models::text_style::SHADOW_ALPHA)
        ),
        format!("shadowx={shadow_depth}"),
        format!("shadowy={shadow_depth}"),
        "box=1".to_string(),
        format!("boxcolor={box_color}"),
        format!("boxborderw={}", style.box_padding()),
    ]
    .join(":")
}

/// Video filter that plays a stream at `speed`.
pub fn retime_filter(speed: f64) -> String {
    format!("setpts=PTS/{speed}")
}
