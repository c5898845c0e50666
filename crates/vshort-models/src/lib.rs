//! Shared data models for the vshort clip pipeline.
//!
//! This crate provides:
//! - The declarative canvas layout (video, image, thumbnail and text items)
//! - Text style defaults
//! - Encoder profiles for intermediate and segment renders
//! - Segment planning and retime/loop arithmetic
//! - Job descriptions
//! - Pipeline events and the line-oriented stdout protocol

pub mod encoding;
pub mod event;
pub mod job;
pub mod layout;
pub mod text_style;
pub mod timeline;
pub mod utils;

// Re-export common types
pub use encoding::{EncoderFamily, EncoderProfile};
pub use event::{EventSink, OutputChannel, PipelineEvent};
pub use job::{JobError, JobSpec, VideoTrack};
pub use layout::{Frame, Layout, LayoutElement, LayoutError, LayoutItem, LayoutResult};
pub use text_style::TextStyle;
pub use timeline::{PlanError, SegmentPlan, SegmentWindow};
pub use utils::sanitize_filename;
