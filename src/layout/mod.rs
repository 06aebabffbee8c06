//! Layout transform pipeline: canvas payloads to surface geometry.

pub mod measure;
pub mod output;
pub mod pipeline;
pub mod scale;


pub use measure::{EstimatedTextMeasurer, TextExtent, TextMeasurer};
pub use output::{
    FrameOutput, GroupBackground, RenderedGeometry, RenderedGroup, RenderedLabel, RenderedPayload,
    RenderedPoint,
};
pub use pipeline::{compute_frame, FrameInput};
pub use scale::{anchor_shift, base_mapping};
