//! Deterministic headline and body text flow around an image for carousel slides.
//!
//! [`LayoutEngine::layout`] searches a small grid of font sizes and returns the
//! first arrangement that places all text without touching the image, or the
//! fullest truncated one.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod flow_engine;
mod flow_ir;
mod flow_layout;
mod flow_prep;

pub use flow_engine::{check_invariants, font_steps, LayoutEngine, LayoutError, LayoutRequest};
pub use flow_ir::{
    blocked_rect, line_height_px, BlockedRect, CanvasBox, ContentRect, Lane, LaneKind,
    LaneTieBreak, LayoutResult, LinePosition, PixelRect, StyleRange, TextAlign, TextLine,
    TextRole, UsedFonts,
};
pub use flow_layout::{
    apply_ellipsis, lane_for_band, place_line, project_styles, AverageCharWidth, BlockMetrics,
    FlowBounds, LayoutConfig, LinePart, LineParts, Placement, PlacedLine, RetryAt, TextMeasurer,
    ELLIPSIS,
};
pub use flow_prep::{
    normalize_style_ranges, split_paragraphs, tokenize, tokenize_paragraph, Paragraph, Token,
};
