//! Font-fit search, invariant checking and the public layout entry point.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::flow_ir::{
    blocked_rect, line_height_px, BlockedRect, CanvasBox, ContentRect, LayoutResult, PixelRect,
    StyleRange, TextLine, TextRole, UsedFonts,
};
use crate::flow_layout::{
    apply_ellipsis, flow_attempt, project_styles, AverageCharWidth, FlowBounds, FlowCursor,
    FlowInput, LayoutConfig, TextMeasurer,
};
use crate::flow_prep::{normalize_style_ranges, split_paragraphs};

/// Upper bound on sizes tried per block.
const MAX_FONT_STEPS: usize = 4096;

/// Errors returned by [`LayoutEngine`].
#[derive(Debug)]
pub enum LayoutError {
    /// The content rectangle has no area.
    InvalidContentRect(PixelRect),
    /// Font range for a block is empty, non-positive or not finite.
    InvalidFontRange {
        block: TextRole,
        min: f32,
        max: f32,
        step: f32,
    },
    /// Line-height multiplier is non-positive or not finite.
    InvalidLineHeight { block: TextRole, value: f32 },
    /// Average character width ratio is non-positive or not finite.
    InvalidMeasureRatio(f32),
    /// A placed line escaped the content rect or touched the image.
    InvariantViolation {
        line_index: usize,
        line: PixelRect,
        blocked: BlockedRect,
        content: ContentRect,
    },
    /// Snapshot JSON could not be written or read.
    Snapshot(serde_json::Error),
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidContentRect(rect) => write!(f, "content rect has no area: {}", rect),
            Self::InvalidFontRange {
                block,
                min,
                max,
                step,
            } => write!(
                f,
                "invalid {} font range (min={} max={} step={})",
                block, min, max, step
            ),
            Self::InvalidLineHeight { block, value } => {
                write!(f, "invalid {} line height: {}", block, value)
            }
            Self::InvalidMeasureRatio(ratio) => write!(f, "invalid char width ratio: {}", ratio),
            Self::InvariantViolation {
                line_index,
                line,
                blocked,
                content,
            } => write!(
                f,
                "layout invariant violated at line {}: line={} blocked={} content={}",
                line_index, line, blocked, content
            ),
            Self::Snapshot(err) => write!(f, "layout snapshot failed: {}", err),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(value: serde_json::Error) -> Self {
        Self::Snapshot(value)
    }
}

fn valid_font_range(block: TextRole, max: f32, min: f32, step: f32) -> Result<(), LayoutError> {
    let finite = max.is_finite() && min.is_finite() && step.is_finite();
    if !finite || min <= 0.0 || max < min || step <= 0.0 {
        return Err(LayoutError::InvalidFontRange {
            block,
            min,
            max,
            step,
        });
    }
    Ok(())
}

fn valid_line_height(block: TextRole, value: f32) -> Result<(), LayoutError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LayoutError::InvalidLineHeight { block, value });
    }
    Ok(())
}

impl LayoutConfig {
    /// Reject tunables the search cannot run with.
    pub fn validate(&self) -> Result<(), LayoutError> {
        valid_font_range(
            TextRole::Headline,
            self.headline_font_max,
            self.headline_font_min,
            self.headline_font_step,
        )?;
        valid_font_range(
            TextRole::Body,
            self.body_font_max,
            self.body_font_min,
            self.body_font_step,
        )?;
        valid_line_height(TextRole::Headline, self.headline_line_height)?;
        valid_line_height(TextRole::Body, self.body_line_height)?;
        if !self.char_width_ratio.is_finite() || self.char_width_ratio <= 0.0 {
            return Err(LayoutError::InvalidMeasureRatio(self.char_width_ratio));
        }
        Ok(())
    }
}

/// Text and geometry for one slide.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutRequest {
    pub headline: String,
    pub body: String,
    /// Ranges over `headline` chars.
    pub headline_styles: Vec<StyleRange>,
    /// Ranges over `body` chars.
    pub body_styles: Vec<StyleRange>,
    /// Image bounds in canvas pixels; `None` leaves the full content width free.
    pub image: Option<CanvasBox>,
    /// Template content region; `None` uses the canvas minus the margin.
    pub content_region: Option<CanvasBox>,
}

impl LayoutRequest {
    pub fn new(headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: CanvasBox) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_content_region(mut self, region: CanvasBox) -> Self {
        self.content_region = Some(region);
        self
    }

    pub fn with_headline_styles(mut self, styles: Vec<StyleRange>) -> Self {
        self.headline_styles = styles;
        self
    }

    pub fn with_body_styles(mut self, styles: Vec<StyleRange>) -> Self {
        self.body_styles = styles;
        self
    }
}

/// Sizes from `max` down to `min` in `step` decrements; `min` is always tried.
pub fn font_steps(max: f32, min: f32, step: f32) -> Vec<f32> {
    if step.is_nan() || step <= 0.0 || max <= min {
        return vec![min];
    }
    let count = (((max - min) / step).floor() as usize).min(MAX_FONT_STEPS - 1);
    let mut sizes: Vec<f32> = (0..=count).map(|i| max - i as f32 * step).collect();
    if sizes.last().is_some_and(|last| (last - min).abs() > 1e-3) {
        sizes.push(min);
    }
    sizes
}

/// Verify every line stays inside `content` and clear of `blocked`.
pub fn check_invariants(
    lines: &[TextLine],
    content: &ContentRect,
    blocked: &BlockedRect,
) -> Result<(), LayoutError> {
    for (line_index, line) in lines.iter().enumerate() {
        check_line(line_index, line, content, blocked)?;
    }
    Ok(())
}

fn check_line(
    line_index: usize,
    line: &TextLine,
    content: &ContentRect,
    blocked: &BlockedRect,
) -> Result<(), LayoutError> {
    let rect = line.rect();
    if rect.intersects(blocked) || !content.contains_rect(&rect) {
        return Err(LayoutError::InvariantViolation {
            line_index,
            line: rect,
            blocked: *blocked,
            content: *content,
        });
    }
    Ok(())
}

/// Fits headline and body text around an image.
#[derive(Clone)]
pub struct LayoutEngine {
    cfg: LayoutConfig,
    text_measurer: Arc<dyn TextMeasurer>,
}

impl LayoutEngine {
    /// Create a layout engine using the average-character-width measurer.
    pub fn new(cfg: LayoutConfig) -> Self {
        Self {
            cfg,
            text_measurer: Arc::new(AverageCharWidth {
                ratio: cfg.char_width_ratio,
            }),
        }
    }

    /// Install a shared text measurer for glyph-accurate width fitting.
    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.text_measurer = measurer;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    /// Content rectangle for an optional template region.
    pub fn content_rect(&self, region: Option<&CanvasBox>) -> ContentRect {
        match region {
            Some(region) => region.inner_pixels(self.cfg.region_padding),
            None => PixelRect::new(
                self.cfg.margin,
                self.cfg.margin,
                self.cfg.canvas_width.saturating_sub(self.cfg.margin),
                self.cfg.canvas_height.saturating_sub(self.cfg.margin),
            ),
        }
    }

    fn bounds(&self, req: &LayoutRequest) -> Result<FlowBounds, LayoutError> {
        self.cfg.validate()?;
        let content = self.content_rect(req.content_region.as_ref());
        if content.is_empty() {
            return Err(LayoutError::InvalidContentRect(content));
        }
        let blocked = blocked_rect(req.image.as_ref(), self.cfg.image_clearance);
        Ok(FlowBounds { content, blocked })
    }

    /// The headline must stay above the image when one minimum-size line fits there.
    fn headline_clears_image(&self, bounds: &FlowBounds) -> bool {
        let room = bounds.blocked.top.saturating_sub(bounds.content.top);
        room >= line_height_px(self.cfg.headline_font_min, self.cfg.headline_line_height)
    }

    /// Search the font grid and return the first complete layout, or the
    /// fullest truncated one.
    pub fn layout(&self, req: &LayoutRequest) -> Result<LayoutResult, LayoutError> {
        let bounds = self.bounds(req)?;
        let paragraphs = split_paragraphs(&req.body);
        let input = FlowInput {
            headline: &req.headline,
            paragraphs: &paragraphs,
            bounds,
            headline_clears_image: self.headline_clears_image(&bounds),
        };
        let cfg = &self.cfg;
        let headline_sizes = font_steps(
            cfg.headline_font_max,
            cfg.headline_font_min,
            cfg.headline_font_step,
        );
        let body_sizes = font_steps(cfg.body_font_max, cfg.body_font_min, cfg.body_font_step);

        let mut best: Option<(FlowCursor, UsedFonts)> = None;
        for &headline in &headline_sizes {
            for &body in &body_sizes {
                let fonts = UsedFonts::new(headline, body);
                let attempt = flow_attempt(cfg, self.text_measurer.as_ref(), &input, fonts);
                log::trace!(
                    "layout attempt headline={} body={} lines={} truncated={}",
                    headline,
                    body,
                    attempt.lines.len(),
                    attempt.truncated
                );
                if !attempt.truncated {
                    log::debug!(
                        "layout fits at headline={} body={} ({} lines)",
                        headline,
                        body,
                        attempt.lines.len()
                    );
                    return self.finish(req, attempt, fonts, &bounds);
                }
                let headline_failed = attempt.headline_failed;
                let fuller = best
                    .as_ref()
                    .map_or(true, |(kept, _)| attempt.lines.len() > kept.lines.len());
                if fuller {
                    for (line_index, placed) in attempt.lines.iter().enumerate() {
                        check_line(line_index, &placed.line, &bounds.content, &bounds.blocked)?;
                    }
                    best = Some((attempt, fonts));
                }
                if headline_failed {
                    break;
                }
            }
        }

        let Some((attempt, fonts)) = best else {
            return Ok(LayoutResult {
                truncated: true,
                used_fonts: UsedFonts::new(cfg.headline_font_min, cfg.body_font_min),
                ..LayoutResult::default()
            });
        };
        log::warn!(
            "text does not fit; keeping {} lines at headline={} body={}",
            attempt.lines.len(),
            fonts.headline,
            fonts.body
        );
        self.finish(req, attempt, fonts, &bounds)
    }

    /// Run a single attempt at fixed sizes, skipping the search.
    pub fn layout_with_fonts(
        &self,
        req: &LayoutRequest,
        fonts: UsedFonts,
    ) -> Result<LayoutResult, LayoutError> {
        let bounds = self.bounds(req)?;
        for (block, size) in [(TextRole::Headline, fonts.headline), (TextRole::Body, fonts.body)] {
            valid_font_range(block, size, size, 1.0)?;
        }
        let paragraphs = split_paragraphs(&req.body);
        let input = FlowInput {
            headline: &req.headline,
            paragraphs: &paragraphs,
            bounds,
            headline_clears_image: self.headline_clears_image(&bounds),
        };
        let attempt = flow_attempt(&self.cfg, self.text_measurer.as_ref(), &input, fonts);
        self.finish(req, attempt, fonts, &bounds)
    }

    fn finish(
        &self,
        req: &LayoutRequest,
        attempt: FlowCursor,
        fonts: UsedFonts,
        bounds: &FlowBounds,
    ) -> Result<LayoutResult, LayoutError> {
        let headline_styles =
            normalize_style_ranges(&req.headline_styles, req.headline.chars().count());
        let body_styles = normalize_style_ranges(&req.body_styles, req.body.chars().count());

        let mut text_lines = Vec::with_capacity(attempt.lines.len());
        for placed in attempt.lines {
            let ranges = match placed.line.role {
                TextRole::Headline => &headline_styles,
                TextRole::Body => &body_styles,
            };
            let mut line = placed.line;
            line.styles = project_styles(ranges, &placed.parts);
            text_lines.push(line);
        }
        if attempt.truncated {
            if let Some(last) = text_lines.last_mut() {
                apply_ellipsis(last, self.text_measurer.as_ref());
            }
        }
        check_invariants(&text_lines, &bounds.content, &bounds.blocked)?;

        Ok(LayoutResult {
            text_lines,
            truncated: attempt.truncated,
            used_fonts: fonts,
        })
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutResult {
    /// Serialize for storage as an opaque slide snapshot.
    pub fn to_snapshot_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_snapshot_json(json: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(json)?)
    }
}
