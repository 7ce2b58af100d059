use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::flow_ir::{
    line_height_px, BlockedRect, ContentRect, Lane, LaneKind, LaneTieBreak, LinePosition,
    StyleRange, TextAlign, TextLine, TextRole, UsedFonts,
};
use crate::flow_prep::{tokenize, tokenize_paragraph, Paragraph, Token};

pub const ELLIPSIS: char = '\u{2026}';
const FIT_EPSILON_PX: f32 = 0.001;

/// Width model used to fill lines.
///
/// The default is [`AverageCharWidth`]; install a glyph-accurate measurer with
/// [`LayoutEngine::with_text_measurer`](crate::LayoutEngine::with_text_measurer).
pub trait TextMeasurer: Send + Sync {
    /// Rendered width of `text` at `font_size` pixels.
    fn measure_text_px(&self, text: &str, font_size: f32) -> f32;

    /// How many characters fit in `width_px`; used to pre-split long words.
    ///
    /// Default derives an average from the width of `"n"`.
    fn char_budget(&self, width_px: i32, font_size: f32) -> usize {
        let per_char = self.measure_text_px("n", font_size);
        if per_char <= 0.0 || width_px <= 0 {
            return 0;
        }
        (width_px as f32 / per_char).floor() as usize
    }
}

/// Every character is `font_size * ratio` wide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AverageCharWidth {
    pub ratio: f32,
}

impl Default for AverageCharWidth {
    fn default() -> Self {
        Self { ratio: 0.56 }
    }
}

impl TextMeasurer for AverageCharWidth {
    fn measure_text_px(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.ratio
    }
}

/// Layout tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Canvas width used when no content region is supplied.
    pub canvas_width: i32,
    /// Canvas height used when no content region is supplied.
    pub canvas_height: i32,
    /// Inset from the canvas edges when no content region is supplied.
    pub margin: i32,
    /// Inset applied to a template content region.
    pub region_padding: f32,
    /// Clearance kept between text and the image.
    pub image_clearance: f32,
    /// Largest headline size tried first.
    pub headline_font_max: f32,
    /// Smallest headline size; always tried.
    pub headline_font_min: f32,
    /// Decrement between headline sizes.
    pub headline_font_step: f32,
    /// Largest body size tried first for each headline size.
    pub body_font_max: f32,
    /// Smallest body size; always tried.
    pub body_font_min: f32,
    /// Decrement between body sizes.
    pub body_font_step: f32,
    /// Line-height multiplier for headline lines.
    pub headline_line_height: f32,
    /// Line-height multiplier for body lines.
    pub body_line_height: f32,
    /// Gap after the headline and between body paragraphs.
    pub block_gap_px: i32,
    /// Side taken when both lanes beside the image are equally wide.
    pub lane_tie_break: LaneTieBreak,
    /// Alignment of text inside each line box.
    pub text_align: TextAlign,
    /// Body starts beside the image when the wider side lane is at least this wide.
    pub min_side_lane_px: i32,
    /// Side lanes narrower than this are abandoned for the space below the image.
    pub skinny_lane_px: i32,
    /// Space needed below the image before a skinny lane is abandoned.
    pub min_below_image_px: i32,
    /// Average glyph width as a fraction of the font size.
    pub char_width_ratio: f32,
}

impl LayoutConfig {
    /// Convenience for a canvas size with sensible defaults.
    pub fn for_canvas(width: i32, height: i32) -> Self {
        Self {
            canvas_width: width,
            canvas_height: height,
            ..Self::default()
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1080,
            canvas_height: 1350,
            margin: 60,
            region_padding: 24.0,
            image_clearance: 1.0,
            headline_font_max: 88.0,
            headline_font_min: 44.0,
            headline_font_step: 4.0,
            body_font_max: 44.0,
            body_font_min: 24.0,
            body_font_step: 2.0,
            headline_line_height: 1.15,
            body_line_height: 1.35,
            block_gap_px: 32,
            lane_tie_break: LaneTieBreak::Right,
            text_align: TextAlign::Center,
            min_side_lane_px: 240,
            skinny_lane_px: 200,
            min_below_image_px: 120,
            char_width_ratio: 0.56,
        }
    }
}

/// Content and blocked rectangles for one layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowBounds {
    pub content: ContentRect,
    pub blocked: BlockedRect,
}

impl FlowBounds {
    fn image_band_hit(&self, y_top: i32, y_bottom: i32) -> bool {
        self.blocked.overlaps_band(y_top, y_bottom)
    }

    fn space_below_image(&self) -> i32 {
        self.content.bottom.saturating_sub(self.blocked.bottom)
    }
}

/// Pick the usable span of the content width for the band `[y_top, y_bottom)`.
///
/// Returns `None` when the band crosses the image and neither side has room.
pub fn lane_for_band(
    y_top: i32,
    y_bottom: i32,
    content: &ContentRect,
    blocked: &BlockedRect,
    tie_break: LaneTieBreak,
) -> Option<Lane> {
    if !blocked.overlaps_band(y_top, y_bottom) {
        return Some(Lane {
            x: content.left,
            width: content.width(),
            kind: LaneKind::Full,
        });
    }
    let left_width = blocked.left.saturating_sub(content.left);
    let right_width = content.right.saturating_sub(blocked.right);
    if left_width <= 0 && right_width <= 0 {
        return None;
    }
    let take_left = match left_width.cmp(&right_width) {
        core::cmp::Ordering::Greater => true,
        core::cmp::Ordering::Less => false,
        core::cmp::Ordering::Equal => tie_break == LaneTieBreak::Left,
    };
    if take_left {
        Some(Lane {
            x: content.left,
            width: left_width,
            kind: LaneKind::Left,
        })
    } else {
        Some(Lane {
            x: blocked.right,
            width: right_width,
            kind: LaneKind::Right,
        })
    }
}

/// Line box width for a lane; centered boxes get an even width so the
/// center never lands on a half pixel.
fn line_box_width(lane_width: i32, align: TextAlign) -> i32 {
    if align == TextAlign::Center && lane_width >= 2 {
        lane_width - lane_width % 2
    } else {
        lane_width
    }
}

/// Per-block placement parameters for one font attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockMetrics {
    pub role: TextRole,
    pub font_size: f32,
    pub line_height: f32,
    pub align: TextAlign,
    /// Lines may not share a vertical band with the image.
    pub clear_image: bool,
}

impl BlockMetrics {
    pub fn line_height_px(&self) -> i32 {
        line_height_px(self.font_size, self.line_height)
    }
}

/// Maps one consumed token from its position in a line back to the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinePart {
    pub line_start: usize,
    /// Includes an inserted hyphen, so it may run one past the source span.
    pub line_end: usize,
    pub source_start: usize,
    pub source_end: usize,
}

pub type LineParts = SmallVec<[LinePart; 8]>;

/// A placed line before style projection.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    pub line: TextLine,
    pub parts: LineParts,
    /// The first word did not fit and was cut with an ellipsis.
    pub clipped: bool,
}

/// Where to try again after a rejected placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryAt {
    /// Same token, one line lower.
    NextRow,
    /// Same token, at the bottom edge of the blocked rect.
    BelowImage,
}

/// Outcome of one [`place_line`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    Placed { line: PlacedLine, next_idx: usize },
    /// Only hard breaks remained; they were consumed without a line.
    Empty { next_idx: usize },
    /// The line would pass the content bottom.
    OutOfSpace,
    /// A headline line that must clear the image crossed its band.
    HeadlineHitImage,
    /// The first word does not fit this side lane.
    LaneTooNarrow,
    /// The line box touched the blocked rect.
    Rejected(RetryAt),
}

/// Greedily fill one line from `tokens[idx..]` into `lane` at row `y`.
pub fn place_line(
    measurer: &dyn TextMeasurer,
    metrics: &BlockMetrics,
    tokens: &[Token],
    idx: usize,
    y: i32,
    lane: Lane,
    bounds: &FlowBounds,
) -> Placement {
    let line_h = metrics.line_height_px();
    let y_bottom = y.saturating_add(line_h);
    if y_bottom > bounds.content.bottom {
        return Placement::OutOfSpace;
    }
    if metrics.role == TextRole::Headline
        && metrics.clear_image
        && bounds.image_band_hit(y, y_bottom)
    {
        return Placement::HeadlineHitImage;
    }

    let mut next = idx;
    while tokens.get(next).is_some_and(Token::is_break) {
        next += 1;
    }
    if next >= tokens.len() {
        return Placement::Empty { next_idx: next };
    }

    let content = &bounds.content;
    let x = lane.x.clamp(content.left, content.right.saturating_sub(1));
    let max_width = line_box_width(lane.width, metrics.align)
        .min(content.right.saturating_sub(x))
        .max(1);
    let fit_width = max_width as f32 + FIT_EPSILON_PX;

    let mut text = String::with_capacity(64);
    let mut parts = LineParts::new();
    let mut line_chars = 0usize;
    while let Some(token) = tokens.get(next) {
        let Token::Word {
            text: word,
            start,
            end,
        } = token
        else {
            next += 1;
            break;
        };
        let rollback = text.len();
        let sep = usize::from(!text.is_empty());
        if sep == 1 {
            text.push(' ');
        }
        text.push_str(word);
        if measurer.measure_text_px(&text, metrics.font_size) > fit_width {
            text.truncate(rollback);
            break;
        }
        let word_chars = word.chars().count();
        parts.push(LinePart {
            line_start: line_chars + sep,
            line_end: line_chars + sep + word_chars,
            source_start: *start,
            source_end: *end,
        });
        line_chars += sep + word_chars;
        next += 1;
    }

    let mut clipped = false;
    if parts.is_empty() {
        if lane.kind != LaneKind::Full {
            return Placement::LaneTooNarrow;
        }
        let Some(Token::Word { text: word, start, end }) = tokens.get(next) else {
            return Placement::Empty { next_idx: next };
        };
        text = clip_with_ellipsis(measurer, word, metrics.font_size, fit_width);
        let kept = text.chars().count().saturating_sub(1).min(end - start);
        parts.push(LinePart {
            line_start: 0,
            line_end: kept,
            source_start: *start,
            source_end: start + kept,
        });
        clipped = true;
        next += 1;
    }

    let line = TextLine {
        text,
        role: metrics.role,
        base_size: metrics.font_size,
        position: LinePosition { x, y },
        text_align: metrics.align,
        line_height: metrics.line_height,
        max_width,
        styles: Vec::new(),
    };
    if line.rect().intersects(&bounds.blocked) {
        let retry = if bounds.image_band_hit(y, y_bottom) {
            RetryAt::BelowImage
        } else {
            RetryAt::NextRow
        };
        return Placement::Rejected(retry);
    }

    Placement::Placed {
        line: PlacedLine {
            line,
            parts,
            clipped,
        },
        next_idx: next,
    }
}

fn clip_with_ellipsis(
    measurer: &dyn TextMeasurer,
    word: &str,
    font_size: f32,
    fit_width: f32,
) -> String {
    let mut out = String::with_capacity(word.len() + ELLIPSIS.len_utf8());
    for ch in word.chars() {
        out.push(ch);
        out.push(ELLIPSIS);
        let fits = measurer.measure_text_px(&out, font_size) <= fit_width;
        out.pop();
        if !fits {
            out.pop();
            break;
        }
    }
    out.push(ELLIPSIS);
    out
}

/// Rewrite a line so it ends in exactly one ellipsis and still fits its box.
///
/// Trailing ellipses and an inserted hyphen are dropped before cutting; local
/// style ranges are clipped to the kept text and extended over the ellipsis
/// when they reach its last character.
pub fn apply_ellipsis(line: &mut TextLine, measurer: &dyn TextMeasurer) {
    let fit_width = line.max_width as f32 + FIT_EPSILON_PX;
    let mut kept = line
        .text
        .trim_end()
        .trim_end_matches(ELLIPSIS)
        .trim_end()
        .to_string();
    if kept.ends_with('-') {
        kept.pop();
    }
    loop {
        kept.push(ELLIPSIS);
        let fits = measurer.measure_text_px(&kept, line.base_size) <= fit_width;
        kept.pop();
        if fits || kept.is_empty() {
            break;
        }
        kept.pop();
    }
    let trimmed = kept.trim_end().len();
    kept.truncate(trimmed);

    let kept_chars = kept.chars().count();
    if kept_chars == 0 {
        line.styles.clear();
    } else {
        line.styles.retain(|range| range.start < kept_chars);
        for range in &mut line.styles {
            if range.end >= kept_chars {
                range.end = kept_chars + 1;
            }
        }
    }
    kept.push(ELLIPSIS);
    line.text = kept;
}

/// Project original-text style ranges onto one line's local offsets.
///
/// Each range intersects each part independently. Consecutive pieces of the
/// same range join across the inter-word space when the range spans the
/// source gap, so a range over a whole paragraph covers whole lines.
pub fn project_styles(ranges: &[StyleRange], parts: &[LinePart]) -> Vec<StyleRange> {
    let mut out = Vec::new();
    for range in ranges {
        let mut current: Option<StyleRange> = None;
        let mut joinable = false;
        for part in parts {
            let start = range.start.max(part.source_start);
            let end = range.end.min(part.source_end);
            if start >= end {
                if let Some(done) = current.take() {
                    out.push(done);
                }
                joinable = false;
                continue;
            }
            let local_start = part.line_start + (start - part.source_start);
            let local_end = if end >= part.source_end {
                part.line_end
            } else {
                part.line_start + (end - part.source_start)
            };
            let reaches_part_end = end >= part.source_end;
            if joinable && start == part.source_start {
                if let Some(open) = current.as_mut() {
                    open.end = local_end;
                    joinable = reaches_part_end;
                    continue;
                }
            }
            if let Some(done) = current.take() {
                out.push(done);
            }
            current = Some(range.with_span(local_start, local_end));
            joinable = reaches_part_end;
        }
        if let Some(done) = current {
            out.push(done);
        }
    }
    out
}

/// How a block stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockEnd {
    Complete,
    OutOfSpace,
    HitImage,
}

/// Inputs that stay fixed across font attempts.
pub(crate) struct FlowInput<'a> {
    pub headline: &'a str,
    pub paragraphs: &'a [Paragraph<'a>],
    pub bounds: FlowBounds,
    pub headline_clears_image: bool,
}

/// Running state of one font attempt.
#[derive(Clone, Debug, Default)]
pub(crate) struct FlowCursor {
    pub y: i32,
    pub lines: Vec<PlacedLine>,
    pub truncated: bool,
    /// The headline did not complete; body sizes cannot change the outcome.
    pub headline_failed: bool,
}

struct FlowContext<'a> {
    cfg: &'a LayoutConfig,
    measurer: &'a dyn TextMeasurer,
    bounds: FlowBounds,
}

/// Run the headline then the body at one font pair.
pub(crate) fn flow_attempt(
    cfg: &LayoutConfig,
    measurer: &dyn TextMeasurer,
    input: &FlowInput<'_>,
    fonts: UsedFonts,
) -> FlowCursor {
    let bounds = input.bounds;
    let ctx = FlowContext {
        cfg,
        measurer,
        bounds,
    };
    let mut cursor = FlowCursor {
        y: bounds.content.top,
        lines: Vec::with_capacity(16),
        ..FlowCursor::default()
    };
    let full_width = line_box_width(bounds.content.width(), cfg.text_align);

    let headline = BlockMetrics {
        role: TextRole::Headline,
        font_size: fonts.headline,
        line_height: cfg.headline_line_height,
        align: cfg.text_align,
        clear_image: input.headline_clears_image,
    };
    let headline_tokens = tokenize(
        input.headline,
        measurer.char_budget(full_width, fonts.headline),
    );
    if headline_tokens.iter().any(|token| !token.is_break()) {
        match cursor.flow_block(&ctx, &headline, &headline_tokens) {
            BlockEnd::Complete => {}
            BlockEnd::OutOfSpace | BlockEnd::HitImage => {
                cursor.truncated = true;
                cursor.headline_failed = true;
                return cursor;
            }
        }
        cursor.y = cursor.y.saturating_add(cfg.block_gap_px);
    }

    let blocked = &bounds.blocked;
    if blocked.intersects(&bounds.content) {
        let widest = blocked
            .left
            .saturating_sub(bounds.content.left)
            .max(bounds.content.right.saturating_sub(blocked.right));
        if widest >= cfg.min_side_lane_px {
            cursor.y = cursor.y.max(blocked.top);
        }
    }

    let body = BlockMetrics {
        role: TextRole::Body,
        font_size: fonts.body,
        line_height: cfg.body_line_height,
        align: cfg.text_align,
        clear_image: false,
    };
    let budget = measurer.char_budget(full_width, fonts.body);
    for (idx, paragraph) in input.paragraphs.iter().enumerate() {
        if idx > 0 {
            cursor.y = cursor.y.saturating_add(cfg.block_gap_px);
        }
        let tokens = tokenize_paragraph(paragraph, budget);
        if cursor.flow_block(&ctx, &body, &tokens) != BlockEnd::Complete {
            cursor.truncated = true;
            break;
        }
    }
    cursor
}

impl FlowCursor {
    fn flow_block(
        &mut self,
        ctx: &FlowContext<'_>,
        metrics: &BlockMetrics,
        tokens: &[Token],
    ) -> BlockEnd {
        let bounds = &ctx.bounds;
        let line_h = metrics.line_height_px();
        let shares_image_band = metrics.role == TextRole::Body || !metrics.clear_image;
        let mut idx = 0usize;

        loop {
            while tokens.get(idx).is_some_and(Token::is_break) {
                idx += 1;
            }
            if idx >= tokens.len() {
                break;
            }
            let y_bottom = self.y.saturating_add(line_h);
            if y_bottom > bounds.content.bottom {
                return BlockEnd::OutOfSpace;
            }
            if !shares_image_band && bounds.image_band_hit(self.y, y_bottom) {
                return BlockEnd::HitImage;
            }
            let Some(lane) = lane_for_band(
                self.y,
                y_bottom,
                &bounds.content,
                &bounds.blocked,
                ctx.cfg.lane_tie_break,
            ) else {
                self.y = self.below_image(&bounds.blocked);
                continue;
            };
            if lane.kind != LaneKind::Full
                && lane.width < ctx.cfg.skinny_lane_px
                && bounds.space_below_image() >= ctx.cfg.min_below_image_px
            {
                self.y = self.below_image(&bounds.blocked);
                continue;
            }

            match place_line(ctx.measurer, metrics, tokens, idx, self.y, lane, bounds) {
                Placement::Placed { line, next_idx } => {
                    self.truncated |= line.clipped;
                    self.lines.push(line);
                    self.y = y_bottom;
                    idx = next_idx;
                }
                Placement::Empty { next_idx } => idx = next_idx,
                Placement::OutOfSpace => return BlockEnd::OutOfSpace,
                Placement::HeadlineHitImage => return BlockEnd::HitImage,
                Placement::LaneTooNarrow | Placement::Rejected(RetryAt::BelowImage) => {
                    self.y = self.below_image(&bounds.blocked);
                }
                Placement::Rejected(RetryAt::NextRow) => self.y = y_bottom,
            }
        }
        BlockEnd::Complete
    }

    fn below_image(&self, blocked: &BlockedRect) -> i32 {
        blocked.bottom.max(self.y.saturating_add(1))
    }
}
