use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle, half-open on the right and bottom edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Region all text must stay inside.
pub type ContentRect = PixelRect;

/// Image box grown by the clearance; text must never touch it.
pub type BlockedRect = PixelRect;

impl PixelRect {
    /// Stand-in for an absent image, far enough off-canvas to never constrain layout.
    pub const OFFSCREEN: PixelRect = PixelRect {
        left: -1_000_000,
        top: -1_000_000,
        right: -999_999,
        bottom: -999_999,
    };

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    /// True when the horizontal band `[y_top, y_bottom)` crosses this rectangle's rows.
    pub fn overlaps_band(&self, y_top: i32, y_bottom: i32) -> bool {
        y_top < self.bottom && self.top < y_bottom
    }
}

impl core::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[l={} t={} r={} b={}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Fractional box in canvas pixels as supplied by the editor layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    fn edges(&self) -> (f32, f32, f32, f32) {
        let (x0, x1) = (self.x.min(self.x + self.width), self.x.max(self.x + self.width));
        let (y0, y1) = (self.y.min(self.y + self.height), self.y.max(self.y + self.height));
        (x0, y0, x1, y1)
    }

    /// Grow by `amount` on every side and snap outward to whole pixels.
    pub fn outer_pixels(&self, amount: f32) -> PixelRect {
        let (x0, y0, x1, y1) = self.edges();
        PixelRect::new(
            (x0 - amount).floor() as i32,
            (y0 - amount).floor() as i32,
            (x1 + amount).ceil() as i32,
            (y1 + amount).ceil() as i32,
        )
    }

    /// Shrink by `amount` on every side and snap inward to whole pixels.
    pub fn inner_pixels(&self, amount: f32) -> PixelRect {
        let (x0, y0, x1, y1) = self.edges();
        PixelRect::new(
            (x0 + amount).ceil() as i32,
            (y0 + amount).ceil() as i32,
            (x1 - amount).floor() as i32,
            (y1 - amount).floor() as i32,
        )
    }
}

/// Blocked rectangle for an optional image.
///
/// The box grows by `clearance` and snaps outward so rounding can never pull
/// text closer than the clearance. A missing or non-finite image yields
/// [`PixelRect::OFFSCREEN`].
pub fn blocked_rect(image: Option<&CanvasBox>, clearance: f32) -> BlockedRect {
    match image {
        Some(image) if image.is_finite() => image.outer_pixels(clearance.max(0.0)),
        _ => PixelRect::OFFSCREEN,
    }
}

/// Which part of the content width a scan band may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneKind {
    Full,
    Left,
    Right,
}

/// Usable horizontal span for one scan band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lane {
    pub x: i32,
    pub width: i32,
    pub kind: LaneKind,
}

/// Side picked when both lanes beside the image are equally wide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneTieBreak {
    Left,
    #[default]
    Right,
}

/// Horizontal alignment of text inside its line box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
}

/// Block a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRole {
    Headline,
    Body,
}

impl core::fmt::Display for TextRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Headline => write!(f, "headline"),
            Self::Body => write!(f, "body"),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Half-open character range carrying inline marks.
///
/// Offsets count `char`s. Input ranges address the original headline or body
/// text; ranges on a [`TextLine`] address that line's `text`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleRange {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
}

impl StyleRange {
    pub fn bold(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            italic: true,
            ..Self::default()
        }
    }

    pub fn underline(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            underline: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn has_marks(&self) -> bool {
        self.bold || self.italic || self.underline
    }

    pub fn same_marks(&self, other: &StyleRange) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.underline == other.underline
    }

    pub(crate) fn with_span(&self, start: usize, end: usize) -> Self {
        Self { start, end, ..*self }
    }
}

/// Top-left corner of a line box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePosition {
    pub x: i32,
    pub y: i32,
}

/// Pixel height of one line at `font_size` with a line-height multiplier.
pub fn line_height_px(font_size: f32, line_height: f32) -> i32 {
    (font_size * line_height).ceil().max(1.0) as i32
}

/// One positioned line of output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLine {
    pub text: String,
    pub role: TextRole,
    /// Font size in pixels.
    pub base_size: f32,
    pub position: LinePosition,
    pub text_align: TextAlign,
    /// Line-height multiplier; the box is `ceil(base_size * line_height)` tall.
    pub line_height: f32,
    /// Box width; text is aligned inside `[x, x + max_width)`.
    pub max_width: i32,
    #[serde(default)]
    pub styles: Vec<StyleRange>,
}

impl TextLine {
    pub fn line_height_px(&self) -> i32 {
        line_height_px(self.base_size, self.line_height)
    }

    /// The box the renderer may paint into.
    pub fn rect(&self) -> PixelRect {
        PixelRect::from_xywh(
            self.position.x,
            self.position.y,
            self.max_width,
            self.line_height_px(),
        )
    }
}

/// Font sizes the accepted attempt was laid out with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsedFonts {
    pub headline: f32,
    pub body: f32,
}

impl UsedFonts {
    pub fn new(headline: f32, body: f32) -> Self {
        Self { headline, body }
    }
}

/// Final layout handed to the renderer and stored as the slide snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub text_lines: Vec<TextLine>,
    /// Some input text could not be placed at any tried size.
    pub truncated: bool,
    pub used_fonts: UsedFonts,
}

impl LayoutResult {
    /// Lines of one block, in placement order.
    pub fn lines_for(&self, role: TextRole) -> impl Iterator<Item = &TextLine> {
        self.text_lines.iter().filter(move |line| line.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(10, 0, 20, 10);
        let c = PixelRect::new(0, 10, 10, 20);
        assert!(!a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&PixelRect::new(9, 9, 11, 11)));
    }

    #[test]
    fn blocked_rect_snaps_outward_with_clearance() {
        let image = CanvasBox::new(10.4, 20.6, 100.2, 50.0);
        let blocked = blocked_rect(Some(&image), 1.0);
        assert_eq!(blocked, PixelRect::new(9, 19, 112, 72));
    }

    #[test]
    fn blocked_rect_normalizes_negative_size() {
        let image = CanvasBox::new(100.0, 100.0, -50.0, -20.0);
        assert_eq!(
            blocked_rect(Some(&image), 0.0),
            PixelRect::new(50, 80, 100, 100)
        );
    }

    #[test]
    fn missing_or_broken_image_is_offscreen() {
        assert_eq!(blocked_rect(None, 1.0), PixelRect::OFFSCREEN);
        let broken = CanvasBox::new(f32::NAN, 0.0, 10.0, 10.0);
        assert_eq!(blocked_rect(Some(&broken), 1.0), PixelRect::OFFSCREEN);
    }

    #[test]
    fn inner_pixels_snap_inward() {
        let region = CanvasBox::new(40.5, 40.5, 1000.0, 500.0);
        assert_eq!(region.inner_pixels(20.0), PixelRect::new(61, 61, 1020, 520));
    }

    #[test]
    fn line_rect_uses_ceiled_line_height() {
        let line = TextLine {
            text: "hello".to_string(),
            role: TextRole::Body,
            base_size: 44.0,
            position: LinePosition { x: 60, y: 100 },
            text_align: TextAlign::Center,
            line_height: 1.35,
            max_width: 960,
            styles: Vec::new(),
        };
        assert_eq!(line.rect(), PixelRect::new(60, 100, 1020, 160));
    }

    #[test]
    fn style_range_flags_skip_false_on_serialize() {
        let json = serde_json::to_string(&StyleRange::bold(2, 5)).expect("serializes");
        assert_eq!(json, r#"{"start":2,"end":5,"bold":true}"#);
        let parsed: StyleRange =
            serde_json::from_str(r#"{"start":1,"end":3,"italic":true}"#).expect("parses");
        assert_eq!(parsed, StyleRange::italic(1, 3));
    }
}
