mod common;

use carousel_flow::{
    blocked_rect, check_invariants, CanvasBox, LayoutConfig, LayoutEngine, LayoutError,
    LayoutRequest, LayoutResult, TextRole, UsedFonts, ELLIPSIS,
};
use common::fixtures::{image_grid, prose, BODY, HEADLINE};

/// Non-whitespace characters of `lines`, dropping ellipses and the hyphens
/// the splitter inserts. Fixture text carries no hyphens of its own.
fn visible_chars<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines
        .flat_map(str::chars)
        .filter(|ch| !ch.is_whitespace() && *ch != ELLIPSIS && *ch != '-')
        .collect()
}

fn source_chars(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}

fn assert_word_integrity(result: &LayoutResult, headline: &str, body: &str) {
    for (role, source) in [(TextRole::Headline, headline), (TextRole::Body, body)] {
        let placed = visible_chars(result.lines_for(role).map(|line| line.text.as_str()));
        let source = source_chars(source);
        assert!(
            source.starts_with(&placed),
            "{} lines are not a prefix of the source:\n{}\n{}",
            role,
            placed,
            source
        );
        if !result.truncated {
            assert_eq!(placed, source, "{} lost text without truncating", role);
        }
    }
}

#[test]
fn lines_never_touch_image_or_leave_content() {
    let cfg = LayoutConfig::default();
    let engine = LayoutEngine::new(cfg);
    let content = engine.content_rect(None);
    let bodies = [String::new(), BODY.to_string(), prose(400), prose(1600)];

    for image in image_grid() {
        let blocked = blocked_rect(Some(&image), cfg.image_clearance);
        for body in &bodies {
            let req = LayoutRequest::new(HEADLINE, body.as_str()).with_image(image);
            let result = engine
                .layout(&req)
                .unwrap_or_else(|e| panic!("image {:?}: {}", image, e));
            for (idx, line) in result.text_lines.iter().enumerate() {
                let rect = line.rect();
                assert!(
                    !rect.intersects(&blocked),
                    "line {} {} overlaps {} for image {:?}",
                    idx,
                    rect,
                    blocked,
                    image
                );
                assert!(content.contains_rect(&rect), "line {} escapes content", idx);
            }
            assert_word_integrity(&result, HEADLINE, body);
        }
    }
}

#[test]
fn unplaced_text_is_always_flagged() {
    let engine = LayoutEngine::default();
    for chars in [0usize, 50, 200, 800, 3000] {
        let body = prose(chars);
        let result = engine
            .layout(&LayoutRequest::new(HEADLINE, body.as_str()))
            .expect("layout succeeds");
        assert_word_integrity(&result, HEADLINE, &body);
        if result.truncated {
            let last = result.text_lines.last().expect("partial layout keeps lines");
            assert_eq!(last.text.matches(ELLIPSIS).count(), 1);
        }
    }
}

#[test]
fn larger_fonts_never_rescue_a_truncated_pair() {
    let cfg = LayoutConfig::default();
    let engine = LayoutEngine::new(cfg);
    let headline_sizes = [44.0f32, 56.0, 68.0, 80.0];
    let body_sizes = [24.0f32, 30.0, 36.0, 44.0];
    let geometries = [
        None,
        Some(CanvasBox::new(0.0, 1000.0, 1080.0, 440.0)),
    ];

    for image in geometries {
        for body in [prose(600), prose(1100)] {
            let mut req = LayoutRequest::new(HEADLINE, body.as_str());
            req.image = image;
            let truncated = |h: f32, b: f32| {
                engine
                    .layout_with_fonts(&req, UsedFonts::new(h, b))
                    .expect("layout succeeds")
                    .truncated
            };
            for &h in &headline_sizes {
                for &b in &body_sizes {
                    if !truncated(h, b) {
                        continue;
                    }
                    for &h2 in headline_sizes.iter().filter(|&&s| s >= h) {
                        for &b2 in body_sizes.iter().filter(|&&s| s >= b) {
                            assert!(
                                truncated(h2, b2),
                                "truncated at ({}, {}) but fits at ({}, {})",
                                h,
                                b,
                                h2,
                                b2
                            );
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn search_returns_first_fitting_pair() {
    let engine = LayoutEngine::default();
    let body = prose(900);
    let req = LayoutRequest::new(HEADLINE, body.as_str());
    let result = engine.layout(&req).expect("layout succeeds");
    assert!(!result.truncated);

    let fixed = engine
        .layout_with_fonts(&req, result.used_fonts)
        .expect("layout succeeds");
    assert_eq!(fixed, result);
}

#[test]
fn layout_is_deterministic() {
    let engine = LayoutEngine::default();
    let body = prose(1200);
    let req = LayoutRequest::new(HEADLINE, body.as_str())
        .with_image(CanvasBox::new(300.0, 500.0, 480.0, 360.0));
    let first = engine.layout(&req).expect("layout succeeds");
    let second = engine.layout(&req).expect("layout succeeds");
    assert_eq!(first, second);
}

#[test]
fn corrupted_line_trips_invariant_checker() {
    let image = CanvasBox::new(600.0, 60.0, 420.0, 1320.0);
    let cfg = LayoutConfig::default();
    let engine = LayoutEngine::new(cfg);
    let result = engine
        .layout(&LayoutRequest::new(HEADLINE, BODY).with_image(image))
        .expect("layout succeeds");
    let content = engine.content_rect(None);
    let blocked = blocked_rect(Some(&image), cfg.image_clearance);
    check_invariants(&result.text_lines, &content, &blocked).expect("clean layout");

    let mut lines = result.text_lines.clone();
    lines[1].position.x += 200;
    let err = check_invariants(&lines, &content, &blocked).expect_err("line pushed into image");
    match err {
        LayoutError::InvariantViolation {
            line_index,
            line,
            blocked: reported,
            content: reported_content,
        } => {
            assert_eq!(line_index, 1);
            assert_eq!(line, lines[1].rect());
            assert_eq!(reported, blocked);
            assert_eq!(reported_content, content);
        }
        other => panic!("unexpected error: {}", other),
    }
}
