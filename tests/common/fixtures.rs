use carousel_flow::{CanvasBox, LayoutConfig};

pub const HEADLINE: &str = "Visceral Fat: The Hidden Driver";
pub const BODY: &str = "It silently accelerates inflammation and early ageing.";

const FILLER: &[&str] = &[
    "metabolic", "health", "depends", "on", "where", "fat", "is", "stored", "and", "how",
    "the", "liver", "responds", "to", "sleep", "stress", "and", "movement", "over", "years",
];

/// Content region used by the slide scenarios: 960x1320 at (60, 60).
pub fn scenario_region() -> CanvasBox {
    CanvasBox::new(60.0, 60.0, 960.0, 1320.0)
}

/// Defaults with the region used as-is.
pub fn scenario_config() -> LayoutConfig {
    LayoutConfig {
        region_padding: 0.0,
        ..LayoutConfig::default()
    }
}

/// Deterministic prose of at least `chars` characters, without hyphens.
pub fn prose(chars: usize) -> String {
    let mut out = String::with_capacity(chars + 16);
    let mut idx = 0usize;
    while out.chars().count() < chars {
        if !out.is_empty() {
            out.push(if idx % 17 == 16 { '\n' } else { ' ' });
        }
        out.push_str(FILLER[idx % FILLER.len()]);
        idx += 1;
    }
    out
}

/// Image boxes sweeping corners, edges, the middle and oversize cases.
pub fn image_grid() -> Vec<CanvasBox> {
    let mut out = Vec::new();
    for &(w, h) in &[(300.0, 300.0), (620.0, 420.0), (1080.0, 240.0), (260.0, 1350.0)] {
        for &x in &[0.0, 240.0, 540.0, 820.0] {
            for &y in &[0.0, 310.0, 700.0, 1100.0] {
                out.push(CanvasBox::new(x, y, w, h));
            }
        }
    }
    out.push(CanvasBox::new(-200.0, -200.0, 1600.0, 1800.0));
    out.push(CanvasBox::new(500.5, 333.3, 79.7, 41.1));
    out
}
