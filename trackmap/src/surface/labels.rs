//! Collision-avoiding label placement.
//!
//! Labels sit beside their marker on one of four sides. Each label tries its
//! preferred side, then the opposite side, then the two perpendicular sides,
//! and takes the first that overlaps neither a marker nor an earlier label.
//! A label squeezed between neighbours on the left and right therefore ends
//! up above or below its marker, and vice versa.

use super::overlay::LabelPlacement;

/// Gap between a marker's edge and its label.
pub const LABEL_GAP: f32 = 4.0;

/// Axis-aligned box in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LabelRect {
    pub fn overlaps(&self, other: &LabelRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Concrete side a label was placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelSide {
    Right,
    Left,
    Top,
    Bottom,
}

impl LabelSide {
    fn opposite(self) -> LabelSide {
        match self {
            LabelSide::Right => LabelSide::Left,
            LabelSide::Left => LabelSide::Right,
            LabelSide::Top => LabelSide::Bottom,
            LabelSide::Bottom => LabelSide::Top,
        }
    }

    /// Sides to try, preferred first.
    fn candidates(hint: LabelPlacement) -> [LabelSide; 4] {
        let first = match hint {
            LabelPlacement::Auto | LabelPlacement::Right => LabelSide::Right,
            LabelPlacement::Left => LabelSide::Left,
            LabelPlacement::Top => LabelSide::Top,
            LabelPlacement::Bottom => LabelSide::Bottom,
        };
        let (third, fourth) = match first {
            LabelSide::Right | LabelSide::Left => (LabelSide::Top, LabelSide::Bottom),
            LabelSide::Top | LabelSide::Bottom => (LabelSide::Right, LabelSide::Left),
        };
        [first, first.opposite(), third, fourth]
    }
}

/// What one label needs placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRequest {
    /// Marker center in surface pixels.
    pub anchor: (f32, f32),
    /// Label box size in pixels.
    pub size: (f32, f32),
    pub hint: LabelPlacement,
}

/// Where a label ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedLabel {
    pub side: LabelSide,
    pub rect: LabelRect,
    /// False when every side collided and the preferred side was used anyway.
    pub clear: bool,
}

/// Places every label in input order.
///
/// Markers of all requests count as obstacles from the start; each placed
/// label becomes an obstacle for the ones after it.
pub fn place_labels(requests: &[LabelRequest], marker_radius: f32) -> Vec<PlacedLabel> {
    let mut obstacles: Vec<LabelRect> = requests
        .iter()
        .map(|r| LabelRect {
            x: r.anchor.0 - marker_radius,
            y: r.anchor.1 - marker_radius,
            width: marker_radius * 2.0,
            height: marker_radius * 2.0,
        })
        .collect();

    let mut placed = Vec::with_capacity(requests.len());
    for request in requests {
        let candidates = LabelSide::candidates(request.hint);
        let chosen = candidates
            .iter()
            .map(|&side| (side, label_rect(request, side, marker_radius)))
            .find(|(_, rect)| !obstacles.iter().any(|o| o.overlaps(rect)));

        let label = match chosen {
            Some((side, rect)) => PlacedLabel {
                side,
                rect,
                clear: true,
            },
            None => PlacedLabel {
                side: candidates[0],
                rect: label_rect(request, candidates[0], marker_radius),
                clear: false,
            },
        };
        obstacles.push(label.rect);
        placed.push(label);
    }
    placed
}

fn label_rect(request: &LabelRequest, side: LabelSide, marker_radius: f32) -> LabelRect {
    let (ax, ay) = request.anchor;
    let (width, height) = request.size;
    let offset = marker_radius + LABEL_GAP;
    let (x, y) = match side {
        LabelSide::Right => (ax + offset, ay - height / 2.0),
        LabelSide::Left => (ax - offset - width, ay - height / 2.0),
        LabelSide::Top => (ax - width / 2.0, ay - offset - height),
        LabelSide::Bottom => (ax - width / 2.0, ay + offset),
    };
    LabelRect {
        x,
        y,
        width,
        height,
    }
}
