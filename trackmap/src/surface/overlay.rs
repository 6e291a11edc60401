//! Vector content drawn over the base imagery.
//!
//! An [`Overlay`] arrives as JSON already validated and filtered by the
//! caller: tracks are polylines with a color and width, places are points
//! with a text label and a placement hint.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{GeoBounds, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Overlay loading errors.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Failed to read overlay: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed overlay JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid overlay: {0}")]
    Invalid(String),
}

/// Straight-alpha 8-bit color, written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RgbaColor {
    pub const BLACK: RgbaColor = RgbaColor::rgb(0, 0, 0);
    pub const WHITE: RgbaColor = RgbaColor::rgb(255, 255, 255);
    /// Default track color.
    pub const TRACK_RED: RgbaColor = RgbaColor::rgb(0xe5, 0x39, 0x35);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#rrggbb` or `#rrggbbaa` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 255 },
        })
    }
}

impl fmt::Display for RgbaColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for RgbaColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RgbaColor::from_hex(&value).ok_or_else(|| format!("invalid color '{value}'"))
    }
}

impl From<RgbaColor> for String {
    fn from(color: RgbaColor) -> Self {
        color.to_string()
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.lat) && (MIN_LON..=MAX_LON).contains(&self.lon)
    }
}

fn default_track_color() -> RgbaColor {
    RgbaColor::TRACK_RED
}

fn default_track_width() -> f32 {
    3.0
}

/// A polyline drawn on the lines layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLine {
    #[serde(default)]
    pub name: Option<String>,
    pub points: Vec<GeoPoint>,
    #[serde(default = "default_track_color")]
    pub color: RgbaColor,
    /// Stroke width in pixels.
    #[serde(default = "default_track_width")]
    pub width: f32,
}

impl TrackLine {
    /// Smallest rectangle holding every point.
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        let init = (first.lat, first.lat, first.lon, first.lon);
        Some(self.points.iter().fold(init, |(n, s, e, w), p| {
            (n.max(p.lat), s.min(p.lat), e.max(p.lon), w.min(p.lon))
        }))
    }

    /// True when the track's extent touches `bounds`.
    pub fn touches(&self, bounds: &GeoBounds) -> bool {
        match self.extent() {
            Some((n, s, e, w)) => {
                n >= bounds.south && s <= bounds.north && e >= bounds.west && w <= bounds.east
            }
            None => false,
        }
    }
}

/// Preferred side of a label relative to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPlacement {
    #[default]
    Auto,
    Right,
    Left,
    Top,
    Bottom,
}

/// A marked place drawn on the labels layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceLabel {
    pub position: GeoPoint,
    pub text: String,
    #[serde(default)]
    pub placement: LabelPlacement,
    #[serde(default = "default_track_color")]
    pub color: RgbaColor,
}

/// Everything drawn over the base imagery.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(default)]
    pub tracks: Vec<TrackLine>,
    #[serde(default)]
    pub places: Vec<PlaceLabel>,
}

impl Overlay {
    /// Parses and checks an overlay document.
    pub fn from_json(json: &str) -> Result<Self, OverlayError> {
        let overlay: Overlay = serde_json::from_str(json)?;
        overlay.validate()?;
        Ok(overlay)
    }

    /// Reads an overlay document from disk.
    pub fn load(path: &Path) -> Result<Self, OverlayError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.places.is_empty()
    }

    fn validate(&self) -> Result<(), OverlayError> {
        for (i, track) in self.tracks.iter().enumerate() {
            if let Some(p) = track.points.iter().find(|p| !p.is_valid()) {
                return Err(OverlayError::Invalid(format!(
                    "track {i} has out-of-range point ({}, {})",
                    p.lat, p.lon
                )));
            }
            if !(track.width.is_finite() && track.width > 0.0) {
                return Err(OverlayError::Invalid(format!(
                    "track {i} has non-positive width {}",
                    track.width
                )));
            }
        }
        for place in &self.places {
            if !place.position.is_valid() {
                return Err(OverlayError::Invalid(format!(
                    "place '{}' is out of range",
                    place.text
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(RgbaColor::from_hex("#ff8000"), Some(RgbaColor::rgb(255, 128, 0)));
        assert_eq!(
            RgbaColor::from_hex("00000080"),
            Some(RgbaColor { r: 0, g: 0, b: 0, a: 128 })
        );
        assert_eq!(RgbaColor::from_hex("#fff"), None);
        assert_eq!(RgbaColor::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_color_display_roundtrip() {
        let color = RgbaColor { r: 1, g: 2, b: 3, a: 4 };
        assert_eq!(RgbaColor::from_hex(&color.to_string()), Some(color));
        assert_eq!(RgbaColor::WHITE.to_string(), "#ffffff");
    }

    #[test]
    fn test_overlay_from_json_applies_defaults() {
        let json = r##"{
            "tracks": [{"points": [{"lat": 51.5, "lon": -0.1}, {"lat": 51.6, "lon": 0.0}]}],
            "places": [{"position": {"lat": 51.55, "lon": -0.05}, "text": "Camden", "placement": "top"}]
        }"##;

        let overlay = Overlay::from_json(json).unwrap();

        assert_eq!(overlay.tracks[0].color, RgbaColor::TRACK_RED);
        assert_eq!(overlay.tracks[0].width, 3.0);
        assert_eq!(overlay.places[0].placement, LabelPlacement::Top);
        assert!(!overlay.is_empty());
    }

    #[test]
    fn test_overlay_rejects_bad_points() {
        let json = r#"{"tracks": [{"points": [{"lat": 91.0, "lon": 0.0}]}]}"#;
        assert!(matches!(Overlay::from_json(json), Err(OverlayError::Invalid(_))));
    }

    #[test]
    fn test_overlay_rejects_bad_color() {
        let json = r#"{"tracks": [{"points": [], "color": "red"}]}"#;
        assert!(matches!(Overlay::from_json(json), Err(OverlayError::Json(_))));
    }

    #[test]
    fn test_track_touches_bounds() {
        let track = TrackLine {
            name: None,
            points: vec![GeoPoint::new(51.5, -0.1), GeoPoint::new(51.6, 0.0)],
            color: RgbaColor::BLACK,
            width: 2.0,
        };
        let inside = GeoBounds::new(51.58, 51.52, -0.02, -0.08).unwrap();
        let outside = GeoBounds::new(40.0, 39.0, 1.0, 0.5).unwrap();
        assert!(track.touches(&inside));
        assert!(!track.touches(&outside));
    }
}
