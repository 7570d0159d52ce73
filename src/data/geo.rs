//! Geolocation parsing for free-text point strings like `POINT (-95.7 37.1)`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Optional sign, then digits with a fractional part or digits alone.
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?(?:\d+\.\d+|\d+)").expect("coordinate token pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Parse a point whose first number is the longitude and second the latitude.
///
/// Anything with fewer than two numeric tokens yields `None`; extra tokens
/// are ignored.
pub fn parse_point(text: &str) -> Option<Coordinates> {
    if text.trim().is_empty() {
        return None;
    }
    let mut tokens = NUMBER
        .find_iter(text)
        .map(|m| m.as_str().parse::<f64>().ok().filter(|v| v.is_finite()));
    let longitude = tokens.next()??;
    let latitude = tokens.next()??;
    Some(Coordinates {
        latitude,
        longitude,
    })
}

/// `(latitude, longitude)` for `text`, or `(None, None)` when it holds no point.
pub fn extract_coordinates(text: &str) -> (Option<f64>, Option<f64>) {
    match parse_point(text) {
        Some(point) => (Some(point.latitude), Some(point.longitude)),
        None => (None, None),
    }
}
