//! Entities the bridge renders onto the map.
//!
//! Rooms and availability snapshots are supplied by external loaders and are
//! treated as read-only here. Marker and location state are owned by the
//! coordinator, which is the only writer for both.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_FALLBACK_COLOR, DEFAULT_HIGHLIGHT_COLOR};

/// A geographic coordinate. Serialized as `[lat, lng]`, the order the map
/// runtime uses for camera and marker positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// GeoJSON position order.
    #[must_use]
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lng]
    }
}

/// A room polygon from the campus dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier, e.g. `"G201"`. Also the availability lookup key.
    pub name: String,
    /// Outline of the room, in order, as `[lat, lng]` pairs (not GeoJSON
    /// `[lng, lat]` order). Flipped to GeoJSON order when rendered.
    pub ring: Vec<LatLng>,
    /// Label anchor, used when focusing the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LatLng>,
}

impl Room {
    #[must_use]
    pub fn new(name: impl Into<String>, ring: Vec<LatLng>, center: Option<LatLng>) -> Self {
        Self { name: name.into(), ring, center }
    }

    /// The outline in GeoJSON `[lng, lat]` order, closed by repeating the first
    /// position when the dataset left it open.
    #[must_use]
    pub fn closed_ring(&self) -> Vec<[f64; 2]> {
        let mut ring: Vec<[f64; 2]> = self.ring.iter().map(|p| p.to_lng_lat()).collect();
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if ring.len() > 1 && first != last {
                ring.push(first);
            }
        }
        ring
    }
}

/// Point-in-time snapshot of room availability: room name to status.
///
/// A room missing from the record is unknown/unavailable, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityRecord(HashMap<String, String>);

impl AvailabilityRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, room: impl Into<String>, status: impl Into<String>) {
        self.0.insert(room.into(), status.into());
    }

    #[must_use]
    pub fn is_available(&self, room: &str) -> bool {
        self.0.contains_key(room)
    }

    #[must_use]
    pub fn status(&self, room: &str) -> Option<&str> {
        self.0.get(room).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AvailabilityRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A CSS color string, passed through to the map runtime untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Colors supplied by the theming collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Accent: available rooms and the location circle.
    pub highlight: Color,
    /// Neutral: rooms without an availability entry.
    pub fallback: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            highlight: Color::from(DEFAULT_HIGHLIGHT_COLOR),
            fallback: Color::from(DEFAULT_FALLBACK_COLOR),
        }
    }
}

impl Theme {
    /// Overlay color for a room given the current availability snapshot.
    #[must_use]
    pub fn overlay_color(&self, room: &Room, availability: &AvailabilityRecord) -> &Color {
        if availability.is_available(&room.name) {
            &self.highlight
        } else {
            &self.fallback
        }
    }
}

/// The single user-placed marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerState {
    pub position: LatLng,
    pub color: Color,
}

/// Circle showing current-position uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOverlay {
    pub center: LatLng,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    pub color: Color,
}
