//! Outbound commands, one variant per map mutation.
//!
//! Serialized as `{"type": ..., "payload": ...}` so commands can be logged,
//! replayed, and fed to the CLI in the same envelope the inbound direction uses.

#[cfg(test)]
#[path = "command_test.rs"]
mod command_test;

use serde::{Deserialize, Serialize};

use crate::model::{AvailabilityRecord, Color, LatLng, Room, Theme};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Command {
    /// Draw a room polygon behind any marker.
    AddOverlay { room: Room, color: Color },
    /// Remove every room polygon.
    ClearOverlays,
    /// Recenter the camera at the focus zoom.
    SetView {
        center: LatLng,
        #[serde(default = "default_animate")]
        animate: bool,
    },
    /// Replace the marker with a new one.
    PlaceMarker { position: LatLng, color: Color },
    /// Recolor the existing marker in place.
    UpdateMarkerColor { color: Color },
    RemoveMarker,
    /// Replace the location-accuracy circle.
    SetLocation { center: LatLng, accuracy: f64, color: Color },
    ClearLocation,
}

fn default_animate() -> bool {
    true
}

impl Command {
    /// Build an overlay command colored by availability.
    #[must_use]
    pub fn add_overlay(room: &Room, availability: &AvailabilityRecord, theme: &Theme) -> Self {
        Self::AddOverlay {
            room: room.clone(),
            color: theme.overlay_color(room, availability).clone(),
        }
    }

    /// Wire tag, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddOverlay { .. } => "addOverlay",
            Self::ClearOverlays => "clearOverlays",
            Self::SetView { .. } => "setView",
            Self::PlaceMarker { .. } => "placeMarker",
            Self::UpdateMarkerColor { .. } => "updateMarkerColor",
            Self::RemoveMarker => "removeMarker",
            Self::SetLocation { .. } => "setLocation",
            Self::ClearLocation => "clearLocation",
        }
    }
}
