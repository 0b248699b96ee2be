//! Script builder: renders commands into fragments the embedded map executes.
//!
//! SYSTEM CONTEXT
//! ==============
//! The embedded runtime is reachable only through script injection. Every
//! fragment produced here is self-contained and shaped the same way:
//!
//! - an IIFE, so no bindings leak into the page's global scope;
//! - an early return when the map global or Leaflet itself is missing, so a
//!   fragment arriving before the page has booted is a no-op;
//! - the mutation wrapped in `try/catch`, since an uncaught throw inside the
//!   web view cannot be recovered from the host;
//! - a trailing `true;`, which is what the web view reports back as the
//!   fragment's completion value.
//!
//! Payload values are embedded as JSON literals, never spliced as raw text.

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use serde_json::{Value, json};

use crate::command::Command;
use crate::consts::{
    FOCUS_ZOOM, LOCATION_FILL_OPACITY, LOCATION_GLOBAL, MAP_GLOBAL, MARKER_GLOBAL, MARKER_ICON_ANCHOR,
    MARKER_ICON_SIZE, MARKER_Z_OFFSET, OVERLAY_FILL_OPACITY, POST_MESSAGE_FN,
};
use crate::model::{AvailabilityRecord, Color, LatLng, Room};

const MARKER_PIN_PATH: &str = "M512 85.3c-164.9 0-298.6 133.7-298.6 298.6 0 164.9 298.6 554.6 298.6 554.6s298.6-389.7 298.6-554.6c0-164.9-133.7-298.6-298.6-298.6z m0 448a149.3 149.3 0 1 1 0-298.6 149.3 149.3 0 0 1 0 298.6z";

/// A rendered fragment, ready for injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script(String);

impl Script {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render any command. This is the only place commands cross into script text.
#[must_use]
pub fn render(command: &Command) -> Script {
    match command {
        Command::AddOverlay { room, color } => room_overlay(room, color),
        Command::ClearOverlays => build_clear_overlays(),
        Command::SetView { center, animate } => build_set_view(Some(*center), *animate),
        Command::PlaceMarker { position, color } => build_place_or_update_marker(*position, color),
        Command::UpdateMarkerColor { color } => build_update_marker_color(color),
        Command::RemoveMarker => build_remove_marker(),
        Command::SetLocation { center, accuracy, color } => build_set_location_overlay(*center, *accuracy, color),
        Command::ClearLocation => build_clear_location_overlay(),
    }
}

/// Draw a room polygon colored by availability, pushed behind the marker.
///
/// Tapping the polygon posts a `roomClick` message carrying the room name and
/// label center back to the host.
#[must_use]
pub fn build_add_room_overlay(
    room: &Room,
    availability: &AvailabilityRecord,
    highlight: &Color,
    fallback: &Color,
) -> Script {
    let color = if availability.is_available(&room.name) { highlight } else { fallback };
    room_overlay(room, color)
}

fn room_overlay(room: &Room, color: &Color) -> Script {
    let feature = json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [room.closed_ring()],
        },
        "properties": {
            "room": room.name,
            "center": room.center,
        },
    });
    let color = js_string(color.as_str());
    guarded(
        "addOverlay",
        &format!(
            r#"    var feature = {feature};
    var layer = L.geoJSON(feature, {{
      color: {color},
      fillOpacity: {OVERLAY_FILL_OPACITY},
      campusOverlay: true,
    }}).addTo(map).bringToBack();
    layer.on("click", function (e) {{
      if (typeof window.{POST_MESSAGE_FN} !== "function") {{
        return;
      }}
      window.{POST_MESSAGE_FN}(JSON.stringify({{
        type: "roomClick",
        payload: {{ type: "room", properties: e.layer.feature.properties }},
      }}));
    }});"#
        ),
    )
}

/// Remove every room polygon. Tiles, marker, and location circle stay.
#[must_use]
pub fn build_clear_overlays() -> Script {
    guarded(
        "clearOverlays",
        r"    map.eachLayer(function (layer) {
      if (layer instanceof L.GeoJSON && layer.options.campusOverlay) {
        map.removeLayer(layer);
      }
    });",
    )
}

/// Recenter at the focus zoom. An absent center renders a guarded no-op.
#[must_use]
pub fn build_set_view(center: Option<LatLng>, animate: bool) -> Script {
    let Some(center) = center else {
        return guarded("setView", "    return;");
    };
    let center = js_lat_lng(center);
    guarded(
        "setView",
        &format!("    map.setView({center}, {FOCUS_ZOOM}, {{ animate: {animate} }});"),
    )
}

/// Replace any existing marker with a new one at `position`.
#[must_use]
pub fn build_place_or_update_marker(position: LatLng, color: &Color) -> Script {
    let position = js_lat_lng(position);
    let icon = marker_icon(color);
    guarded(
        "placeMarker",
        &format!(
            r"    if (window.{MARKER_GLOBAL}) {{
      window.{MARKER_GLOBAL}.remove();
    }}
    window.{MARKER_GLOBAL} = L.marker({position}, {{
      icon: {icon},
      zIndexOffset: {MARKER_Z_OFFSET},
    }}).addTo(map);"
        ),
    )
}

/// Swap the marker icon in place. No-op when there is no marker.
#[must_use]
pub fn build_update_marker_color(color: &Color) -> Script {
    let icon = marker_icon(color);
    guarded(
        "updateMarkerColor",
        &format!(
            r"    if (!window.{MARKER_GLOBAL}) {{
      return;
    }}
    window.{MARKER_GLOBAL}.setIcon({icon});"
        ),
    )
}

#[must_use]
pub fn build_remove_marker() -> Script {
    guarded(
        "removeMarker",
        &format!(
            r"    if (window.{MARKER_GLOBAL}) {{
      window.{MARKER_GLOBAL}.remove();
      window.{MARKER_GLOBAL} = null;
    }}"
        ),
    )
}

/// Replace the location circle.
///
/// The new circle is added before the old one is removed, inside one
/// synchronous fragment, so the runtime never renders a frame without it.
#[must_use]
pub fn build_set_location_overlay(center: LatLng, accuracy: f64, color: &Color) -> Script {
    let center = js_lat_lng(center);
    let radius = js_number(clamp_radius(accuracy));
    let color = js_string(color.as_str());
    guarded(
        "setLocation",
        &format!(
            r"    var previous = window.{LOCATION_GLOBAL};
    window.{LOCATION_GLOBAL} = L.circle({center}, {{
      color: {color},
      fillColor: {color},
      fillOpacity: {LOCATION_FILL_OPACITY},
      radius: {radius},
    }}).addTo(map);
    if (previous) {{
      previous.remove();
    }}"
        ),
    )
}

#[must_use]
pub fn build_clear_location_overlay() -> Script {
    guarded(
        "clearLocation",
        &format!(
            r"    if (window.{LOCATION_GLOBAL}) {{
      window.{LOCATION_GLOBAL}.remove();
      window.{LOCATION_GLOBAL} = null;
    }}"
        ),
    )
}

/// Data URL for the pin icon filled with `color`.
#[must_use]
pub fn marker_icon_url(color: &Color) -> String {
    let fill = escape_attr(color.as_str());
    let svg = format!(
        r#"<svg viewBox="0 0 824 944" version="1.1" xmlns="http://www.w3.org/2000/svg"><path d="{MARKER_PIN_PATH}" fill="{fill}" stroke="black" stroke-width="35" /></svg>"#
    );
    format!("data:image/svg+xml;base64,{}", BASE64_ENGINE.encode(svg))
}

fn marker_icon(color: &Color) -> String {
    let url = js_string(&marker_icon_url(color));
    let [size_w, size_h] = MARKER_ICON_SIZE;
    let [anchor_x, anchor_y] = MARKER_ICON_ANCHOR;
    format!("L.icon({{ iconUrl: {url}, iconSize: [{size_w}, {size_h}], iconAnchor: [{anchor_x}, {anchor_y}] }})")
}

fn guarded(label: &str, body: &str) -> Script {
    Script(format!(
        r#"(function () {{
  var map = window.{MAP_GLOBAL};
  if (!map || typeof L === "undefined") {{
    return;
  }}
  try {{
{body}
  }} catch (err) {{
    console.warn("campus map: {label} failed", err);
  }}
}})();
true;
"#
    ))
}

fn clamp_radius(accuracy: f64) -> f64 {
    if accuracy.is_finite() && accuracy > 0.0 { accuracy } else { 0.0 }
}

fn js_string(value: &str) -> String {
    Value::from(value).to_string()
}

fn js_number(value: f64) -> String {
    Value::from(value).to_string()
}

fn js_lat_lng(point: LatLng) -> String {
    json!([point.lat, point.lng]).to_string()
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
