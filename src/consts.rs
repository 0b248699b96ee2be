//! Shared constants for the map bridge.

// ── Runtime globals ─────────────────────────────────────────────

/// Global holding the map instance. Its presence is the initialization sentinel.
pub const MAP_GLOBAL: &str = "campusMap";

/// Global holding the single user-placed marker.
pub const MARKER_GLOBAL: &str = "campusMarker";

/// Global holding the location-accuracy circle.
pub const LOCATION_GLOBAL: &str = "campusLocation";

/// Function the host page installs to post a message back to the host.
pub const POST_MESSAGE_FN: &str = "sendMessageToHost";

// ── Camera ──────────────────────────────────────────────────────

/// Zoom used for every "focus on room/marker/location" request.
pub const FOCUS_ZOOM: f64 = 17.5;

/// Initial map center (main campus).
pub const DEFAULT_CENTER: [f64; 2] = [48.76709, 11.4328];

/// Initial zoom when the page boots.
pub const DEFAULT_ZOOM: f64 = 17.5;

pub const DEFAULT_MIN_ZOOM: f64 = 16.0;
pub const DEFAULT_MAX_ZOOM: f64 = 20.0;

/// Tiles may overzoom one level past the interactive limit.
pub const TILE_MAX_ZOOM: f64 = 21.0;

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

// ── Styling ─────────────────────────────────────────────────────

/// Neutral overlay color for rooms without an availability entry.
pub const DEFAULT_FALLBACK_COLOR: &str = "grey";

/// Accent color used when no theme is configured.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#3b82f6";

pub const OVERLAY_FILL_OPACITY: f64 = 0.2;
pub const LOCATION_FILL_OPACITY: f64 = 0.6;

/// Marker icon size in pixels.
pub const MARKER_ICON_SIZE: [u32; 2] = [45, 45];

/// Pixel offset of the pin tip inside the icon.
pub const MARKER_ICON_ANCHOR: [u32; 2] = [24, 42];

/// Keeps the marker above every overlay.
pub const MARKER_Z_OFFSET: i32 = 1000;
