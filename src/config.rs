//! Map configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{
    DEFAULT_CENTER, DEFAULT_FALLBACK_COLOR, DEFAULT_HIGHLIGHT_COLOR, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM,
    DEFAULT_TILE_URL, DEFAULT_ZOOM,
};
use crate::coordinator::PendingPolicy;
use crate::model::{Color, LatLng, Theme};

/// Error returned by [`MapConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub tile_url: String,
    pub initial_center: LatLng,
    pub initial_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub theme: Theme,
    pub pending_policy: PendingPolicy,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: DEFAULT_TILE_URL.to_owned(),
            initial_center: LatLng::from(DEFAULT_CENTER),
            initial_zoom: DEFAULT_ZOOM,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            theme: Theme::default(),
            pending_policy: PendingPolicy::default(),
        }
    }
}

impl MapConfig {
    /// Build typed map config from environment variables.
    ///
    /// All optional:
    /// - `MAP_TILE_URL`: tile template, OpenStreetMap by default
    /// - `MAP_CENTER`: `"lat,lng"` initial center
    /// - `MAP_ZOOM`, `MAP_MIN_ZOOM`, `MAP_MAX_ZOOM`: default 17.5 / 16 / 20
    /// - `MAP_HIGHLIGHT_COLOR`, `MAP_FALLBACK_COLOR`: overlay colors
    /// - `MAP_PENDING_POLICY`: `resync` (default) or `drop`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable values or zoom limits
    /// that do not contain the initial zoom.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(std::env::VarError::NotPresent) => None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "ignoring unreadable environment variable");
                None
            }
        })
    }

    /// Same as [`MapConfig::from_env`] with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`MapConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tile_url = lookup("MAP_TILE_URL")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TILE_URL.to_owned());
        let initial_center = match lookup("MAP_CENTER") {
            Some(raw) => parse_center(&raw)?,
            None => LatLng::from(DEFAULT_CENTER),
        };
        let initial_zoom = parse_f64(&lookup, "MAP_ZOOM", DEFAULT_ZOOM)?;
        let min_zoom = parse_f64(&lookup, "MAP_MIN_ZOOM", DEFAULT_MIN_ZOOM)?;
        let max_zoom = parse_f64(&lookup, "MAP_MAX_ZOOM", DEFAULT_MAX_ZOOM)?;
        if !(min_zoom <= initial_zoom && initial_zoom <= max_zoom) {
            return Err(ConfigError::Invalid {
                var: "MAP_ZOOM",
                reason: format!("{initial_zoom} outside [{min_zoom}, {max_zoom}]"),
            });
        }
        let theme = Theme {
            highlight: Color::from(lookup("MAP_HIGHLIGHT_COLOR").unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_owned())),
            fallback: Color::from(lookup("MAP_FALLBACK_COLOR").unwrap_or_else(|| DEFAULT_FALLBACK_COLOR.to_owned())),
        };
        let pending_policy = parse_policy(lookup("MAP_PENDING_POLICY").as_deref())?;

        Ok(Self { tile_url, initial_center, initial_zoom, min_zoom, max_zoom, theme, pending_policy })
    }
}

fn parse_f64(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: f64) -> Result<f64, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => Err(ConfigError::Invalid { var, reason: format!("{value} is not finite") }),
        Err(e) => Err(ConfigError::Invalid { var, reason: e.to_string() }),
    }
}

fn parse_center(raw: &str) -> Result<LatLng, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid { var: "MAP_CENTER", reason };
    let Some((lat, lng)) = raw.split_once(',') else {
        return Err(invalid(format!("expected \"lat,lng\", got {raw:?}")));
    };
    let lat = lat.trim().parse::<f64>().map_err(|e| invalid(e.to_string()))?;
    let lng = lng.trim().parse::<f64>().map_err(|e| invalid(e.to_string()))?;
    let center = LatLng::new(lat, lng);
    if !center.is_finite() {
        return Err(invalid(format!("{raw:?} is not finite")));
    }
    Ok(center)
}

fn parse_policy(raw: Option<&str>) -> Result<PendingPolicy, ConfigError> {
    match raw.map_or("resync", str::trim) {
        "resync" => Ok(PendingPolicy::Resync),
        "drop" => Ok(PendingPolicy::Drop),
        other => Err(ConfigError::Invalid {
            var: "MAP_PENDING_POLICY",
            reason: format!("unknown policy '{other}' (expected 'resync' or 'drop')"),
        }),
    }
}
