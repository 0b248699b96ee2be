//! Host page: the HTML document the embedded surface loads.
//!
//! The page boots Leaflet, installs the message hook the bridge's fragments
//! post through, and reports lifecycle and connectivity back to the host. The
//! map global is assigned only after the map is constructed, so fragments that
//! arrive earlier hit their guard and do nothing.

#[cfg(test)]
#[path = "page_test.rs"]
mod page_test;

use serde_json::Value;

use crate::config::MapConfig;
use crate::consts::{MAP_GLOBAL, POST_MESSAGE_FN, TILE_MAX_ZOOM};

const LEAFLET_CSS: &str = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" integrity="sha512-Zcn6bjR/8RZbLEpLIeOwNtzREBAJnUKESxces60Mpoj+2okopSAcSUIUOseddDm0cxnGQzxIR7vJgsLZbdLE3w==" crossorigin="anonymous">"#;
const LEAFLET_JS: &str = r#"<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" integrity="sha512-BwHfrr4c9kmRkLw6iXFdzcdWV/PGkVgiIyIWLLlTSXzWQzxuSg4DiQUCpauz/EWjgk5TYQqX/kvn9pG1NpYfqg==" crossorigin="anonymous"></script>"#;

/// Render the host page for `config`.
#[must_use]
pub fn host_page(config: &MapConfig) -> String {
    let tile_url = Value::from(config.tile_url.as_str()).to_string();
    let center = serde_json::json!([config.initial_center.lat, config.initial_center.lng]).to_string();
    let zoom = config.initial_zoom;
    let min_zoom = config.min_zoom;
    let max_zoom = config.max_zoom;

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Campus Map</title>
  <meta charset="utf-8" />
  <meta name="viewport" content="initial-scale=1.0">
  {LEAFLET_CSS}
  {LEAFLET_JS}
  <style>
    body {{ margin: 0; padding: 0; -webkit-user-select: none; user-select: none; }}
    #mapid {{ width: 100%; height: 100vh; }}
  </style>
</head>
<body>
  <div id="mapid"></div>
  <script>
    function {POST_MESSAGE_FN}(message) {{
      if (window.ipc && typeof window.ipc.postMessage === "function") {{
        window.ipc.postMessage(message);
      }} else if (window.ReactNativeWebView) {{
        window.ReactNativeWebView.postMessage(message);
      }}
    }}
    window.{POST_MESSAGE_FN} = {POST_MESSAGE_FN};

    function postEvent(type, payload) {{
      {POST_MESSAGE_FN}(JSON.stringify(payload === undefined ? {{ type: type }} : {{ type: type, payload: payload }}));
    }}

    function handleLoadError() {{
      postEvent("mapLoadError");
      window.removeEventListener("error", handleLoadError, true);
    }}

    window.addEventListener("error", handleLoadError, true);
    window.addEventListener("online", function () {{ postEvent("online"); }});
    window.addEventListener("offline", function () {{ postEvent("offline"); }});
    if (!navigator.onLine) {{
      postEvent("offline");
    }}

    var map = L.map("mapid", {{ zoomControl: false, minZoom: {min_zoom}, maxZoom: {max_zoom} }})
      .setView({center}, {zoom});

    L.tileLayer({tile_url}, {{
      maxZoom: {TILE_MAX_ZOOM},
      attribution: "Map data &copy; OpenStreetMap contributors",
    }}).addTo(map);

    map.on("popupopen", function (e) {{
      postEvent("popup", {{ content: String(e.popup.getContent()) }});
    }});

    window.{MAP_GLOBAL} = map;
    map.whenReady(function () {{
      postEvent("mapReady");
    }});
  </script>
</body>
</html>
"#
    )
}
