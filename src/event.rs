//! Event channel: the inbound half of the bridge.
//!
//! The embedded runtime posts one string per event. Current runtimes send a
//! JSON envelope `{"type": ..., "payload": {...}}`; older ones post bare
//! strings (popup HTML, or a status word such as `mapLoadError`).
//!
//! ERROR HANDLING
//! ==============
//! The runtime is untrusted with respect to schema. Anything that is not a JSON
//! envelope is a legacy message, never an error. An envelope that fails schema
//! checks is logged and dropped here, so nothing malformed reaches handlers.
//! Messages are handled in isolation; they are not correlated with outbound
//! commands.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::model::LatLng;

/// Legacy status words posted by older runtimes.
const LEGACY_LOAD_ERROR: &str = "mapLoadError";
const LEGACY_OFFLINE: &str = "noInternetConnection";

/// Error returned by [`decode`] for envelopes that fail schema checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The envelope's `type` is not one the bridge understands.
    #[error("unknown event type: {0}")]
    UnknownType(String),
    /// A required payload field is missing or has the wrong shape.
    #[error("{kind} payload missing `{field}`")]
    MissingField { kind: &'static str, field: &'static str },
}

/// A tapped room polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomClick {
    pub room: String,
    pub center: Option<LatLng>,
}

/// Payload-less connectivity notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// The map page or its tiles failed to load.
    LoadError,
    Offline,
    Online,
}

/// A decoded message from the embedded runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    RoomClick(RoomClick),
    /// Raw popup content, also the fallback for any unstructured message.
    Popup(String),
    Connectivity(Connectivity),
    /// The map finished loading and accepts commands.
    MapReady,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Decode one raw message.
///
/// # Errors
///
/// Returns [`EventError`] when the message is a JSON envelope whose type is
/// unknown or whose payload lacks a required field. Non-envelope input always
/// decodes.
pub fn decode(raw: &str) -> Result<InboundEvent, EventError> {
    let Ok(envelope) = serde_json::from_str::<Envelope>(raw) else {
        return Ok(decode_legacy(raw));
    };

    match envelope.kind.as_str() {
        "roomClick" => decode_room_click(&envelope.payload).map(InboundEvent::RoomClick),
        "popup" => envelope
            .payload
            .get("content")
            .and_then(Value::as_str)
            .map(|content| InboundEvent::Popup(content.to_owned()))
            .ok_or(EventError::MissingField { kind: "popup", field: "content" }),
        "mapReady" => Ok(InboundEvent::MapReady),
        "mapLoadError" => Ok(InboundEvent::Connectivity(Connectivity::LoadError)),
        "offline" => Ok(InboundEvent::Connectivity(Connectivity::Offline)),
        "online" => Ok(InboundEvent::Connectivity(Connectivity::Online)),
        other => Err(EventError::UnknownType(other.to_owned())),
    }
}

fn decode_legacy(raw: &str) -> InboundEvent {
    match raw.trim() {
        LEGACY_LOAD_ERROR => InboundEvent::Connectivity(Connectivity::LoadError),
        LEGACY_OFFLINE => InboundEvent::Connectivity(Connectivity::Offline),
        _ => InboundEvent::Popup(raw.to_owned()),
    }
}

fn decode_room_click(payload: &Value) -> Result<RoomClick, EventError> {
    let properties = payload
        .get("properties")
        .ok_or(EventError::MissingField { kind: "roomClick", field: "properties" })?;
    let room = properties
        .get("room")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(EventError::MissingField { kind: "roomClick", field: "room" })?
        .to_owned();

    let center = match properties.get("center") {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value::<LatLng>(value.clone()) {
            Ok(center) => Some(center),
            Err(e) => {
                tracing::debug!(%room, error = %e, "ignoring malformed room center");
                None
            }
        },
    };

    Ok(RoomClick { room, center })
}

/// Host-side subscriber. Every method defaults to doing nothing.
pub trait EventHandler {
    fn on_room_click(&mut self, _click: &RoomClick) {}
    fn on_popup(&mut self, _content: &str) {}
    fn on_connectivity(&mut self, _signal: Connectivity) {}
    fn on_ready(&mut self) {}
}

/// Decodes inbound messages and routes them to subscribers.
#[derive(Default)]
pub struct EventChannel {
    handlers: Vec<Box<dyn EventHandler>>,
    received: u64,
    dropped: u64,
}

impl EventChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl EventHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Decode and dispatch one message. Returns the event so the caller can
    /// also feed it to the coordinator; `None` when it was dropped.
    pub fn receive(&mut self, raw: &str) -> Option<InboundEvent> {
        self.received += 1;
        let event = match decode(raw) {
            Ok(event) => event,
            Err(e) => {
                self.dropped += 1;
                tracing::warn!(error = %e, len = raw.len(), "dropping malformed map message");
                return None;
            }
        };
        self.dispatch(&event);
        Some(event)
    }

    /// Await the next message that decodes, dispatching it on the way.
    /// Returns `None` once every [`MessageSender`] is gone.
    pub async fn next(&mut self, rx: &mut mpsc::UnboundedReceiver<String>) -> Option<InboundEvent> {
        while let Some(raw) = rx.recv().await {
            if let Some(event) = self.receive(&raw) {
                return Some(event);
            }
        }
        None
    }

    fn dispatch(&mut self, event: &InboundEvent) {
        for handler in &mut self.handlers {
            match event {
                InboundEvent::RoomClick(click) => handler.on_room_click(click),
                InboundEvent::Popup(content) => handler.on_popup(content),
                InboundEvent::Connectivity(signal) => handler.on_connectivity(*signal),
                InboundEvent::MapReady => handler.on_ready(),
            }
        }
    }

    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// The host's message-receive hook, handed to the web view's message callback.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<String>,
}

impl MessageSender {
    /// Forward one raw message. `false` when the inbox has been closed.
    pub fn post(&self, raw: impl Into<String>) -> bool {
        self.tx.send(raw.into()).is_ok()
    }
}

#[must_use]
pub fn message_inbox() -> (MessageSender, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MessageSender { tx }, rx)
}
