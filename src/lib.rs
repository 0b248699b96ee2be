//! Bridge between a host application and an embedded interactive campus map.
//!
//! The map itself runs inside a sandboxed web surface (Leaflet in a web view).
//! The host never shares memory with it: it drives the map by injecting script
//! fragments and observes it through a single string message hook. This crate
//! owns both directions of that boundary and the state machine that keeps the
//! map consistent with host state.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Rooms, availability, colors, marker and location state |
//! | [`command`] | Typed outbound command union |
//! | [`script`] | Pure renderer from [`command::Command`] to injectable fragments |
//! | [`channel`] | Fire-and-forget outbound command channel and script log |
//! | [`event`] | Inbound message decoding and subscriber dispatch |
//! | [`coordinator`] | Readiness-gated state coordinator |
//! | [`page`] | Host HTML document that boots the embedded runtime |
//! | [`config`] | Map configuration and environment parsing |
//! | [`consts`] | Runtime globals, zoom levels, and styling constants |

pub mod channel;
pub mod command;
pub mod config;
pub mod consts;
pub mod coordinator;
pub mod event;
pub mod model;
pub mod page;
pub mod script;
