//! Map state coordinator: the single writer of everything the map shows.
//!
//! DESIGN
//! ======
//! Host transitions (rooms loaded, availability refreshed, marker placed,
//! location updated, focus requested) only stage desired state. [`MapCoordinator::sync`]
//! is the one path that turns desired state into commands: it diffs against
//! what it believes the surface currently renders and emits the minimal
//! ordered sequence, always overlays, then location, then marker, then view.
//! Two triggers touching overlays and the marker in the same tick therefore
//! never interleave.
//!
//! Readiness is an explicit state machine driven by inbound events:
//!
//! ```text
//! Uninitialized --mapReady--> Ready --mapLoadError--> Faulted
//!       ^                                               |
//!       +------------------- reload() -----------------+
//! ```
//!
//! What happens to commands while not `Ready` is the [`PendingPolicy`].

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_test;

use serde::{Deserialize, Serialize};

use crate::channel::CommandSink;
use crate::command::Command;
use crate::config::MapConfig;
use crate::event::{Connectivity, InboundEvent};
use crate::model::{AvailabilityRecord, Color, LatLng, LocationOverlay, MarkerState, Room, Theme};

/// Lifecycle of the embedded surface as observed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Page not loaded yet, or being reloaded.
    #[default]
    Uninitialized,
    /// `mapReady` observed; commands are delivered.
    Ready,
    /// The runtime reported a load error. Host should offer a reload.
    Faulted,
}

/// What to do with state changes while the surface is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Keep changes staged and replay the full state once ready.
    #[default]
    Resync,
    /// Emit anyway; the channel drops them, as a bare fire-and-forget bridge would.
    /// Dropped commands still count as applied, so the coordinator's view of
    /// the surface can run ahead of it until the next [`MapCoordinator::resync`].
    Drop,
}

/// What a focus request should center on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum FocusTarget {
    Room(String),
    Marker,
    Location,
    Point(LatLng),
}

/// Serializable host transition, for replay and for hosts that prefer a
/// single entry point over the individual setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum HostUpdate {
    Rooms(Vec<Room>),
    Availability(AvailabilityRecord),
    Theme(Theme),
    PlaceMarker { position: LatLng, color: Color },
    RecolorMarker { color: Color },
    RemoveMarker,
    Location { center: LatLng, accuracy: f64 },
    ClearLocation,
    Focus {
        target: FocusTarget,
        #[serde(default = "default_animate")]
        animate: bool,
    },
}

fn default_animate() -> bool {
    true
}

pub struct MapCoordinator<S: CommandSink> {
    sink: S,
    policy: PendingPolicy,
    readiness: Readiness,
    online: bool,
    dropped: u64,

    // Desired state.
    theme: Theme,
    rooms: Vec<Room>,
    availability: AvailabilityRecord,
    marker: Option<MarkerState>,
    location: Option<(LatLng, f64)>,
    pending_focus: Option<(LatLng, bool)>,

    // What the surface is believed to show.
    overlays_dirty: bool,
    rendered_marker: Option<MarkerState>,
    rendered_location: Option<LocationOverlay>,
}

impl<S: CommandSink> MapCoordinator<S> {
    #[must_use]
    pub fn new(sink: S, theme: Theme, policy: PendingPolicy) -> Self {
        Self {
            sink,
            policy,
            readiness: Readiness::Uninitialized,
            online: true,
            dropped: 0,
            theme,
            rooms: Vec::new(),
            availability: AvailabilityRecord::new(),
            marker: None,
            location: None,
            pending_focus: None,
            overlays_dirty: false,
            rendered_marker: None,
            rendered_location: None,
        }
    }

    #[must_use]
    pub fn from_config(sink: S, config: &MapConfig) -> Self {
        Self::new(sink, config.theme.clone(), config.pending_policy)
    }

    // --- Lifecycle ---

    /// Feed an inbound event. Only lifecycle and connectivity events change
    /// coordinator state; room taps and popups are for host handlers.
    pub fn observe(&mut self, event: &InboundEvent) {
        match event {
            InboundEvent::MapReady => self.mark_ready(),
            InboundEvent::Connectivity(Connectivity::LoadError) => self.fault(),
            InboundEvent::Connectivity(Connectivity::Offline) => self.online = false,
            InboundEvent::Connectivity(Connectivity::Online) => self.online = true,
            InboundEvent::RoomClick(_) | InboundEvent::Popup(_) => {}
        }
    }

    /// The surface finished loading. Under [`PendingPolicy::Resync`] the full
    /// state is replayed onto it.
    pub fn mark_ready(&mut self) {
        let previous = self.readiness;
        self.readiness = Readiness::Ready;
        tracing::debug!(?previous, "map ready");
        if self.policy == PendingPolicy::Resync {
            self.emit_full(true);
        }
    }

    pub fn fault(&mut self) {
        tracing::warn!(previous = ?self.readiness, "map reported load error");
        self.readiness = Readiness::Faulted;
    }

    /// The host is reloading the surface; wait for the next `mapReady`.
    pub fn reload(&mut self) {
        self.readiness = Readiness::Uninitialized;
        self.rendered_marker = None;
        self.rendered_location = None;
        self.overlays_dirty = !self.rooms.is_empty();
    }

    // --- Host transitions ---

    pub fn apply(&mut self, update: HostUpdate) {
        match update {
            HostUpdate::Rooms(rooms) => self.set_rooms(rooms),
            HostUpdate::Availability(record) => self.set_availability(record),
            HostUpdate::Theme(theme) => self.set_theme(theme),
            HostUpdate::PlaceMarker { position, color } => {
                self.place_marker(position, color);
            }
            HostUpdate::RecolorMarker { color } => self.set_marker_color(color),
            HostUpdate::RemoveMarker => self.remove_marker(),
            HostUpdate::Location { center, accuracy } => {
                self.set_location(center, accuracy);
            }
            HostUpdate::ClearLocation => self.clear_location(),
            HostUpdate::Focus { target, animate } => {
                self.focus_target(&target, animate);
            }
        }
    }

    /// Replace the displayed rooms. Iteration order is preserved on the map.
    pub fn set_rooms(&mut self, rooms: Vec<Room>) {
        if rooms != self.rooms {
            self.rooms = rooms;
            self.overlays_dirty = true;
        }
    }

    pub fn set_availability(&mut self, availability: AvailabilityRecord) {
        if availability != self.availability {
            self.availability = availability;
            self.overlays_dirty = true;
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if theme != self.theme {
            self.theme = theme;
            self.overlays_dirty = true;
        }
    }

    /// Stage a marker. Returns `false` and keeps the previous marker when the
    /// position is not finite.
    pub fn place_marker(&mut self, position: LatLng, color: Color) -> bool {
        if !position.is_finite() {
            tracing::warn!(?position, "rejecting non-finite marker position");
            return false;
        }
        self.marker = Some(MarkerState { position, color });
        true
    }

    /// Recolor the current marker. Ignored when there is none.
    pub fn set_marker_color(&mut self, color: Color) {
        match &mut self.marker {
            Some(marker) => marker.color = color,
            None => tracing::debug!("no marker to recolor"),
        }
    }

    pub fn remove_marker(&mut self) {
        self.marker = None;
    }

    /// Stage a location update. Returns `false` and keeps the previous
    /// location when the position or accuracy is not finite.
    pub fn set_location(&mut self, center: LatLng, accuracy: f64) -> bool {
        if !center.is_finite() || !accuracy.is_finite() {
            tracing::warn!(?center, accuracy, "rejecting non-finite location update");
            return false;
        }
        self.location = Some((center, accuracy));
        true
    }

    pub fn clear_location(&mut self) {
        self.location = None;
    }

    /// Request a recenter. An absent or non-finite center is a no-op.
    pub fn focus(&mut self, center: Option<LatLng>, animate: bool) -> bool {
        let Some(center) = center else {
            tracing::debug!("focus requested without a center");
            return false;
        };
        if !center.is_finite() {
            tracing::warn!(?center, "rejecting non-finite focus center");
            return false;
        }
        self.pending_focus = Some((center, animate));
        true
    }

    pub fn focus_room(&mut self, name: &str, animate: bool) -> bool {
        let center = self.rooms.iter().find(|room| room.name == name).and_then(|room| room.center);
        self.focus(center, animate)
    }

    pub fn focus_marker(&mut self, animate: bool) -> bool {
        let center = self.marker.as_ref().map(|marker| marker.position);
        self.focus(center, animate)
    }

    pub fn focus_location(&mut self, animate: bool) -> bool {
        let center = self.location.map(|(center, _)| center);
        self.focus(center, animate)
    }

    pub fn focus_target(&mut self, target: &FocusTarget, animate: bool) -> bool {
        match target {
            FocusTarget::Room(name) => self.focus_room(name, animate),
            FocusTarget::Marker => self.focus_marker(animate),
            FocusTarget::Location => self.focus_location(animate),
            FocusTarget::Point(center) => self.focus(Some(*center), animate),
        }
    }

    // --- Command emission ---

    /// Emit the commands needed to bring the surface to the desired state.
    /// Returns how many commands reached the sink.
    pub fn sync(&mut self) -> usize {
        if self.readiness != Readiness::Ready && self.policy == PendingPolicy::Resync {
            return 0;
        }

        let mut issued = 0;

        if self.overlays_dirty {
            self.overlays_dirty = false;
            issued += self.emit_overlays();
        }

        let desired_location = self.desired_location();
        if desired_location != self.rendered_location {
            let command = match &desired_location {
                Some(location) => set_location_command(location),
                None => Command::ClearLocation,
            };
            issued += usize::from(self.emit(command));
            self.rendered_location = desired_location;
        }

        let command = match (&self.rendered_marker, &self.marker) {
            (Some(_), None) => Some(Command::RemoveMarker),
            (None, Some(marker)) => Some(place_marker_command(marker)),
            (Some(rendered), Some(marker)) if rendered.position != marker.position => {
                Some(place_marker_command(marker))
            }
            (Some(rendered), Some(marker)) if rendered.color != marker.color => {
                Some(Command::UpdateMarkerColor { color: marker.color.clone() })
            }
            _ => None,
        };
        if let Some(command) = command {
            issued += usize::from(self.emit(command));
            self.rendered_marker.clone_from(&self.marker);
        }

        if let Some((center, animate)) = self.pending_focus.take() {
            issued += usize::from(self.emit(Command::SetView { center, animate }));
        }

        issued
    }

    /// Re-issue the entire state, including removals, regardless of what the
    /// surface is believed to show. Recovers a stale map.
    pub fn resync(&mut self) -> usize {
        if self.readiness != Readiness::Ready {
            tracing::debug!(readiness = ?self.readiness, "resync deferred until ready");
            return 0;
        }
        self.emit_full(false)
    }

    /// `fresh` means the surface is known to be blank, so removals are skipped.
    fn emit_full(&mut self, fresh: bool) -> usize {
        let mut issued = 0;

        self.overlays_dirty = false;
        if !fresh || !self.rooms.is_empty() {
            issued += self.emit_overlays();
        }

        let desired_location = self.desired_location();
        match &desired_location {
            Some(location) => issued += usize::from(self.emit(set_location_command(location))),
            None if !fresh => issued += usize::from(self.emit(Command::ClearLocation)),
            None => {}
        }
        self.rendered_location = desired_location;

        match self.marker.clone() {
            Some(marker) => issued += usize::from(self.emit(place_marker_command(&marker))),
            None if !fresh => issued += usize::from(self.emit(Command::RemoveMarker)),
            None => {}
        }
        self.rendered_marker.clone_from(&self.marker);

        if let Some((center, animate)) = self.pending_focus.take() {
            issued += usize::from(self.emit(Command::SetView { center, animate }));
        }

        tracing::debug!(issued, fresh, "full map state issued");
        issued
    }

    fn emit_overlays(&mut self) -> usize {
        let mut commands = Vec::with_capacity(self.rooms.len() + 1);
        commands.push(Command::ClearOverlays);
        commands.extend(
            self.rooms
                .iter()
                .map(|room| Command::add_overlay(room, &self.availability, &self.theme)),
        );
        commands.into_iter().map(|command| usize::from(self.emit(command))).sum()
    }

    fn emit(&mut self, command: Command) -> bool {
        if self.readiness == Readiness::Ready {
            return self.sink.submit(command);
        }
        self.dropped += 1;
        tracing::debug!(command = command.name(), readiness = ?self.readiness, "map not ready, dropping command");
        false
    }

    fn desired_location(&self) -> Option<LocationOverlay> {
        self.location.map(|(center, accuracy)| LocationOverlay {
            center,
            accuracy,
            color: self.theme.highlight.clone(),
        })
    }

    // --- Queries ---

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    #[must_use]
    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Commands discarded because the surface was not ready.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[must_use]
    pub fn marker(&self) -> Option<&MarkerState> {
        self.marker.as_ref()
    }

    #[must_use]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }
}

fn set_location_command(location: &LocationOverlay) -> Command {
    Command::SetLocation {
        center: location.center,
        accuracy: location.accuracy,
        color: location.color.clone(),
    }
}

fn place_marker_command(marker: &MarkerState) -> Command {
    Command::PlaceMarker { position: marker.position, color: marker.color.clone() }
}
