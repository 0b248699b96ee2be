use super::*;
use crate::channel::CommandChannel;
use crate::script::Script;

// =============================================================
// Helpers
// =============================================================

fn theme() -> Theme {
    Theme { highlight: Color::from("#00aaff"), fallback: Color::from("grey") }
}

fn room(name: &str, center: Option<LatLng>) -> Room {
    Room::new(name, vec![LatLng::new(48.0, 11.0), LatLng::new(48.0, 11.1), LatLng::new(48.1, 11.1)], center)
}

fn ready(policy: PendingPolicy) -> MapCoordinator<Vec<Command>> {
    let mut coordinator = MapCoordinator::new(Vec::new(), theme(), policy);
    coordinator.mark_ready();
    coordinator.sink_mut().clear();
    coordinator
}

fn drain(coordinator: &mut MapCoordinator<Vec<Command>>) -> Vec<Command> {
    std::mem::take(coordinator.sink_mut())
}

fn available(names: &[&str]) -> AvailabilityRecord {
    names.iter().map(|name| (*name, "free")).collect()
}

fn overlay(room: &Room, color: &str) -> Command {
    Command::AddOverlay { room: room.clone(), color: Color::from(color) }
}

// =============================================================
// Overlays
// =============================================================

#[test]
fn availability_arriving_before_refresh_yields_one_clear_and_one_highlight_add() {
    let mut map = ready(PendingPolicy::Resync);
    let a = room("A", None);

    map.set_rooms(vec![a.clone()]);
    map.set_availability(available(&["A"]));
    map.sync();

    assert_eq!(drain(&mut map), vec![Command::ClearOverlays, overlay(&a, "#00aaff")]);
}

#[test]
fn overlay_refresh_preserves_room_order() {
    let mut map = ready(PendingPolicy::Resync);
    let rooms = vec![room("C", None), room("A", None), room("B", None)];

    map.set_rooms(rooms.clone());
    map.set_availability(available(&["A"]));
    map.sync();

    assert_eq!(
        drain(&mut map),
        vec![
            Command::ClearOverlays,
            overlay(&rooms[0], "grey"),
            overlay(&rooms[1], "#00aaff"),
            overlay(&rooms[2], "grey"),
        ]
    );
}

#[test]
fn unchanged_inputs_emit_nothing() {
    let mut map = ready(PendingPolicy::Resync);
    map.set_rooms(vec![room("A", None)]);
    map.sync();
    drain(&mut map);

    map.set_rooms(vec![room("A", None)]);
    map.set_availability(AvailabilityRecord::new());
    assert_eq!(map.sync(), 0);
    assert!(drain(&mut map).is_empty());
}

#[test]
fn availability_change_refreshes_overlays_again() {
    let mut map = ready(PendingPolicy::Resync);
    let a = room("A", None);
    map.set_rooms(vec![a.clone()]);
    map.sync();
    assert_eq!(drain(&mut map), vec![Command::ClearOverlays, overlay(&a, "grey")]);

    map.set_availability(available(&["A"]));
    map.sync();
    assert_eq!(drain(&mut map), vec![Command::ClearOverlays, overlay(&a, "#00aaff")]);
}

#[test]
fn theme_change_recolors_overlays_and_location() {
    let mut map = ready(PendingPolicy::Resync);
    let a = room("A", None);
    map.set_rooms(vec![a.clone()]);
    map.set_availability(available(&["A"]));
    map.set_location(LatLng::new(48.0, 11.0), 5.0);
    map.sync();
    drain(&mut map);

    map.set_theme(Theme { highlight: Color::from("orange"), fallback: Color::from("grey") });
    map.sync();

    assert_eq!(
        drain(&mut map),
        vec![
            Command::ClearOverlays,
            overlay(&a, "orange"),
            Command::SetLocation { center: LatLng::new(48.0, 11.0), accuracy: 5.0, color: Color::from("orange") },
        ]
    );
}

#[test]
fn overlay_refresh_never_moves_the_camera() {
    let mut map = ready(PendingPolicy::Resync);
    map.set_rooms(vec![room("A", Some(LatLng::new(48.05, 11.05)))]);
    map.sync();
    assert!(drain(&mut map).iter().all(|cmd| !matches!(cmd, Command::SetView { .. })));
}

// =============================================================
// Marker
// =============================================================

#[test]
fn recolor_in_place_when_only_color_changes() {
    let mut map = ready(PendingPolicy::Resync);
    let c1 = LatLng::new(48.0, 11.0);
    map.place_marker(c1, Color::from("red"));
    map.sync();
    assert_eq!(drain(&mut map), vec![Command::PlaceMarker { position: c1, color: Color::from("red") }]);

    map.set_marker_color(Color::from("blue"));
    map.sync();
    assert_eq!(drain(&mut map), vec![Command::UpdateMarkerColor { color: Color::from("blue") }]);
}

#[test]
fn moving_the_marker_replaces_it() {
    let mut map = ready(PendingPolicy::Resync);
    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    map.sync();
    drain(&mut map);

    map.place_marker(LatLng::new(48.1, 11.1), Color::from("red"));
    map.sync();
    assert_eq!(
        drain(&mut map),
        vec![Command::PlaceMarker { position: LatLng::new(48.1, 11.1), color: Color::from("red") }]
    );
}

#[test]
fn replacing_marker_with_identical_state_emits_nothing() {
    let mut map = ready(PendingPolicy::Resync);
    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    map.sync();
    drain(&mut map);

    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    assert_eq!(map.sync(), 0);
}

#[test]
fn recolor_without_marker_is_ignored() {
    let mut map = ready(PendingPolicy::Resync);
    map.set_marker_color(Color::from("blue"));
    assert_eq!(map.sync(), 0);
    assert!(map.marker().is_none());
}

#[test]
fn remove_marker_emits_once() {
    let mut map = ready(PendingPolicy::Resync);
    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    map.sync();
    drain(&mut map);

    map.remove_marker();
    map.sync();
    map.remove_marker();
    map.sync();
    assert_eq!(drain(&mut map), vec![Command::RemoveMarker]);
}

// =============================================================
// Location
// =============================================================

#[test]
fn location_updates_independently_of_marker_and_rooms() {
    let mut map = ready(PendingPolicy::Resync);
    map.set_location(LatLng::new(48.0, 11.0), 10.0);
    map.sync();
    map.set_location(LatLng::new(48.0, 11.0), 4.0);
    map.sync();
    map.clear_location();
    map.sync();

    assert_eq!(
        drain(&mut map),
        vec![
            Command::SetLocation { center: LatLng::new(48.0, 11.0), accuracy: 10.0, color: Color::from("#00aaff") },
            Command::SetLocation { center: LatLng::new(48.0, 11.0), accuracy: 4.0, color: Color::from("#00aaff") },
            Command::ClearLocation,
        ]
    );
}

#[test]
fn non_finite_location_is_rejected() {
    let mut map = ready(PendingPolicy::Resync);
    assert!(!map.set_location(LatLng::new(f64::NAN, 11.0), 3.0));
    assert!(!map.set_location(LatLng::new(48.0, 11.0), f64::INFINITY));
    assert_eq!(map.sync(), 0);
}

#[test]
fn non_finite_marker_position_is_rejected() {
    let mut map = ready(PendingPolicy::Resync);
    let red = Color::from("red");
    assert!(!map.place_marker(LatLng::new(f64::NAN, 11.0), red.clone()));
    assert!(map.marker().is_none());
    assert_eq!(map.sync(), 0);

    let position = LatLng::new(48.0, 11.0);
    assert!(map.place_marker(position, red.clone()));
    map.sync();
    drain(&mut map);

    assert!(!map.place_marker(LatLng::new(48.0, f64::INFINITY), Color::from("blue")));
    assert_eq!(map.marker(), Some(&MarkerState { position, color: red }));
    assert_eq!(map.sync(), 0);
    assert_eq!(map.sync(), 0);
}

// =============================================================
// Focus
// =============================================================

#[test]
fn non_finite_focus_center_is_rejected() {
    let mut map = ready(PendingPolicy::Resync);
    assert!(!map.focus(Some(LatLng::new(f64::NAN, f64::NAN)), true));
    assert!(!map.focus_target(&FocusTarget::Point(LatLng::new(48.0, f64::NEG_INFINITY)), false));
    assert_eq!(map.sync(), 0);
    assert!(drain(&mut map).is_empty());
}

#[test]
fn focus_room_centers_on_room_center_once() {
    let mut map = ready(PendingPolicy::Resync);
    let center = LatLng::new(48.05, 11.05);
    map.set_rooms(vec![room("G201", Some(center))]);
    map.sync();
    drain(&mut map);

    assert!(map.focus_room("G201", true));
    map.sync();
    map.sync();
    assert_eq!(drain(&mut map), vec![Command::SetView { center, animate: true }]);
}

#[test]
fn focus_without_center_is_a_no_op() {
    let mut map = ready(PendingPolicy::Resync);
    map.set_rooms(vec![room("G201", None)]);
    map.sync();
    drain(&mut map);

    assert!(!map.focus_room("G201", true));
    assert!(!map.focus_room("missing", true));
    assert!(!map.focus_marker(true));
    assert!(!map.focus_location(true));
    assert_eq!(map.sync(), 0);
}

#[test]
fn view_is_emitted_after_state_changes() {
    let mut map = ready(PendingPolicy::Resync);
    let here = LatLng::new(48.0, 11.0);
    map.place_marker(here, Color::from("red"));
    map.focus_marker(false);
    map.set_rooms(vec![room("A", None)]);
    map.sync();

    let commands = drain(&mut map);
    assert_eq!(commands.first(), Some(&Command::ClearOverlays));
    assert_eq!(commands.last(), Some(&Command::SetView { center: here, animate: false }));
}

// =============================================================
// Readiness
// =============================================================

#[test]
fn resync_policy_stages_until_ready_then_replays_everything() {
    let mut map = MapCoordinator::new(Vec::<Command>::new(), theme(), PendingPolicy::Resync);
    let a = room("A", None);
    let here = LatLng::new(48.0, 11.0);

    map.set_rooms(vec![a.clone()]);
    map.set_location(here, 7.0);
    map.place_marker(here, Color::from("red"));
    map.focus(Some(here), true);
    assert_eq!(map.sync(), 0);
    assert!(map.sink().is_empty());
    assert_eq!(map.dropped(), 0);

    map.observe(&InboundEvent::MapReady);

    assert_eq!(map.readiness(), Readiness::Ready);
    assert_eq!(
        drain(&mut map),
        vec![
            Command::ClearOverlays,
            overlay(&a, "grey"),
            Command::SetLocation { center: here, accuracy: 7.0, color: Color::from("#00aaff") },
            Command::PlaceMarker { position: here, color: Color::from("red") },
            Command::SetView { center: here, animate: true },
        ]
    );
    assert_eq!(map.sync(), 0);
}

#[test]
fn ready_on_empty_state_emits_nothing() {
    let mut map = MapCoordinator::new(Vec::<Command>::new(), theme(), PendingPolicy::Resync);
    map.mark_ready();
    assert!(map.sink().is_empty());
}

#[test]
fn drop_policy_loses_commands_issued_before_ready() {
    let mut map = MapCoordinator::new(Vec::<Command>::new(), theme(), PendingPolicy::Drop);
    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    assert_eq!(map.sync(), 0);
    assert_eq!(map.dropped(), 1);

    map.observe(&InboundEvent::MapReady);
    assert_eq!(map.sync(), 0);
    assert!(map.sink().is_empty());

    assert_eq!(map.resync(), 3);
    assert_eq!(
        drain(&mut map),
        vec![
            Command::ClearOverlays,
            Command::ClearLocation,
            Command::PlaceMarker { position: LatLng::new(48.0, 11.0), color: Color::from("red") },
        ]
    );
}

#[test]
fn load_error_faults_and_reload_recovers() {
    let mut map = ready(PendingPolicy::Resync);
    let a = room("A", None);
    map.set_rooms(vec![a.clone()]);
    map.sync();
    drain(&mut map);

    map.observe(&InboundEvent::Connectivity(Connectivity::LoadError));
    assert_eq!(map.readiness(), Readiness::Faulted);
    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    assert_eq!(map.sync(), 0);
    assert_eq!(map.resync(), 0);

    map.reload();
    assert_eq!(map.readiness(), Readiness::Uninitialized);
    map.observe(&InboundEvent::MapReady);

    assert_eq!(
        drain(&mut map),
        vec![
            Command::ClearOverlays,
            overlay(&a, "grey"),
            Command::PlaceMarker { position: LatLng::new(48.0, 11.0), color: Color::from("red") },
        ]
    );
}

#[test]
fn connectivity_signals_track_online_state() {
    let mut map = ready(PendingPolicy::Resync);
    assert!(map.is_online());
    map.observe(&InboundEvent::Connectivity(Connectivity::Offline));
    assert!(!map.is_online());
    assert_eq!(map.readiness(), Readiness::Ready);
    map.observe(&InboundEvent::Connectivity(Connectivity::Online));
    assert!(map.is_online());
}

#[test]
fn room_clicks_and_popups_do_not_touch_the_map() {
    let mut map = ready(PendingPolicy::Resync);
    map.observe(&InboundEvent::Popup("<div>popup</div>".to_owned()));
    map.observe(&InboundEvent::RoomClick(crate::event::RoomClick { room: "A".to_owned(), center: None }));
    assert_eq!(map.sync(), 0);
}

#[test]
fn full_resync_includes_removals() {
    let mut map = ready(PendingPolicy::Resync);
    assert_eq!(map.resync(), 3);
    assert_eq!(
        drain(&mut map),
        vec![Command::ClearOverlays, Command::ClearLocation, Command::RemoveMarker]
    );
}

// =============================================================
// HostUpdate
// =============================================================

#[test]
fn host_updates_deserialize_and_apply() {
    let mut map = ready(PendingPolicy::Resync);
    let updates: Vec<HostUpdate> = serde_json::from_str(
        r#"[
            {"type":"rooms","payload":[{"name":"A","ring":[[48.0,11.0],[48.0,11.1],[48.1,11.1]],"center":[48.05,11.05]}]},
            {"type":"availability","payload":{"A":"free"}},
            {"type":"placeMarker","payload":{"position":[48.0,11.0],"color":"red"}},
            {"type":"recolorMarker","payload":{"color":"blue"}},
            {"type":"focus","payload":{"target":{"type":"room","payload":"A"}}}
        ]"#,
    )
    .expect("updates parse");

    for update in updates {
        map.apply(update);
    }
    map.sync();

    let commands = drain(&mut map);
    assert_eq!(commands.len(), 4);
    assert!(matches!(&commands[1], Command::AddOverlay { color, .. } if color.as_str() == "#00aaff"));
    assert_eq!(commands[2], Command::PlaceMarker { position: LatLng::new(48.0, 11.0), color: Color::from("blue") });
    assert_eq!(commands[3], Command::SetView { center: LatLng::new(48.05, 11.05), animate: true });
}

// =============================================================
// Through the command channel
// =============================================================

#[test]
fn coordinator_drives_command_channel() {
    let mut map = MapCoordinator::new(CommandChannel::new(Vec::<Script>::new()), theme(), PendingPolicy::Resync);
    map.place_marker(LatLng::new(48.0, 11.0), Color::from("red"));
    map.mark_ready();
    map.set_marker_color(Color::from("blue"));
    map.sync();

    let channel = map.into_sink();
    assert_eq!(channel.dispatched(), 2);
    let scripts = channel.into_transport();
    assert!(scripts[0].as_str().contains("L.marker([48.0,11.0]"));
    assert!(scripts[1].as_str().contains("setIcon("));
    assert!(!scripts[1].as_str().contains(".remove()"));
}
