//! Waypoint ordering engine.
//!
//! Connected (non-isolated) waypoints of a route form a single sequence:
//! positions run 0..n without gaps, position 0 is `start`, the last one is
//! `finish`, everything in between is `intermediate`. Isolated waypoints have
//! no position and are never touched here.
//!
//! Every mutation recomputes the whole sequence. Routes hold tens of points, so
//! the O(n) pass is run inside the same transaction as the mutation itself.

use uuid::Uuid;

use crate::models::{CreateWaypointRequest, Waypoint, WaypointType};

/// Type of the waypoint sitting at `index` of a connected sequence of `len` points.
pub fn slot_kind(index: usize, len: usize) -> WaypointType {
    if index == 0 {
        WaypointType::Start
    } else if index + 1 == len {
        WaypointType::Finish
    } else {
        WaypointType::Intermediate
    }
}

/// Assigns positions 0..n and retypes the waypoints in slice order.
/// Isolated entries are skipped and keep `position = None`.
pub fn resequence(waypoints: &mut [Waypoint]) {
    let len = waypoints.iter().filter(|w| !w.is_isolated()).count();
    let mut index = 0;
    for waypoint in waypoints.iter_mut() {
        if waypoint.is_isolated() {
            waypoint.position = None;
            continue;
        }
        waypoint.position = Some(index as i32);
        waypoint.kind = slot_kind(index, len);
        index += 1;
    }
}

/// Drops isolated waypoints and sorts the rest by their current position.
/// Waypoints without a position (freshly appended) go last, in input order.
pub fn connected_in_order(waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    let mut connected: Vec<Waypoint> = waypoints.into_iter().filter(|w| !w.is_isolated()).collect();
    connected.sort_by_key(|w| w.position.unwrap_or(i32::MAX));
    connected
}

/// Checks the sequence invariant over all waypoints of one route.
pub fn is_well_formed(waypoints: &[Waypoint]) -> bool {
    if waypoints.iter().any(|w| w.is_isolated() && w.position.is_some()) {
        return false;
    }

    let mut connected: Vec<&Waypoint> = waypoints.iter().filter(|w| !w.is_isolated()).collect();
    connected.sort_by_key(|w| w.position.unwrap_or(i32::MAX));

    let len = connected.len();
    connected
        .iter()
        .enumerate()
        .all(|(i, w)| w.position == Some(i as i32) && w.kind == slot_kind(i, len))
}

/// Recomputes the connected sequence of a route after a mutation and returns
/// the waypoints whose position or type changed, ready to be written back.
pub fn reindex(waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    let before = waypoints.clone();
    let mut connected = connected_in_order(waypoints);
    resequence(&mut connected);
    connected
        .into_iter()
        .filter(|w| {
            before
                .iter()
                .find(|b| b.id == w.id)
                .is_none_or(|b| b.position != w.position || b.kind != w.kind)
        })
        .collect()
}

/// Builds waypoint rows for a whole route from request payloads, in payload
/// order: isolated points are stored as such, the rest are chained.
pub fn plan_waypoints(route_id: Uuid, requests: &[CreateWaypointRequest]) -> Vec<Waypoint> {
    let mut planned: Vec<Waypoint> = requests
        .iter()
        .map(|req| new_waypoint(route_id, req))
        .collect();
    resequence(&mut planned);
    planned
}

/// A waypoint built from a request, not yet placed in the sequence.
pub fn new_waypoint(route_id: Uuid, req: &CreateWaypointRequest) -> Waypoint {
    Waypoint {
        id: Uuid::new_v4(),
        route_id,
        lat: req.lat,
        lon: req.lon,
        position: None,
        kind: if req.is_isolated() {
            WaypointType::Isolated
        } else {
            WaypointType::Intermediate
        },
        description: req.description.clone(),
        photo_url: req.photo_url.clone(),
    }
}
