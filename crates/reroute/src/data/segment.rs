//! Styled route segments.

use serde::Serialize;

use crate::data::coordinates::Coordinates;
use crate::data::expand::ExpandedWaypoint;

/// How a segment is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Mandatory portion of the route
    Solid,
    Dashed,
    /// Connector between an airport and the route core
    Fan,
}

impl LineKind {
    pub fn dash_array(&self) -> Option<&'static str> {
        match self {
            LineKind::Solid => None,
            LineKind::Dashed => Some("8, 8"),
            LineKind::Fan => Some("2, 6"),
        }
    }
}

/**
 * A polyline over consecutive waypoints sharing the same style.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub kind: LineKind,
    pub color: String,
    pub weight: f64,
    pub dash_array: Option<&'static str>,
    pub coordinates: Vec<Coordinates>,
}

impl RouteSegment {
    fn new(kind: LineKind, coordinates: Vec<Coordinates>, color: &str, base_weight: f64) -> Self {
        let weight = match kind {
            LineKind::Fan => base_weight / 2.,
            _ => base_weight,
        };
        RouteSegment {
            kind,
            color: color.to_string(),
            weight,
            dash_array: kind.dash_array(),
            coordinates,
        }
    }

    /// Identifies segments drawn identically: style first, then the geometry
    /// rounded to 4 decimals in whichever direction sorts first.
    pub fn dedup_key(&self) -> String {
        let forward = geometry(self.coordinates.iter());
        let reverse = geometry(self.coordinates.iter().rev());
        let role = if self.kind == LineKind::Fan { "fan" } else { "main" };
        format!(
            "{}|{}|{}|{}||{}",
            self.color,
            self.dash_array.unwrap_or("solid"),
            self.weight,
            role,
            forward.min(reverse)
        )
    }
}

fn geometry<'a>(coords: impl Iterator<Item = &'a Coordinates>) -> String {
    coords
        .map(|c| format!("{:.4},{:.4}", c.latitude, c.longitude))
        .collect::<Vec<_>>()
        .join("|")
}

/// Cut the waypoints of a route into styled segments.
///
/// Airports (and facilities) at either end of the route are each connected to
/// the nearest end of the core with a fan segment; the core is then chained
/// into polylines, a new one starting whenever a leg changes between solid
/// and dashed. A leg is solid when both its ends are.
pub fn assemble_segments(waypoints: &[ExpandedWaypoint], color: &str, base_weight: f64) -> Vec<RouteSegment> {
    if waypoints.len() < 2 {
        return Vec::new();
    }
    let first = waypoints.iter().position(|w| !w.airport_like);
    let last = waypoints.iter().rposition(|w| !w.airport_like);

    match (first, last) {
        (Some(first), Some(last)) if first > 0 || last < waypoints.len() - 1 => {
            let fan = |from: &ExpandedWaypoint, to: &ExpandedWaypoint| {
                RouteSegment::new(LineKind::Fan, vec![from.coordinates, to.coordinates], color, base_weight)
            };
            let mut segments = waypoints[..first]
                .iter()
                .map(|airport| fan(airport, &waypoints[first]))
                .collect::<Vec<_>>();
            segments.extend(chain(&waypoints[first..=last], color, base_weight));
            segments.extend(waypoints[last + 1..].iter().map(|airport| fan(&waypoints[last], airport)));
            segments
        }
        _ => chain(waypoints, color, base_weight),
    }
}

fn chain(waypoints: &[ExpandedWaypoint], color: &str, base_weight: f64) -> Vec<RouteSegment> {
    let mut segments = Vec::new();
    let mut current: Option<(bool, Vec<Coordinates>)> = None;

    for leg in waypoints.windows(2) {
        let solid = leg[0].solid && leg[1].solid;
        if let Some((current_solid, coords)) = current.as_mut() {
            if *current_solid == solid {
                coords.push(leg[1].coordinates);
                continue;
            }
        }
        if let Some(done) = current.replace((solid, vec![leg[0].coordinates, leg[1].coordinates])) {
            segments.push(done);
        }
    }
    segments.extend(current);

    segments
        .into_iter()
        .map(|(solid, coords)| {
            let kind = if solid { LineKind::Solid } else { LineKind::Dashed };
            RouteSegment::new(kind, coords, color, base_weight)
        })
        .collect()
}
