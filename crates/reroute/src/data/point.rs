//! Point resolution and disambiguation.

use serde::Serialize;

use crate::data::context::ReferenceContext;
use crate::data::coordinates::{parse_coordinate, Coordinates};
use crate::data::expand::RouteToken;
use crate::error::ResolutionIssue;

/// Where the position of a resolved point comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    /// A fix, navaid or airport of the points table
    Fix,
    /// A facility centre pseudo-point
    FacilityCenter,
    /// The centroid of a facility boundary
    Centroid,
    /// A position decoded from coordinate shorthand
    Shorthand,
}

/**
 * A point resolved from its name.
 *
 * `name` is the identifier the position was found under: a bare facility code
 * such as `ZFW` resolves to its `ZZ_ZFW` pseudo-point.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPoint {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub kind: PointKind,
}

/// Positions of the points around the one being resolved, if known.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Neighbors {
    pub previous: Option<Coordinates>,
    pub next: Option<Coordinates>,
}

impl Neighbors {
    pub fn new(previous: Option<Coordinates>, next: Option<Coordinates>) -> Self {
        Neighbors { previous, next }
    }

    /// Reference position used to pick among candidates.
    fn reference(&self) -> Option<Coordinates> {
        match (self.previous, self.next) {
            (Some(previous), Some(next)) => Some(previous.midpoint(&next)),
            (previous, next) => previous.or(next),
        }
    }
}

/// Why a name could not be turned into a position.
#[derive(Debug, Clone, PartialEq)]
pub enum Unresolved {
    NotFound,
    /// The best candidate is too far from its neighbours.
    Unreliable { distance_km: f64, limit_km: f64 },
}

impl Unresolved {
    pub fn into_issue(self, name: &str) -> ResolutionIssue {
        match self {
            Unresolved::NotFound => ResolutionIssue::UnresolvedPoint { name: name.to_string() },
            Unresolved::Unreliable { distance_km, limit_km } => ResolutionIssue::UnreliableCandidate {
                name: name.to_string(),
                distance_km,
                limit_km,
            },
        }
    }
}

impl ReferenceContext {
    /// Resolve a point name, using neighbour positions to disambiguate.
    ///
    /// Lookup order:
    /// 1. facility pseudo-points (`ZZ_ZMP`) by their key, bare facility codes
    ///    (`ZMP`) through their pseudo-point first;
    /// 2. any other identifier of the points table;
    /// 3. coordinate shorthand;
    /// 4. facility centroids.
    ///
    /// Among several candidates, the one closest to the neighbours (or their
    /// midpoint) wins. Whatever its origin, the position is rejected when it
    /// lies further from a known neighbour than the configured bound.
    pub fn resolve_point(&self, name: &str, neighbors: Neighbors) -> Result<ResolvedPoint, Unresolved> {
        let name = name.trim().to_uppercase();

        let indexed = self.lookup_key(&name).map(|(key, kind)| {
            let coordinates = select_candidate(&self.points[&key], neighbors);
            self.confirm_distance(
                ResolvedPoint {
                    name: key,
                    coordinates,
                    kind,
                },
                neighbors,
            )
        });

        let indexed: Result<ResolvedPoint, Unresolved> = match indexed {
            Some(Ok(point)) => return Ok(point),
            Some(Err(unreliable)) => Err(unreliable),
            None => match parse_coordinate(&name) {
                Some(coordinates) => {
                    let point = ResolvedPoint {
                        name: name.clone(),
                        coordinates,
                        kind: PointKind::Shorthand,
                    };
                    return self.confirm_distance(point, neighbors);
                }
                None => Err(Unresolved::NotFound),
            },
        };

        match self.centroids.get(&name) {
            Some(coordinates) => {
                let point = ResolvedPoint {
                    name,
                    coordinates: *coordinates,
                    kind: PointKind::Centroid,
                };
                // keep the first failure when the centroid is no better
                self.confirm_distance(point, neighbors).or(indexed)
            }
            None => indexed,
        }
    }

    /// Number of candidates a name would be chosen among; shorthand counts
    /// as a single candidate.
    pub fn candidate_count(&self, name: &str) -> usize {
        let name = name.trim().to_uppercase();
        match self.lookup_key(&name) {
            Some((key, _)) => self.points[&key].len(),
            None if parse_coordinate(&name).is_some() => 1,
            None => 0,
        }
    }

    /// Key of the points table to use for a name, if any.
    fn lookup_key(&self, name: &str) -> Option<(String, PointKind)> {
        if self.is_facility_point(name) {
            return self
                .points
                .contains_key(name)
                .then(|| (name.to_string(), PointKind::FacilityCenter));
        }
        if self.is_facility_code(name) {
            let key = self.facility_key(name);
            if self.points.contains_key(&key) {
                return Some((key, PointKind::FacilityCenter));
            }
        }
        self.points
            .contains_key(name)
            .then(|| (name.to_string(), PointKind::Fix))
    }

    fn confirm_distance(&self, point: ResolvedPoint, neighbors: Neighbors) -> Result<ResolvedPoint, Unresolved> {
        let mut limit_km = self.config.max_leg_km;
        if let (Some(previous), Some(next)) = (neighbors.previous, neighbors.next) {
            limit_km = limit_km.min(previous.distance_km(&next) * self.config.neighbor_ratio);
        }
        for neighbor in [neighbors.previous, neighbors.next].into_iter().flatten() {
            let distance_km = point.coordinates.distance_km(&neighbor);
            if distance_km > limit_km {
                tracing::debug!(
                    "Rejecting {} at {}: {:.0} km from a neighbour (limit {:.0} km)",
                    point.name,
                    point.coordinates,
                    distance_km,
                    limit_km
                );
                return Err(Unresolved::Unreliable { distance_km, limit_km });
            }
        }
        Ok(point)
    }

    /// Resolve every token of an expanded route, in order.
    ///
    /// Returns each resolved point with the index of the token it comes from.
    /// Tokens that cannot be resolved are skipped and reported.
    pub(crate) fn resolve_route(
        &self,
        tokens: &[RouteToken],
        issues: &mut Vec<ResolutionIssue>,
    ) -> Vec<(usize, ResolvedPoint)> {
        let mut resolved: Vec<(usize, ResolvedPoint)> = Vec::with_capacity(tokens.len());
        let mut previous: Option<Coordinates> = None;

        for (i, token) in tokens.iter().enumerate() {
            let Some(target) = self.lookup_target(&token.name) else {
                tracing::debug!("Skipping procedure name '{}' with no known root fix", token.name);
                continue;
            };

            // Provisional position of the next token, to disambiguate this one
            let next = tokens
                .get(i + 1)
                .and_then(|next_token| self.lookup_target(&next_token.name))
                .and_then(|next_target| {
                    let hint = if self.candidate_count(target) == 1 {
                        self.resolve_point(target, Neighbors::default())
                            .ok()
                            .map(|p| p.coordinates)
                    } else {
                        None
                    };
                    self.resolve_point(next_target, Neighbors::new(previous, hint))
                        .ok()
                        .map(|p| p.coordinates)
                });

            match self.resolve_point(target, Neighbors::new(previous, next)) {
                Ok(point) => {
                    previous = Some(point.coordinates);
                    let duplicate = resolved.last().is_some_and(|(_, last)| last == &point);
                    if !duplicate {
                        resolved.push((i, point));
                    }
                }
                // airways left in place are already reported
                Err(Unresolved::NotFound) if self.airways.contains_key(target) => {
                    tracing::debug!("Skipping unexpanded airway '{}'", target);
                }
                Err(unresolved) => {
                    tracing::warn!("Can't resolve point '{}': {:?}", target, unresolved);
                    issues.push(unresolved.into_issue(target));
                }
            }
        }
        resolved
    }

    /// Name to look up for a token: the root fix of a procedure name, `None`
    /// when that root is unknown.
    fn lookup_target<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self.procedure_root(name) {
            Some(ProcedureRoot::Known(root)) => Some(root),
            Some(ProcedureRoot::Unknown) => None,
            None => Some(name),
        }
    }

    /// A 6-character name with a digit that is not itself a known point is
    /// read as a procedure (`BIGGY5`), located at its root fix (`BIGGY`).
    fn procedure_root<'a>(&self, name: &'a str) -> Option<ProcedureRoot<'a>> {
        if name.len() != 6 || !name.is_ascii() || !name.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        if self.lookup_key(name).is_some() {
            return None;
        }
        let root = &name[..5];
        Some(if self.lookup_key(root).is_some() {
            ProcedureRoot::Known(root)
        } else {
            ProcedureRoot::Unknown
        })
    }
}

enum ProcedureRoot<'a> {
    Known(&'a str),
    Unknown,
}

/// Pick the candidate closest to the neighbours; the first one wins ties, and
/// when there is no neighbour.
fn select_candidate(candidates: &[Coordinates], neighbors: Neighbors) -> Coordinates {
    let first = candidates[0];
    let Some(reference) = neighbors.reference().filter(|_| candidates.len() > 1) else {
        return first;
    };
    let mut best = first;
    let mut best_error = reference.manhattan(&first);
    for candidate in &candidates[1..] {
        let error = reference.manhattan(candidate);
        if error < best_error {
            best = *candidate;
            best_error = error;
        }
    }
    best
}
