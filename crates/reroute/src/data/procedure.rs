//! Departure (DP) and arrival (STAR) procedure expansion.
//!
//! Departure procedures are identified from loosely written tokens (outdated
//! numbers, `#` placeholders, explicit transitions) and replaced by their
//! point sequences, taken from the full-route table or stitched together from
//! the legacy leg table. Arrival procedures are looked up by transition or
//! STAR code and replaced by the route points of the best entry.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::data::airport_equivalents;
use crate::data::context::ReferenceContext;
use crate::data::expand::RouteToken;
use crate::data::reference::{DepartureBaseRow, DepartureLegRow, FullRouteRow, RoutePortion};
use crate::error::ResolutionIssue;

/**
 * A departure procedure, as used to identify tokens.
 *
 * Records derived from the full-route table aggregate every row sharing a
 * computer code: the served airports are the union of their origin groups and
 * the effective date is the latest one.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureRecord {
    /// Computer code, e.g. `BOOVE3.BOOVE`
    pub code: String,
    pub name: String,
    pub served_airports: Vec<String>,
    pub effective: Option<NaiveDate>,
}

impl DepartureRecord {
    /// Whether the procedure serves the airport, `KDFW` and `DFW` being the same.
    pub fn serves(&self, origin: &str) -> bool {
        serves(&self.served_airports, origin)
    }

    /// The part of the code before the dot (`BOOVE3` for `BOOVE3.BOOVE`).
    fn left(&self) -> Option<&str> {
        split_dotted(&self.code).map(|(left, _)| left)
    }
}

/**
 * One row of a full-route table: a procedure, one of its transitions and the
 * complete list of points flown.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureRoute {
    pub code: String,
    pub name: String,
    pub transition_code: String,
    pub effective: Option<NaiveDate>,
    /// Airports of the origin (departures) or destination (arrivals) group,
    /// runways stripped
    pub airports: Vec<String>,
    pub points: Vec<String>,
}

impl From<FullRouteRow> for ProcedureRoute {
    fn from(row: FullRouteRow) -> Self {
        let mut airports: Vec<String> = Vec::new();
        for token in row.endpoint_group.split_whitespace() {
            let airport = token.split('/').next().unwrap_or_default().to_uppercase();
            if !airport.is_empty() && !airports.contains(&airport) {
                airports.push(airport);
            }
        }
        ProcedureRoute {
            code: row.code.trim().to_uppercase(),
            name: row.name.trim().to_uppercase(),
            transition_code: row.transition_code.trim().to_uppercase(),
            effective: row.effective,
            airports,
            points: row.points.iter().map(|p| p.trim().to_uppercase()).filter(|p| !p.is_empty()).collect(),
        }
    }
}

impl ProcedureRoute {
    /// Routes without an airport group apply to any airport.
    fn applies_to(&self, airport: &str) -> bool {
        self.airports.is_empty() || serves(&self.airports, airport)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Leg {
    sequence: i64,
    point: String,
    airport_runway: String,
}

impl Leg {
    /// The airport/runway association mentions `ORIGIN/`.
    fn departs_from(&self, origin: &str) -> bool {
        airport_equivalents(origin)
            .iter()
            .any(|airport| self.airport_runway.contains(&format!("{airport}/")))
    }
}

/// Legacy procedure legs, body and transitions indexed separately.
#[derive(Debug, Clone, Default)]
pub struct LegIndex {
    bodies: HashMap<String, Vec<Leg>>,
    transitions: HashMap<String, Vec<Leg>>,
}

impl LegIndex {
    fn new(rows: Vec<DepartureLegRow>) -> Self {
        let mut index = LegIndex::default();
        for row in rows {
            let point = row.point.trim().to_uppercase();
            let code = row.code.trim().to_uppercase();
            if point.is_empty() || code.is_empty() {
                continue;
            }
            let target = match row.portion {
                RoutePortion::Body => &mut index.bodies,
                RoutePortion::Transition => &mut index.transitions,
            };
            target.entry(code).or_default().push(Leg {
                sequence: row.sequence,
                point,
                airport_runway: row.airport_runway.to_uppercase(),
            });
        }
        index
    }

    /// Points of the legs, ordered by sequence number, each point once. Legs
    /// associated with the origin are preferred when there are any.
    fn sequence(legs: Option<&Vec<Leg>>, origin: &str) -> Option<Vec<String>> {
        let legs = legs?;
        let mut selected = legs.iter().filter(|leg| leg.departs_from(origin)).collect::<Vec<_>>();
        if selected.is_empty() {
            selected = legs.iter().collect();
        }
        selected.sort_by_key(|leg| leg.sequence);

        let mut seen = HashSet::new();
        let points = selected
            .into_iter()
            .filter(|leg| seen.insert(leg.point.as_str()))
            .map(|leg| leg.point.clone())
            .collect::<Vec<_>>();
        (!points.is_empty()).then_some(points)
    }

    /// Body of the procedure, oriented so that it ends at the root fix named
    /// by the code (`REVSS` for `REVSS6.REVSS`).
    fn body(&self, code: &str, origin: &str) -> Option<Vec<String>> {
        let mut points = Self::sequence(self.bodies.get(code), origin)?;
        let root = split_dotted(code).map_or(code, |(_, right)| right);

        let n = points.len();
        let forward = points.iter().rposition(|p| p == root);
        let backward = points.iter().position(|p| p == root).map(|i| n - 1 - i);
        let reverse = match (forward, backward) {
            (Some(i), _) if i == n - 1 => false,
            (_, Some(i)) if i == n - 1 => true,
            (None, None) => false,
            (forward, backward) => {
                let gap = |idx: Option<usize>| idx.map_or(n, |i| n - 1 - i);
                gap(backward) < gap(forward)
            }
        };
        if reverse {
            points.reverse();
        }
        Some(points)
    }

    /// Stitch body and transition together, the origin first.
    ///
    /// Returns the sequence and whether the transition was used.
    fn stitch(&self, code: &str, transition: Option<&str>, origin: &str) -> Option<(Vec<String>, bool)> {
        let mut combined = self.body(code, origin).unwrap_or_default();
        let mut used_transition = false;

        if let Some(mut legs) = transition.and_then(|t| Self::sequence(self.transitions.get(t), origin)) {
            if let Some(last) = combined.last() {
                if legs.first() != Some(last) && legs.last() == Some(last) {
                    legs.reverse();
                }
                if legs.first() == Some(last) {
                    legs.remove(0);
                }
            }
            combined.extend(legs);
            used_transition = true;
        }

        if combined.is_empty() {
            return None;
        }
        let mut sequence = vec![origin.to_string()];
        sequence.extend(combined);
        Some((sequence, used_transition))
    }
}

/// Where departure point sequences come from, decided once from the
/// available tables.
#[derive(Debug, Clone)]
pub enum DepartureSource {
    FullRoutes {
        by_transition: HashMap<String, Vec<ProcedureRoute>>,
        by_code: HashMap<String, Vec<ProcedureRoute>>,
        /// Last resort when no full route matches
        legs: Option<LegIndex>,
    },
    Legs(LegIndex),
}

/**
 * Departure procedure indices.
 *
 * Records are reachable by exact code, by the part of the code before the
 * dot (`BOOVE3`), by root name (`BOOVE`) and by pattern (`BOOVE#.SPS`). For
 * the last three, a record only replaces an earlier one with a strictly later
 * effective date.
 */
#[derive(Debug, Clone)]
pub struct Departures {
    records: Vec<DepartureRecord>,
    by_code: HashMap<String, usize>,
    by_left: HashMap<String, usize>,
    by_root: HashMap<String, usize>,
    by_pattern: HashMap<String, usize>,
    source: DepartureSource,
}

/// A departure token replaced by the points of its procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureExpansion {
    pub record: DepartureRecord,
    /// Origin first, then the procedure points
    pub points: Vec<String>,
    /// The following token was read as the transition and is consumed
    pub consumes_next: bool,
}

impl Departures {
    /// Build the indices from whatever tables are available.
    ///
    /// The full-route table takes precedence, with the legacy legs attached
    /// as a fallback. The legacy base and leg tables are used together when
    /// there is no full-route table. Otherwise there is nothing to expand.
    pub fn build(
        full_routes: Option<Vec<FullRouteRow>>,
        base: Option<Vec<DepartureBaseRow>>,
        legs: Option<Vec<DepartureLegRow>>,
    ) -> Option<Self> {
        match (full_routes.filter(|rows| !rows.is_empty()), base, legs) {
            (Some(rows), _, legs) => {
                let routes = rows.into_iter().map(ProcedureRoute::from).collect::<Vec<_>>();
                let records = aggregate(&routes);

                let mut by_transition: HashMap<String, Vec<ProcedureRoute>> = HashMap::new();
                let mut by_code: HashMap<String, Vec<ProcedureRoute>> = HashMap::new();
                for route in routes {
                    if !route.transition_code.is_empty() {
                        by_transition
                            .entry(route.transition_code.clone())
                            .or_default()
                            .push(route.clone());
                    }
                    by_code.entry(route.code.clone()).or_default().push(route);
                }
                tracing::info!(
                    "Departures: {} procedures, {} transitions from full routes",
                    records.len(),
                    by_transition.len()
                );
                let source = DepartureSource::FullRoutes {
                    by_transition,
                    by_code,
                    legs: legs.map(LegIndex::new),
                };
                Some(Self::index(records, source))
            }
            (None, Some(base), Some(legs)) => {
                let records = base
                    .into_iter()
                    .filter(|row| !row.code.trim().is_empty())
                    .map(|row| DepartureRecord {
                        code: row.code.trim().to_uppercase(),
                        name: row.name.trim().to_uppercase(),
                        served_airports: row.served_airports.iter().map(|a| a.to_uppercase()).collect(),
                        effective: row.effective,
                    })
                    .collect::<Vec<_>>();
                tracing::info!("Departures: {} procedures from legacy tables", records.len());
                Some(Self::index(records, DepartureSource::Legs(LegIndex::new(legs))))
            }
            _ => None,
        }
    }

    fn index(records: Vec<DepartureRecord>, source: DepartureSource) -> Self {
        let mut departures = Departures {
            records: Vec::new(),
            by_code: HashMap::new(),
            by_left: HashMap::new(),
            by_root: HashMap::new(),
            by_pattern: HashMap::new(),
            source,
        };
        for (idx, record) in records.iter().enumerate() {
            let keys = [
                (IndexKind::Code, Some(record.code.clone())),
                (IndexKind::Left, record.left().map(String::from)),
                (IndexKind::Root, record.left().map(letters).filter(|r| !r.is_empty())),
                (IndexKind::Pattern, pattern(&record.code)),
            ];
            for (kind, key) in keys {
                let Some(key) = key else { continue };
                let map = match kind {
                    IndexKind::Code => &mut departures.by_code,
                    IndexKind::Left => &mut departures.by_left,
                    IndexKind::Root => &mut departures.by_root,
                    IndexKind::Pattern => &mut departures.by_pattern,
                };
                match map.get(&key) {
                    Some(&existing) if records[existing].effective >= record.effective => {}
                    _ => {
                        map.insert(key, idx);
                    }
                }
            }
        }
        departures.records = records;
        departures
    }

    pub fn records(&self) -> &[DepartureRecord] {
        &self.records
    }

    pub fn source(&self) -> &DepartureSource {
        &self.source
    }

    fn get(&self, map: &HashMap<String, usize>, key: &str, origin: &str) -> Option<&DepartureRecord> {
        map.get(key).map(|&idx| &self.records[idx]).filter(|r| r.serves(origin))
    }

    /// Identify the procedure a token stands for, among those serving the
    /// origin airport.
    ///
    /// 1. exact computer code (`BOOVE3.BOOVE`);
    /// 2. for dotted tokens, the `ROOT#.TRANSITION` pattern, then the root
    ///    name alone (wrong number or wrong transition);
    /// 3. the part before the dot (`BOOVE3`);
    /// 4. for tokens with digits or `#`, the current procedure of the root
    ///    name (`BOOVE2`, `BOOVE#`).
    pub fn lookup(&self, token: &str, origin: &str) -> Option<&DepartureRecord> {
        if let Some(record) = self.get(&self.by_code, token, origin) {
            return Some(record);
        }
        if let Some((left, right)) = split_dotted(token) {
            let root = letters(left);
            if !root.is_empty() {
                let found = self
                    .get(&self.by_pattern, &format!("{root}#.{right}"), origin)
                    .or_else(|| self.get(&self.by_root, &root, origin));
                if found.is_some() {
                    return found;
                }
            }
        }
        if let Some(record) = self.get(&self.by_left, token, origin) {
            return Some(record);
        }
        if token.contains(|c: char| c.is_ascii_digit() || c == '#') {
            let root = letters(token);
            if !root.is_empty() {
                return self.get(&self.by_root, &root, origin);
            }
        }
        None
    }

    /// Expand a departure token into the points of its procedure.
    ///
    /// The transition comes from the token itself (`BOOVE3.SPS`) or from the
    /// following token when it looks like a fix. Full routes for the
    /// transition come first, then any full route of the procedure, then the
    /// legacy legs; the longest candidate sequence wins.
    pub fn expand(&self, token: &str, next: Option<&str>, origin: &str) -> Option<DepartureExpansion> {
        let record = self.lookup(token, origin)?;
        let left = record.left();

        let (transition, from_next) = match split_dotted(token) {
            Some((token_left, right)) => (Some(format!("{}.{}", left.unwrap_or(token_left), right)), false),
            None => match next.filter(|n| looks_like_fix(n)) {
                Some(next) => (Some(format!("{}.{}", left.unwrap_or(token), next)), true),
                None => (None, false),
            },
        };

        let (points, used_transition) = match &self.source {
            DepartureSource::FullRoutes {
                by_transition,
                by_code,
                legs,
            } => {
                let for_transition = transition
                    .as_ref()
                    .and_then(|t| longest(by_transition.get(t), origin))
                    .map(|points| (points, true));
                match for_transition.or_else(|| longest(by_code.get(&record.code), origin).map(|p| (p, false))) {
                    Some(found) => found,
                    None => legs
                        .as_ref()
                        .and_then(|legs| legs.stitch(&record.code, transition.as_deref(), origin))?,
                }
            }
            DepartureSource::Legs(legs) => legs.stitch(&record.code, transition.as_deref(), origin)?,
        };

        Some(DepartureExpansion {
            record: record.clone(),
            points,
            consumes_next: from_next && used_transition,
        })
    }
}

enum IndexKind {
    Code,
    Left,
    Root,
    Pattern,
}

/// Merge full-route rows into one record per computer code, in order of first
/// appearance.
fn aggregate(routes: &[ProcedureRoute]) -> Vec<DepartureRecord> {
    let mut records: Vec<DepartureRecord> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for route in routes {
        if route.code.is_empty() {
            continue;
        }
        let idx = *positions.entry(route.code.as_str()).or_insert_with(|| {
            records.push(DepartureRecord {
                code: route.code.clone(),
                name: route.name.clone(),
                served_airports: Vec::new(),
                effective: route.effective,
            });
            records.len() - 1
        });
        let record = &mut records[idx];
        if route.effective > record.effective {
            record.effective = route.effective;
        }
        for airport in &route.airports {
            if !record.served_airports.contains(airport) {
                record.served_airports.push(airport.clone());
            }
        }
    }
    records
}

/// The longest route applying to the origin, as `[origin] + points`. The
/// first one wins among equally long routes.
fn longest(routes: Option<&Vec<ProcedureRoute>>, origin: &str) -> Option<Vec<String>> {
    let best = routes?
        .iter()
        .filter(|route| !route.points.is_empty() && route.applies_to(origin))
        .fold(None::<&ProcedureRoute>, |best, route| match best {
            Some(best) if best.points.len() >= route.points.len() => Some(best),
            _ => Some(route),
        })?;
    let mut sequence = vec![origin.to_string()];
    sequence.extend(best.points.iter().cloned());
    Some(sequence)
}

fn serves(airports: &[String], origin: &str) -> bool {
    airport_equivalents(origin).iter().any(|a| airports.contains(a))
}

/// Split `LEFT.RIGHT`; anything with zero or several dots is not dotted.
fn split_dotted(token: &str) -> Option<(&str, &str)> {
    let (left, right) = token.split_once('.')?;
    (!right.contains('.')).then_some((left, right))
}

/// Letters of a procedure name: digits and `#` removed.
fn letters(name: &str) -> String {
    name.chars().filter(|c| !c.is_ascii_digit() && *c != '#').collect()
}

/// `BOOVE3.SPS` → `BOOVE#.SPS`
fn pattern(code: &str) -> Option<String> {
    let (left, right) = split_dotted(code)?;
    let root = letters(left);
    (!root.is_empty()).then(|| format!("{root}#.{right}"))
}

fn looks_like_fix(token: &str) -> bool {
    (3..=6).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/**
 * Arrival procedures from the STAR full-route table, indexed by transition
 * code and by STAR code.
 */
#[derive(Debug, Clone, Default)]
pub struct Arrivals {
    by_transition: HashMap<String, Vec<ProcedureRoute>>,
    by_code: HashMap<String, Vec<ProcedureRoute>>,
}

impl Arrivals {
    pub fn new(rows: Vec<FullRouteRow>) -> Self {
        let mut arrivals = Arrivals::default();
        for route in rows.into_iter().map(ProcedureRoute::from) {
            if route.points.is_empty() {
                continue;
            }
            if !route.transition_code.is_empty() {
                arrivals
                    .by_transition
                    .entry(route.transition_code.clone())
                    .or_default()
                    .push(route.clone());
            }
            if !route.code.is_empty() {
                arrivals.by_code.entry(route.code.clone()).or_default().push(route);
            }
        }
        tracing::info!(
            "Arrivals: {} STARs, {} transitions",
            arrivals.by_code.len(),
            arrivals.by_transition.len()
        );
        arrivals
    }

    /// The route a token stands for: routes to the destination are preferred,
    /// then the latest effective date wins (the last one loaded on ties).
    pub fn lookup(&self, token: &str, destination: Option<&str>) -> Option<&ProcedureRoute> {
        let candidates = self
            .by_transition
            .get(token)
            .into_iter()
            .chain(self.by_code.get(token))
            .flatten()
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return None;
        }
        let to_destination = candidates
            .iter()
            .copied()
            .filter(|route| destination.map_or(true, |d| route.applies_to(d)))
            .collect::<Vec<_>>();
        let pool = if to_destination.is_empty() {
            candidates
        } else {
            to_destination
        };
        pool.into_iter().max_by_key(|route| route.effective)
    }
}

impl ReferenceContext {
    /// The origin airport of a route: the first token naming an indexed
    /// point, facility centres and facility codes aside.
    pub(crate) fn route_origin(&self, tokens: &[RouteToken]) -> Option<String> {
        tokens.iter().find_map(|token| {
            let name = token
                .name
                .trim()
                .trim_start_matches(['>', '['])
                .trim_end_matches(['<', ']', ';']);
            let usable = !name.is_empty()
                && !self.is_facility_point(name)
                && !self.is_facility_code(name)
                && self.points.contains_key(name);
            usable.then(|| name.to_string())
        })
    }

    /// Replace departure procedure tokens by their point sequences.
    ///
    /// Only tokens containing a digit or `#` are considered. Tokens naming no
    /// known procedure pass through unchanged; an identified procedure with no
    /// usable sequence is reported.
    pub(crate) fn expand_departures(
        &self,
        tokens: Vec<RouteToken>,
        issues: &mut Vec<ResolutionIssue>,
    ) -> Vec<RouteToken> {
        let Some(departures) = &self.departures else {
            return tokens;
        };
        let Some(origin) = self.route_origin(&tokens) else {
            return tokens;
        };

        let mut expanded = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;
            if !token.name.contains(|c: char| c.is_ascii_digit() || c == '#') {
                expanded.push(token.clone());
                continue;
            }
            if departures.lookup(&token.name, &origin).is_none() {
                expanded.push(token.clone());
                continue;
            }

            let next = tokens.get(i).map(|t| t.name.as_str());
            match departures.expand(&token.name, next, &origin) {
                Some(expansion) => {
                    tracing::debug!(
                        "Departure {} ({}) from {}: {} points",
                        token.name,
                        expansion.record.code,
                        origin,
                        expansion.points.len()
                    );
                    expanded.extend(expansion.points.into_iter().map(|p| token.replaced_by(p)));
                    if expansion.consumes_next {
                        i += 1;
                    }
                }
                None => {
                    tracing::warn!("No route found for departure procedure '{}' from {}", token.name, origin);
                    issues.push(ResolutionIssue::UnknownProcedure {
                        token: token.name.clone(),
                    });
                    expanded.push(token.clone());
                }
            }
        }
        expanded
    }

    /// Replace arrival procedure and transition tokens by their route points.
    /// The destination is the last token of the route.
    pub(crate) fn expand_arrivals(&self, tokens: Vec<RouteToken>) -> Vec<RouteToken> {
        let Some(arrivals) = &self.arrivals else {
            return tokens;
        };
        let destination = tokens.iter().rev().map(|t| t.name.trim()).find(|n| !n.is_empty());

        let mut expanded = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match arrivals.lookup(&token.name, destination) {
                Some(route) => {
                    tracing::debug!(
                        "Arrival {} ({} {}): {} points",
                        token.name,
                        route.code,
                        route.transition_code,
                        route.points.len()
                    );
                    expanded.extend(route.points.iter().map(|p| token.replaced_by(p.clone())));
                }
                None => expanded.push(token.clone()),
            }
        }
        expanded
    }
}
