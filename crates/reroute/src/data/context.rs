//! The reference context: every index the expansion pipeline queries.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::airway::Airway;
use crate::data::coordinates::Coordinates;
use crate::data::playbook::{normalize_play_name, PlaybookRoute};
use crate::data::procedure::{Arrivals, Departures};
use crate::data::reference::{PointRow, ReferenceTables};
use crate::error::ReferenceError;

/**
 * Tunable constants of the expansion engine.
 *
 * Every field has a default, so a configuration file only needs to list the
 * values it overrides.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Upper bound on the distance between a point and its neighbours (km)
    pub max_leg_km: f64,
    /// With both neighbours known, the bound shrinks to this ratio of the
    /// distance between them
    pub neighbor_ratio: f64,
    /// Identifier prefix of facility centre pseudo-points
    pub facility_prefix: String,
    /// Color of lines without an explicit color
    pub default_color: String,
    /// Line weight of route segments; fan connectors use half of it
    pub base_weight: f64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        ExpansionConfig {
            max_leg_km: 4000.,
            neighbor_ratio: 1.5,
            facility_prefix: "ZZ_".to_string(),
            default_color: "#C70039".to_string(),
            base_weight: 3.,
        }
    }
}

impl ExpansionConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ReferenceError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/**
 * Immutable indices built once from the reference tables.
 *
 * The context is shared by every expansion call; it is `Send + Sync` and can
 * be wrapped in an `Arc`. Reloading reference data means building a new one.
 */
#[derive(Debug)]
pub struct ReferenceContext {
    pub(crate) config: ExpansionConfig,
    /// Candidate positions per identifier, in load order
    pub(crate) points: HashMap<String, Vec<Coordinates>>,
    /// Bare codes of facilities with a centre pseudo-point (`ZZ_ZMP` → `ZMP`)
    pub(crate) facility_codes: HashSet<String>,
    /// Facility centroids, last resort for facility codes
    pub(crate) centroids: HashMap<String, Coordinates>,
    pub(crate) airways: HashMap<String, Airway>,
    pub(crate) cdrs: HashMap<String, String>,
    /// Playbook routes by normalized play name
    pub(crate) playbook: HashMap<String, Vec<PlaybookRoute>>,
    pub(crate) departures: Option<Departures>,
    pub(crate) arrivals: Option<Arrivals>,
}

impl ReferenceContext {
    /// Build every index from the reference tables.
    ///
    /// A dataset set to `None` is disabled: the lookups depending on it
    /// return no match for the whole session.
    pub fn build(tables: ReferenceTables, config: ExpansionConfig) -> Self {
        let ReferenceTables {
            points,
            facility_centroids,
            airways,
            cdrs,
            playbook,
            departure_full_routes,
            departure_base,
            departure_legs,
            arrival_full_routes,
        } = tables;

        let (points, facility_codes) = index_points(enabled("points", points), &config.facility_prefix);

        let mut centroids = HashMap::new();
        for row in enabled("facility centroids", facility_centroids) {
            if !row.is_finite() {
                tracing::debug!("Skipping centroid '{}' with invalid coordinates", row.identifier);
                continue;
            }
            centroids
                .entry(row.identifier.to_uppercase())
                .or_insert(Coordinates::new(row.latitude, row.longitude));
        }

        let airways = enabled("airways", airways)
            .into_iter()
            .map(|row| (row.identifier.to_uppercase(), Airway::new(row.fixes)))
            .collect::<HashMap<_, _>>();

        let cdrs = enabled("coded departure routes", cdrs)
            .into_iter()
            .map(|row| (row.code.trim().to_uppercase(), row.route.trim().to_uppercase()))
            .collect::<HashMap<_, _>>();

        let mut plays: HashMap<String, Vec<PlaybookRoute>> = HashMap::new();
        for row in enabled("playbook", playbook) {
            plays
                .entry(normalize_play_name(&row.play))
                .or_default()
                .push(PlaybookRoute::from(row));
        }

        let departures = Departures::build(departure_full_routes, departure_base, departure_legs);
        if departures.is_none() {
            tracing::warn!("No departure procedure table available, departure expansion disabled");
        }
        let arrivals = arrival_full_routes.map(Arrivals::new);
        if arrivals.is_none() {
            tracing::warn!("No arrival procedure table available, arrival expansion disabled");
        }

        tracing::info!(
            "Reference context ready: {} points, {} facilities, {} airways, {} CDRs, {} plays",
            points.len(),
            facility_codes.len(),
            airways.len(),
            cdrs.len(),
            plays.len()
        );

        ReferenceContext {
            config,
            points,
            facility_codes,
            centroids,
            airways,
            cdrs,
            playbook: plays,
            departures,
            arrivals,
        }
    }

    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// All indexed positions for an identifier, in load order.
    pub fn point_candidates(&self, name: &str) -> &[Coordinates] {
        self.points.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the code names a facility with a centre pseudo-point.
    pub fn is_facility_code(&self, code: &str) -> bool {
        self.facility_codes.contains(code)
    }

    pub(crate) fn is_facility_point(&self, name: &str) -> bool {
        name.starts_with(&self.config.facility_prefix)
    }

    pub(crate) fn facility_key(&self, code: &str) -> String {
        format!("{}{}", self.config.facility_prefix, code)
    }

    /// Airports, facility centres and facility centroids are drawn as route
    /// endpoints rather than fixes.
    pub fn is_airport_like(&self, identifier: &str) -> bool {
        self.is_facility_point(identifier)
            || identifier.chars().count() == 4
            || self.centroids.contains_key(identifier)
    }
}

fn enabled<T>(dataset: &str, rows: Option<Vec<T>>) -> Vec<T> {
    rows.unwrap_or_else(|| {
        tracing::warn!("Dataset '{}' unavailable, dependent lookups disabled", dataset);
        Vec::new()
    })
}

fn index_points(rows: Vec<PointRow>, prefix: &str) -> (HashMap<String, Vec<Coordinates>>, HashSet<String>) {
    let mut points: HashMap<String, Vec<Coordinates>> = HashMap::new();
    let mut facility_codes = HashSet::new();
    for row in rows {
        let identifier = row.identifier.trim().to_uppercase();
        if identifier.is_empty() || !row.is_finite() {
            continue;
        }
        if let Some(code) = identifier.strip_prefix(prefix) {
            if !code.is_empty() {
                facility_codes.insert(code.to_string());
            }
        }
        points
            .entry(identifier)
            .or_default()
            .push(Coordinates::new(row.latitude, row.longitude));
    }
    (points, facility_codes)
}
