//! Reference table rows.
//!
//! Rows are already tokenized: identifiers are trimmed and upper-cased, route
//! strings are split into points. The [`csv`] module reads them from the usual
//! CSV exports, but any loader producing these rows can feed a
//! [`ReferenceContext`](crate::data::context::ReferenceContext).

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReferenceError;

pub mod csv;

/// A named point (fix, navaid, airport or facility centre) with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    pub identifier: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl PointRow {
    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// An airway as an ordered list of fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirwayRow {
    pub identifier: String,
    pub fixes: Vec<String>,
}

/// A coded departure route: a short code standing for a full route string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdrRow {
    pub code: String,
    pub route: String,
}

/// One route of a playbook play, with the endpoints used for filtering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybookRow {
    pub play: String,
    pub route: String,
    pub origin_airports: Vec<String>,
    pub origin_tracons: Vec<String>,
    pub origin_artccs: Vec<String>,
    pub dest_airports: Vec<String>,
    pub dest_tracons: Vec<String>,
    pub dest_artccs: Vec<String>,
}

/// A departure procedure from the legacy base table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureBaseRow {
    pub effective: Option<NaiveDate>,
    pub name: String,
    /// Computer code, e.g. `BOOVE3.BOOVE`
    pub code: String,
    pub served_airports: Vec<String>,
}

/// The part of a departure procedure a leg belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutePortion {
    Body,
    Transition,
}

/// One point of a departure procedure from the legacy leg table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureLegRow {
    /// Procedure code for body rows, transition code for transition rows
    pub code: String,
    pub portion: RoutePortion,
    pub sequence: i64,
    pub point: String,
    /// Airport/runway association, e.g. `KDFW/17C KDFW/18R`
    pub airport_runway: String,
}

/// A complete procedure route, from the departure or arrival full-route table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullRouteRow {
    pub effective: Option<NaiveDate>,
    pub name: String,
    /// Procedure computer code
    pub code: String,
    /// Origin group for departures, destination group for arrivals
    /// (e.g. `KDFW/17C KDAL`)
    pub endpoint_group: String,
    pub transition_code: String,
    pub points: Vec<String>,
}

/// Every dataset the reference context is built from.
///
/// `None` marks a dataset that is unavailable for the session: lookups
/// depending on it return no match.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub points: Option<Vec<PointRow>>,
    pub facility_centroids: Option<Vec<PointRow>>,
    pub airways: Option<Vec<AirwayRow>>,
    pub cdrs: Option<Vec<CdrRow>>,
    pub playbook: Option<Vec<PlaybookRow>>,
    pub departure_full_routes: Option<Vec<FullRouteRow>>,
    pub departure_base: Option<Vec<DepartureBaseRow>>,
    pub departure_legs: Option<Vec<DepartureLegRow>>,
    pub arrival_full_routes: Option<Vec<FullRouteRow>>,
}

impl ReferenceTables {
    /// Load every table found in the specified directory.
    ///
    /// `points.csv` is required; every other table is optional and disabled
    /// when missing or malformed.
    pub fn from_directory(path: &Path) -> Result<Self, ReferenceError> {
        let points = csv::read_points(std::fs::File::open(path.join("points.csv"))?)?;
        Ok(ReferenceTables {
            points: Some(points),
            facility_centroids: optional(path, "facility_centers.csv", csv::read_points),
            airways: optional(path, "awys.csv", csv::read_airways),
            cdrs: optional(path, "cdrs.csv", csv::read_cdrs),
            playbook: optional(path, "playbook_routes.csv", csv::read_playbook),
            departure_full_routes: optional(path, "dp_full_routes.csv", csv::read_departure_full_routes),
            departure_base: optional(path, "DP_BASE.csv", csv::read_departure_base),
            departure_legs: optional(path, "DP_RTE.csv", csv::read_departure_legs),
            arrival_full_routes: optional(path, "star_full_routes.csv", csv::read_arrival_full_routes),
        })
    }
}

fn optional<T>(
    path: &Path,
    name: &str,
    read: fn(std::fs::File) -> Result<Vec<T>, ReferenceError>,
) -> Option<Vec<T>> {
    let file = path.join(name);
    if !file.exists() {
        tracing::info!("{} not found, dataset disabled", file.display());
        return None;
    }
    match std::fs::File::open(&file)
        .map_err(ReferenceError::from)
        .and_then(read)
    {
        Ok(rows) => {
            tracing::info!("Loaded {} rows from {}", rows.len(), file.display());
            Some(rows)
        }
        Err(e) => {
            tracing::warn!("{}: {}; dataset disabled", file.display(), e);
            None
        }
    }
}

/// Parse an effective date as found in the procedure tables.
///
/// Accepted formats are `YYYY-MM-DD`, `MM/DD/YYYY` and `YYYYMMDD`.
pub fn parse_effective_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim().trim_matches('"');
    ["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 10, 2);
        assert_eq!(parse_effective_date("2025-10-02"), expected);
        assert_eq!(parse_effective_date("10/02/2025"), expected);
        assert_eq!(parse_effective_date("\"20251002\""), expected);
        assert_eq!(parse_effective_date(""), None);
        assert_eq!(parse_effective_date("soon"), None);
    }

    #[test]
    fn undated_rows_sort_first() {
        assert!(None < parse_effective_date("2020-01-01"));
    }
}
