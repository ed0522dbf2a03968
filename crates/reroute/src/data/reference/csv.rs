//! CSV readers for the reference tables.
//!
//! Headerless tables (points, airways, CDRs, facility centroids) are read by
//! position. The other tables are located by header name, case-insensitive;
//! a table missing a required column is rejected with
//! [`ReferenceError::MissingColumns`].

use std::io::Read;

use ::csv::{ReaderBuilder, StringRecord, Trim};

use super::{
    parse_effective_date, AirwayRow, CdrRow, DepartureBaseRow, DepartureLegRow, FullRouteRow, PlaybookRow, PointRow,
    RoutePortion,
};
use crate::data::split_tokens;
use crate::error::ReferenceError;

fn reader<R: Read>(rdr: R, has_headers: bool) -> ::csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(rdr)
}

fn field(record: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|s| s.trim().trim_matches('"').trim().to_uppercase())
        .unwrap_or_default()
}

/// Column lookup over a header row.
struct Columns {
    names: Vec<String>,
}

impl Columns {
    fn new(header: &StringRecord) -> Self {
        Columns {
            names: header
                .iter()
                .map(|h| h.trim().trim_matches('"').trim().to_uppercase())
                .collect(),
        }
    }

    /// Index of the first of `aliases` present in the header.
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.names.iter().position(|n| n.eq_ignore_ascii_case(alias)))
    }

    fn require(&self, dataset: &'static str, wanted: &[&'static str]) -> Result<Vec<usize>, ReferenceError> {
        let found = wanted.iter().map(|w| self.find(&[w])).collect::<Vec<_>>();
        let missing = wanted
            .iter()
            .zip(&found)
            .filter(|(_, idx)| idx.is_none())
            .map(|(w, _)| *w)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ReferenceError::MissingColumns {
                dataset,
                columns: missing,
            });
        }
        Ok(found.into_iter().flatten().collect())
    }
}

/// Read `ID,LAT,LON` rows. Also used for facility centroids.
pub fn read_points<R: Read>(rdr: R) -> Result<Vec<PointRow>, ReferenceError> {
    let mut points = Vec::new();
    for record in reader(rdr, false).records() {
        let record = record?;
        if record.len() < 3 {
            continue;
        }
        let identifier = field(&record, Some(0));
        if identifier.is_empty() {
            continue;
        }
        match (record[1].trim().parse::<f64>(), record[2].trim().parse::<f64>()) {
            (Ok(latitude), Ok(longitude)) if latitude.is_finite() && longitude.is_finite() => points.push(PointRow {
                identifier,
                latitude,
                longitude,
            }),
            _ => tracing::debug!("Skipping point '{}' with invalid coordinates", identifier),
        }
    }
    Ok(points)
}

/// Read `ID,FIX FIX ...` rows.
pub fn read_airways<R: Read>(rdr: R) -> Result<Vec<AirwayRow>, ReferenceError> {
    let mut airways = Vec::new();
    for record in reader(rdr, false).records() {
        let record = record?;
        let identifier = field(&record, Some(0));
        let fixes = split_tokens(&field(&record, Some(1)));
        if identifier.is_empty() || fixes.is_empty() {
            continue;
        }
        airways.push(AirwayRow { identifier, fixes });
    }
    Ok(airways)
}

/// Read `CODE,ROUTE` rows.
pub fn read_cdrs<R: Read>(rdr: R) -> Result<Vec<CdrRow>, ReferenceError> {
    let mut cdrs = Vec::new();
    for record in reader(rdr, false).records() {
        let record = record?;
        let code = field(&record, Some(0));
        // routes are not expected to contain commas, but keep them if they do
        let route = record.iter().skip(1).collect::<Vec<_>>().join(",").trim().to_uppercase();
        if code.is_empty() || route.is_empty() {
            continue;
        }
        cdrs.push(CdrRow { code, route });
    }
    Ok(cdrs)
}

/// Read the playbook table.
///
/// Required columns are the play name and the route string; endpoint columns
/// are optional and accept several historical header names.
pub fn read_playbook<R: Read>(rdr: R) -> Result<Vec<PlaybookRow>, ReferenceError> {
    let mut rdr = reader(rdr, true);
    let columns = Columns::new(rdr.headers()?);

    let play = columns.find(&["play_name", "play"]);
    let route = columns.find(&["full_route", "route string", "route", "route_string"]);
    let (Some(play), Some(route)) = (play, route) else {
        let mut missing = vec![];
        if play.is_none() {
            missing.push("play_name");
        }
        if route.is_none() {
            missing.push("full_route");
        }
        return Err(ReferenceError::MissingColumns {
            dataset: "playbook",
            columns: missing,
        });
    };

    let origin_airports = columns.find(&["origins", "origin", "origin_airports", "origin_bases"]);
    let origin_tracons = columns.find(&["origin_tracons", "origin_tracon"]);
    let origin_artccs = columns.find(&["origin_artccs", "origin_artcc"]);
    let dest_airports = columns.find(&["destinations", "dest", "dest_airports", "dest_bases"]);
    let dest_tracons = columns.find(&["dest_tracons", "dest_tracon"]);
    let dest_artccs = columns.find(&["dest_artccs", "dest_artcc"]);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let play_name = record.get(play).map(str::trim).unwrap_or_default().to_string();
        let route_string = field(&record, Some(route));
        if play_name.is_empty() || route_string.is_empty() || play_name.eq_ignore_ascii_case("nan") {
            continue;
        }
        rows.push(PlaybookRow {
            play: play_name,
            route: route_string,
            origin_airports: split_tokens(&field(&record, origin_airports)),
            origin_tracons: split_tokens(&field(&record, origin_tracons)),
            origin_artccs: split_tokens(&field(&record, origin_artccs)),
            dest_airports: split_tokens(&field(&record, dest_airports)),
            dest_tracons: split_tokens(&field(&record, dest_tracons)),
            dest_artccs: split_tokens(&field(&record, dest_artccs)),
        });
    }
    Ok(rows)
}

fn read_full_routes<R: Read>(
    rdr: R,
    dataset: &'static str,
    code_column: &'static str,
    group_column: &'static str,
    name_column: &'static str,
) -> Result<Vec<FullRouteRow>, ReferenceError> {
    let mut rdr = reader(rdr, true);
    let columns = Columns::new(rdr.headers()?);
    let required = columns.require(
        dataset,
        &[code_column, group_column, "TRANSITION_COMPUTER_CODE", "ROUTE_POINTS"],
    )?;
    let (code, group, transition, points) = (required[0], required[1], required[2], required[3]);
    let effective = columns.find(&["EFF_DATE"]);
    let name = columns.find(&[name_column]);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = FullRouteRow {
            effective: effective
                .and_then(|i| record.get(i))
                .and_then(parse_effective_date),
            name: field(&record, name),
            code: field(&record, Some(code)),
            endpoint_group: field(&record, Some(group)),
            transition_code: field(&record, Some(transition)),
            points: split_tokens(&field(&record, Some(points))),
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Read the departure full-route table (`dp_full_routes.csv`).
pub fn read_departure_full_routes<R: Read>(rdr: R) -> Result<Vec<FullRouteRow>, ReferenceError> {
    let rows = read_full_routes(rdr, "departure full routes", "DP_COMPUTER_CODE", "ORIG_GROUP", "DP_NAME")?;
    Ok(rows
        .into_iter()
        .filter(|r| !r.code.is_empty() && !r.endpoint_group.is_empty())
        .collect())
}

/// Read the arrival full-route table (`star_full_routes.csv`).
pub fn read_arrival_full_routes<R: Read>(rdr: R) -> Result<Vec<FullRouteRow>, ReferenceError> {
    let rows = read_full_routes(
        rdr,
        "arrival full routes",
        "STAR_COMPUTER_CODE",
        "DEST_GROUP",
        "ARRIVAL_NAME",
    )?;
    Ok(rows
        .into_iter()
        .filter(|r| !r.transition_code.is_empty() && !r.points.is_empty())
        .collect())
}

/// Read the legacy departure base table (`DP_BASE.csv`).
pub fn read_departure_base<R: Read>(rdr: R) -> Result<Vec<DepartureBaseRow>, ReferenceError> {
    let mut rdr = reader(rdr, true);
    let columns = Columns::new(rdr.headers()?);
    let required = columns.require("departure base", &["DP_COMPUTER_CODE", "SERVED_ARPT"])?;
    let effective = columns.find(&["EFF_DATE"]);
    let name = columns.find(&["DP_NAME"]);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let code = field(&record, Some(required[0]));
        if code.is_empty() {
            continue;
        }
        rows.push(DepartureBaseRow {
            effective: effective
                .and_then(|i| record.get(i))
                .and_then(parse_effective_date),
            name: field(&record, name),
            code,
            served_airports: split_tokens(&field(&record, Some(required[1]))),
        });
    }
    Ok(rows)
}

/// Read the legacy departure leg table (`DP_RTE.csv`).
pub fn read_departure_legs<R: Read>(rdr: R) -> Result<Vec<DepartureLegRow>, ReferenceError> {
    let mut rdr = reader(rdr, true);
    let columns = Columns::new(rdr.headers()?);
    let required = columns.require(
        "departure legs",
        &["DP_COMPUTER_CODE", "ROUTE_PORTION_TYPE", "POINT_SEQ", "POINT"],
    )?;
    let airport_runway = columns.find(&["ARPT_RWY_ASSOC"]);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let code = field(&record, Some(required[0]));
        let point = field(&record, Some(required[3]));
        let portion = match field(&record, Some(required[1])).as_str() {
            "BODY" => RoutePortion::Body,
            "TRANSITION" => RoutePortion::Transition,
            _ => continue,
        };
        let Ok(sequence) = field(&record, Some(required[2])).parse::<i64>() else {
            continue;
        };
        if code.is_empty() || point.is_empty() {
            continue;
        }
        rows.push(DepartureLegRow {
            code,
            portion,
            sequence,
            point,
            airport_runway: field(&record, airport_runway),
        });
    }
    Ok(rows)
}
