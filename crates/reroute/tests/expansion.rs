use std::path::{Path, PathBuf};

use reroute::data::context::{ExpansionConfig, ReferenceContext};
use reroute::data::expand::ExpandedRoute;
use reroute::data::point::PointKind;
use reroute::data::reference::ReferenceTables;
use reroute::data::segment::LineKind;
use reroute::error::ResolutionIssue;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

fn tables() -> ReferenceTables {
    ReferenceTables::from_directory(&data_dir()).unwrap()
}

fn context() -> ReferenceContext {
    ReferenceContext::build(tables(), ExpansionConfig::default())
}

fn names(route: &ExpandedRoute) -> Vec<&str> {
    route.waypoints.iter().map(|w| w.name.as_str()).collect()
}

fn kinds(route: &ExpandedRoute) -> Vec<(LineKind, usize)> {
    route.segments.iter().map(|s| (s.kind, s.coordinates.len())).collect()
}

#[test]
fn load_reference_directory() {
    let tables = tables();
    assert_eq!(tables.points.as_ref().map(Vec::len), Some(11));
    assert_eq!(tables.playbook.as_ref().map(Vec::len), Some(2));
    assert_eq!(tables.departure_full_routes.as_ref().map(Vec::len), Some(2));
    assert_eq!(tables.arrival_full_routes.as_ref().map(Vec::len), Some(1));
    // legacy departure tables are not part of the fixtures
    assert!(tables.departure_base.is_none());
    assert!(tables.departure_legs.is_none());

    let context = ReferenceContext::build(tables, ExpansionConfig::default());
    assert!(context.is_facility_code("ZFW"));
    assert_eq!(context.point_candidates("KDFW").len(), 1);
}

#[test]
fn malformed_tables_are_disabled() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["points.csv", "awys.csv"] {
        std::fs::copy(data_dir().join(name), dir.path().join(name)).unwrap();
    }
    std::fs::write(dir.path().join("playbook_routes.csv"), "name,description\nABI WEST,nothing\n").unwrap();
    std::fs::write(
        dir.path().join("star_full_routes.csv"),
        "STAR_COMPUTER_CODE,ROUTE_POINTS\nANJLL4.ANJLL,TNP ANJLL KLAX\n",
    )
    .unwrap();

    let tables = ReferenceTables::from_directory(dir.path()).unwrap();
    assert!(tables.playbook.is_none());
    assert!(tables.arrival_full_routes.is_none());
    assert!(tables.cdrs.is_none());
    assert_eq!(tables.points.as_ref().map(Vec::len), Some(11));
    assert_eq!(tables.airways.as_ref().map(Vec::len), Some(1));

    let context = ReferenceContext::build(tables, ExpansionConfig::default());
    let expansion = context.expand("PB.ABIWEST\nSPS J80 ELP");
    assert_eq!(
        expansion.issues,
        vec![ResolutionIssue::UnknownPlaybook {
            directive: "ABIWEST".to_string()
        }]
    );
    assert_eq!(names(&expansion.routes[0]), vec!["SPS", "ABI", "TXO", "ELP"]);
}

#[test]
fn points_table_is_required() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(data_dir().join("awys.csv"), dir.path().join("awys.csv")).unwrap();
    assert!(ReferenceTables::from_directory(dir.path()).is_err());
}

#[test]
fn procedures_and_airways() {
    let context = context();
    let route = context
        .expand_line("KDFW >BOOVE3 SPS J80 ELP< TNP.ANJLL4 KLAX;#00ff00")
        .unwrap();

    assert_eq!(route.color, "#00FF00");
    assert!(route.issues.is_empty(), "{:?}", route.issues);
    assert_eq!(
        names(&route),
        vec!["KDFW", "BOOVE", "SPS", "ABI", "TXO", "ELP", "TNP", "ANJLL", "KLAX"]
    );
    let solid = route.waypoints.iter().map(|w| w.solid).collect::<Vec<_>>();
    assert_eq!(solid, vec![false, true, true, true, true, true, false, false, false]);

    // departure points keep the procedure token, airway fixes have none
    assert_eq!(route.waypoints[1].source, Some(1));
    assert_eq!(route.waypoints[3].source, None);

    assert_eq!(
        kinds(&route),
        vec![
            (LineKind::Fan, 2),
            (LineKind::Solid, 5),
            (LineKind::Dashed, 3),
            (LineKind::Fan, 2)
        ]
    );
    assert_eq!(route.segments[0].weight, 1.5);
    assert_eq!(route.segments[2].dash_array, Some("8, 8"));
}

#[test]
fn playbook_directive() {
    let context = context();
    let expansion = context.expand(">PB.ABIWEST.DFW<;ORANGE");
    assert!(expansion.issues.is_empty());
    assert_eq!(expansion.routes.len(), 1);

    let route = &expansion.routes[0];
    assert_eq!(route.route, "KDFW >SPS J80 ELP< KLAX");
    assert_eq!(route.color, "ORANGE");
    assert_eq!(route.tokens, vec!["KDFW", "SPS", "ABI", "TXO", "ELP", "KLAX"]);
    assert_eq!(
        kinds(route),
        vec![(LineKind::Fan, 2), (LineKind::Solid, 4), (LineKind::Fan, 2)]
    );

    let lines = context.route_lines("PB.ABI_WEST..LAX");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].route, "KDAL SPS J80 TXO KLAX");
}

#[test]
fn unknown_play() {
    let context = context();
    let expansion = context.expand("PB.NOPE\nKDFW SPS");
    assert_eq!(expansion.routes.len(), 1);
    assert_eq!(
        expansion.issues,
        vec![ResolutionIssue::UnknownPlaybook {
            directive: "NOPE".to_string()
        }]
    );
}

#[test]
fn coded_departure_route() {
    let context = context();
    let route = context.expand_line("dfwlax1n").unwrap();
    // the departure sequence starts at the origin, which then collapses
    assert_eq!(
        route.tokens,
        vec!["KDFW", "KDFW", "BOOVE", "SPS", "ABI", "TXO", "ELP", "KLAX"]
    );
    assert_eq!(names(&route), vec!["KDFW", "BOOVE", "SPS", "ABI", "TXO", "ELP", "KLAX"]);
    assert_eq!(
        kinds(&route),
        vec![(LineKind::Fan, 2), (LineKind::Dashed, 5), (LineKind::Fan, 2)]
    );
}

#[test]
fn facilities_and_centroids() {
    let context = context();
    let route = context.expand_line("ZFW SPS ZLA").unwrap();
    assert!(route.issues.is_empty(), "{:?}", route.issues);
    assert_eq!(names(&route), vec!["ZZ_ZFW", "SPS", "ZLA"]);
    assert_eq!(route.waypoints[0].kind, PointKind::FacilityCenter);
    assert_eq!(route.waypoints[2].kind, PointKind::Centroid);
    assert!(route.waypoints[0].airport_like && route.waypoints[2].airport_like);
    assert_eq!(kinds(&route), vec![(LineKind::Fan, 2), (LineKind::Fan, 2)]);
}

#[test]
fn coordinate_shorthand() {
    let context = context();
    let route = context.expand_line("SPS 3300N10000W ELP").unwrap();
    assert_eq!(names(&route), vec!["SPS", "3300N10000W", "ELP"]);
    let shorthand = &route.waypoints[1];
    assert_eq!(shorthand.kind, PointKind::Shorthand);
    assert_eq!(shorthand.coordinates.latitude, 33.);
    assert_eq!(shorthand.coordinates.longitude, -100.);
}

#[test]
fn advisory_input() {
    let context = context();
    let advisory = "VATCSCC ADVZY 001 DCC 01/01/2025 ROUTE RQD\nROUTE:\nORIG DEST ROUTE\nDFW LAX >SPS J80 ELP<\nTMI ID: RRDCC001\n";
    let expansion = context.expand(advisory);
    assert_eq!(expansion.routes.len(), 1);
    let route = &expansion.routes[0];
    assert_eq!(route.route, "KDFW >SPS J80 ELP< KLAX");
    assert_eq!(route.tokens, vec!["KDFW", "SPS", "ABI", "TXO", "ELP", "KLAX"]);
}

#[test]
fn shared_segments_drawn_once() {
    let context = context();
    let expansion = context.expand("KDFW SPS ABI\nKDFW SPS ABI");
    assert_eq!(expansion.routes.len(), 2);
    assert_eq!(expansion.routes[0].segments.len(), 2);
    assert!(expansion.routes[1].segments.is_empty());
    assert_eq!(expansion.routes[1].waypoints.len(), 3);
}

#[test]
fn unresolved_points_are_skipped() {
    let context = context();
    let route = context.expand_line("KDFW SPS NOWHERE ABI").unwrap();
    assert_eq!(names(&route), vec!["KDFW", "SPS", "ABI"]);
    assert_eq!(
        route.issues,
        vec![ResolutionIssue::UnresolvedPoint {
            name: "NOWHERE".to_string()
        }]
    );
}

#[test]
fn distant_candidates_are_rejected() {
    let context = context();
    // ANJLL lies far beyond the neighbours of a Texas route
    let route = context.expand_line("KDFW SPS ANJLL ABI").unwrap();
    assert_eq!(names(&route), vec!["KDFW", "SPS", "ABI"]);
    assert_eq!(route.issues.len(), 1);
    assert!(matches!(
        &route.issues[0],
        ResolutionIssue::UnreliableCandidate { name, distance_km, limit_km }
            if name == "ANJLL" && distance_km > limit_km
    ));
}

#[test]
fn airway_between_adjacent_fixes() {
    let context = context();
    let route = context.expand_line("SPS J80 ABI").unwrap();
    assert_eq!(route.tokens, vec!["SPS", "J80", "ABI"]);
    assert_eq!(names(&route), vec!["SPS", "ABI"]);
    assert_eq!(
        route.issues,
        vec![ResolutionIssue::UnknownAirwayAdjacency {
            airway: "J80".to_string(),
            from: "SPS".to_string(),
            to: "ABI".to_string()
        }]
    );
}

#[test]
fn procedure_root_without_tables() {
    let tables = ReferenceTables {
        departure_full_routes: None,
        ..tables()
    };
    let context = ReferenceContext::build(tables, ExpansionConfig::default());
    let route = context.expand_line("KDFW BOOVE3 SPS").unwrap();
    assert_eq!(route.tokens, vec!["KDFW", "BOOVE3", "SPS"]);
    assert_eq!(names(&route), vec!["KDFW", "BOOVE", "SPS"]);
    assert!(route.issues.is_empty());
}

#[test]
fn configuration_file() {
    let config = ExpansionConfig::from_json_file(&data_dir().join("config.json")).unwrap();
    assert_eq!(config.default_color, "#0000FF");
    assert_eq!(config.base_weight, 4.);
    assert_eq!(config.facility_prefix, "ZZ_");

    let context = ReferenceContext::build(tables(), config);
    let route = context.expand_line("KDFW SPS ABI").unwrap();
    assert_eq!(route.color, "#0000FF");
    assert_eq!(route.segments[0].weight, 2.);
}
