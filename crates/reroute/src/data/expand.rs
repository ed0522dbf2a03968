//! The expansion pipeline.
//!
//! Each route line goes through the following stages:
//!
//! 1. coded departure routes are replaced by their full route;
//! 2. mandatory markers (`>` and `<`) are turned into a solid flag per token;
//! 3. departure and arrival procedures are expanded;
//! 4. airways are expanded;
//! 5. fixes inserted along airways inherit the flag of the tokens around them;
//! 6. every token is resolved to a position;
//! 7. waypoints are cut into styled segments.

use std::collections::HashSet;

use serde::Serialize;

use crate::data::context::ReferenceContext;
use crate::data::coordinates::Coordinates;
use crate::data::directive::{parse_directives, Directive, RouteSpecLine};
use crate::data::point::PointKind;
use crate::data::segment::{assemble_segments, RouteSegment};
use crate::error::ResolutionIssue;

/**
 * A route token on its way through the pipeline.
 *
 * `source` is the index of the input token it comes from: points expanded
 * from a procedure keep the index of the procedure token, fixes inserted along
 * an airway have none.
 */
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RouteToken {
    pub(crate) name: String,
    pub(crate) source: Option<usize>,
    pub(crate) solid: bool,
}

impl RouteToken {
    pub(crate) fn original(name: &str, idx: usize, solid: bool) -> Self {
        RouteToken {
            name: name.to_string(),
            source: Some(idx),
            solid,
        }
    }

    pub(crate) fn inserted(name: String) -> Self {
        RouteToken {
            name,
            source: None,
            solid: false,
        }
    }

    /// A token standing in place of this one.
    pub(crate) fn replaced_by(&self, name: String) -> Self {
        RouteToken {
            name,
            source: self.source,
            solid: self.solid,
        }
    }
}

/// A resolved point of an expanded route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedWaypoint {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub kind: PointKind,
    /// Index of the input token this waypoint comes from
    pub source: Option<usize>,
    /// Part of a mandatory portion of the route
    pub solid: bool,
    /// Airport or facility, drawn as a route endpoint
    pub airport_like: bool,
}

/**
 * Result of the expansion of one route line.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedRoute {
    /// Route line as written, markers included
    pub route: String,
    pub color: String,
    pub mandatory: bool,
    /// Tokens after procedure and airway expansion
    pub tokens: Vec<String>,
    pub waypoints: Vec<ExpandedWaypoint>,
    pub segments: Vec<RouteSegment>,
    pub issues: Vec<ResolutionIssue>,
}

/// Result of the expansion of a whole input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expansion {
    pub routes: Vec<ExpandedRoute>,
    /// Issues not tied to a route line, e.g. playbook directives matching
    /// nothing
    pub issues: Vec<ResolutionIssue>,
}

/// State shared by the lines of one expansion call.
#[derive(Debug, Default)]
struct Session {
    segment_keys: HashSet<String>,
    reported: HashSet<String>,
}

impl Session {
    /// Keep each issue the first time it is seen.
    fn report(&mut self, issues: Vec<ResolutionIssue>) -> Vec<ResolutionIssue> {
        issues
            .into_iter()
            .filter(|issue| self.reported.insert(issue_key(issue)))
            .collect()
    }
}

fn issue_key(issue: &ResolutionIssue) -> String {
    match issue {
        // the distance depends on the neighbours: one report per name
        ResolutionIssue::UnreliableCandidate { name, .. } => format!("unreliable {name}"),
        issue => issue.to_string(),
    }
}

impl ReferenceContext {
    /// Expand raw input: group headers, playbook directives, route lines or
    /// an advisory.
    ///
    /// Segments drawn identically by several lines are only kept on the first
    /// one, and each issue is reported once.
    pub fn expand(&self, input: &str) -> Expansion {
        let mut session = Session::default();
        let mut issues = Vec::new();
        let lines = self.collect_lines(input, &mut issues);
        let mut expansion = Expansion {
            routes: Vec::with_capacity(lines.len()),
            issues: session.report(issues),
        };
        tracing::debug!("{} route lines to expand", lines.len());

        for line in &lines {
            if let Some(route) = self.expand_spec(line, &mut session) {
                expansion.routes.push(route);
            }
        }
        expansion
    }

    /// Expand a single `ROUTE;COLOR` line.
    pub fn expand_line(&self, line: &str) -> Option<ExpandedRoute> {
        self.expand_spec(&RouteSpecLine::parse(line), &mut Session::default())
    }

    /// Route lines the input stands for, playbook directives expanded.
    pub fn route_lines(&self, input: &str) -> Vec<RouteSpecLine> {
        self.collect_lines(input, &mut Vec::new())
    }

    fn collect_lines(&self, input: &str, issues: &mut Vec<ResolutionIssue>) -> Vec<RouteSpecLine> {
        let mut lines = Vec::new();
        for directive in parse_directives(input) {
            match directive {
                Directive::Route(line) => lines.push(line),
                Directive::Playbook { body, mandatory, color } => {
                    let routes = self.expand_playbook(&body, mandatory, color.as_deref());
                    if routes.is_empty() {
                        tracing::warn!("No playbook routes matched for PB.{}", body);
                        issues.push(ResolutionIssue::UnknownPlaybook { directive: body });
                    }
                    lines.extend(routes.iter().map(|route| RouteSpecLine::parse(route)));
                }
            }
        }
        lines
    }

    /// Replace coded departure routes by their full route.
    ///
    /// A line made of a single code is replaced as a whole; in longer lines
    /// each code is spliced in place, its mandatory markers moved to the
    /// first and last inserted tokens.
    pub fn expand_cdrs(&self, route: &str) -> String {
        let tokens = route.split_whitespace().collect::<Vec<_>>();
        if let [single] = tokens.as_slice() {
            if let Some(full) = self.cdrs.get(&single.to_uppercase()) {
                tracing::debug!("CDR {} expanded", single);
                return full.clone();
            }
        }

        let mut expanded: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let opens = token.starts_with('>');
            let closes = token.ends_with('<');
            let code = token.trim_start_matches('>').trim_end_matches('<').to_uppercase();
            let Some(full) = self.cdrs.get(&code) else {
                expanded.push(token.to_uppercase());
                continue;
            };
            let mut inserted = full.split_whitespace().map(String::from).collect::<Vec<_>>();
            if opens {
                if let Some(first) = inserted.first_mut() {
                    first.insert(0, '>');
                }
            }
            if closes {
                if let Some(last) = inserted.last_mut() {
                    last.push('<');
                }
            }
            tracing::debug!("CDR {} expanded into {} tokens", code, inserted.len());
            expanded.extend(inserted);
        }
        expanded.join(" ")
    }

    fn expand_spec(&self, line: &RouteSpecLine, session: &mut Session) -> Option<ExpandedRoute> {
        let route = self.expand_cdrs(&line.route);
        let tokens = solid_mask(&route);
        if tokens.is_empty() {
            return None;
        }

        let mut issues = Vec::new();
        let tokens = self.expand_departures(tokens, &mut issues);
        let tokens = self.expand_arrivals(tokens);
        let mut tokens = self.expand_airways(tokens, &mut issues);
        inherit_solid(&mut tokens);

        let waypoints = self
            .resolve_route(&tokens, &mut issues)
            .into_iter()
            .map(|(idx, point)| ExpandedWaypoint {
                airport_like: self.is_airport_like(&point.name),
                name: point.name,
                coordinates: point.coordinates,
                kind: point.kind,
                source: tokens[idx].source,
                solid: tokens[idx].solid,
            })
            .collect::<Vec<_>>();

        let color = line.color.clone().unwrap_or_else(|| self.config.default_color.clone());
        let segments = assemble_segments(&waypoints, &color, self.config.base_weight)
            .into_iter()
            .filter(|segment| session.segment_keys.insert(segment.dedup_key()))
            .collect::<Vec<_>>();

        tracing::debug!(
            "{}: {} tokens, {} waypoints, {} segments",
            line.route,
            tokens.len(),
            waypoints.len(),
            segments.len()
        );

        Some(ExpandedRoute {
            route: line.route.clone(),
            color,
            mandatory: line.mandatory,
            tokens: tokens.into_iter().map(|t| t.name).collect(),
            waypoints,
            segments,
            issues: session.report(issues),
        })
    }
}

/// Strip mandatory markers, flagging each token as solid or not.
///
/// `>` opens a mandatory run and `<` closes it, both ends included. A token
/// carrying both markers is solid on its own.
fn solid_mask(route: &str) -> Vec<RouteToken> {
    let mut tokens = Vec::new();
    let mut inside = false;
    for raw in route.split_whitespace() {
        let opens = raw.contains('>');
        let closes = raw.contains('<');
        let solid = match (opens, closes) {
            (true, true) => true,
            (true, false) => {
                inside = true;
                true
            }
            (false, true) => {
                inside = false;
                true
            }
            (false, false) => inside,
        };
        let name = raw.replace(['>', '<'], "").to_uppercase();
        if !name.is_empty() {
            let idx = tokens.len();
            tokens.push(RouteToken::original(&name, idx, solid));
        }
    }
    tokens
}

/// Tokens with no origin take the flag of the tokens around them: solid when
/// both are (or the only one is), dashed at either end of a route made of
/// inserted tokens only.
fn inherit_solid(tokens: &mut [RouteToken]) {
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].source.is_some() {
            i += 1;
            continue;
        }
        let start = i;
        while i < tokens.len() && tokens[i].source.is_none() {
            i += 1;
        }
        let before = start.checked_sub(1).map(|b| tokens[b].solid);
        let after = tokens.get(i).map(|t| t.solid);
        let solid = match (before, after) {
            (Some(before), Some(after)) => before && after,
            (Some(bound), None) | (None, Some(bound)) => bound,
            (None, None) => false,
        };
        for token in &mut tokens[start..i] {
            token.solid = solid;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::context::ExpansionConfig;
    use crate::data::reference::{AirwayRow, CdrRow, PointRow, ReferenceTables};
    use crate::data::segment::LineKind;

    fn point(identifier: &str, latitude: f64, longitude: f64) -> PointRow {
        PointRow {
            identifier: identifier.to_string(),
            latitude,
            longitude,
        }
    }

    fn context() -> ReferenceContext {
        let tables = ReferenceTables {
            points: Some(vec![
                point("KDFW", 32.9, -97.04),
                point("SPS", 33.99, -98.49),
                point("ABI", 32.48, -99.86),
                point("TXO", 34.5, -102.8),
                point("ELP", 31.8, -106.28),
                point("KLAX", 33.94, -118.41),
            ]),
            airways: Some(vec![AirwayRow {
                identifier: "J80".to_string(),
                fixes: ["SPS", "ABI", "TXO", "ELP"].iter().map(|s| s.to_string()).collect(),
            }]),
            cdrs: Some(vec![CdrRow {
                code: "DFWLAX01".to_string(),
                route: "KDFW SPS J80 ELP KLAX".to_string(),
            }]),
            ..Default::default()
        };
        ReferenceContext::build(tables, ExpansionConfig::default())
    }

    fn flags(tokens: &[RouteToken]) -> Vec<(&str, bool)> {
        tokens.iter().map(|t| (t.name.as_str(), t.solid)).collect()
    }

    #[test]
    fn mandatory_markers() {
        let tokens = solid_mask("KDFW >SPS J80 ABI< KLAX >ELP<");
        assert_eq!(
            flags(&tokens),
            vec![
                ("KDFW", false),
                ("SPS", true),
                ("J80", true),
                ("ABI", true),
                ("KLAX", false),
                ("ELP", true)
            ]
        );
        let tokens = solid_mask("> KDFW SPS < KLAX");
        assert_eq!(flags(&tokens), vec![("KDFW", true), ("SPS", true), ("KLAX", false)]);
        assert_eq!(tokens[2].source, Some(2));
    }

    #[test]
    fn inserted_tokens_inherit() {
        let mut tokens = vec![
            RouteToken::inserted("A".to_string()),
            RouteToken::original("B", 0, true),
            RouteToken::inserted("C".to_string()),
            RouteToken::original("D", 1, false),
            RouteToken::inserted("E".to_string()),
            RouteToken::original("F", 2, true),
            RouteToken::original("G", 3, true),
            RouteToken::inserted("H".to_string()),
        ];
        // the leading run sees only B, the last one only G
        inherit_solid(&mut tokens);
        let solid = tokens.iter().map(|t| t.solid).collect::<Vec<_>>();
        assert_eq!(solid, vec![true, true, false, false, false, true, true, true]);

        let mut alone = vec![RouteToken::inserted("A".to_string())];
        inherit_solid(&mut alone);
        assert!(!alone[0].solid);
    }

    #[test]
    fn coded_departure_routes() {
        let context = context();
        assert_eq!(context.expand_cdrs("dfwlax01"), "KDFW SPS J80 ELP KLAX");
        assert_eq!(
            context.expand_cdrs(">DFWLAX01< KSAN"),
            ">KDFW SPS J80 ELP KLAX< KSAN"
        );
        assert_eq!(context.expand_cdrs("KDFW SPS"), "KDFW SPS");
    }

    #[test]
    fn mandatory_propagation() {
        let context = context();
        let route = context.expand_line(">KDFW SPS< ABI").unwrap();
        assert_eq!(route.segments.len(), 2);
        assert_eq!(route.segments[0].kind, LineKind::Fan);
        assert_eq!(route.segments[1].kind, LineKind::Dashed);

        let route = context.expand_line(">SPS ABI< TXO").unwrap();
        let kinds = route.segments.iter().map(|s| (s.kind, s.coordinates.len())).collect::<Vec<_>>();
        assert_eq!(kinds, vec![(LineKind::Solid, 2), (LineKind::Dashed, 2)]);

        // airway fixes inserted inside a mandatory run stay solid
        let route = context.expand_line("KDFW >SPS J80 ELP< KLAX;#00ff00").unwrap();
        assert_eq!(route.tokens, vec!["KDFW", "SPS", "ABI", "TXO", "ELP", "KLAX"]);
        assert_eq!(route.color, "#00FF00");
        let solid = route.waypoints.iter().map(|w| w.solid).collect::<Vec<_>>();
        assert_eq!(solid, vec![false, true, true, true, true, false]);
        assert_eq!(route.waypoints[2].source, None);
        let kinds = route.segments.iter().map(|s| s.kind).collect::<Vec<_>>();
        assert_eq!(kinds, vec![LineKind::Fan, LineKind::Solid, LineKind::Fan]);
        assert_eq!(route.segments[1].coordinates.len(), 4);
    }

    #[test]
    fn graceful_degradation() {
        let context = context();
        let route = context.expand_line("KDFW SPS NOWHERE ABI").unwrap();
        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(
            route.issues,
            vec![ResolutionIssue::UnresolvedPoint {
                name: "NOWHERE".to_string()
            }]
        );
        assert!(context.expand_line("  ").is_none());
        assert!(context.expand_line("><").is_none());
    }

    #[test]
    fn shared_segments_and_issues() {
        let context = context();
        let expansion = context.expand("KDFW SPS ABI NOWHERE\nKDFW SPS ABI NOWHERE TXO\nPB.NOPE");
        assert_eq!(expansion.routes.len(), 2);
        assert_eq!(
            expansion.issues,
            vec![ResolutionIssue::UnknownPlaybook {
                directive: "NOPE".to_string()
            }]
        );
        let first = &expansion.routes[0];
        let second = &expansion.routes[1];
        assert_eq!(first.color, "#C70039");
        assert_eq!(first.issues.len(), 1);
        assert!(second.issues.is_empty());
        // the KDFW fan is already drawn by the first line
        assert_eq!(first.segments.len(), 2);
        assert_eq!(second.segments.len(), 1);
        assert_eq!(second.segments[0].coordinates.len(), 3);
    }

    #[test]
    fn idempotent() {
        let context = context();
        let input = ">[WEST]<;BLUE\nKDFW SPS J80 ELP KLAX\n\nDFWLAX01";
        assert_eq!(context.expand(input), context.expand(input));
        assert_eq!(context.route_lines(input).len(), 2);
    }
}
