//! Playbook plays: named, pre-coordinated reroutes.
//!
//! A directive `PB.PLAY[.ORIGINS][.DESTS]` selects the routes of a play,
//! optionally filtered by origin and destination. Endpoints are matched
//! against the airports, TRACONs and ARTCCs listed for each route.

use serde::Serialize;

use crate::data::context::ReferenceContext;
use crate::data::reference::PlaybookRow;

/// Play names are compared upper-cased, without spaces, dashes or underscores.
pub fn normalize_play_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Normalize an endpoint token for airport matching only: `BWI` becomes
/// `KBWI`, but ARTCCs (`ZDC`) and TRACONs (`N90`) are left alone.
pub fn normalize_airport_endpoint(token: &str) -> String {
    let token = token.trim().to_uppercase();
    let bytes = token.as_bytes();
    let is_three_letters = bytes.len() == 3 && bytes.iter().all(u8::is_ascii_alphabetic);
    if is_three_letters && bytes[0] != b'Z' {
        format!("K{token}")
    } else {
        token
    }
}

/// Airports, TRACONs and ARTCCs at one end of a playbook route.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Endpoints {
    pub airports: Vec<String>,
    pub tracons: Vec<String>,
    pub artccs: Vec<String>,
}

impl Endpoints {
    /// Whether any of the tokens designates this end of the route.
    fn matches(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|token| {
            self.airports.contains(&normalize_airport_endpoint(token))
                || self.tracons.contains(token)
                || self.artccs.contains(token)
        })
    }
}

/**
 * One route of a play.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybookRoute {
    /// Play name as written in the table
    pub play: String,
    /// Route string, upper-cased
    pub route: String,
    pub origins: Endpoints,
    pub destinations: Endpoints,
}

impl From<PlaybookRow> for PlaybookRoute {
    fn from(row: PlaybookRow) -> Self {
        let upper = |v: Vec<String>| v.into_iter().map(|s| s.to_uppercase()).collect::<Vec<_>>();
        PlaybookRoute {
            play: row.play,
            route: row.route.to_uppercase(),
            origins: Endpoints {
                airports: upper(row.origin_airports),
                tracons: upper(row.origin_tracons),
                artccs: upper(row.origin_artccs),
            },
            destinations: Endpoints {
                airports: upper(row.dest_airports),
                tracons: upper(row.dest_tracons),
                artccs: upper(row.dest_artccs),
            },
        }
    }
}

impl PlaybookRoute {
    /// Route string with its interior marked mandatory: `>` on the second
    /// token and `<` on the second to last one, so that the endpoints stay
    /// dashed. Short routes are wrapped as a whole.
    fn mandatory_route(&self) -> String {
        let mut tokens = self.route.split_whitespace().map(String::from).collect::<Vec<_>>();
        if tokens.len() <= 2 {
            return format!(">{}<", tokens.join(" "));
        }
        let last = tokens.len() - 2;
        tokens[1].insert(0, '>');
        tokens[last].push('<');
        tokens.join(" ")
    }
}

impl ReferenceContext {
    /// Expand a playbook directive body (everything after `PB.`) into route
    /// strings.
    ///
    /// - `PLAY`: every route of the play
    /// - `PLAY.KDFW KDAL`: routes from any of these origins
    /// - `PLAY..KLAX`: routes to that destination
    /// - `PLAY.ZFW.ZLA`: origin and destination filters together
    ///
    /// Each route is rendered as `ROUTE;COLOR` when a color is given. An
    /// unknown play, or filters excluding every route, yield nothing.
    pub fn expand_playbook(&self, body: &str, mandatory: bool, color: Option<&str>) -> Vec<String> {
        let body = body.trim().to_uppercase();
        let mut parts = body.split('.');
        let play = normalize_play_name(parts.next().unwrap_or_default());
        if play.is_empty() {
            return Vec::new();
        }
        let origins = parts.next().map(crate::data::split_tokens).unwrap_or_default();
        let destinations = parts.next().map(crate::data::split_tokens).unwrap_or_default();

        let Some(routes) = self.playbook.get(&play) else {
            tracing::warn!("Unknown play '{}'", play);
            return Vec::new();
        };

        let expanded = routes
            .iter()
            .filter(|pr| origins.is_empty() || pr.origins.matches(&origins))
            .filter(|pr| destinations.is_empty() || pr.destinations.matches(&destinations))
            .map(|pr| {
                let route = if mandatory {
                    pr.mandatory_route()
                } else {
                    pr.route.clone()
                };
                match color {
                    Some(color) => format!("{route};{color}"),
                    None => route,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!("PB.{} expanded into {} routes", body, expanded.len());
        expanded
    }
}
