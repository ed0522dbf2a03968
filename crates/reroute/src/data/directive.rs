//! Parsing of raw route input into directives.
//!
//! Input is line oriented. A line is either a route, a playbook directive
//! (`PB.PLAY.ORIGINS.DESTS`), or a group header setting defaults for the
//! following lines:
//!
//! ```text
//! >[WEST FLOWS]<;#00FF00
//! KDFW BOOVE3 J80 SPS KLAX
//! PB.ABI.KDFW.KLAX
//!
//! KDFW >SPS J80 ABI< KLAX;RED
//! ```
//!
//! Inputs carrying an advisory (`VATCSCC ADVZY`) are handed to the advisory
//! extractor instead.

use serde::Serialize;

use crate::data::advisory::{extract_advisory_routes, is_advisory};

/**
 * A route line ready for expansion.
 *
 * `route` keeps its mandatory markers (`>` and `<`); `mandatory` tells
 * whether the whole line was wrapped.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSpecLine {
    pub route: String,
    pub color: Option<String>,
    pub mandatory: bool,
}

impl RouteSpecLine {
    /// Parse a `ROUTE;COLOR` string. Whitespace is normalized and everything
    /// is upper-cased.
    pub fn parse(line: &str) -> Self {
        let (route, color) = split_color(line);
        let route = route.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let mandatory = route.len() > 1 && route.starts_with('>') && route.ends_with('<');
        RouteSpecLine { route, color, mandatory }
    }
}

impl std::fmt::Display for RouteSpecLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.color {
            Some(color) => write!(f, "{};{}", self.route, color),
            None => write!(f, "{}", self.route),
        }
    }
}

/// One unit of work produced by the directive parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    /// A literal route line
    Route(RouteSpecLine),
    /// A playbook directive; `body` is everything after `PB.`
    Playbook {
        body: String,
        mandatory: bool,
        color: Option<String>,
    },
}

/// Defaults set by a group header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Group {
    color: Option<String>,
    mandatory: bool,
}

/// Split raw input into directives.
///
/// Nothing here fails: lines that make no sense are passed on as routes and
/// dealt with (or reported) during expansion.
pub fn parse_directives(input: &str) -> Vec<Directive> {
    if is_advisory(input) {
        return extract_advisory_routes(input)
            .iter()
            .map(|line| Directive::Route(RouteSpecLine::parse(line)))
            .collect();
    }

    let mut directives = Vec::new();
    let mut group = Group::default();

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // a blank line closes the current group
            group = Group::default();
            continue;
        }
        if let Some(header) = parse_header(trimmed) {
            group = header;
            continue;
        }
        if let Some(directive) = parse_line(trimmed, &group) {
            directives.push(directive);
        }
    }
    directives
}

fn split_color(line: &str) -> (&str, Option<String>) {
    match line.split_once(';') {
        Some((body, color)) => {
            let color = color.trim();
            (body.trim(), (!color.is_empty()).then(|| color.to_uppercase()))
        }
        None => (line.trim(), None),
    }
}

fn unwrap_mandatory(body: &str) -> Option<&str> {
    body.strip_prefix('>')?.strip_suffix('<').map(str::trim)
}

fn parse_line(line: &str, group: &Group) -> Option<Directive> {
    let (body, color) = split_color(line);
    let color = color.or_else(|| group.color.clone());

    let (spec, mandatory) = match unwrap_mandatory(body) {
        Some(inner) => (inner, true),
        None => (body, group.mandatory),
    };
    let spec = spec.to_uppercase();
    if spec.is_empty() {
        return None;
    }

    if let Some(play) = spec.strip_prefix("PB.") {
        return Some(Directive::Playbook {
            body: play.trim().to_string(),
            mandatory,
            color,
        });
    }

    let route = if mandatory { format!(">{spec}<") } else { spec };
    Some(Directive::Route(RouteSpecLine {
        route,
        color,
        mandatory,
    }))
}

/// Recognize `[NAME]`, `>[NAME]<` and their `;COLOR` variants. Modifiers
/// written inside the brackets (`[NAME><;COLOR]`) are also accepted.
fn parse_header(line: &str) -> Option<Group> {
    let (leading, rest) = match line.strip_prefix('>') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, line),
    };
    let rest = rest.strip_prefix('[')?;
    let (inner, after) = rest.split_once(']')?;
    if inner.is_empty() {
        return None;
    }

    let after = after.trim_start();
    let (trailing, after) = match after.strip_prefix('<') {
        Some(after) => (true, after.trim_start()),
        None => (false, after),
    };
    let color = match after.strip_prefix(';') {
        Some(color) if !color.trim().is_empty() => Some(color.trim().to_uppercase()),
        Some(_) => return None,
        None if after.is_empty() => None,
        None => return None,
    };

    let mut group = Group {
        color,
        mandatory: leading || trailing,
    };

    if inner.contains("><") {
        group.mandatory = true;
    }
    if let Some((_, inner_color)) = inner.split_once(';') {
        let inner_color = inner_color.replace("><", "");
        let inner_color = inner_color.trim();
        if group.color.is_none() && !inner_color.is_empty() {
            group.color = Some(inner_color.to_uppercase());
        }
    }
    Some(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(route: &str, color: Option<&str>, mandatory: bool) -> Directive {
        Directive::Route(RouteSpecLine {
            route: route.to_string(),
            color: color.map(String::from),
            mandatory,
        })
    }

    #[test]
    fn literal_lines() {
        let directives = parse_directives("kdfw sps klax\n  \n>KDFW SPS KLAX<;green\nKDFW >SPS J80 ABI< KLAX");
        assert_eq!(
            directives,
            vec![
                route("KDFW SPS KLAX", None, false),
                route(">KDFW SPS KLAX<", Some("GREEN"), true),
                route("KDFW >SPS J80 ABI< KLAX", None, false),
            ]
        );
    }

    #[test]
    fn group_defaults() {
        let input = ">[WEST]<;#00ff00\nKDFW SPS KLAX\nKDAL ABI KLAX;RED\n>KIAH ABI KLAX<\n\nKDFW SPS KLAX";
        let directives = parse_directives(input);
        assert_eq!(
            directives,
            vec![
                route(">KDFW SPS KLAX<", Some("#00FF00"), true),
                route(">KDAL ABI KLAX<", Some("RED"), true),
                route(">KIAH ABI KLAX<", Some("#00FF00"), true),
                route("KDFW SPS KLAX", None, false),
            ]
        );
    }

    #[test]
    fn headers() {
        assert_eq!(parse_header("[WEST]"), Some(Group::default()));
        assert_eq!(
            parse_header("[WEST];blue"),
            Some(Group {
                color: Some("BLUE".to_string()),
                mandatory: false
            })
        );
        assert_eq!(
            parse_header(">[WEST]"),
            Some(Group {
                color: None,
                mandatory: true
            })
        );
        assert_eq!(
            parse_header("[WEST><;RED]"),
            Some(Group {
                color: Some("RED".to_string()),
                mandatory: true
            })
        );
        assert_eq!(parse_header("[]"), None);
        assert_eq!(parse_header("[WEST] KDFW"), None);
        assert_eq!(parse_header("[WEST"), None);
    }

    #[test]
    fn malformed_header_is_a_route() {
        assert_eq!(parse_directives("[WEST KDFW"), vec![route("[WEST KDFW", None, false)]);
    }

    #[test]
    fn playbook_directives() {
        let directives = parse_directives(">pb.abi.kdfw.klax<;orange\n[EAST]<\nPB.ABI..KJFK");
        assert_eq!(
            directives,
            vec![
                Directive::Playbook {
                    body: "ABI.KDFW.KLAX".to_string(),
                    mandatory: true,
                    color: Some("ORANGE".to_string()),
                },
                Directive::Playbook {
                    body: "ABI..KJFK".to_string(),
                    mandatory: true,
                    color: None,
                },
            ]
        );
    }

    #[test]
    fn route_spec_line() {
        let line = RouteSpecLine::parse(">kdfw   sps klax<; red ");
        assert!(line.mandatory);
        assert_eq!(line.to_string(), ">KDFW SPS KLAX<;RED");
        assert_eq!(RouteSpecLine::parse("KDFW KLAX").to_string(), "KDFW KLAX");
    }
}
