//! Route extraction from reroute advisories.
//!
//! Advisories list their routes after a `ROUTE:` (or `ROUTES:`) line, in one
//! of three layouts:
//!
//! - `FROM:` / `TO:` blocks, origin segments ending where destination
//!   segments begin;
//! - an `ORIG DEST ROUTE` table, space separated or column aligned;
//! - `ORIG ... ROUTE SEGMENTS` / `DEST ... ROUTE SEGMENTS` blocks, with
//!   fields separated by runs of spaces.
//!
//! Each layout is flattened into plain route lines, one per origin and
//! destination pair.

const ADVISORY_MARKER: &str = "VATCSCC ADVZY";

/// Whether the input contains at least one advisory.
pub fn is_advisory(input: &str) -> bool {
    input.to_uppercase().contains(ADVISORY_MARKER)
}

/// Extract every route line of every advisory found in the input.
pub fn extract_advisory_routes(input: &str) -> Vec<String> {
    let upper = input.to_uppercase();
    let routes = split_advisories(&upper)
        .into_iter()
        .flat_map(block_routes)
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    tracing::debug!("Extracted {} routes from advisory input", routes.len());
    routes
}

/// Split upper-cased text into advisory blocks, each starting at the marker.
fn split_advisories(text: &str) -> Vec<&str> {
    let starts = text.match_indices(ADVISORY_MARKER).map(|(i, _)| i).collect::<Vec<_>>();
    if starts.is_empty() {
        return vec![text];
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            text[start..end].trim()
        })
        .filter(|block| !block.is_empty())
        .collect()
}

fn block_routes(block: &str) -> Vec<String> {
    let lines = block.lines().collect::<Vec<_>>();
    let Some(routes_idx) = lines
        .iter()
        .position(|l| l.contains("ROUTES:") || l.contains("ROUTE:"))
    else {
        return Vec::new();
    };
    let after = &lines[routes_idx + 1..];

    if after.iter().any(|l| l.trim().starts_with("FROM:")) {
        return from_to_routes(after);
    }
    let table = table_routes(after);
    if !table.is_empty() {
        return table;
    }
    if after.iter().any(|l| l.contains("ROUTE SEGMENTS")) {
        return segment_routes(after);
    }
    Vec::new()
}

/// 3 or 4 alphanumeric characters, excluding `Z`-leading 3-letter codes
/// (ARTCCs).
fn is_airport_token(token: &str) -> bool {
    (3..=4).contains(&token.len())
        && token.bytes().all(|b| b.is_ascii_alphanumeric())
        && !(token.len() == 3 && token.starts_with('Z'))
}

/// `DFW` → `KDFW`; anything else unchanged.
fn normalize_airport(token: &str) -> String {
    if token.len() == 3 && !token.starts_with('Z') {
        format!("K{token}")
    } else {
        token.to_string()
    }
}

/// Origin or destination cell token: 3-letter codes not starting with `Z`
/// get a `K` prefix, facilities and ICAO codes are kept.
fn endpoint(token: &str) -> String {
    if token.len() == 3 && token.bytes().all(|b| b.is_ascii_alphabetic()) && !token.starts_with('Z') {
        format!("K{token}")
    } else {
        token.to_string()
    }
}

/// Join an origin segment and a destination segment, sharing their common
/// boundary fix when there is one. Mandatory markers are ignored when
/// comparing, and a closing marker on the destination side is kept.
fn merge_segments(origin: &[&str], destination: &[&str]) -> Vec<String> {
    let strip = |t: &str| t.replace(['<', '>'], "");
    let shared = match (origin.last(), destination.split_first()) {
        (Some(last), Some((first, rest))) if strip(last) == strip(first) => Some((*first, rest)),
        _ => None,
    };

    let mut merged = origin.iter().map(|t| t.to_string()).collect::<Vec<_>>();
    match shared {
        Some((first, rest)) => {
            if let Some(last) = merged.last_mut() {
                if first.contains('<') && !last.contains('<') {
                    last.push('<');
                }
            }
            merged.extend(rest.iter().map(|t| t.to_string()));
        }
        None => merged.extend(destination.iter().map(|t| t.to_string())),
    }
    merged
}

/// Remarks follow a `;` and are not part of the route.
fn without_remarks(segment: &str) -> &str {
    segment.split(';').next().unwrap_or_default().trim()
}

fn assemble(origin: Option<&str>, route: &[&str], destination: Option<&str>) -> String {
    origin
        .into_iter()
        .chain(route.iter().copied())
        .chain(destination)
        .collect::<Vec<_>>()
        .join(" ")
}

fn from_to_routes(lines: &[&str]) -> Vec<String> {
    let from_idx = lines.iter().position(|l| l.trim().starts_with("FROM:"));
    let to_idx = lines.iter().position(|l| l.trim().starts_with("TO:"));
    let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
        return Vec::new();
    };
    if to_idx <= from_idx {
        return Vec::new();
    }

    let mut origins = Vec::new();
    for line in &lines[from_idx + 1..to_idx] {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("ORIG") || trimmed.starts_with("----") {
            continue;
        }
        let (prefix, segment) = match line.find('>') {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => continue,
        };
        if segment.is_empty() {
            continue;
        }
        let airports = prefix
            .split_whitespace()
            .filter(|t| is_airport_token(t))
            .map(normalize_airport)
            .collect::<Vec<_>>();
        origins.push((airports, segment));
    }

    let mut destinations = Vec::new();
    for line in &lines[to_idx + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("DEST") || trimmed.starts_with("----") {
            continue;
        }
        if trimmed.starts_with("TMI ID") {
            break;
        }
        let tokens = trimmed.split_whitespace().collect::<Vec<_>>();
        if tokens.len() < 2 || !is_airport_token(tokens[0]) {
            continue;
        }
        destinations.push((normalize_airport(tokens[0]), tokens[1..].join(" ")));
    }

    let mut routes = Vec::new();
    for (airports, origin_segment) in &origins {
        let origin_tokens = without_remarks(origin_segment).split_whitespace().collect::<Vec<_>>();
        for (destination, dest_segment) in &destinations {
            let dest_tokens = without_remarks(dest_segment).split_whitespace().collect::<Vec<_>>();
            let mut tokens = airports.clone();
            tokens.extend(merge_segments(&origin_tokens, &dest_tokens));
            tokens.push(destination.clone());
            routes.push(tokens.join(" "));
        }
    }
    routes
}

/// Whether the text contains a run of at least two whitespace characters.
fn has_wide_gap(text: &str) -> bool {
    text.chars()
        .zip(text.chars().skip(1))
        .any(|(a, b)| a.is_whitespace() && b.is_whitespace())
}

/// Split on runs of two or more whitespace characters.
fn split_wide(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut run_start: Option<usize> = None;
    let mut run_len = 0;
    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if run_start.is_none() {
                run_start = Some(idx);
                run_len = 0;
            }
            run_len += 1;
        } else if let Some(run) = run_start.take() {
            if run_len >= 2 {
                parts.push(&text[start..run]);
                start = idx;
            }
        }
    }
    parts.push(&text[start..run_start.unwrap_or(text.len())]);
    parts
}

fn char_slice(line: &str, start: usize, end: Option<usize>) -> String {
    let chars = line.chars().skip(start);
    match end {
        Some(end) => chars.take(end.saturating_sub(start)).collect(),
        None => chars.collect(),
    }
}

fn cross_join(origins: &[String], route: &[&str], destinations: &[String], routes: &mut Vec<String>) {
    if route.is_empty() {
        return;
    }
    let origins = if origins.is_empty() { vec![None] } else { origins.iter().map(|o| Some(o.as_str())).collect() };
    let destinations = if destinations.is_empty() {
        vec![None]
    } else {
        destinations.iter().map(|d| Some(d.as_str())).collect()
    };
    for origin in &origins {
        for destination in &destinations {
            let line = assemble(*origin, route, *destination);
            if !line.is_empty() {
                routes.push(line);
            }
        }
    }
}

fn table_routes(lines: &[&str]) -> Vec<String> {
    let Some(header_idx) = lines.iter().position(|l| {
        let t = l.trim();
        t.starts_with("ORIG") && t.contains("DEST") && t.contains("ROUTE")
    }) else {
        return Vec::new();
    };
    let header = lines[header_idx].trim_end();
    let rows = lines[header_idx + 1..]
        .iter()
        .filter(|l| !l.trim().is_empty() && !l.trim().starts_with("----"))
        .take_while(|l| !l.trim().starts_with("TMI ID"));

    let mut routes = Vec::new();

    if !has_wide_gap(header) {
        for row in rows {
            let tokens = row.split_whitespace().collect::<Vec<_>>();
            if tokens.len() < 3 {
                continue;
            }
            cross_join(&[endpoint(tokens[0])], &tokens[2..], &[endpoint(tokens[1])], &mut routes);
        }
        return routes;
    }

    // column aligned: cells are sliced at the header's column starts
    let (Some(dest_col), Some(route_col)) = (
        header.find("DEST").map(|i| header[..i].chars().count()),
        header.find("ROUTE").map(|i| header[..i].chars().count()),
    ) else {
        return routes;
    };

    let mut current_origins: Vec<String> = Vec::new();
    for row in rows {
        let origin_cell = char_slice(row, 0, Some(dest_col));
        let dest_cell = char_slice(row, dest_col, Some(route_col));
        let route_cell = char_slice(row, route_col, None);
        let route = route_cell.split_whitespace().collect::<Vec<_>>();
        if route.is_empty() {
            continue;
        }

        let origins = origin_cell.split_whitespace().map(endpoint).collect::<Vec<_>>();
        // a blank origin cell continues the previous row's origins
        let origins = if origins.is_empty() {
            current_origins.clone()
        } else {
            current_origins = origins.clone();
            origins
        };
        let destinations = dest_cell.split_whitespace().map(endpoint).collect::<Vec<_>>();
        if origins.is_empty() && destinations.is_empty() {
            continue;
        }
        cross_join(&origins, &route, &destinations, &mut routes);
    }
    routes
}

fn segment_routes(lines: &[&str]) -> Vec<String> {
    let Some(orig_idx) = lines
        .iter()
        .position(|l| l.trim().starts_with("ORIG") && l.contains("ROUTE SEGMENTS"))
    else {
        return Vec::new();
    };
    let Some(dest_idx) = lines
        .iter()
        .enumerate()
        .skip(orig_idx + 1)
        .find(|(_, l)| l.trim().starts_with("DEST") && l.contains("ROUTE SEGMENTS"))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };

    let parse_block = |block: &[&str], stop_at_tmi: bool| {
        let mut entries = Vec::new();
        for line in block {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("----") {
                continue;
            }
            if stop_at_tmi && trimmed.starts_with("TMI ID") {
                break;
            }
            let parts = split_wide(line.trim_end());
            if parts.len() < 2 || parts[1].trim().is_empty() {
                continue;
            }
            let endpoints = parts[0].split_whitespace().map(endpoint).collect::<Vec<_>>();
            entries.push((endpoints, parts[1].trim().to_string()));
        }
        entries
    };
    let origins = parse_block(&lines[orig_idx + 1..dest_idx], false);
    let destinations = parse_block(&lines[dest_idx + 1..], true);

    let mut routes = Vec::new();
    for (origin_endpoints, origin_segment) in &origins {
        let origin_tokens = without_remarks(origin_segment).split_whitespace().collect::<Vec<_>>();
        for (dest_endpoints, dest_segment) in &destinations {
            let dest_tokens = without_remarks(dest_segment).split_whitespace().collect::<Vec<_>>();
            let combined = merge_segments(&origin_tokens, &dest_tokens);
            let combined = combined.iter().map(String::as_str).collect::<Vec<_>>();
            cross_join(origin_endpoints, &combined, dest_endpoints, &mut routes);
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection() {
        assert!(is_advisory("vatcscc advzy 001 DCC 01/01/2025"));
        assert!(!is_advisory("KDFW SPS KLAX"));
    }

    #[test]
    fn from_to_layout() {
        let text = "VATCSCC ADVZY 012 DCC 03/14/2025 ROUTE RQD\n\
                    ROUTES:\n\
                    FROM:\n\
                    ORIG       ROUTE - ORIGIN SEGMENTS\n\
                    ----       -----------------------\n\
                    DFW DAL    >BOOVE3 SPS J80 ABI\n\
                    TO:\n\
                    DEST       ROUTE - DESTINATION SEGMENTS\n\
                    LAX        ABI< J80 ELP;REMARK\n\
                    SAN        TXO< HOBBS\n\
                    TMI ID: RRDCC012\n\
                    PHX        IGNORED\n";
        let routes = extract_advisory_routes(text);
        assert_eq!(
            routes,
            vec![
                "KDFW KDAL >BOOVE3 SPS J80 ABI< J80 ELP KLAX",
                "KDFW KDAL >BOOVE3 SPS J80 ABI TXO< HOBBS KSAN",
            ]
        );
    }

    #[test]
    fn simple_table_layout() {
        let text = "VATCSCC ADVZY 003 ZNY\nROUTE:\nORIG DEST ROUTE\nJFK ORD >GAYEL Q818 WOZEE< BRWNZ4\nZNY N90 MERIT J60\nTMI ID: X\n";
        let routes = extract_advisory_routes(text);
        assert_eq!(
            routes,
            vec!["KJFK >GAYEL Q818 WOZEE< BRWNZ4 KORD", "ZNY MERIT J60 N90"]
        );
    }

    #[test]
    fn aligned_table_layout() {
        let text = "VATCSCC ADVZY 004 DCC\n\
                    ROUTES:\n\
                    ORIG    DEST     ROUTE\n\
                    ----    ----     -----\n\
                    BOS     ATL CLT  >MERIT J60< PSB\n\
                    \x20       MIA      >HNK J121< SAV\n";
        let routes = extract_advisory_routes(text);
        assert_eq!(
            routes,
            vec![
                "KBOS >MERIT J60< PSB KATL",
                "KBOS >MERIT J60< PSB KCLT",
                "KBOS >HNK J121< SAV KMIA",
            ]
        );
    }

    #[test]
    fn segment_layout() {
        let text = "VATCSCC ADVZY 005 DCC\n\
                    ROUTES:\n\
                    ORIG      ROUTE SEGMENTS\n\
                    ZBW N90   >MERIT J60 PSB\n\
                    DEST      ROUTE SEGMENTS\n\
                    ORD       PSB< J146 GIJ\n";
        let routes = extract_advisory_routes(text);
        assert_eq!(
            routes,
            vec!["ZBW >MERIT J60 PSB< J146 GIJ KORD", "N90 >MERIT J60 PSB< J146 GIJ KORD"]
        );
    }

    #[test]
    fn several_advisories() {
        let text = "junk\nVATCSCC ADVZY 1\nROUTE:\nORIG DEST ROUTE\nDFW LAX SPS\nVATCSCC ADVZY 2\nROUTE:\nORIG DEST ROUTE\nDAL SAN ABI\n";
        assert_eq!(extract_advisory_routes(text), vec!["KDFW SPS KLAX", "KDAL ABI KSAN"]);
    }

    #[test]
    fn wide_split() {
        assert_eq!(split_wide("ZBW N90   >MERIT J60"), vec!["ZBW N90", ">MERIT J60"]);
        assert_eq!(split_wide("A B"), vec!["A B"]);
        assert!(has_wide_gap("ORIG  DEST"));
        assert!(!has_wide_gap("ORIG DEST ROUTE"));
    }
}
