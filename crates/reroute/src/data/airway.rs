//! Airway expansion.

use std::collections::HashMap;

use crate::data::context::ReferenceContext;
use crate::data::expand::RouteToken;
use crate::error::ResolutionIssue;

/**
 * An airway as an ordered list of fixes, with the position of each fix.
 *
 * A fix appearing several times along the airway is only indexed at its first
 * occurrence.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Airway {
    fixes: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Airway {
    pub fn new(fixes: Vec<String>) -> Self {
        let fixes = fixes.into_iter().map(|f| f.trim().to_uppercase()).collect::<Vec<_>>();
        let mut positions = HashMap::new();
        for (idx, fix) in fixes.iter().enumerate() {
            positions.entry(fix.clone()).or_insert(idx);
        }
        Airway { fixes, positions }
    }

    pub fn fixes(&self) -> &[String] {
        &self.fixes
    }

    pub fn position(&self, fix: &str) -> Option<usize> {
        self.positions.get(fix).copied()
    }

    /// The fixes strictly between two fixes of the airway, in the direction of
    /// travel.
    ///
    /// Returns `None` when either fix is not on the airway. The result is
    /// empty when both fixes are adjacent (or the same).
    pub fn between(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let (start, end) = (self.position(from)?, self.position(to)?);
        if start.abs_diff(end) <= 1 {
            return Some(Vec::new());
        }
        Some(if start < end {
            self.fixes[start + 1..end].to_vec()
        } else {
            self.fixes[end + 1..start].iter().rev().cloned().collect()
        })
    }
}

impl ReferenceContext {
    /// Replace airway tokens by the fixes between their neighbouring tokens.
    ///
    /// Neighbours are taken from the input sequence, so consecutive airways
    /// (`A J1 J2 B`) are not chained. Inserted fixes have no originating token.
    /// An airway left in place, its neighbours being adjacent or off the
    /// airway, is reported.
    pub(crate) fn expand_airways(&self, tokens: Vec<RouteToken>, issues: &mut Vec<ResolutionIssue>) -> Vec<RouteToken> {
        if tokens.len() < 3 || self.airways.is_empty() {
            return tokens;
        }

        let mut expanded = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let airway = match (i.checked_sub(1), tokens.get(i + 1)) {
                (Some(prev), Some(next)) => self.airways.get(&token.name).map(|a| (a, &tokens[prev], next)),
                _ => None,
            };
            let Some((airway, prev, next)) = airway else {
                expanded.push(token.clone());
                continue;
            };

            match airway.between(&prev.name, &next.name) {
                Some(fixes) if !fixes.is_empty() => {
                    tracing::debug!(
                        "Expanded airway {} between {} and {}: {} fixes",
                        token.name,
                        prev.name,
                        next.name,
                        fixes.len()
                    );
                    expanded.extend(fixes.into_iter().map(RouteToken::inserted));
                }
                _ => {
                    tracing::warn!(
                        "No valid segment on airway '{}' between '{}' and '{}'",
                        token.name,
                        prev.name,
                        next.name
                    );
                    issues.push(ResolutionIssue::UnknownAirwayAdjacency {
                        airway: token.name.clone(),
                        from: prev.name.clone(),
                        to: next.name.clone(),
                    });
                    expanded.push(token.clone());
                }
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::context::ExpansionConfig;
    use crate::data::reference::{AirwayRow, ReferenceTables};

    fn airway(fixes: &str) -> Airway {
        Airway::new(fixes.split_whitespace().map(String::from).collect())
    }

    fn names(tokens: &[RouteToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn between_follows_direction() {
        let awy = airway("A B C D");
        assert_eq!(awy.between("A", "D"), Some(vec!["B".to_string(), "C".to_string()]));
        assert_eq!(awy.between("D", "A"), Some(vec!["C".to_string(), "B".to_string()]));
        assert_eq!(awy.between("A", "B"), Some(vec![]));
        assert_eq!(awy.between("A", "X"), None);
    }

    #[test]
    fn repeated_fix_keeps_first_position() {
        let awy = airway("A B C B D");
        assert_eq!(awy.position("B"), Some(1));
        assert_eq!(awy.between("B", "D"), Some(vec!["C".to_string(), "B".to_string()]));
    }

    #[test]
    fn expand_in_route() {
        let tables = ReferenceTables {
            airways: Some(vec![AirwayRow {
                identifier: "J80".to_string(),
                fixes: ["SPS", "ABI", "TXO", "ELP"].iter().map(|s| s.to_string()).collect(),
            }]),
            ..Default::default()
        };
        let context = ReferenceContext::build(tables, ExpansionConfig::default());
        let tokens = ["KDFW", "SPS", "J80", "ELP", "J80", "XYZ", "J80"]
            .iter()
            .enumerate()
            .map(|(i, name)| RouteToken::original(name, i, false))
            .collect();

        let mut issues = vec![];
        let expanded = context.expand_airways(tokens, &mut issues);
        assert_eq!(
            names(&expanded),
            vec!["KDFW", "SPS", "ABI", "TXO", "ELP", "J80", "XYZ", "J80"]
        );
        assert_eq!(expanded[2].source, None);
        assert_eq!(expanded[4].source, Some(3));
        // only the middle occurrence has both neighbours and an unknown fix
        assert_eq!(issues.len(), 1);
        assert!(matches!(&issues[0], ResolutionIssue::UnknownAirwayAdjacency { from, to, .. } if from == "ELP" && to == "XYZ"));
    }

    #[test]
    fn adjacent_fixes_are_reported() {
        let tables = ReferenceTables {
            airways: Some(vec![AirwayRow {
                identifier: "J80".to_string(),
                fixes: ["SPS", "ABI", "TXO"].iter().map(|s| s.to_string()).collect(),
            }]),
            ..Default::default()
        };
        let context = ReferenceContext::build(tables, ExpansionConfig::default());
        let tokens = ["SPS", "J80", "ABI"]
            .iter()
            .enumerate()
            .map(|(i, name)| RouteToken::original(name, i, false))
            .collect();

        let mut issues = vec![];
        let expanded = context.expand_airways(tokens, &mut issues);
        assert_eq!(names(&expanded), vec!["SPS", "J80", "ABI"]);
        assert_eq!(
            issues,
            vec![ResolutionIssue::UnknownAirwayAdjacency {
                airway: "J80".to_string(),
                from: "SPS".to_string(),
                to: "ABI".to_string()
            }]
        );
    }
}
