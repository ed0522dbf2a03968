//! Geographic positions and coordinate shorthand.
//!
//! Oceanic and remote route descriptions often skip named fixes and write
//! positions directly. [`parse_coordinate`] understands the usual forms:
//!
//! | form | example | position |
//! |---|---|---|
//! | NAT slash | `51/53` | 51N 053W |
//! | NAT half degree | `H5250` | 52°30'N 050W |
//! | ICAO slash | `5230N/05000W` | 52°30'N 050W |
//! | ICAO compact | `5230N05000W`, `52N030W` | |
//! | ARINC 5 characters | `5275N`, `75N70` | 52N 075W, 75N 170W |

use geodesy::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The WGS84 ellipsoid.
static WGS84: Lazy<Ellipsoid> = Lazy::new(|| Ellipsoid::named("WGS84").unwrap());

/**
 * A position in decimal degrees.
 */
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates { latitude, longitude }
    }

    /// Geodesic distance on the WGS84 ellipsoid, in kilometers.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        WGS84.distance(&Coor2D::from(self), &Coor2D::from(other)) / 1000.
    }

    /// Plain average of both positions; only used as a reference for
    /// candidate selection, not as a point on the route.
    pub fn midpoint(&self, other: &Coordinates) -> Coordinates {
        Coordinates {
            latitude: (self.latitude + other.latitude) / 2.,
            longitude: (self.longitude + other.longitude) / 2.,
        }
    }

    /// Sum of absolute latitude and longitude differences, in degrees.
    pub fn manhattan(&self, other: &Coordinates) -> f64 {
        (self.latitude - other.latitude).abs() + (self.longitude - other.longitude).abs()
    }
}

impl From<&Coordinates> for Coor2D {
    fn from(val: &Coordinates) -> Self {
        Coor2D::geo(val.latitude, val.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Decode a coordinate shorthand token, or `None` when the token is not one.
///
/// Forms are tried from the most specific to the least ambiguous: NAT slash,
/// NAT half degree, ICAO slash, ICAO compact and finally ARINC 5 characters.
pub fn parse_coordinate(token: &str) -> Option<Coordinates> {
    let token = token.trim().to_uppercase();
    if token.is_empty() || !token.is_ascii() {
        return None;
    }
    let s = token.as_str();
    nat_slash(s)
        .or_else(|| nat_half_degree(s))
        .or_else(|| icao_slash(s))
        .or_else(|| icao_compact(s))
        .or_else(|| arinc(s))
}

fn number(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn split_last(s: &str) -> Option<(&str, char)> {
    let last = s.chars().last()?;
    Some((&s[..s.len() - 1], last))
}

/// `ddmm[NS]` or `dd[NS]`
fn latitude(part: &str) -> Option<f64> {
    let (digits, hemisphere) = split_last(part)?;
    let value = match digits.len() {
        4 => number(&digits[..2])? + number(&digits[2..])? / 60.,
        2 => number(digits)?,
        _ => return None,
    };
    match hemisphere {
        'N' => Some(value),
        'S' => Some(-value),
        _ => None,
    }
}

/// `dddmm[EW]`, `ddmm[EW]`, `ddd[EW]` or `dd[EW]`
fn longitude(part: &str) -> Option<f64> {
    let (digits, hemisphere) = split_last(part)?;
    let value = match digits.len() {
        5 => number(&digits[..3])? + number(&digits[3..])? / 60.,
        4 => number(&digits[..2])? + number(&digits[2..])? / 60.,
        3 | 2 => number(digits)?,
        _ => return None,
    };
    match hemisphere {
        'E' => Some(value),
        'W' => Some(-value),
        _ => None,
    }
}

fn nat_slash(s: &str) -> Option<Coordinates> {
    let (lat, lon) = s.split_once('/')?;
    if lat.len() != 2 || lon.len() != 2 {
        return None;
    }
    Some(Coordinates::new(number(lat)?, -number(lon)?))
}

fn nat_half_degree(s: &str) -> Option<Coordinates> {
    let rest = s.strip_prefix('H')?;
    if rest.len() != 4 {
        return None;
    }
    Some(Coordinates::new(number(&rest[..2])? + 0.5, -number(&rest[2..])?))
}

fn icao_slash(s: &str) -> Option<Coordinates> {
    let mut parts = s.split('/');
    let (lat, lon) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(Coordinates::new(latitude(lat)?, longitude(lon)?))
}

fn icao_compact(s: &str) -> Option<Coordinates> {
    let split = s.find(['N', 'S'])? + 1;
    let (lat, lon) = s.split_at(split);
    // longitude degrees always take three digits here
    if !matches!(lon.len(), 4 | 6) {
        return None;
    }
    Some(Coordinates::new(latitude(lat)?, longitude(lon)?))
}

fn arinc(s: &str) -> Option<Coordinates> {
    if s.len() != 5 {
        return None;
    }
    let lat = number(&s[..2])?;
    let (lon, letter) = match (number(&s[2..4]), number(&s[3..])) {
        (Some(lon), _) => (lon, s.chars().nth(4)?),
        (None, Some(lon)) => (100. + lon, s.chars().nth(2)?),
        _ => return None,
    };
    // the letter encodes the quadrant
    match letter {
        'N' => Some(Coordinates::new(lat, -lon)),
        'E' => Some(Coordinates::new(lat, lon)),
        'S' => Some(Coordinates::new(-lat, lon)),
        'W' => Some(Coordinates::new(-lat, -lon)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(actual: Option<Coordinates>, latitude: f64, longitude: f64) {
        let actual = actual.expect("a coordinate");
        assert!((actual.latitude - latitude).abs() < 1e-9, "{actual}");
        assert!((actual.longitude - longitude).abs() < 1e-9, "{actual}");
    }

    #[test]
    fn nat_forms() {
        assert_near(parse_coordinate("51/53"), 51., -53.);
        assert_near(parse_coordinate("H5250"), 52.5, -50.);
        assert_near(parse_coordinate("h5250"), 52.5, -50.);
    }

    #[test]
    fn icao_forms() {
        assert_near(parse_coordinate("5230N05000W"), 52.5, -50.);
        assert_near(parse_coordinate("7500N13400W"), 75., -134.);
        assert_near(parse_coordinate("52N030W"), 52., -30.);
        assert_near(parse_coordinate("5230N030W"), 52.5, -30.);
        assert_near(parse_coordinate("52N03030E"), 52., 30.5);
        assert_near(parse_coordinate("5230N/05000W"), 52.5, -50.);
        assert_near(parse_coordinate("45S/170E"), -45., 170.);
        assert_near(parse_coordinate("4530S/2015E"), -45.5, 20.25);
    }

    #[test]
    fn arinc_forms() {
        assert_near(parse_coordinate("5275N"), 52., -75.);
        assert_near(parse_coordinate("75N70"), 75., -170.);
        assert_near(parse_coordinate("5020S"), -50., 20.);
        assert_near(parse_coordinate("5020E"), 50., 20.);
        assert_near(parse_coordinate("5275W"), -52., -75.);
    }

    #[test]
    fn not_coordinates() {
        for token in ["KDFW", "BOOVE", "J80", "", "H52", "51/5", "5230X05000W", "12345", "52N30W", "ÉÉÉÉÉ"] {
            assert_eq!(parse_coordinate(token), None, "{token}");
        }
    }

    #[test]
    fn distances() {
        let paris = Coordinates::new(48.8566, 2.3522);
        let london = Coordinates::new(51.5074, -0.1278);
        let d = paris.distance_km(&london);
        assert!((d - 343.9).abs() < 2., "{d}");
        assert_eq!(paris.distance_km(&paris), 0.);
    }
}
