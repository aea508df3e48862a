//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

use std::f64::consts::PI;
use std::fmt::{Display, Formatter};
use std::num::ParseFloatError;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use geogrounder_toolkit::from_str_ex::{ParseErrorEx, ParseEx};

pub const EARTH_RADIUS_IN_MILES: f64 = 3963.191;
pub const MILES_PER_DEGREE: f64 = PI * 2.0 * EARTH_RADIUS_IN_MILES / 360.0;
pub const KM_PER_MILE: f64 = 1.609;

/// Returned as distance if a coordinate is missing or the distance can not be computed.
pub const UNKNOWN_DISTANCE: f64 = 1_000_000.0;

/// A point on the earth in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub long: f64,
}

impl Coord {
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Clamps the latitude into [-90, 90] and wraps the longitude into [-180, 180).
    pub fn coerced(lat: f64, long: f64) -> Self {
        let lat = lat.clamp(-90.0, 90.0);
        let mut long = long;
        while long < -180.0 {
            long += 360.0;
        }
        while long >= 180.0 {
            long -= 360.0;
        }
        Self { lat, long }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..180.0).contains(&self.long)
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2},{:.2})", self.lat, self.long)
    }
}

#[derive(Debug, Error)]
pub enum CoordParseError {
    #[error("Expected a coordinate of the form \"lat,long\" but got {0:?}.")]
    Format(String),
    #[error(transparent)]
    Number(#[from] ParseErrorEx<ParseFloatError>),
}

/// Parses `lat,long`.
impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, long) = s.split_once(',').ok_or_else(|| CoordParseError::Format(s.to_string()))?;
        Ok(Self::new(lat.parse_field("lat")?, long.parse_field("long")?))
    }
}

/// Great circle distance in miles.
pub fn spheredist(p1: &Coord, p2: &Coord) -> f64 {
    let this_lat = p1.lat.to_radians();
    let this_long = p1.long.to_radians();
    let other_lat = p2.lat.to_radians();
    let other_long = p2.long.to_radians();
    let angle_cos = this_lat.sin() * other_lat.sin()
        + this_lat.cos() * other_lat.cos() * (other_long - this_long).cos();
    // round-off can push the cosine slightly out of range
    if angle_cos.abs() > 1.000001 {
        log::warn!("Something wrong in spheredist({p1}, {p2}): cosine {angle_cos} out of range");
        return UNKNOWN_DISTANCE;
    }
    if angle_cos.abs() > 1.0 {
        return 0.0;
    }
    EARTH_RADIUS_IN_MILES * angle_cos.acos()
}

/// [spheredist] for optional coordinates, a missing one yields [UNKNOWN_DISTANCE].
pub fn spheredist_opt(p1: Option<&Coord>, p2: Option<&Coord>) -> f64 {
    match (p1, p2) {
        (Some(a), Some(b)) => spheredist(a, b),
        _ => UNKNOWN_DISTANCE
    }
}

/// Euclidean distance in degrees, as if a degree had the same length everywhere.
pub fn degree_dist(c1: &Coord, c2: &Coord) -> f64 {
    ((c1.lat - c2.lat).powi(2) + (c1.long - c2.long).powi(2)).sqrt()
}

/// Formats a distance as `X miles (Y km)`.
pub fn miles_and_km(miles: f64) -> String {
    format!("{miles:.2} miles ({:.2} km)", miles * KM_PER_MILE)
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::coord::{degree_dist, spheredist, spheredist_opt, Coord, MILES_PER_DEGREE, UNKNOWN_DISTANCE};

    #[test]
    fn coercion_wraps_longitude(){
        assert_eq!(Coord::new(90.0, -170.0), Coord::coerced(95.0, 190.0));
        assert_eq!(Coord::new(-90.0, -180.0), Coord::coerced(-100.0, 180.0));
        assert_eq!(Coord::new(10.0, 170.0), Coord::coerced(10.0, -550.0));
        assert!(Coord::coerced(12.0, 540.0).is_valid());
    }

    #[test]
    fn parse_and_display(){
        let coord: Coord = "48.8567,2.3508".parse().unwrap();
        assert_eq!(Coord::new(48.8567, 2.3508), coord);
        assert_eq!("(48.86,2.35)", coord.to_string());
        assert!("48.8567".parse::<Coord>().is_err());
        assert!("north,2.0".parse::<Coord>().is_err());
    }

    #[test]
    fn distances(){
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(0.0, 1.0);
        assert_relative_eq!(MILES_PER_DEGREE, spheredist(&a, &b), epsilon = 1e-6);
        assert_relative_eq!(0.0, spheredist(&a, &a));
        assert_relative_eq!(1.0, degree_dist(&a, &b));
        assert_relative_eq!(UNKNOWN_DISTANCE, spheredist_opt(Some(&a), None));
        // Paris to London, roughly 213 miles
        let paris = Coord::new(48.8567, 2.3508);
        let london = Coord::new(51.5072, -0.1275);
        let dist = spheredist(&paris, &london);
        assert!(dist > 205.0 && dist < 220.0, "{dist}");
    }
}
