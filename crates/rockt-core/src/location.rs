//! Geographic positions and geodesic distance.
//!
//! Storage and JSON encode a position as `[longitude, latitude]`. Inside the
//! crate it is always a [`Location`] with named fields; the positional form
//! only exists at the serde boundary.

use geo::{Distance, Geodesic, Point};
use serde::{Deserialize, Serialize};

/// A WGS-84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
  pub longitude: f64,
  pub latitude:  f64,
}

impl Location {
  pub fn new(longitude: f64, latitude: f64) -> Self {
    Self { longitude, latitude }
  }

  /// Geodesic distance to `other`, in kilometres.
  pub fn distance_km(&self, other: &Location) -> f64 {
    Geodesic.distance(self.to_point(), other.to_point()) / 1000.0
  }

  /// The single conversion point into `geo`'s (x = lon, y = lat) convention.
  fn to_point(self) -> Point {
    Point::new(self.longitude, self.latitude)
  }
}

impl From<[f64; 2]> for Location {
  fn from([longitude, latitude]: [f64; 2]) -> Self {
    Self { longitude, latitude }
  }
}

impl From<Location> for [f64; 2] {
  fn from(l: Location) -> Self { [l.longitude, l.latitude] }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn json_is_longitude_first() {
    let loc = Location::new(-79.411286, 43.666532);
    let json = serde_json::to_string(&loc).unwrap();
    assert_eq!(json, "[-79.411286,43.666532]");

    let back: Location = serde_json::from_str(&json).unwrap();
    assert_eq!(back, loc);
  }

  #[test]
  fn equator_distance_matches_semi_major_axis() {
    // Along the equator the geodesic is an arc of radius 6378.137 km.
    let a = Location::new(0.0, 0.0);
    let b = Location::new(1.0, 0.0);
    let expected = 6378.137 * 1.0_f64.to_radians();
    assert_relative_eq!(a.distance_km(&b), expected, epsilon = 1e-6);
  }

  #[test]
  fn distance_is_symmetric_and_zero_on_self() {
    let station = Location::new(-79.411286, 43.666532);
    let king = Location::new(-79.402858, 43.644075);
    assert_eq!(station.distance_km(&station), 0.0);
    assert_relative_eq!(
      station.distance_km(&king),
      king.distance_km(&station),
      epsilon = 1e-9
    );
    let d = station.distance_km(&king);
    assert!((2.5..2.7).contains(&d), "unexpected distance {d}");
  }
}
