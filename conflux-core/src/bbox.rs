//! Geographic bounding boxes in longitude/latitude degrees.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Intersects, Rect};
use thiserror::Error;

use crate::geometry::distance_m;

/// An axis-aligned longitude/latitude rectangle.
///
/// # Examples
///
/// ```
/// use conflux_core::BoundingBox;
///
/// # fn main() -> Result<(), conflux_core::BoundingBoxError> {
/// let bbox: BoundingBox = "13.0,52.0,13.5,52.5".parse()?;
/// assert!(bbox.width_m() > 30_000.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    rect: Rect<f64>,
}

/// Errors returned when constructing a [`BoundingBox`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundingBoxError {
    /// A corner was not a finite number.
    #[error("bounding box corners must be finite")]
    NotFinite,
    /// A longitude fell outside `[-180, 180]` or a latitude outside `[-90, 90]`.
    #[error("bounding box ({min_lon}, {min_lat}, {max_lon}, {max_lat}) is outside WGS84 range")]
    OutOfRange {
        /// West edge.
        min_lon: f64,
        /// South edge.
        min_lat: f64,
        /// East edge.
        max_lon: f64,
        /// North edge.
        max_lat: f64,
    },
    /// The textual form did not contain four comma-separated numbers.
    #[error("expected min_lon,min_lat,max_lon,max_lat, found {input:?}")]
    Malformed {
        /// Offending input.
        input: String,
    },
}

impl BoundingBox {
    /// Build a bounding box from its edges.
    ///
    /// Swapped edges are normalised; only non-finite or out-of-range values
    /// are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`BoundingBoxError`] when an edge is invalid.
    pub fn new(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Result<Self, BoundingBoxError> {
        if ![min_lon, min_lat, max_lon, max_lat]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(BoundingBoxError::NotFinite);
        }
        let lon_ok = |v: f64| (-180.0..=180.0).contains(&v);
        let lat_ok = |v: f64| (-90.0..=90.0).contains(&v);
        if !(lon_ok(min_lon) && lon_ok(max_lon) && lat_ok(min_lat) && lat_ok(max_lat)) {
            return Err(BoundingBoxError::OutOfRange {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }
        Ok(Self {
            rect: Rect::new(
                Coord {
                    x: min_lon,
                    y: min_lat,
                },
                Coord {
                    x: max_lon,
                    y: max_lat,
                },
            ),
        })
    }

    /// Wrap an existing rectangle.
    #[must_use]
    pub const fn from_rect(rect: Rect<f64>) -> Self {
        Self { rect }
    }

    /// Underlying rectangle.
    #[must_use]
    pub const fn rect(&self) -> Rect<f64> {
        self.rect
    }

    /// South-west corner.
    #[must_use]
    pub fn min(&self) -> Coord<f64> {
        self.rect.min()
    }

    /// North-east corner.
    #[must_use]
    pub fn max(&self) -> Coord<f64> {
        self.rect.max()
    }

    /// Return `true` when `coord` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        // `Intersects` treats boundary points as inside the rectangle.
        self.rect.intersects(&coord)
    }

    /// Return `true` when the boxes share any point.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.rect.intersects(&other.rect)
    }

    /// East-west extent in metres, measured along the southern edge.
    #[must_use]
    pub fn width_m(&self) -> f64 {
        let min = self.min();
        distance_m(min, Coord { x: self.max().x, y: min.y })
    }

    /// North-south extent in metres.
    #[must_use]
    pub fn height_m(&self) -> f64 {
        let min = self.min();
        distance_m(min, Coord { x: min.x, y: self.max().y })
    }

    /// Longer of the two side lengths in metres.
    #[must_use]
    pub fn longest_side_m(&self) -> f64 {
        self.width_m().max(self.height_m())
    }

    /// Split across the longer side into two halves.
    ///
    /// The halves share the dividing edge, so their union covers the
    /// original box exactly.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "midpoint of an edge")]
    pub fn split(&self) -> (Self, Self) {
        let min = self.min();
        let max = self.max();
        if self.width_m() >= self.height_m() {
            let mid = min.x + (max.x - min.x) / 2.0;
            (
                Self::from_rect(Rect::new(min, Coord { x: mid, y: max.y })),
                Self::from_rect(Rect::new(Coord { x: mid, y: min.y }, max)),
            )
        } else {
            let mid = min.y + (max.y - min.y) / 2.0;
            (
                Self::from_rect(Rect::new(min, Coord { x: max.x, y: mid })),
                Self::from_rect(Rect::new(Coord { x: min.x, y: mid }, max)),
            )
        }
    }

    /// Render as `min_lon,min_lat,max_lon,max_lat`, the form most
    /// tile services accept in query strings.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let min = self.min();
        let max = self.max();
        format!("{},{},{},{}", min.x, min.y, max.x, max.y)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BoundingBoxError::Malformed {
            input: s.to_owned(),
        };
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;
        match values.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                Self::new(*min_lon, *min_lat, *max_lon, *max_lat)
            }
            _ => Err(malformed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_query_string_form() {
        let bbox: BoundingBox = "1.5,2,3,4.25".parse().expect("valid bbox");
        assert_eq!(bbox.to_query_string(), "1.5,2,3,4.25");
    }

    #[rstest]
    #[case("1,2,3")]
    #[case("a,b,c,d")]
    #[case("0,0,200,1")]
    #[case("0,NaN,1,1")]
    fn rejects_invalid_text(#[case] input: &str) {
        assert!(input.parse::<BoundingBox>().is_err());
    }

    #[rstest]
    fn normalises_swapped_corners() {
        let bbox = BoundingBox::new(1.0, 1.0, 0.0, 0.0).expect("valid bbox");
        assert_eq!(bbox.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(bbox.max(), Coord { x: 1.0, y: 1.0 });
    }

    #[rstest]
    fn boundary_points_are_contained() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).expect("valid bbox");
        assert!(bbox.contains(Coord { x: 1.0, y: 0.5 }));
        assert!(!bbox.contains(Coord { x: 1.1, y: 0.5 }));
    }

    #[rstest]
    fn split_divides_the_longer_side() {
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 1.0).expect("valid bbox");
        let (west, east) = bbox.split();
        assert_eq!(west.max().x, 1.0);
        assert_eq!(east.min().x, 1.0);
        assert_eq!(west.max().y, 1.0);
        assert!(west.intersects(&east));
    }
}
