use std::fmt::{Display, Formatter};
use crate::coord::{Coord, EARTH_RADIUS_IN_MILES};
use crate::grid::{RegionGrid, RegionIndices};

/// A rectangular box between two corners. If the western longitude is larger
/// than the eastern one, the box crosses the date line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Boundary {
    pub botleft: Coord,
    pub topright: Coord,
}

impl Boundary {
    pub fn new(botleft: Coord, topright: Coord) -> Self {
        Self { botleft, topright }
    }

    pub fn contains(&self, coord: &Coord) -> bool {
        if !(coord.lat >= self.botleft.lat && coord.lat <= self.topright.lat) {
            return false;
        }
        let (west, east) = (self.botleft.long, self.topright.long);
        if west <= east {
            coord.long >= west && coord.long <= east
        } else {
            (coord.long >= west && coord.long <= east + 360.0)
                || (coord.long >= west - 360.0 && coord.long <= east)
        }
    }

    /// Area in square miles.
    pub fn square_area(&self) -> f64 {
        let lat1 = self.botleft.lat.to_radians();
        let lat2 = self.topright.lat.to_radians();
        let lon1 = self.botleft.long.to_radians();
        let lon2 = self.topright.long.to_radians();
        EARTH_RADIUS_IN_MILES * EARTH_RADIUS_IN_MILES * (lat1.sin() - lat2.sin()).abs() * (lon1 - lon2).abs()
    }

    /// Every tiling region touched by the box, longitudes wrap at the date line.
    pub fn iter_tiling_regions(&self, grid: &RegionGrid) -> Vec<RegionIndices> {
        let (bot_latind, left_longind) = grid.coord_to_tiling_region_indices(&self.botleft);
        let (top_latind, right_longind) = grid.coord_to_tiling_region_indices(&self.topright);
        let mut result = Vec::new();
        for latind in bot_latind..=top_latind {
            let mut longind = left_longind;
            // bounded so that indices outside of the grid can not loop forever
            for _ in 0..grid.num_longinds() {
                result.push((latind, longind));
                if longind == right_longind {
                    break;
                }
                longind = if longind >= grid.max_longind() {
                    grid.min_longind()
                } else {
                    longind + 1
                };
            }
        }
        result
    }
}

impl Display for Boundary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.botleft, self.topright)
    }
}
