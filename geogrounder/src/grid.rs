use crate::coord::{Coord, MILES_PER_DEGREE};
use crate::errors::ConfigError;

/// The `(latind, longind)` of the south west tiling region of a region.
pub type RegionIndices = (i32, i32);

/// The discretisation of the globe into tiling regions of `degrees_per_region`
/// degrees on a side, and into statistical regions of `width_of_stat_region`
/// tiling regions on a side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RegionGrid {
    degrees_per_region: f64,
    width_of_stat_region: i32,
    min_latind: i32,
    max_latind: i32,
    min_longind: i32,
    max_longind: i32,
}

impl RegionGrid {
    pub const DEFAULT_MILES_PER_REGION: f64 = 100.0;

    pub fn new(degrees_per_region: f64, width_of_stat_region: i32) -> Result<Self, ConfigError> {
        if !(degrees_per_region > 0.0) {
            return Err(ConfigError::InvalidValue("degrees-per-region", degrees_per_region.to_string()));
        }
        if width_of_stat_region <= 0 {
            return Err(ConfigError::InvalidValue("width-of-stat-region", width_of_stat_region.to_string()));
        }
        let mut grid = Self {
            degrees_per_region,
            width_of_stat_region,
            min_latind: 0,
            max_latind: 0,
            min_longind: 0,
            max_longind: 0,
        };
        (grid.max_latind, grid.max_longind) = grid.coord_to_tiling_region_indices(&Coord::new(90.0 - 1e-10, 180.0 - 1e-10));
        (grid.min_latind, grid.min_longind) = grid.coord_to_tiling_region_indices(&Coord::new(-90.0, -180.0));
        Ok(grid)
    }

    /// Uses the degrees if given, else converts the miles.
    pub fn from_sizes(degrees_per_region: Option<f64>, miles_per_region: f64, width_of_stat_region: i32) -> Result<Self, ConfigError> {
        let degrees = match degrees_per_region {
            Some(degrees) => degrees,
            None => {
                if !(miles_per_region > 0.0) {
                    return Err(ConfigError::InvalidValue("miles-per-region", miles_per_region.to_string()));
                }
                miles_per_region / MILES_PER_DEGREE
            }
        };
        Self::new(degrees, width_of_stat_region)
    }

    pub fn degrees_per_region(&self) -> f64 {
        self.degrees_per_region
    }

    pub fn width_of_stat_region(&self) -> i32 {
        self.width_of_stat_region
    }

    pub fn min_latind(&self) -> i32 {
        self.min_latind
    }

    pub fn max_latind(&self) -> i32 {
        self.max_latind
    }

    pub fn min_longind(&self) -> i32 {
        self.min_longind
    }

    pub fn max_longind(&self) -> i32 {
        self.max_longind
    }

    /// The number of distinct longitude indices, the period of the longitude wrap.
    pub fn num_longinds(&self) -> i32 {
        self.max_longind - self.min_longind + 1
    }

    /// Wraps a longitude index past the date line back to the start.
    pub fn wrap_longind(&self, longind: i32) -> i32 {
        let mut longind = longind;
        while longind > self.max_longind {
            longind -= self.num_longinds();
        }
        while longind < self.min_longind {
            longind += self.num_longinds();
        }
        longind
    }

    pub fn coord_to_tiling_region_indices(&self, coord: &Coord) -> RegionIndices {
        let latind = (coord.lat / self.degrees_per_region).floor() as i32;
        let longind = (coord.long / self.degrees_per_region).floor() as i32;
        (latind, longind)
    }

    /// Indices of the statistical region whose center is closest to the coordinate.
    pub fn coord_to_stat_region_indices(&self, coord: &Coord) -> RegionIndices {
        let offset = (self.width_of_stat_region - 1) as f64 / 2.0 * self.degrees_per_region;
        self.coord_to_tiling_region_indices(&Coord::new(coord.lat - offset, coord.long - offset))
    }

    pub fn region_indices_to_coord(&self, latind: i32, longind: i32, coerce: bool) -> Coord {
        let lat = latind as f64 * self.degrees_per_region;
        let long = longind as f64 * self.degrees_per_region;
        if coerce {
            Coord::coerced(lat, long)
        } else {
            Coord::new(lat, long)
        }
    }

    fn offset_coord(&self, latind: i32, longind: i32, offset: f64) -> Coord {
        let lat = (latind as f64 + offset) * self.degrees_per_region;
        let long = (longind as f64 + offset) * self.degrees_per_region;
        Coord::coerced(lat, long)
    }

    pub fn tiling_region_indices_to_near_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        self.region_indices_to_coord(latind, longind, false)
    }

    pub fn tiling_region_indices_to_center_coord(&self, latind: i32, longind: i32) -> Coord {
        self.offset_coord(latind, longind, 0.5)
    }

    pub fn tiling_region_indices_to_far_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        self.offset_coord(latind, longind, 1.0)
    }

    pub fn stat_region_indices_to_near_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        self.region_indices_to_coord(latind, longind, false)
    }

    pub fn stat_region_indices_to_center_coord(&self, latind: i32, longind: i32) -> Coord {
        self.offset_coord(latind, longind, self.width_of_stat_region as f64 / 2.0)
    }

    pub fn stat_region_indices_to_far_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        self.offset_coord(latind, longind, self.width_of_stat_region as f64)
    }

    pub fn stat_region_indices_to_nw_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        let far = self.stat_region_indices_to_far_corner_coord(latind, longind);
        let near = self.stat_region_indices_to_near_corner_coord(latind, longind);
        Coord::new(far.lat, near.long)
    }

    pub fn stat_region_indices_to_se_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        let far = self.stat_region_indices_to_far_corner_coord(latind, longind);
        let near = self.stat_region_indices_to_near_corner_coord(latind, longind);
        Coord::new(near.lat, far.long)
    }

    pub fn stat_region_indices_to_sw_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        self.stat_region_indices_to_near_corner_coord(latind, longind)
    }

    pub fn stat_region_indices_to_ne_corner_coord(&self, latind: i32, longind: i32) -> Coord {
        self.stat_region_indices_to_far_corner_coord(latind, longind)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::coord::Coord;
    use crate::grid::RegionGrid;

    #[test]
    fn index_range_for_one_degree(){
        let grid = RegionGrid::new(1.0, 1).unwrap();
        assert_eq!(-90, grid.min_latind());
        assert_eq!(89, grid.max_latind());
        assert_eq!(-180, grid.min_longind());
        assert_eq!(179, grid.max_longind());
        assert_eq!(360, grid.num_longinds());
        assert_eq!(-180, grid.wrap_longind(180));
        assert_eq!(179, grid.wrap_longind(-181));
    }

    #[test]
    fn coordinates_and_indices(){
        let grid = RegionGrid::new(1.0, 1).unwrap();
        assert_eq!((48, 2), grid.coord_to_tiling_region_indices(&Coord::new(48.85, 2.35)));
        assert_eq!((-1, -1), grid.coord_to_tiling_region_indices(&Coord::new(-0.5, -0.5)));
        assert_eq!((48, 2), grid.coord_to_stat_region_indices(&Coord::new(48.85, 2.35)));
        let center = grid.stat_region_indices_to_center_coord(48, 2);
        assert_relative_eq!(48.5, center.lat);
        assert_relative_eq!(2.5, center.long);
        assert_eq!(Coord::new(49.0, 2.0), grid.stat_region_indices_to_nw_corner_coord(48, 2));
        assert_eq!(Coord::new(48.0, 3.0), grid.stat_region_indices_to_se_corner_coord(48, 2));
        // far corner past the date line is wrapped
        assert_eq!(Coord::new(10.0, -180.0), grid.tiling_region_indices_to_far_corner_coord(9, 179));
    }

    #[test]
    fn wide_stat_regions_are_shifted(){
        let grid = RegionGrid::new(1.0, 3).unwrap();
        assert_eq!((47, 1), grid.coord_to_stat_region_indices(&Coord::new(48.85, 2.35)));
        let center = grid.stat_region_indices_to_center_coord(47, 1);
        assert_relative_eq!(48.5, center.lat);
        assert_relative_eq!(2.5, center.long);
    }

    #[test]
    fn sizes_are_validated(){
        assert!(RegionGrid::new(0.0, 1).is_err());
        assert!(RegionGrid::new(1.0, 0).is_err());
        assert!(RegionGrid::from_sizes(None, -1.0, 1).is_err());
        let grid = RegionGrid::from_sizes(None, 100.0, 1).unwrap();
        assert_relative_eq!(100.0 / crate::coord::MILES_PER_DEGREE, grid.degrees_per_region());
    }
}
