//! Native coordinate systems of climate model grids.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// Longitude convention of a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LonConvention {
    /// [-180, 180)
    Deg180,
    /// [0, 360)
    Deg360,
}

impl LonConvention {
    /// Map a longitude into this convention's range.
    pub fn normalize(self, lon: f64) -> f64 {
        match self {
            LonConvention::Deg180 => (lon + 180.0).rem_euclid(360.0) - 180.0,
            LonConvention::Deg360 => lon.rem_euclid(360.0),
        }
    }

    /// Infer the convention of a coordinate sequence.
    pub fn of_longitudes(lons: &[f64]) -> Self {
        if lons.iter().any(|&lon| lon > 180.0) {
            LonConvention::Deg360
        } else {
            LonConvention::Deg180
        }
    }
}

/// Immutable description of a model's native lat/lon/time coordinates.
///
/// Latitudes and longitudes are strictly monotonic (either direction), time
/// steps strictly increasing. Data laid out on this grid is indexed
/// `(time, lat, lon)` in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    lats: Vec<f64>,
    lons: Vec<f64>,
    times: Vec<NaiveDate>,
}

impl Grid {
    /// Create a grid, validating the coordinate invariants.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>, times: Vec<NaiveDate>) -> ClimateResult<Self> {
        check_monotonic("latitude", &lats)?;
        check_monotonic("longitude", &lons)?;
        if let Some(w) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ClimateError::InvalidGrid(format!(
                "time steps must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }
        Ok(Self { lats, lons, times })
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    /// Number of latitude rows.
    pub fn ny(&self) -> usize {
        self.lats.len()
    }

    /// Number of longitude columns.
    pub fn nx(&self) -> usize {
        self.lons.len()
    }

    /// Number of time steps.
    pub fn nt(&self) -> usize {
        self.times.len()
    }

    /// Spatial shape as (lat, lon).
    pub fn shape(&self) -> (usize, usize) {
        (self.ny(), self.nx())
    }

    /// Total number of spatial cells.
    pub fn n_cells(&self) -> usize {
        self.ny() * self.nx()
    }

    /// Flat index of a spatial cell.
    pub fn flat_index(&self, y: usize, x: usize) -> usize {
        y * self.nx() + x
    }

    /// Centre coordinates (lat, lon) of a cell.
    pub fn cell_center(&self, y: usize, x: usize) -> (f64, f64) {
        (self.lats[y], self.lons[x])
    }

    /// Longitude convention of this grid's coordinates.
    pub fn lon_convention(&self) -> LonConvention {
        LonConvention::of_longitudes(&self.lons)
    }

    /// Absolute grid spacing (dlat, dlon); zero along a single-point axis.
    pub fn resolution(&self) -> (f64, f64) {
        let step = |v: &[f64]| if v.len() > 1 { (v[1] - v[0]).abs() } else { 0.0 };
        (step(&self.lats), step(&self.lons))
    }

    /// Key identifying the spatial layout, used to memoise masks.
    pub fn key(&self) -> GridKey {
        let (dlat, dlon) = self.resolution();
        GridKey {
            ny: self.ny(),
            nx: self.nx(),
            lat0: quantize(self.lats.first().copied().unwrap_or_default()),
            lon0: quantize(self.lons.first().copied().unwrap_or_default()),
            dlat: quantize(dlat),
            dlon: quantize(dlon),
        }
    }

    /// Whether two grids share the same spatial coordinates.
    pub fn same_coordinates(&self, other: &Grid) -> bool {
        let close = |a: &[f64], b: &[f64]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
        };
        close(&self.lats, &other.lats) && close(&self.lons, &other.lons)
    }

    /// Range of time indices whose dates fall within `[start, end]`.
    pub fn time_index_range(&self, start: NaiveDate, end: NaiveDate) -> std::ops::Range<usize> {
        let lo = self.times.partition_point(|d| *d < start);
        let hi = self.times.partition_point(|d| *d <= end);
        lo..hi.max(lo)
    }

    /// Same spatial coordinates, restricted time axis.
    pub(crate) fn with_times(&self, times: Vec<NaiveDate>) -> Self {
        Self {
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            times,
        }
    }
}

/// Spatial layout key: shape, origin and resolution in micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridKey {
    pub ny: usize,
    pub nx: usize,
    pub lat0: i64,
    pub lon0: i64,
    pub dlat: i64,
    pub dlon: i64,
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@({:.6},{:.6})/{:.6}x{:.6}",
            self.ny,
            self.nx,
            self.lat0 as f64 / 1e6,
            self.lon0 as f64 / 1e6,
            self.dlat as f64 / 1e6,
            self.dlon as f64 / 1e6
        )
    }
}

fn quantize(v: f64) -> i64 {
    (v * 1e6).round() as i64
}

fn check_monotonic(axis: &str, values: &[f64]) -> ClimateResult<()> {
    if values.is_empty() {
        return Err(ClimateError::InvalidGrid(format!("{} axis is empty", axis)));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ClimateError::InvalidGrid(format!(
            "{} axis contains non-finite values",
            axis
        )));
    }
    let increasing = values.windows(2).all(|w| w[1] > w[0]);
    let decreasing = values.windows(2).all(|w| w[1] < w[0]);
    if !(increasing || decreasing) {
        return Err(ClimateError::InvalidGrid(format!(
            "{} axis must be strictly monotonic",
            axis
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        start.iter_days().take(n).collect()
    }

    #[test]
    fn test_rejects_non_monotonic_axes() {
        let err = Grid::new(vec![0.0, 1.0, 0.5], vec![10.0], days(1)).unwrap_err();
        assert!(matches!(err, ClimateError::InvalidGrid(_)));

        let err = Grid::new(vec![0.0], vec![10.0, 10.0], days(1)).unwrap_err();
        assert!(matches!(err, ClimateError::InvalidGrid(_)));
    }

    #[test]
    fn test_accepts_descending_latitudes() {
        let grid = Grid::new(vec![-21.0, -22.0, -23.0], vec![16.0, 17.0], days(3)).unwrap();
        assert_eq!(grid.shape(), (3, 2));
        assert_eq!(grid.resolution(), (1.0, 1.0));
    }

    #[test]
    fn test_rejects_repeated_time_step() {
        let mut times = days(3);
        times[2] = times[1];
        assert!(Grid::new(vec![0.0], vec![0.0], times).is_err());
    }

    #[test]
    fn test_lon_normalisation() {
        assert_eq!(LonConvention::Deg180.normalize(350.0), -10.0);
        assert_eq!(LonConvention::Deg180.normalize(180.0), -180.0);
        assert_eq!(LonConvention::Deg360.normalize(-10.0), 350.0);
        assert_eq!(LonConvention::Deg360.normalize(16.0), 16.0);
    }

    #[test]
    fn test_grid_key_distinguishes_resolution() {
        let a = Grid::new(vec![0.0, 0.25], vec![0.0, 0.25], days(1)).unwrap();
        let b = Grid::new(vec![0.0, 0.5], vec![0.0, 0.5], days(1)).unwrap();
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
    }

    #[test]
    fn test_time_index_range() {
        let grid = Grid::new(vec![0.0], vec![0.0], days(10)).unwrap();
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2000, 1, 5).unwrap();
        assert_eq!(grid.time_index_range(start, end), 2..5);
    }
}
