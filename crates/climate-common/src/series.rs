//! Daily gridded time series.

use crate::error::{ClimateError, ClimateResult};
use crate::grid::Grid;
use crate::period::{Aggregation, PeriodIndex, TimeRange};

/// Daily values of one variable for one model and experiment.
///
/// Indexed `(time, lat, lon)` in row-major order; missing days are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    data: Vec<f32>,
    nt: usize,
    ny: usize,
    nx: usize,
}

impl DailySeries {
    /// Wrap a flat buffer, checking it matches the given shape.
    pub fn new(data: Vec<f32>, nt: usize, ny: usize, nx: usize) -> ClimateResult<Self> {
        if data.len() != nt * ny * nx {
            return Err(ClimateError::InvalidGrid(format!(
                "series holds {} values, shape {}x{}x{} needs {}",
                data.len(),
                nt,
                ny,
                nx,
                nt * ny * nx
            )));
        }
        Ok(Self { data, nt, ny, nx })
    }

    /// Wrap a flat buffer laid out on `grid`.
    pub fn for_grid(grid: &Grid, data: Vec<f32>) -> ClimateResult<Self> {
        Self::new(data, grid.nt(), grid.ny(), grid.nx())
    }

    /// Shape as (time, lat, lon).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nt, self.ny, self.nx)
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Cells per daily field.
    pub fn cells(&self) -> usize {
        self.ny * self.nx
    }

    /// The whole field for time step `t`.
    pub fn day(&self, t: usize) -> &[f32] {
        let n = self.cells();
        &self.data[t * n..(t + 1) * n]
    }

    pub fn get(&self, t: usize, y: usize, x: usize) -> Option<f32> {
        if t >= self.nt || y >= self.ny || x >= self.nx {
            return None;
        }
        Some(self.data[(t * self.ny + y) * self.nx + x])
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Multiply every value in place (unit conversion).
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Whether the series is laid out on `grid`.
    pub fn matches(&self, grid: &Grid) -> bool {
        self.nt == grid.nt() && self.ny == grid.ny() && self.nx == grid.nx()
    }
}

/// A daily series borrowed together with the grid that describes it.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    pub grid: &'a Grid,
    pub series: &'a DailySeries,
    /// Requested time window; periods outside the data come out empty.
    pub window: Option<TimeRange>,
}

impl<'a> SeriesView<'a> {
    pub fn new(grid: &'a Grid, series: &'a DailySeries) -> ClimateResult<Self> {
        if !series.matches(grid) {
            let (nt, ny, nx) = series.shape();
            return Err(ClimateError::InvalidGrid(format!(
                "series shape {}x{}x{} does not match grid {}x{}x{}",
                nt,
                ny,
                nx,
                grid.nt(),
                grid.ny(),
                grid.nx()
            )));
        }
        Ok(Self {
            grid,
            series,
            window: None,
        })
    }

    pub fn with_window(mut self, window: Option<TimeRange>) -> Self {
        self.window = window;
        self
    }

    /// Partition the time axis for an aggregation.
    pub fn periods(&self, aggregation: Aggregation) -> PeriodIndex {
        PeriodIndex::build(aggregation, self.grid.times(), self.window)
    }
}

/// Restrict a grid and its series to the days within `range`.
pub fn clip_time(
    grid: &Grid,
    series: &DailySeries,
    range: TimeRange,
) -> ClimateResult<(Grid, DailySeries)> {
    if !series.matches(grid) {
        return Err(ClimateError::InvalidGrid(
            "series does not match grid".to_string(),
        ));
    }
    let span = grid.time_index_range(range.start, range.end);
    let cells = series.cells();
    let times = grid.times()[span.clone()].to_vec();
    let data = series.data()[span.start * cells..span.end * cells].to_vec();
    let clipped = grid.with_times(times);
    let series = DailySeries::for_grid(&clipped, data)?;
    Ok((clipped, series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grid(days: usize) -> Grid {
        let start = NaiveDate::from_ymd_opt(2000, 12, 30).unwrap();
        Grid::new(vec![1.0, 0.0], vec![10.0, 11.0, 12.0], start.iter_days().take(days).collect())
            .unwrap()
    }

    #[test]
    fn test_series_shape_checked() {
        let g = grid(2);
        assert!(DailySeries::for_grid(&g, vec![0.0; 12]).is_ok());
        assert!(DailySeries::for_grid(&g, vec![0.0; 11]).is_err());
    }

    #[test]
    fn test_day_and_get() {
        let g = grid(2);
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let s = DailySeries::for_grid(&g, data).unwrap();
        assert_eq!(s.day(1), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(s.get(1, 1, 2), Some(11.0));
        assert_eq!(s.get(2, 0, 0), None);
    }

    #[test]
    fn test_clip_time() {
        let g = grid(4);
        let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let s = DailySeries::for_grid(&g, data).unwrap();
        let range = TimeRange::years(2001, 2001).unwrap();
        let (cg, cs) = clip_time(&g, &s, range).unwrap();
        assert_eq!(cg.nt(), 2);
        assert_eq!(cg.times()[0], NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
        assert_eq!(cs.day(0)[0], 12.0);
    }
}
