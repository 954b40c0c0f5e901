//! Decoded daily fields and their conversion to engine types.

use chrono::NaiveDate;
use climate_common::{DailySeries, Grid};

use crate::cf::precip_to_mm_per_day;
use crate::error::{NetCdfError, NetCdfResult};

/// One daily `(time, lat, lon)` variable as read from a file.
///
/// Missing values are already NaN; `data` is row-major over
/// `(times, lats, lons)`.
#[derive(Debug, Clone)]
pub struct DailyField {
    pub variable: String,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub times: Vec<NaiveDate>,
    pub data: Vec<f32>,
    pub units: String,
}

impl DailyField {
    /// Join per-year files of one variable along the time axis.
    ///
    /// Parts are ordered by their first date; all must share the same
    /// spatial coordinates and must not overlap in time.
    pub fn concat(mut parts: Vec<DailyField>) -> NetCdfResult<DailyField> {
        if parts.is_empty() {
            return Err(NetCdfError::MissingData("no files to concatenate".to_string()));
        }
        parts.sort_by_key(|p| p.times.first().copied());

        let mut iter = parts.into_iter();
        let mut merged = match iter.next() {
            Some(first) => first,
            None => return Err(NetCdfError::MissingData("no files to concatenate".to_string())),
        };

        for part in iter {
            if !same_axis(&merged.lats, &part.lats) || !same_axis(&merged.lons, &part.lons) {
                return Err(NetCdfError::InvalidFormat(format!(
                    "{} files have differing spatial coordinates",
                    merged.variable
                )));
            }
            if part.units != merged.units {
                return Err(NetCdfError::InvalidFormat(format!(
                    "{} files have differing units ({} vs {})",
                    merged.variable, merged.units, part.units
                )));
            }
            if let (Some(last), Some(first)) = (merged.times.last(), part.times.first()) {
                if first <= last {
                    return Err(NetCdfError::InvalidFormat(format!(
                        "{} files overlap in time at {}",
                        merged.variable, first
                    )));
                }
            }
            merged.times.extend(part.times);
            merged.data.extend(part.data);
        }

        Ok(merged)
    }

    /// Convert precipitation to mm/day in place.
    pub fn convert_precipitation(&mut self) -> NetCdfResult<()> {
        let factor = precip_to_mm_per_day(&self.units)?;
        if factor != 1.0 {
            for v in &mut self.data {
                *v *= factor;
            }
        }
        self.units = "mm/day".to_string();
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.lats.len(), self.lons.len())
    }

    /// Validate coordinates and hand the field over as a grid plus series.
    pub fn into_grid(self) -> NetCdfResult<(Grid, DailySeries)> {
        let grid = Grid::new(self.lats, self.lons, self.times)
            .map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;
        let series = DailySeries::for_grid(&grid, self.data)
            .map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;
        Ok((grid, series))
    }
}

fn same_axis(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}
