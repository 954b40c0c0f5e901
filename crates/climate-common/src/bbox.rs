//! Region bounding boxes in geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};
use crate::grid::LonConvention;

/// A latitude/longitude box, inclusive on every edge.
///
/// Longitudes may be given in [-180, 180) or [0, 360). The convention is
/// inferred from the bounds: anything east of 180° implies [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box. Call [`validate`](Self::validate) before use.
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Create and validate in one step.
    pub fn validated(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> ClimateResult<Self> {
        let bbox = Self::new(lat_min, lat_max, lon_min, lon_max);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Parse a command-line BBOX string: "lat_min,lat_max,lon_min,lon_max"
    pub fn from_arg_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        Ok(Self {
            lat_min: parse(parts[0])?,
            lat_max: parse(parts[1])?,
            lon_min: parse(parts[2])?,
            lon_max: parse(parts[3])?,
        })
    }

    /// Check bounds are finite, ordered and inside the globe.
    ///
    /// Swapped bounds are rejected rather than silently reordered.
    pub fn validate(&self) -> ClimateResult<()> {
        let all = [self.lat_min, self.lat_max, self.lon_min, self.lon_max];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ClimateError::InvalidBbox(format!(
                "non-finite bound in {:?}",
                self
            )));
        }
        if self.lat_min > self.lat_max {
            return Err(ClimateError::InvalidBbox(format!(
                "lat_min ({}) exceeds lat_max ({})",
                self.lat_min, self.lat_max
            )));
        }
        if self.lon_min > self.lon_max {
            return Err(ClimateError::InvalidBbox(format!(
                "lon_min ({}) exceeds lon_max ({})",
                self.lon_min, self.lon_max
            )));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Err(ClimateError::InvalidBbox(format!(
                "latitudes must lie in [-90, 90], got [{}, {}]",
                self.lat_min, self.lat_max
            )));
        }
        if self.lon_min < -180.0 || self.lon_max > 360.0 || self.lon_max - self.lon_min > 360.0 {
            return Err(ClimateError::InvalidBbox(format!(
                "longitudes must lie in [-180, 180] or [0, 360], got [{}, {}]",
                self.lon_min, self.lon_max
            )));
        }
        Ok(())
    }

    /// Longitude convention the bounds are expressed in.
    pub fn lon_convention(&self) -> LonConvention {
        if self.lon_max > 180.0 {
            LonConvention::Deg360
        } else {
            LonConvention::Deg180
        }
    }

    /// Check whether a point lies inside the box (edges inclusive).
    ///
    /// `lon` may use either convention; it is normalised to the box's own.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let lon = self.lon_convention().normalize(lon);
        // +360 catches an eastern edge sitting exactly on the wrap point
        let in_lon = |l: f64| l >= self.lon_min && l <= self.lon_max;
        lat >= self.lat_min && lat <= self.lat_max && (in_lon(lon) || in_lon(lon + 360.0))
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Cache key fragment, quantized to avoid floating point noise.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.6}_{:.6}_{:.6}_{:.6}",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'lat_min,lat_max,lon_min,lon_max'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_bbox() {
        let bbox = BoundingBox::from_arg_string("-35,-21,16,33").unwrap();
        assert_eq!(bbox.lat_min, -35.0);
        assert_eq!(bbox.lat_max, -21.0);
        assert_eq!(bbox.lon_min, 16.0);
        assert_eq!(bbox.lon_max, 33.0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bbox = BoundingBox::validated(-35.0, -21.0, 16.0, 33.0).unwrap();
        assert!(bbox.contains(-35.0, 16.0));
        assert!(bbox.contains(-21.0, 33.0));
        assert!(!bbox.contains(-20.99, 20.0));
    }

    #[test]
    fn test_contains_normalises_longitude() {
        let bbox = BoundingBox::validated(-10.0, 10.0, -20.0, 20.0).unwrap();
        assert!(bbox.contains(0.0, 350.0));
        assert!(!bbox.contains(0.0, 200.0));
    }
}
