//! Planar polygons in longitude/latitude degrees.

use climate_common::{BoundingBox, ClimateError, ClimateResult, LonConvention};

/// Tolerance, in degrees, for treating a point as lying on an edge.
const EDGE_EPSILON: f64 = 1e-9;

/// A polygon ring list: one exterior ring and zero or more holes.
///
/// Rings are `(lon, lat)` vertex sequences; a closing vertex equal to the
/// first is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<(f64, f64)>,
    holes: Vec<Vec<(f64, f64)>>,
    convention: LonConvention,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>, holes: Vec<Vec<(f64, f64)>>) -> ClimateResult<Self> {
        check_ring(&exterior)?;
        for hole in &holes {
            check_ring(hole)?;
        }
        let lons: Vec<f64> = exterior.iter().map(|&(lon, _)| lon).collect();
        Ok(Self {
            convention: LonConvention::of_longitudes(&lons),
            exterior,
            holes,
        })
    }

    /// Axis-aligned rectangle covering a bounding box.
    pub fn rectangle(bbox: &BoundingBox) -> ClimateResult<Self> {
        bbox.validate()?;
        Self::new(
            vec![
                (bbox.lon_min, bbox.lat_min),
                (bbox.lon_max, bbox.lat_min),
                (bbox.lon_max, bbox.lat_max),
                (bbox.lon_min, bbox.lat_max),
            ],
            Vec::new(),
        )
    }

    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.exterior
    }

    pub fn holes(&self) -> &[Vec<(f64, f64)>] {
        &self.holes
    }

    /// Longitude convention of the exterior ring.
    pub fn lon_convention(&self) -> LonConvention {
        self.convention
    }

    /// Bounding box of the exterior ring.
    pub fn bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for &(lon, lat) in &self.exterior {
            bbox.lon_min = bbox.lon_min.min(lon);
            bbox.lon_max = bbox.lon_max.max(lon);
            bbox.lat_min = bbox.lat_min.min(lat);
            bbox.lat_max = bbox.lat_max.max(lat);
        }
        bbox
    }

    /// Check if a point is inside the polygon or on its boundary.
    ///
    /// `lon` may use either longitude convention; it is normalised to the
    /// polygon's own before testing.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let lon = self.convention.normalize(lon);

        if on_ring(&self.exterior, lon, lat) {
            return true;
        }
        if !ray_cast(&self.exterior, lon, lat) {
            return false;
        }
        for hole in &self.holes {
            // A hole's edge is part of the polygon boundary.
            if on_ring(hole, lon, lat) {
                return true;
            }
            if ray_cast(hole, lon, lat) {
                return false;
            }
        }
        true
    }
}

fn check_ring(ring: &[(f64, f64)]) -> ClimateResult<()> {
    if ring.iter().any(|&(lon, lat)| !lon.is_finite() || !lat.is_finite()) {
        return Err(ClimateError::config_invalid(
            "polygon ring contains non-finite coordinates",
        ));
    }
    let mut distinct: Vec<(f64, f64)> = ring.to_vec();
    distinct.dedup();
    if distinct.len() > 1 && distinct.first() == distinct.last() {
        distinct.pop();
    }
    if distinct.len() < 3 {
        return Err(ClimateError::config_invalid(format!(
            "polygon ring needs at least 3 distinct vertices, got {}",
            distinct.len()
        )));
    }
    Ok(())
}

/// Even-odd ray casting: count crossings of a ray going east from the point.
fn ray_cast(ring: &[(f64, f64)], lon: f64, lat: f64) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_ring(ring: &[(f64, f64)], lon: f64, lat: f64) -> bool {
    let n = ring.len();
    (0..n).any(|i| on_segment(ring[i], ring[(i + 1) % n], lon, lat))
}

fn on_segment(a: (f64, f64), b: (f64, f64), lon: f64, lat: f64) -> bool {
    let (ax, ay) = a;
    let (bx, by) = b;
    let cross = (bx - ax) * (lat - ay) - (by - ay) * (lon - ax);
    let length = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
    if cross.abs() > EDGE_EPSILON * length.max(1.0) {
        return false;
    }
    lon >= ax.min(bx) - EDGE_EPSILON
        && lon <= ax.max(bx) + EDGE_EPSILON
        && lat >= ay.min(by) - EDGE_EPSILON
        && lat <= ay.max(by) + EDGE_EPSILON
}
