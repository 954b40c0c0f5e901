//! Named vegetation biomes loaded from GeoJSON.

use std::collections::HashMap;
use std::path::Path;

use climate_common::{BoundingBox, ClimateError, ClimateResult, Grid};
use geojson::{GeoJson, Value};
use tracing::{debug, warn};

use crate::geometry::Polygon;
use crate::mask::RegionMask;

/// Property holding the biome name in the national vegetation map.
pub const DEFAULT_NAME_PROPERTY: &str = "Veg_Biome";

/// A named region made of one or more polygons.
#[derive(Debug, Clone)]
pub struct BiomeRegion {
    id: usize,
    name: String,
    polygons: Vec<Polygon>,
}

impl BiomeRegion {
    pub fn new(id: usize, name: impl Into<String>, polygons: Vec<Polygon>) -> ClimateResult<Self> {
        let name = name.into();
        if polygons.is_empty() {
            return Err(ClimateError::config_invalid(format!(
                "biome '{}' has no polygons",
                name
            )));
        }
        Ok(Self { id, name, polygons })
    }

    /// A rectangular region covering a bounding box.
    pub fn from_bbox(id: usize, name: impl Into<String>, bbox: &BoundingBox) -> ClimateResult<Self> {
        Self::new(id, name, vec![Polygon::rectangle(bbox)?])
    }

    /// Position of this biome in its source collection.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Whether a point lies in (or on the edge of) any of the polygons.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(lat, lon))
    }

    /// Mask of grid cells whose centres fall inside this biome.
    pub fn mask(&self, grid: &Grid) -> ClimateResult<RegionMask> {
        RegionMask::from_polygons(grid, &self.polygons, &self.name)
    }
}

/// Parse biomes from a GeoJSON FeatureCollection.
///
/// Polygon and MultiPolygon features are grouped by the string value of
/// `name_property`; features sharing a name form one biome. Biomes keep the
/// order in which their names first appear.
pub fn parse_biomes(text: &str, name_property: &str) -> ClimateResult<Vec<BiomeRegion>> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| ClimateError::config_invalid(format!("invalid biome GeoJSON: {}", e)))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(ClimateError::config_invalid(
                "biome GeoJSON must contain features with a name property",
            ))
        }
    };

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<Polygon>> = HashMap::new();

    for (i, feature) in features.iter().enumerate() {
        let name = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name_property))
        {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Null) | None => {
                warn!(feature = i, property = name_property, "Biome feature has no name, skipping");
                continue;
            }
            Some(other) => other.to_string(),
        };

        let polygons = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Polygon(rings)) => vec![polygon_from_rings(rings)?],
            Some(Value::MultiPolygon(parts)) => parts
                .iter()
                .map(|rings| polygon_from_rings(rings))
                .collect::<ClimateResult<Vec<_>>>()?,
            _ => {
                warn!(feature = i, biome = %name, "Biome feature is not a polygon, skipping");
                continue;
            }
        };

        if !grouped.contains_key(&name) {
            order.push(name.clone());
        }
        grouped.entry(name).or_default().extend(polygons);
    }

    if order.is_empty() {
        return Err(ClimateError::config_invalid(format!(
            "biome GeoJSON has no polygon features with property '{}'",
            name_property
        )));
    }

    order
        .into_iter()
        .enumerate()
        .map(|(id, name)| {
            let polygons = grouped.remove(&name).unwrap_or_default();
            BiomeRegion::new(id, name, polygons)
        })
        .collect()
}

/// Read and parse a biome GeoJSON file.
pub fn load_biomes(path: &Path, name_property: &str) -> ClimateResult<Vec<BiomeRegion>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ClimateError::config_invalid(format!("cannot read biome file {}: {}", path.display(), e))
    })?;
    let biomes = parse_biomes(&text, name_property)?;
    debug!(path = %path.display(), count = biomes.len(), "Loaded biomes");
    Ok(biomes)
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> ClimateResult<Polygon> {
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|pos| match pos.as_slice() {
                [lon, lat, ..] => Ok((*lon, *lat)),
                _ => Err(ClimateError::config_invalid("GeoJSON position needs lon and lat")),
            })
            .collect::<ClimateResult<Vec<(f64, f64)>>>()
    });

    let exterior = rings
        .next()
        .ok_or_else(|| ClimateError::config_invalid("GeoJSON polygon has no rings"))??;
    let holes = rings.collect::<ClimateResult<Vec<_>>>()?;
    Polygon::new(exterior, holes)
}
