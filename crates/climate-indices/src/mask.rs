//! Region masks aligned to a grid's (lat, lon) cells.

use climate_common::{BoundingBox, ClimateError, ClimateResult, Grid};

use crate::geometry::Polygon;

/// Boolean selection of grid cells.
///
/// Shape always equals the grid's `(lat, lon)` shape; the flat indices of
/// selected cells are kept in ascending order so index kernels can iterate
/// only over the region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    ny: usize,
    nx: usize,
    cells: Vec<bool>,
    selected: Vec<usize>,
}

impl RegionMask {
    /// Wrap a raw cell selection; an empty selection is allowed here.
    pub fn from_cells(ny: usize, nx: usize, cells: Vec<bool>) -> ClimateResult<Self> {
        if cells.len() != ny * nx {
            return Err(ClimateError::InvalidGrid(format!(
                "mask holds {} cells, shape {}x{} needs {}",
                cells.len(),
                ny,
                nx,
                ny * nx
            )));
        }
        let selected = cells
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect();
        Ok(Self {
            ny,
            nx,
            cells,
            selected,
        })
    }

    /// Every cell of the grid.
    pub fn full(grid: &Grid) -> Self {
        let (ny, nx) = grid.shape();
        Self {
            ny,
            nx,
            cells: vec![true; ny * nx],
            selected: (0..ny * nx).collect(),
        }
    }

    /// Cells whose centre lies in the box, edges inclusive.
    ///
    /// Fails with `InvalidBbox` for swapped or out-of-range bounds and with
    /// `EmptyMask` when no cell is selected.
    pub fn from_bbox(grid: &Grid, bbox: &BoundingBox, region: &str) -> ClimateResult<Self> {
        bbox.validate()?;
        Self::select(grid, region, |lat, lon| bbox.contains(lat, lon))
    }

    /// Cells whose centre lies inside (or on the boundary of) any polygon.
    pub fn from_polygons(grid: &Grid, polygons: &[Polygon], region: &str) -> ClimateResult<Self> {
        Self::select(grid, region, |lat, lon| {
            polygons.iter().any(|p| p.contains(lat, lon))
        })
    }

    fn select<F>(grid: &Grid, region: &str, inside: F) -> ClimateResult<Self>
    where
        F: Fn(f64, f64) -> bool,
    {
        let (ny, nx) = grid.shape();
        let mut cells = vec![false; ny * nx];
        for (y, &lat) in grid.lats().iter().enumerate() {
            for (x, &lon) in grid.lons().iter().enumerate() {
                cells[y * nx + x] = inside(lat, lon);
            }
        }
        Self::from_cells(ny, nx, cells)?.non_empty(region)
    }

    /// Fail with `EmptyMask` if nothing is selected.
    pub fn non_empty(self, region: &str) -> ClimateResult<Self> {
        if self.is_empty() {
            return Err(ClimateError::empty_mask(region));
        }
        Ok(self)
    }

    /// Cells selected by both masks.
    pub fn intersect(&self, other: &RegionMask) -> ClimateResult<Self> {
        self.combine(other, |a, b| a && b)
    }

    /// Cells selected by either mask.
    pub fn union(&self, other: &RegionMask) -> ClimateResult<Self> {
        self.combine(other, |a, b| a || b)
    }

    fn combine(&self, other: &RegionMask, op: impl Fn(bool, bool) -> bool) -> ClimateResult<Self> {
        if self.shape() != other.shape() {
            return Err(ClimateError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        let cells = self
            .cells
            .iter()
            .zip(&other.cells)
            .map(|(&a, &b)| op(a, b))
            .collect();
        Self::from_cells(self.ny, self.nx, cells)
    }

    /// Precondition check: the mask must have exactly the grid's shape.
    pub fn check_grid(&self, grid: &Grid) -> ClimateResult<()> {
        if self.shape() != grid.shape() {
            return Err(ClimateError::ShapeMismatch {
                expected: grid.shape(),
                actual: self.shape(),
            });
        }
        Ok(())
    }

    /// Shape as (lat, lon).
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Number of selected cells.
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn get(&self, y: usize, x: usize) -> bool {
        y < self.ny && x < self.nx && self.cells[y * self.nx + x]
    }

    /// Flat indices of selected cells, ascending.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }
}
