//! Common types shared across the climate-indices workspace.
//!
//! Everything here is plain value data: the geographic [`BoundingBox`], the
//! immutable [`Grid`] describing a model's native coordinates, the
//! [`DailySeries`] array borrowed by the index engine, aggregation
//! [`Period`]s, and the [`ClimateError`] taxonomy.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod period;
pub mod series;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::{ClimateError, ClimateResult, ErrorScope};
pub use grid::{Grid, GridKey, LonConvention};
pub use period::{Aggregation, Period, PeriodIndex, Season, TimeRange};
pub use series::{clip_time, DailySeries, SeriesView};
