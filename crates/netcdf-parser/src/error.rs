//! Errors raised while decoding daily model files.

use thiserror::Error;

pub type NetCdfResult<T> = Result<T, NetCdfError>;

#[derive(Error, Debug)]
pub enum NetCdfError {
    /// A variable, dimension or attribute the reader needs is absent
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Present but unusable: bad shapes, non-monotonic axes, unreadable file
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// CF calendar that cannot be mapped onto real dates (e.g. `360_day`)
    #[error("Unsupported calendar: {0}")]
    UnsupportedCalendar(String),

    /// Precipitation units with no known conversion to mm/day
    #[error("Unsupported units: {0}")]
    UnsupportedUnits(String),

    /// Built without the `native` feature
    #[error("NetCDF reading unavailable: {0}")]
    Unavailable(String),
}
