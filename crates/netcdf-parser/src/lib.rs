//! NetCDF reading for daily climate model output.
//!
//! CMIP6-style downscaled products ship one `(time, lat, lon)` variable per
//! file and per year. This crate decodes the CF metadata those files carry
//! ([`cf`]), joins per-year parts into a [`DailyField`], and converts it into
//! the engine's [`climate_common::Grid`] / [`climate_common::DailySeries`].
//!
//! # Implementation Notes
//!
//! Reading files requires libnetcdf and HDF5 and is gated behind the
//! `native` feature. Without it, [`read_daily_field`] returns
//! [`NetCdfError::Unavailable`] and everything else still works, which keeps
//! the pure decoding logic testable on machines without the C libraries.

pub mod cf;
pub mod error;
pub mod field;

#[cfg(feature = "native")]
mod native;

pub use cf::{decode_times, precip_to_mm_per_day, Calendar};
pub use error::{NetCdfError, NetCdfResult};
pub use field::DailyField;

#[cfg(feature = "native")]
pub use native::{read_daily_field, silence_hdf5_errors};

/// Read one daily variable from a NetCDF file.
#[cfg(not(feature = "native"))]
pub fn read_daily_field(path: &std::path::Path, variable: &str) -> NetCdfResult<DailyField> {
    Err(NetCdfError::Unavailable(format!(
        "cannot read {} from {}: built without the `native` feature",
        variable,
        path.display()
    )))
}

/// No-op without the `native` feature.
#[cfg(not(feature = "native"))]
pub fn silence_hdf5_errors() {}

/// Whether this build can read NetCDF files.
pub fn native_available() -> bool {
    cfg!(feature = "native")
}
