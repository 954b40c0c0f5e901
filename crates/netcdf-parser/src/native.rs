//! Native NetCDF reading using the netcdf library.
//!
//! Daily model output stores one variable per file with dimensions
//! `(time, lat, lon)`. Coordinate variables share the dimension names, and
//! the time variable carries CF `units` and `calendar` attributes.

use std::path::Path;
use std::sync::Once;

use tracing::debug;

use crate::cf::decode_times;
use crate::error::{NetCdfError, NetCdfResult};
use crate::field::DailyField;

/// Values at or above this magnitude are treated as fill (CF default fill is 9.97e36).
const FILL_THRESHOLD: f32 = 1.0e20;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even when a lookup for an optional
/// attribute fails and is handled on the Rust side. Call once early in
/// `main()`; repeated calls are no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read one daily variable from a NetCDF file.
pub fn read_daily_field(path: &Path, variable: &str) -> NetCdfResult<DailyField> {
    silence_hdf5_errors();

    let file = netcdf::open(path).map_err(|e| {
        NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let var = file
        .variable(variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", variable)))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    if dims.len() != 3 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has dimensions {:?}, expected (time, lat, lon)",
            variable, dims
        )));
    }

    let lats = read_coordinate(&file, &dims[1])?;
    let lons = read_coordinate(&file, &dims[2])?;

    let time_var = file
        .variable(&dims[0])
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", dims[0])))?;
    let raw_times: Vec<f64> = time_var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read time: {}", e)))?;
    let time_units = get_string_attr(&time_var, "units")
        .ok_or_else(|| NetCdfError::MissingData("time units attribute".to_string()))?;
    let calendar = get_string_attr(&time_var, "calendar").unwrap_or_else(|| "standard".to_string());
    let times = decode_times(&raw_times, &time_units, &calendar)?;

    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", variable, e)))?;

    let fill_value = get_f32_attr(&var, "_FillValue").or_else(|| get_f32_attr(&var, "missing_value"));
    let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);

    let data: Vec<f32> = raw
        .into_iter()
        .map(|val| {
            if Some(val) == fill_value || !val.is_finite() || val.abs() >= FILL_THRESHOLD {
                f32::NAN
            } else {
                val * scale_factor + add_offset
            }
        })
        .collect();

    let units = get_string_attr(&var, "units").unwrap_or_default();

    debug!(
        path = %path.display(),
        variable = variable,
        nt = times.len(),
        ny = lats.len(),
        nx = lons.len(),
        units = %units,
        calendar = %calendar,
        "Read daily field"
    );

    Ok(DailyField {
        variable: variable.to_string(),
        lats,
        lons,
        times,
        data,
        units,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_coordinate(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate", name)))?;
    var.get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
