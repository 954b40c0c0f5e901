//! Tests for BoundingBox parsing, validation and containment.

use climate_common::bbox::{BboxParseError, BoundingBox};
use climate_common::{ClimateError, LonConvention};

// ============================================================================
// from_arg_string tests
// ============================================================================

#[test]
fn test_parse_with_whitespace() {
    let bbox = BoundingBox::from_arg_string(" -35.5, -21.25 ,16, 33.75").unwrap();
    assert!((bbox.lat_min - (-35.5)).abs() < 1e-9);
    assert!((bbox.lat_max - (-21.25)).abs() < 1e-9);
    assert!((bbox.lon_max - 33.75).abs() < 1e-9);
}

#[test]
fn test_parse_too_few_parts() {
    let result = BoundingBox::from_arg_string("-35,-21,16");
    assert!(matches!(result, Err(BboxParseError::InvalidFormat(_))));
}

#[test]
fn test_parse_invalid_number() {
    let result = BoundingBox::from_arg_string("-35,-21,east,33");
    assert!(matches!(result, Err(BboxParseError::InvalidNumber(ref s)) if s == "east"));
}

// ============================================================================
// validate tests
// ============================================================================

#[test]
fn test_swapped_latitudes_rejected() {
    let result = BoundingBox::validated(-21.0, -35.0, 16.0, 33.0);
    assert!(matches!(result, Err(ClimateError::InvalidBbox(_))));
}

#[test]
fn test_swapped_longitudes_rejected() {
    let result = BoundingBox::validated(-35.0, -21.0, 33.0, 16.0);
    assert!(matches!(result, Err(ClimateError::InvalidBbox(_))));
}

#[test]
fn test_out_of_range_latitude_rejected() {
    assert!(BoundingBox::validated(-95.0, 0.0, 0.0, 10.0).is_err());
}

#[test]
fn test_nan_bound_rejected() {
    assert!(BoundingBox::validated(f64::NAN, 0.0, 0.0, 10.0).is_err());
}

#[test]
fn test_degenerate_box_allowed() {
    let bbox = BoundingBox::validated(-30.0, -30.0, 20.0, 20.0).unwrap();
    assert!(bbox.contains(-30.0, 20.0));
    assert_eq!(bbox.width(), 0.0);
}

// ============================================================================
// Longitude convention tests
// ============================================================================

#[test]
fn test_convention_inferred_from_bounds() {
    let east = BoundingBox::validated(-10.0, 10.0, 170.0, 190.0).unwrap();
    assert_eq!(east.lon_convention(), LonConvention::Deg360);

    let west = BoundingBox::validated(-10.0, 10.0, -20.0, 20.0).unwrap();
    assert_eq!(west.lon_convention(), LonConvention::Deg180);
}

#[test]
fn test_box_across_antimeridian_in_360_convention() {
    let bbox = BoundingBox::validated(-10.0, 10.0, 170.0, 190.0).unwrap();
    assert!(bbox.contains(0.0, -175.0));
    assert!(bbox.contains(0.0, 175.0));
    assert!(!bbox.contains(0.0, -160.0));
}

#[test]
fn test_cache_key_stable() {
    let a = BoundingBox::new(-35.0, -21.0, 16.0, 33.0);
    let b = BoundingBox::new(-35.0000000001, -21.0, 16.0, 33.0);
    assert_eq!(a.cache_key(), b.cache_key());
}
