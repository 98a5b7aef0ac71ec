//! Physical constants and fixed engine parameters

/// Mean Earth radius used by the spherical distance formulas (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS84 eccentricity squared, as used by the USGS Bulletin 1532 UTM equations
pub const WGS84_ECCENTRICITY_SQUARED: f64 = 0.00669438;

/// UTM central meridian scale factor
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

/// UTM false easting (meters)
pub const UTM_FALSE_EASTING_M: f64 = 500_000.0;

/// UTM false northing applied in the southern hemisphere (meters)
pub const UTM_FALSE_NORTHING_SOUTH_M: f64 = 10_000_000.0;

/// Sentinel "previous accuracy" used after resets, worse than any real fix (meters)
pub const UNKNOWN_ACCURACY_M: f32 = 9999.0;
