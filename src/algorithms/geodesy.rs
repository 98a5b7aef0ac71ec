//! Geodetic math: great-circle and flat-earth distances, bearings and UTM projection
//!
//! All functions are pure. Coordinates are not validated; callers are expected
//! to pass latitudes in [-90, 90] and longitudes in [-180, 180].

use crate::core::{
    GeoCoordinate, EARTH_RADIUS_M, UTM_FALSE_EASTING_M, UTM_FALSE_NORTHING_SOUTH_M,
    UTM_SCALE_FACTOR, WGS84_ECCENTRICITY_SQUARED, WGS84_SEMI_MAJOR_AXIS_M,
};
use nalgebra::Vector2;

/// Projected UTM coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmCoordinate {
    pub northing: f64,
    pub easting: f64,
    pub zone: u8,
}

/// Great-circle distance in meters using the Haversine formula.
/// Read more here: https://en.wikipedia.org/wiki/Haversine_formula
pub fn haversine_distance(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (delta_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Fast distance in meters using the equirectangular approximation.
///
/// Longitude difference is scaled by the cosine of the mean latitude. Good to
/// well under a meter for the meter-scale deltas the engine feeds it, and it
/// degrades at high latitudes and long distances.
pub fn equirectangular_distance(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    let mean_lat = ((from.latitude + to.latitude) / 2.0).to_radians();
    let x = (to.longitude - from.longitude).to_radians() * mean_lat.cos();
    let y = (to.latitude - from.latitude).to_radians();

    (x * x + y * y).sqrt() * EARTH_RADIUS_M
}

/// Initial great-circle bearing from `from` to `to` in radians, in (-π, π].
///
/// θ = atan2(sin Δλ · cos φ2, cos φ1 · sin φ2 − sin φ1 · cos φ2 · cos Δλ)
pub fn initial_bearing(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat_to.cos();
    let x = lat_from.cos() * lat_to.sin() - lat_from.sin() * lat_to.cos() * delta_lon.cos();

    y.atan2(x)
}

/// Initial bearing in degrees, in (-180, 180]. 0 is north, 90 is east.
pub fn initial_bearing_deg(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    initial_bearing(from, to).to_degrees()
}

/// UTM zone number for a coordinate, including the Norway and Svalbard exceptions
pub fn utm_zone(latitude: f64, longitude: f64) -> u8 {
    let lon = wrap_longitude(longitude);
    let mut zone = ((lon + 180.0) / 6.0) as i32 + 1;

    if (56.0..64.0).contains(&latitude) && (3.0..12.0).contains(&lon) {
        zone = 32;
    }

    if (72.0..84.0).contains(&latitude) {
        if (0.0..9.0).contains(&lon) {
            zone = 31;
        } else if (9.0..21.0).contains(&lon) {
            zone = 33;
        } else if (21.0..33.0).contains(&lon) {
            zone = 35;
        } else if (33.0..42.0).contains(&lon) {
            zone = 37;
        }
    }

    zone.clamp(1, 60) as u8
}

/// Project a coordinate to UTM in its own zone using the USGS Bulletin 1532 transverse Mercator equations (WGS84)
pub fn to_utm(coordinate: &GeoCoordinate) -> UtmCoordinate {
    let zone = utm_zone(coordinate.latitude, wrap_longitude(coordinate.longitude));
    to_utm_in_zone(coordinate, zone)
}

/// Project a coordinate into a given UTM zone, even when it lies outside that zone.
///
/// Southern hemisphere coordinates get the 10 000 km false northing, as in [`to_utm`].
pub fn to_utm_in_zone(coordinate: &GeoCoordinate, zone: u8) -> UtmCoordinate {
    let (easting, mut northing) = transverse_mercator(coordinate, zone);
    if coordinate.latitude < 0.0 {
        northing += UTM_FALSE_NORTHING_SOUTH_M;
    }

    UtmCoordinate {
        northing,
        easting,
        zone,
    }
}

/// Easting (with false easting) and northing (without false northing) in `zone`
fn transverse_mercator(coordinate: &GeoCoordinate, zone: u8) -> (f64, f64) {
    let a = WGS84_SEMI_MAJOR_AXIS_M;
    let ecc_sq = WGS84_ECCENTRICITY_SQUARED;
    let k0 = UTM_SCALE_FACTOR;

    let lon = wrap_longitude(coordinate.longitude);
    let lat_rad = coordinate.latitude.to_radians();
    let lon_rad = lon.to_radians();

    let lon_origin_rad = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();
    let ecc_prime_sq = ecc_sq / (1.0 - ecc_sq);

    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let tan_lat = lat_rad.tan();

    let n = a / (1.0 - ecc_sq * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ecc_prime_sq * cos_lat * cos_lat;
    let big_a = cos_lat * (lon_rad - lon_origin_rad);

    let e4 = ecc_sq * ecc_sq;
    let e6 = e4 * ecc_sq;
    let m = a
        * ((1.0 - ecc_sq / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat_rad
            - (3.0 * ecc_sq / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat_rad).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat_rad).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat_rad).sin());

    let easting = k0
        * n
        * (big_a
            + (1.0 - t + c) * big_a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ecc_prime_sq) * big_a.powi(5) / 120.0)
        + UTM_FALSE_EASTING_M;

    let northing = k0
        * (m + n
            * tan_lat
            * (big_a * big_a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ecc_prime_sq) * big_a.powi(6)
                    / 720.0));

    (easting, northing)
}

/// Flat-plane displacement from `from` to `to` as (east, north) meters via UTM.
///
/// Both points are projected in the zone of `from`, so pairs straddling a zone
/// line or the equator stay continuous.
pub fn utm_delta(from: &GeoCoordinate, to: &GeoCoordinate) -> Vector2<f64> {
    let zone = utm_zone(from.latitude, wrap_longitude(from.longitude));
    let (start_east, start_north) = transverse_mercator(from, zone);
    let (end_east, end_north) = transverse_mercator(to, zone);

    Vector2::new(end_east - start_east, end_north - start_north)
}

fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0) - (((longitude + 180.0) / 360.0) as i64 as f64) * 360.0 - 180.0
}
