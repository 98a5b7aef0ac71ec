//! Pure math used by the heading estimators and the POI tracker

pub mod geodesy;
pub mod angles;
pub mod statistics;

pub use geodesy::{
    equirectangular_distance, haversine_distance, initial_bearing, initial_bearing_deg, to_utm,
    to_utm_in_zone, utm_delta, utm_zone, UtmCoordinate,
};
pub use angles::{
    delta_angle, flip_direction, normalize_360, shortest_angle_lerp, signed_angle_from_forward,
    to_positive, wrap_delta,
};
pub use statistics::{mean, median};
