//! Core types and constants for the AR geopositioning engine

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
