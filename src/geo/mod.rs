//! Geolocation subsystem.
//!
//! # Data Flow
//! ```text
//! Query source IP
//!     → locator.rs (GeoLite2 City lookup → GeoCoord)
//!
//! Backend name
//!     → locations.rs (country code → fixed GeoCoord, once at registration)
//!
//! SelectionEngine
//!     → distance.rs (Vincenty miles between the two)
//! ```

pub mod distance;
pub mod locations;
pub mod locator;

use serde::Serialize;

pub use distance::distance_miles;
pub use locator::{GeoError, GeoLocator, MaxMindLocator};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoCoord {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoord {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}
