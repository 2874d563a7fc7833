//! Source address geolocation.

use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;

use crate::geo::GeoCoord;

/// Errors from a geolocation lookup.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The database could not be opened at startup.
    #[error("failed to open geo database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: maxminddb::MaxMindDBError,
    },

    /// The address is not in the database.
    #[error("no location for {0}")]
    NotFound(IpAddr),

    /// The database returned a record without coordinates.
    #[error("location for {0} has no coordinates")]
    NoCoordinates(IpAddr),

    /// Any other reader failure.
    #[error("geo lookup for {ip} failed: {source}")]
    Lookup {
        ip: IpAddr,
        #[source]
        source: maxminddb::MaxMindDBError,
    },
}

/// Maps an IP address to a coordinate.
pub trait GeoLocator: Send + Sync + std::fmt::Debug {
    fn locate(&self, ip: IpAddr) -> Result<GeoCoord, GeoError>;
}

/// Locator backed by a MaxMind GeoLite2-City database held in memory.
pub struct MaxMindLocator {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindLocator {
    /// Open the database. A missing file is fatal at startup.
    pub fn open(path: &Path) -> Result<Self, GeoError> {
        let reader = maxminddb::Reader::open_readfile(path).map_err(|source| GeoError::Open {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            database_type = %reader.metadata.database_type,
            "Geo database loaded"
        );
        Ok(Self { reader })
    }
}

impl GeoLocator for MaxMindLocator {
    fn locate(&self, ip: IpAddr) -> Result<GeoCoord, GeoError> {
        let city: maxminddb::geoip2::City = self.reader.lookup(ip).map_err(|e| match e {
            maxminddb::MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound(ip),
            source => GeoError::Lookup { ip, source },
        })?;

        let location = city.location.ok_or(GeoError::NoCoordinates(ip))?;
        match (location.latitude, location.longitude) {
            (Some(latitude), Some(longitude)) => Ok(GeoCoord::new(latitude, longitude)),
            _ => Err(GeoError::NoCoordinates(ip)),
        }
    }
}

impl std::fmt::Debug for MaxMindLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxMindLocator")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}
