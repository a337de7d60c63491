use serde::{Deserialize, Serialize};

/// WGS84 position reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Planar TM coordinates used by the station directory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCoordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringStation {
    pub name: String,
    pub address: String,
    pub projected_coordinates: ProjectedCoordinates,
}

impl MonitoringStation {
    /// Builds a station only when the provider gave it a usable name.
    pub fn from_parts(
        name: Option<&str>,
        address: Option<&str>,
        projected_coordinates: ProjectedCoordinates,
    ) -> Option<Self> {
        let name = name.map(str::trim).filter(|name| !name.is_empty())?;
        Some(Self {
            name: name.to_string(),
            address: address.map(str::trim).unwrap_or_default().to_string(),
            projected_coordinates,
        })
    }
}
