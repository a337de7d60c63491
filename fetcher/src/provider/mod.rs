use crate::error::FetchError;
use crate::logging;
use airquality_core::{Coordinates, MeasuredValue, MonitoringStation};

pub mod airkorea;
pub mod kakao;

use airkorea::AirKorea;
use kakao::KakaoLocal;

/// Finds the monitoring station closest to a device position.
///
/// `Ok(None)` means the providers answered but had no candidate.
pub trait StationResolver {
    async fn resolve_nearest_station(
        &self,
        coordinates: Coordinates,
    ) -> Result<Option<MonitoringStation>, FetchError>;
}

/// Reads the most recent measurement of a station.
pub trait MeasurementSource {
    async fn fetch_latest_measurement(
        &self,
        station_name: &str,
    ) -> Result<Option<MeasuredValue>, FetchError>;
}

/// Kakao projects the position to TM, AirKorea ranks its stations around it.
#[derive(Clone)]
pub struct NearestStationResolver {
    geocoder: KakaoLocal,
    directory: AirKorea,
}

impl NearestStationResolver {
    pub fn new(geocoder: KakaoLocal, directory: AirKorea) -> Self {
        Self {
            geocoder,
            directory,
        }
    }
}

impl StationResolver for NearestStationResolver {
    async fn resolve_nearest_station(
        &self,
        coordinates: Coordinates,
    ) -> Result<Option<MonitoringStation>, FetchError> {
        let Some(projected) = self.geocoder.project_to_tm(coordinates).await? else {
            logging::Logger::new()
                .coordinates(coordinates)
                .info("geocoding.empty", "No TM candidate for coordinates");
            return Ok(None);
        };
        self.directory.nearest_station(projected).await
    }
}
