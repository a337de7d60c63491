use airquality_core::Coordinates;
use tracing::{error, info};

pub(crate) const TARGET: &str = "airquality_fetcher";

#[derive(Clone, Default)]
pub(crate) struct Logger {
    latitude: Option<f64>,
    longitude: Option<f64>,
    station: Option<String>,
    state: Option<&'static str>,
    error_kind: Option<&'static str>,
    error_text: Option<String>,
}

impl Logger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn coordinates(mut self, coordinates: Coordinates) -> Self {
        self.latitude = Some(coordinates.latitude);
        self.longitude = Some(coordinates.longitude);
        self
    }

    pub(crate) fn station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub(crate) fn state(mut self, state: &'static str) -> Self {
        self.state = Some(state);
        self
    }

    pub(crate) fn error_kind(mut self, error_kind: &'static str) -> Self {
        self.error_kind = Some(error_kind);
        self
    }

    pub(crate) fn error_text(mut self, error_text: impl Into<String>) -> Self {
        self.error_text = Some(error_text.into());
        self
    }

    pub(crate) fn info(&self, event: &'static str, message: &str) {
        let station = self.station.as_deref();
        info!(
            target: TARGET,
            event,
            latitude = self.latitude,
            longitude = self.longitude,
            station = station,
            state = self.state,
            error_kind = self.error_kind,
            error_text = ?self.error_text,
            "{}",
            message
        );
    }

    pub(crate) fn error<E: std::fmt::Debug>(&self, event: &'static str, err: &E, message: &str) {
        let station = self.station.as_deref();
        error!(
            target: TARGET,
            event,
            latitude = self.latitude,
            longitude = self.longitude,
            station = station,
            state = self.state,
            error_kind = self.error_kind,
            error_text = ?self.error_text,
            error = ?err,
            "{}",
            message
        );
    }
}
