use airquality_core::Coordinates;
use serde::{
    Deserialize, Deserializer,
    de::{self, Visitor},
};
use std::fmt;
use thiserror::Error;

use crate::error::FetchError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("location permission denied")]
    PermissionDenied,
}

impl From<LocationError> for FetchError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Unavailable(_) => FetchError::LocationUnavailable,
            LocationError::PermissionDenied => FetchError::PermissionDenied,
        }
    }
}

/// One-shot, high-accuracy position source.
///
/// Implementations do not need to handle cancellation themselves: the
/// orchestrator drops the returned future when the request is superseded.
pub trait LocationProvider {
    async fn current_location(&self) -> Result<Coordinates, LocationError>;
}

/// Function invocation payload carrying the device position.
///
/// Coordinates may arrive as numbers or numeric strings. Anything else leaves
/// the coordinate unset so the cycle fails as "location unavailable".
#[derive(Debug, Clone, Deserialize)]
pub struct LocationEvent {
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub longitude: Option<f64>,
    #[serde(
        default = "permission_granted_default",
        deserialize_with = "deserialize_permission"
    )]
    pub permission_granted: bool,
}

impl Default for LocationEvent {
    /// No fix, permission not refused.
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            permission_granted: permission_granted_default(),
        }
    }
}

fn permission_granted_default() -> bool {
    true
}

/// Only an explicit `false` refuses the permission.
fn deserialize_permission<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let granted = Option::<bool>::deserialize(deserializer)?;
    Ok(granted.unwrap_or_else(permission_granted_default))
}

fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CoordinateVisitor)
}

struct CoordinateVisitor;

impl<'de> Visitor<'de> for CoordinateVisitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number, a string representing a number or null")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value as f64))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value as f64))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Some(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(value.trim().parse::<f64>().ok())
    }

    fn visit_bool<E>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

/// Location source backed by the invocation payload.
#[derive(Debug, Clone)]
pub struct EventLocation {
    event: LocationEvent,
}

impl EventLocation {
    pub fn new(event: LocationEvent) -> Self {
        Self { event }
    }
}

impl LocationProvider for EventLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        if !self.event.permission_granted {
            return Err(LocationError::PermissionDenied);
        }
        match (self.event.latitude, self.event.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates::new(latitude, longitude)),
            _ => Err(LocationError::Unavailable(
                "event carries no coordinates".to_string(),
            )),
        }
    }
}
