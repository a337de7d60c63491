//! Domain model for air-quality lookups: stations, measurements and grades.
//!
//! Nothing in here performs I/O. Provider clients live in the fetcher crate and
//! convert their payloads into these types.

pub mod grade;
pub mod measurement;
pub mod pollutant;
pub mod station;

pub use grade::{Grade, grade_of};
pub use measurement::MeasuredValue;
pub use pollutant::Pollutant;
pub use station::{Coordinates, MonitoringStation, ProjectedCoordinates};
