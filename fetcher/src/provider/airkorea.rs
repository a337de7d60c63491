use super::MeasurementSource;
use crate::{error::FetchError, logging};
use airquality_core::{Grade, MeasuredValue, MonitoringStation, Pollutant, ProjectedCoordinates};
use chrono::{Duration, NaiveDateTime};
use reqwest::{Client as HTTPClient, Request, Url};
use serde::{
    Deserialize, Deserializer,
    de::{self, DeserializeOwned, Visitor},
};
use std::fmt;

const NEARBY_STATIONS_PATH: &str = "/B552584/MsrstnInfoInqireSvc/getNearbyMsrstnList";
const REALTIME_MEASUREMENTS_PATH: &str =
    "/B552584/ArpltnInforInqireSvc/getMsrstnAcctoRltmMesureDnsty";
const SUCCESS_CODE: &str = "00";
const DATA_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const MEASUREMENT_ROWS: &str = "24";

/// AirKorea open API client: station directory and realtime measurements.
#[derive(Clone)]
pub struct AirKorea {
    http_client: HTTPClient,
    api_base: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: EnvelopeResponse<T>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeResponse<T> {
    header: EnvelopeHeader,
    body: Option<EnvelopeBody<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeHeader {
    result_code: String,
    result_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeBody<T> {
    items: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationItem {
    station_name: Option<String>,
    addr: Option<String>,
    /// Distance from the query point in km.
    #[serde(default, deserialize_with = "deserialize_reading")]
    tm: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementRecord {
    data_time: Option<String>,

    #[serde(default, deserialize_with = "deserialize_reading")]
    pm10_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_reading")]
    pm25_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_reading")]
    so2_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_reading")]
    co_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_reading")]
    o3_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_reading")]
    no2_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_reading")]
    khai_value: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_code")]
    khai_grade: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_code")]
    pm10_grade: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_code")]
    pm25_grade: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_code")]
    so2_grade: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_code")]
    co_grade: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_code")]
    o3_grade: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_code")]
    no2_grade: Option<i64>,

    // Non-empty when the provider marks the reading as invalid
    // (e.g. "통신장애", "점검및교정").
    pm10_flag: Option<String>,
    pm25_flag: Option<String>,
    so2_flag: Option<String>,
    co_flag: Option<String>,
    o3_flag: Option<String>,
    no2_flag: Option<String>,
}

impl AirKorea {
    pub fn new(
        http_client: HTTPClient,
        api_base: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into(),
            service_key: service_key.into(),
        }
    }

    /// First station of the provider's distance-ranked list around `projected`.
    pub async fn nearest_station(
        &self,
        projected: ProjectedCoordinates,
    ) -> Result<Option<MonitoringStation>, FetchError> {
        let request = self.nearby_stations_request(projected)?;
        let payload = self.send(request).await?;
        let items: Vec<StationItem> = parse_items(&payload)?;
        let Some(item) = items.into_iter().next() else {
            return Ok(None);
        };
        let station = MonitoringStation::from_parts(
            item.station_name.as_deref(),
            item.addr.as_deref(),
            projected,
        );
        if let Some(station) = station.as_ref() {
            logging::Logger::new().station(&station.name).info(
                "station.resolved",
                &format!("Nearest station at {:?} km", item.tm),
            );
        }
        Ok(station)
    }

    pub(crate) fn nearby_stations_request(
        &self,
        projected: ProjectedCoordinates,
    ) -> Result<Request, FetchError> {
        self.request(
            NEARBY_STATIONS_PATH,
            &[
                ("tmX", projected.x.to_string()),
                ("tmY", projected.y.to_string()),
                ("ver", "1.1".to_string()),
            ],
        )
    }

    pub(crate) fn measurements_request(&self, station_name: &str) -> Result<Request, FetchError> {
        self.request(
            REALTIME_MEASUREMENTS_PATH,
            &[
                ("stationName", station_name.to_string()),
                ("dataTerm", "DAILY".to_string()),
                ("ver", "1.3".to_string()),
                ("pageNo", "1".to_string()),
                ("numOfRows", MEASUREMENT_ROWS.to_string()),
            ],
        )
    }

    fn request(&self, path: &str, params: &[(&str, String)]) -> Result<Request, FetchError> {
        let api_base = self.api_base.trim_end_matches('/');
        let mut url = Url::parse(&format!("{api_base}{path}"))
            .map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("serviceKey", &self.service_key)
                .append_pair("returnType", "json");
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(self.http_client.get(url).build()?)
    }

    async fn send(&self, request: Request) -> Result<String, FetchError> {
        let response = self.http_client.execute(request).await?;
        response.error_for_status_ref()?;
        Ok(response.text().await?)
    }
}

impl MeasurementSource for AirKorea {
    async fn fetch_latest_measurement(
        &self,
        station_name: &str,
    ) -> Result<Option<MeasuredValue>, FetchError> {
        let request = self.measurements_request(station_name)?;
        let payload = self.send(request).await?;
        let records: Vec<MeasurementRecord> = parse_items(&payload)?;
        Ok(latest_record(records).map(to_measured_value))
    }
}

/// Unwraps the provider envelope, failing on any result code but `00`.
fn parse_items<T: DeserializeOwned>(payload: &str) -> Result<Vec<T>, FetchError> {
    let envelope: Envelope<T> = serde_json::from_str(payload)?;
    let EnvelopeResponse { header, body } = envelope.response;
    if header.result_code != SUCCESS_CODE {
        return Err(FetchError::Provider {
            code: header.result_code,
            message: header.result_msg.unwrap_or_default(),
        });
    }
    Ok(body.and_then(|body| body.items).unwrap_or_default())
}

type TimedRecord = (Option<NaiveDateTime>, MeasurementRecord);

/// Most recent record by `dataTime`; records without a time lose, ties keep
/// the first one.
fn latest_record(records: Vec<MeasurementRecord>) -> Option<TimedRecord> {
    let mut latest: Option<TimedRecord> = None;
    for record in records {
        let measured_at = record.data_time.as_deref().and_then(parse_data_time);
        let newer = match &latest {
            Some((best, _)) => measured_at > *best,
            None => true,
        };
        if newer {
            latest = Some((measured_at, record));
        }
    }
    latest
}

/// Parses `YYYY-MM-DD HH:MM`; the provider writes midnight as `24:00` of the
/// previous day.
fn parse_data_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Some(day) = value.strip_suffix(" 24:00") {
        let midnight =
            NaiveDateTime::parse_from_str(&format!("{day} 00:00"), DATA_TIME_FORMAT).ok()?;
        return midnight.checked_add_signed(Duration::days(1));
    }
    NaiveDateTime::parse_from_str(value, DATA_TIME_FORMAT).ok()
}

fn is_flagged(flag: Option<&str>) -> bool {
    flag.is_some_and(|flag| !flag.trim().is_empty())
}

fn to_measured_value((measured_at, record): TimedRecord) -> MeasuredValue {
    let mut value = MeasuredValue {
        measured_at,
        khai_value: record.khai_value,
        composite_grade: record.khai_grade.map(Grade::from_code),
        ..Default::default()
    };
    let readings = [
        (Pollutant::Pm10, record.pm10_value, record.pm10_grade, record.pm10_flag),
        (Pollutant::Pm25, record.pm25_value, record.pm25_grade, record.pm25_flag),
        (Pollutant::So2, record.so2_value, record.so2_grade, record.so2_flag),
        (Pollutant::Co, record.co_value, record.co_grade, record.co_flag),
        (Pollutant::O3, record.o3_value, record.o3_grade, record.o3_flag),
        (Pollutant::No2, record.no2_value, record.no2_grade, record.no2_flag),
    ];
    for (pollutant, reading, code, flag) in readings {
        if is_flagged(flag.as_deref()) {
            value.set_reading(pollutant, None, None);
        } else {
            value.set_reading(pollutant, reading, code.map(Grade::from_code));
        }
    }
    value
}

/// Accepts numbers, strings and null. `-`, empty and non-numeric strings
/// become a missing reading; booleans, arrays and objects fail to decode.
fn deserialize_reading<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = deserializer.deserialize_any(ProviderNumberVisitor)?;
    Ok(text.and_then(|text| text.parse::<f64>().ok()))
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = deserializer.deserialize_any(ProviderNumberVisitor)?;
    Ok(text.and_then(|text| text.parse::<i64>().ok()))
}

struct ProviderNumberVisitor;

impl<'de> Visitor<'de> for ProviderNumberVisitor {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number, a string representing a number, '-' or null")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let value = value.trim();
        if value.is_empty() || value == "-" {
            Ok(None)
        } else {
            Ok(Some(value.to_string()))
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}
