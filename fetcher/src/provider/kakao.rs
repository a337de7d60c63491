use crate::error::FetchError;
use airquality_core::{Coordinates, ProjectedCoordinates};
use reqwest::{Client as HTTPClient, Request, Url};
use serde::Deserialize;

const TRANSCOORD_PATH: &str = "/v2/local/geo/transcoord.json";

/// Kakao Local coordinate transform client.
#[derive(Clone)]
pub struct KakaoLocal {
    http_client: HTTPClient,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TranscoordResponse {
    #[serde(default)]
    documents: Vec<TranscoordDocument>,
}

#[derive(Debug, Deserialize)]
struct TranscoordDocument {
    x: f64,
    y: f64,
}

impl KakaoLocal {
    pub fn new(
        http_client: HTTPClient,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    /// Converts a WGS84 position to TM. `None` when Kakao returns no document.
    pub async fn project_to_tm(
        &self,
        coordinates: Coordinates,
    ) -> Result<Option<ProjectedCoordinates>, FetchError> {
        let request = self.transcoord_request(coordinates)?;
        let response = self.http_client.execute(request).await?;
        response.error_for_status_ref()?;
        let payload = response.text().await?;
        parse_transcoord(&payload)
    }

    /// Kakao expects `x` to be the longitude and `y` the latitude.
    pub(crate) fn transcoord_request(&self, coordinates: Coordinates) -> Result<Request, FetchError> {
        let api_base = self.api_base.trim_end_matches('/');
        let url = Url::parse_with_params(
            &format!("{api_base}{TRANSCOORD_PATH}"),
            &[
                ("x", coordinates.longitude.to_string()),
                ("y", coordinates.latitude.to_string()),
                ("input_coord", "WGS84".to_string()),
                ("output_coord", "TM".to_string()),
            ],
        )
        .map_err(|err| FetchError::InvalidUrl(err.to_string()))?;

        Ok(self
            .http_client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("KakaoAK {}", self.api_key),
            )
            .build()?)
    }
}

fn parse_transcoord(payload: &str) -> Result<Option<ProjectedCoordinates>, FetchError> {
    let response: TranscoordResponse = serde_json::from_str(payload)?;
    Ok(response
        .documents
        .into_iter()
        .next()
        .map(|document| ProjectedCoordinates {
            x: document.x,
            y: document.y,
        }))
}
