use anyhow::{Context, Result};
use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use reqwest::Client as HTTPClient;
use serde_json::{Value, json};
use tracing::instrument;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::FetchError;
use crate::location::{EventLocation, LocationEvent};
use crate::orchestrator::{CycleOutcome, Orchestrator};
use crate::presentation::ScreenState;
use crate::provider::NearestStationResolver;
use crate::provider::airkorea::AirKorea;
use crate::provider::kakao::KakaoLocal;
mod config;
mod context;
mod error;
mod location;
mod logging;
mod orchestrator;
mod presentation;
mod provider;

const ERROR_MESSAGE: &str = "대기질 정보를 불러오지 못했습니다.";

#[instrument(skip(resolver, air_korea, event))]
async fn lambda_handler(
    resolver: &NearestStationResolver,
    air_korea: &AirKorea,
    event: LambdaEvent<Value>,
) -> Result<Value, LambdaError> {
    let location_event = read_location_event(event.payload);
    let orchestrator = Orchestrator::new(
        EventLocation::new(location_event),
        resolver.clone(),
        air_korea.clone(),
        ScreenState::default(),
    );

    let outcome = orchestrator.refresh().await;
    let state = orchestrator.state().await;
    let session_ended = orchestrator.session_ended();
    let screen = orchestrator.into_presenter();

    let error_kind = match &outcome {
        CycleOutcome::Failed(err) => Some(err.kind()),
        CycleOutcome::SessionEnded => Some(FetchError::PermissionDenied.kind()),
        CycleOutcome::Displayed | CycleOutcome::Cancelled => None,
    };
    let message = match (&screen.content, screen.error_visible) {
        (_, true) => ERROR_MESSAGE.to_string(),
        (Some(view), false) => view.message(),
        (None, false) => String::new(),
    };

    Ok(json!({
        "outcome": outcome.name(),
        "error_kind": error_kind,
        "state": state,
        "session_ended": session_ended,
        "content_visible": screen.content_visible(),
        "message": message,
        "screen": screen,
    }))
}

/// An unreadable payload carries no fix, so the cycle fails as
/// "location unavailable" instead of erroring the invocation.
fn read_location_event(payload: Value) -> LocationEvent {
    serde_json::from_value(payload).unwrap_or_else(|err| {
        logging::Logger::new()
            .error_text(err.to_string())
            .error("event.invalid", &err, "Unreadable location event");
        LocationEvent::default()
    })
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()) // Enable log level filtering via `RUST_LOG` env var
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let http_client = HTTPClient::builder()
        .timeout(config.http_timeout)
        .build()?;

    let kakao = KakaoLocal::new(
        http_client.clone(),
        config.kakao_api_base_url.as_str(),
        config.kakao_api_key.as_str(),
    );
    let air_korea = AirKorea::new(
        http_client,
        config.air_korea_api_base_url.as_str(),
        config.air_korea_service_key.as_str(),
    );
    let resolver = NearestStationResolver::new(kakao, air_korea.clone());

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| async {
        lambda_handler(&resolver, &air_korea, event).await
    }))
    .await?;
    Ok(())
}
