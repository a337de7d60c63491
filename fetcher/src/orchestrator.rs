//! Drives one fetch cycle: location, nearest station, latest measurement,
//! presentation.

use crate::context::CancellationContext;
use crate::error::FetchError;
use crate::location::LocationProvider;
use crate::logging;
use crate::presentation::{AirQualityView, Presenter};
use crate::provider::{MeasurementSource, StationResolver};
use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Locating,
    ResolvingStation,
    FetchingMeasurement,
    Displaying,
    Failed,
}

impl CycleState {
    pub fn name(self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::Locating => "locating",
            CycleState::ResolvingStation => "resolving_station",
            CycleState::FetchingMeasurement => "fetching_measurement",
            CycleState::Displaying => "displaying",
            CycleState::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Displayed,
    Failed(FetchError),
    /// Superseded by a newer refresh or by shutdown; nothing was rendered.
    Cancelled,
    /// The session is over (permission denied or shutdown).
    SessionEnded,
}

impl CycleOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            CycleOutcome::Displayed => "displayed",
            CycleOutcome::Failed(_) => "failed",
            CycleOutcome::Cancelled => "cancelled",
            CycleOutcome::SessionEnded => "session_ended",
        }
    }
}

pub struct Orchestrator<L, R, M, P> {
    location: L,
    resolver: R,
    measurements: M,
    presenter: Mutex<P>,
    state: Mutex<CycleState>,
    outstanding: Mutex<Option<CancellationContext>>,
    session: CancellationContext,
}

impl<L, R, M, P> Orchestrator<L, R, M, P>
where
    L: LocationProvider,
    R: StationResolver,
    M: MeasurementSource,
    P: Presenter,
{
    pub fn new(location: L, resolver: R, measurements: M, presenter: P) -> Self {
        Self {
            location,
            resolver,
            measurements,
            presenter: Mutex::new(presenter),
            state: Mutex::new(CycleState::Idle),
            outstanding: Mutex::new(None),
            session: CancellationContext::new(),
        }
    }

    pub async fn state(&self) -> CycleState {
        *self.state.lock().await
    }

    pub fn session_ended(&self) -> bool {
        self.session.is_cancelled()
    }

    pub fn into_presenter(self) -> P {
        self.presenter.into_inner()
    }

    /// Ends the session and cancels the outstanding location request.
    pub async fn shutdown(&self) {
        self.session.cancel();
        if let Some(request) = self.outstanding.lock().await.take() {
            request.cancel();
        }
    }

    /// Runs a fresh cycle, superseding the one in flight if any.
    pub async fn refresh(&self) -> CycleOutcome {
        if self.session.is_cancelled() {
            return CycleOutcome::SessionEnded;
        }

        let cycle = self.replace_outstanding().await;
        {
            let mut presenter = self.presenter.lock().await;
            if cycle.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
            presenter.begin_cycle();
        }

        let outcome = self.run_cycle(&cycle).await;

        let mut presenter = self.presenter.lock().await;
        if !cycle.is_cancelled() {
            presenter.end_cycle();
        }
        outcome
    }

    async fn replace_outstanding(&self) -> CancellationContext {
        let cycle = CancellationContext::new();
        let mut outstanding = self.outstanding.lock().await;
        if let Some(previous) = outstanding.replace(cycle.clone()) {
            previous.cancel();
        }
        cycle
    }

    async fn run_cycle(&self, cycle: &CancellationContext) -> CycleOutcome {
        self.enter(cycle, CycleState::Locating).await;
        let Some(location) = cycle
            .run_until_cancelled(self.location.current_location())
            .await
        else {
            logging::Logger::new()
                .state(CycleState::Locating.name())
                .info("location.cancelled", "Location request cancelled");
            return CycleOutcome::Cancelled;
        };

        let coordinates = match location.map_err(FetchError::from) {
            Ok(coordinates) => coordinates,
            Err(err) if err.is_terminal() => {
                let logger = logging::Logger::new()
                    .state(CycleState::Locating.name())
                    .error_kind(err.kind());
                {
                    let mut presenter = self.presenter.lock().await;
                    if cycle.is_cancelled() {
                        logger.info("cycle.discarded", "Superseded cycle denied location");
                        return CycleOutcome::Cancelled;
                    }
                    // Shutdown cancels this cycle, so `refresh` will not end it.
                    presenter.show_error();
                    presenter.end_cycle();
                }
                self.enter(cycle, CycleState::Failed).await;
                logger.info("session.ended", "Location permission denied");
                self.shutdown().await;
                return CycleOutcome::SessionEnded;
            }
            Err(err) => {
                let logger = logging::Logger::new().state(CycleState::Locating.name());
                return self.fail(cycle, err, logger).await;
            }
        };
        let logger = logging::Logger::new().coordinates(coordinates);

        if cycle.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        self.enter(cycle, CycleState::ResolvingStation).await;
        let station = match self.resolver.resolve_nearest_station(coordinates).await {
            Ok(Some(station)) => station,
            Ok(None) => {
                let logger = logger.state(CycleState::ResolvingStation.name());
                return self.fail(cycle, FetchError::StationNotFound, logger).await;
            }
            Err(err) => {
                let logger = logger.state(CycleState::ResolvingStation.name());
                return self.fail(cycle, err, logger).await;
            }
        };
        let logger = logger.station(&station.name);

        if cycle.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        self.enter(cycle, CycleState::FetchingMeasurement).await;
        let value = match self
            .measurements
            .fetch_latest_measurement(&station.name)
            .await
        {
            Ok(Some(value)) => value,
            Ok(None) => {
                let err = FetchError::MeasurementUnavailable(station.name.clone());
                let logger = logger.state(CycleState::FetchingMeasurement.name());
                return self.fail(cycle, err, logger).await;
            }
            Err(err) => {
                let logger = logger.state(CycleState::FetchingMeasurement.name());
                return self.fail(cycle, err, logger).await;
            }
        };

        {
            let mut presenter = self.presenter.lock().await;
            if cycle.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
            presenter.display(AirQualityView::new(&station, &value));
        }
        self.enter(cycle, CycleState::Displaying).await;
        logger
            .state(CycleState::Displaying.name())
            .info("cycle.displayed", "Air quality rendered");
        CycleOutcome::Displayed
    }

    async fn enter(&self, cycle: &CancellationContext, next: CycleState) {
        let mut state = self.state.lock().await;
        if !cycle.is_cancelled() {
            *state = next;
        }
    }

    async fn fail(
        &self,
        cycle: &CancellationContext,
        err: FetchError,
        logger: logging::Logger,
    ) -> CycleOutcome {
        let logger = logger.error_kind(err.kind()).error_text(err.to_string());
        {
            let mut presenter = self.presenter.lock().await;
            if cycle.is_cancelled() {
                logger.info("cycle.discarded", "Superseded cycle failed");
                return CycleOutcome::Cancelled;
            }
            logger.error("cycle.failed", &err, "Fetch cycle failed");
            presenter.show_error();
        }
        self.enter(cycle, CycleState::Failed).await;
        CycleOutcome::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationError;
    use crate::presentation::{PollutantRow, ScreenState};
    use airquality_core::{
        Coordinates, Grade, MeasuredValue, MonitoringStation, Pollutant, ProjectedCoordinates,
        grade_of,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Fix {
        Pending,
        /// Yields to the scheduler once before answering.
        Delayed(Result<Coordinates, LocationError>),
        Ready(Result<Coordinates, LocationError>),
    }

    #[derive(Default)]
    struct FakeLocation {
        fixes: StdMutex<VecDeque<Fix>>,
        calls: AtomicUsize,
    }

    impl FakeLocation {
        fn with(fixes: Vec<Fix>) -> Self {
            Self {
                fixes: StdMutex::new(fixes.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LocationProvider for FakeLocation {
        async fn current_location(&self) -> Result<Coordinates, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fix = self.fixes.lock().unwrap().pop_front();
            match fix {
                Some(Fix::Pending) => std::future::pending().await,
                Some(Fix::Delayed(result)) => {
                    tokio::task::yield_now().await;
                    result
                }
                Some(Fix::Ready(result)) => result,
                None => Ok(Coordinates::new(37.5, 127.0)),
            }
        }
    }

    #[derive(Default)]
    struct FakeResolver {
        results: StdMutex<VecDeque<Result<Option<MonitoringStation>, FetchError>>>,
        seen: StdMutex<Vec<Coordinates>>,
    }

    impl FakeResolver {
        fn with(results: Vec<Result<Option<MonitoringStation>, FetchError>>) -> Self {
            Self {
                results: StdMutex::new(results.into()),
                seen: StdMutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl StationResolver for FakeResolver {
        async fn resolve_nearest_station(
            &self,
            coordinates: Coordinates,
        ) -> Result<Option<MonitoringStation>, FetchError> {
            self.seen.lock().unwrap().push(coordinates);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Some(station("Station-1"))))
        }
    }

    #[derive(Default)]
    struct FakeMeasurements {
        results: StdMutex<VecDeque<Result<Option<MeasuredValue>, FetchError>>>,
        seen: StdMutex<Vec<String>>,
    }

    impl FakeMeasurements {
        fn with(results: Vec<Result<Option<MeasuredValue>, FetchError>>) -> Self {
            Self {
                results: StdMutex::new(results.into()),
                seen: StdMutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl MeasurementSource for FakeMeasurements {
        async fn fetch_latest_measurement(
            &self,
            station_name: &str,
        ) -> Result<Option<MeasuredValue>, FetchError> {
            self.seen.lock().unwrap().push(station_name.to_string());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Some(graded_measurement())))
        }
    }

    type TestOrchestrator =
        Orchestrator<FakeLocation, FakeResolver, FakeMeasurements, ScreenState>;

    fn orchestrator(
        location: FakeLocation,
        resolver: FakeResolver,
        measurements: FakeMeasurements,
    ) -> TestOrchestrator {
        Orchestrator::new(location, resolver, measurements, ScreenState::default())
    }

    fn station(name: &str) -> MonitoringStation {
        MonitoringStation {
            name: name.to_string(),
            address: "서울 종로구".to_string(),
            projected_coordinates: ProjectedCoordinates {
                x: 198_245.05,
                y: 451_586.03,
            },
        }
    }

    fn graded_measurement() -> MeasuredValue {
        let codes = [
            (Pollutant::Pm10, 2),
            (Pollutant::Pm25, 1),
            (Pollutant::So2, 3),
            (Pollutant::Co, 1),
            (Pollutant::O3, 4),
            (Pollutant::No2, 2),
        ];
        let mut value = MeasuredValue {
            composite_grade: Some(grade_of(Some(2))),
            ..Default::default()
        };
        for (index, (pollutant, code)) in codes.into_iter().enumerate() {
            value.set_reading(pollutant, Some(index as f64 + 1.0), Some(grade_of(Some(code))));
        }
        value
    }

    fn provider_error() -> FetchError {
        FetchError::Provider {
            code: "22".to_string(),
            message: "LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR".to_string(),
        }
    }

    fn row(view: &AirQualityView, pollutant: Pollutant) -> &PollutantRow {
        view.rows
            .iter()
            .find(|row| row.pollutant == pollutant)
            .expect("expected pollutant row")
    }

    async fn screen(orchestrator: &TestOrchestrator) -> ScreenState {
        orchestrator.presenter.lock().await.clone()
    }

    #[tokio::test]
    async fn displays_provider_grades() {
        let orchestrator = orchestrator(
            FakeLocation::with(vec![Fix::Ready(Ok(Coordinates::new(37.5, 127.0)))]),
            FakeResolver::default(),
            FakeMeasurements::default(),
        );

        let outcome = orchestrator.refresh().await;
        assert!(matches!(outcome, CycleOutcome::Displayed));
        assert_eq!(orchestrator.state().await, CycleState::Displaying);
        assert_eq!(
            *orchestrator.resolver.seen.lock().unwrap(),
            vec![Coordinates::new(37.5, 127.0)]
        );
        assert_eq!(
            *orchestrator.measurements.seen.lock().unwrap(),
            vec!["Station-1".to_string()]
        );

        let screen = screen(&orchestrator).await;
        assert!(!screen.error_visible);
        assert!(screen.content_visible());
        assert!(!screen.progress_visible);
        assert!(!screen.refreshing);
        let view = screen.content.expect("expected content");
        assert_eq!(view.station_name, "Station-1");
        assert_eq!(view.composite.grade, Grade::Normal);
        assert_eq!(screen.background, Grade::Normal.color());
        assert_eq!(row(&view, Pollutant::Pm10).grade.grade, Grade::Normal);
        assert_eq!(row(&view, Pollutant::Pm25).grade.grade, Grade::Good);
        assert_eq!(row(&view, Pollutant::So2).grade.grade, Grade::Bad);
        assert_eq!(row(&view, Pollutant::O3).grade.grade, Grade::VeryBad);
    }

    #[tokio::test]
    async fn missing_station_never_fetches_measurement() {
        let orchestrator = orchestrator(
            FakeLocation::default(),
            FakeResolver::with(vec![Ok(None)]),
            FakeMeasurements::default(),
        );

        let outcome = orchestrator.refresh().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Failed(FetchError::StationNotFound)
        ));
        assert_eq!(orchestrator.state().await, CycleState::Failed);
        assert_eq!(orchestrator.measurements.calls(), 0);
        let screen = screen(&orchestrator).await;
        assert!(screen.error_visible);
        assert!(screen.content.is_none());
        assert!(!screen.progress_visible);
    }

    #[tokio::test]
    async fn resolver_transport_fault_never_fetches_measurement() {
        let orchestrator = orchestrator(
            FakeLocation::default(),
            FakeResolver::with(vec![Err(provider_error())]),
            FakeMeasurements::default(),
        );

        let outcome = orchestrator.refresh().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Failed(FetchError::Provider { .. })
        ));
        assert_eq!(orchestrator.measurements.calls(), 0);
        assert!(screen(&orchestrator).await.error_visible);
    }

    #[tokio::test]
    async fn failed_refresh_hides_previous_content() {
        let orchestrator = orchestrator(
            FakeLocation::default(),
            FakeResolver::default(),
            FakeMeasurements::with(vec![Ok(Some(graded_measurement())), Ok(None)]),
        );

        assert!(matches!(
            orchestrator.refresh().await,
            CycleOutcome::Displayed
        ));
        assert!(screen(&orchestrator).await.content_visible());

        let outcome = orchestrator.refresh().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Failed(FetchError::MeasurementUnavailable(ref name)) if name == "Station-1"
        ));
        let screen = screen(&orchestrator).await;
        assert!(screen.error_visible);
        assert_eq!(screen.content_alpha, 0.0);
        assert!(!screen.content_visible());
    }

    #[tokio::test]
    async fn successful_refresh_after_failure_clears_error() {
        let orchestrator = orchestrator(
            FakeLocation::default(),
            FakeResolver::with(vec![Ok(None)]),
            FakeMeasurements::default(),
        );

        assert!(matches!(
            orchestrator.refresh().await,
            CycleOutcome::Failed(_)
        ));
        assert!(matches!(
            orchestrator.refresh().await,
            CycleOutcome::Displayed
        ));
        let screen = screen(&orchestrator).await;
        assert!(!screen.error_visible);
        assert!(screen.content_visible());
    }

    #[tokio::test]
    async fn unavailable_location_fails_without_resolving() {
        let orchestrator = orchestrator(
            FakeLocation::with(vec![Fix::Ready(Err(LocationError::Unavailable(
                "no fix".to_string(),
            )))]),
            FakeResolver::default(),
            FakeMeasurements::default(),
        );

        let outcome = orchestrator.refresh().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Failed(FetchError::LocationUnavailable)
        ));
        assert_eq!(orchestrator.resolver.calls(), 0);
        assert!(screen(&orchestrator).await.error_visible);
        assert!(!orchestrator.session_ended());
    }

    #[tokio::test]
    async fn denied_permission_ends_session() {
        let orchestrator = orchestrator(
            FakeLocation::with(vec![Fix::Ready(Err(LocationError::PermissionDenied))]),
            FakeResolver::default(),
            FakeMeasurements::default(),
        );

        assert!(matches!(
            orchestrator.refresh().await,
            CycleOutcome::SessionEnded
        ));
        assert!(orchestrator.session_ended());
        assert!(matches!(
            orchestrator.refresh().await,
            CycleOutcome::SessionEnded
        ));
        assert_eq!(orchestrator.location.calls(), 1);
        assert_eq!(orchestrator.resolver.calls(), 0);

        assert_eq!(orchestrator.state().await, CycleState::Failed);
        let screen = screen(&orchestrator).await;
        assert!(screen.error_visible);
        assert!(!screen.refreshing);
        assert!(!screen.progress_visible);
        assert!(!screen.content_visible());
    }

    #[tokio::test]
    async fn failure_superseded_while_waiting_for_presenter_is_discarded() {
        let orchestrator = orchestrator(
            FakeLocation::with(vec![Fix::Delayed(Ok(Coordinates::new(37.5, 127.0)))]),
            FakeResolver::with(vec![Err(provider_error())]),
            FakeMeasurements::default(),
        );

        let (outcome, ()) = tokio::join!(orchestrator.refresh(), async {
            while orchestrator.location.calls() == 0 {
                tokio::task::yield_now().await;
            }
            let guard = orchestrator.presenter.lock().await;
            while orchestrator.resolver.calls() == 0 {
                tokio::task::yield_now().await;
            }
            orchestrator.shutdown().await;
            drop(guard);
        });

        assert!(matches!(outcome, CycleOutcome::Cancelled));
        assert_eq!(orchestrator.state().await, CycleState::ResolvingStation);
        let screen = screen(&orchestrator).await;
        assert!(!screen.error_visible);
        assert!(screen.refreshing);
    }

    #[tokio::test]
    async fn refresh_cancels_outstanding_location_request() {
        let orchestrator = orchestrator(
            FakeLocation::with(vec![
                Fix::Pending,
                Fix::Ready(Ok(Coordinates::new(35.1, 129.0))),
            ]),
            FakeResolver::default(),
            FakeMeasurements::default(),
        );

        let (first, second) = tokio::join!(orchestrator.refresh(), async {
            while orchestrator.location.calls() == 0 {
                tokio::task::yield_now().await;
            }
            orchestrator.refresh().await
        });

        assert!(matches!(first, CycleOutcome::Cancelled));
        assert!(matches!(second, CycleOutcome::Displayed));
        assert_eq!(
            *orchestrator.resolver.seen.lock().unwrap(),
            vec![Coordinates::new(35.1, 129.0)]
        );
        assert_eq!(orchestrator.state().await, CycleState::Displaying);
        let screen = screen(&orchestrator).await;
        assert!(!screen.error_visible);
        assert!(!screen.refreshing);
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_location() {
        let orchestrator = orchestrator(
            FakeLocation::with(vec![Fix::Pending]),
            FakeResolver::default(),
            FakeMeasurements::default(),
        );

        let (outcome, ()) = tokio::join!(orchestrator.refresh(), async {
            while orchestrator.location.calls() == 0 {
                tokio::task::yield_now().await;
            }
            orchestrator.shutdown().await
        });

        assert!(matches!(outcome, CycleOutcome::Cancelled));
        assert_eq!(orchestrator.resolver.calls(), 0);
        assert!(matches!(
            orchestrator.refresh().await,
            CycleOutcome::SessionEnded
        ));
        assert_eq!(orchestrator.location.calls(), 1);
        let screen = screen(&orchestrator).await;
        assert!(screen.content.is_none());
        assert!(!screen.error_visible);
    }

    #[test]
    fn outcome_names_are_stable() {
        assert_eq!(CycleOutcome::Displayed.name(), "displayed");
        assert_eq!(CycleOutcome::Failed(provider_error()).name(), "failed");
        assert_eq!(CycleState::ResolvingStation.name(), "resolving_station");
    }
}
