use airquality_core::{Grade, MeasuredValue, MonitoringStation, Pollutant};
use serde::Serialize;

const NOT_AVAILABLE: &str = "-";

/// Surface the orchestrator draws on.
///
/// It receives either a full station + measurement view or the error signal,
/// never a partial result.
pub trait Presenter {
    /// A new cycle started: hide any stale error and show progress.
    fn begin_cycle(&mut self);
    fn display(&mut self, view: AirQualityView);
    fn show_error(&mut self);
    /// The cycle is over, whatever its outcome.
    fn end_cycle(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBadge {
    pub grade: Grade,
    pub label: &'static str,
    pub emoji: &'static str,
    pub color: &'static str,
}

impl From<Grade> for GradeBadge {
    fn from(grade: Grade) -> Self {
        Self {
            grade,
            label: grade.label(),
            emoji: grade.emoji(),
            color: grade.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantRow {
    pub pollutant: Pollutant,
    pub label: &'static str,
    pub grade: GradeBadge,
    /// Reading with its unit, or `-` when the provider had none.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityView {
    pub station_name: String,
    pub station_address: String,
    pub measured_at: Option<String>,
    pub composite: GradeBadge,
    pub rows: Vec<PollutantRow>,
}

impl AirQualityView {
    pub fn new(station: &MonitoringStation, value: &MeasuredValue) -> Self {
        let rows = Pollutant::ALL
            .iter()
            .map(|&pollutant| PollutantRow {
                pollutant,
                label: pollutant.label(),
                grade: value.grade_of(pollutant).into(),
                value: format_reading(value.value(pollutant), pollutant),
            })
            .collect();

        Self {
            station_name: station.name.clone(),
            station_address: station.address.clone(),
            measured_at: value
                .measured_at
                .map(|time| time.format("%Y-%m-%d %H:%M").to_string()),
            composite: value.composite().into(),
            rows,
        }
    }

    /// Plain-text rendering of the view, one line per item.
    pub fn message(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 4);
        lines.push(format!("측정소: {}", self.station_name));
        if !self.station_address.is_empty() {
            lines.push(format!("주소: {}", self.station_address));
        }
        lines.push(format!(
            "통합대기환경지수: {} {}",
            self.composite.label, self.composite.emoji
        ));
        for row in &self.rows {
            lines.push(format!(
                "{}: {} {} {}",
                row.label, row.value, row.grade.label, row.grade.emoji
            ));
        }
        lines.push(format!(
            "측정 시각: {}",
            self.measured_at.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
        lines.join("\n")
    }
}

fn format_reading(value: Option<f64>, pollutant: Pollutant) -> String {
    match value {
        Some(value) => format!("{value} {}", pollutant.unit()),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// In-memory screen: what a client would currently show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenState {
    pub error_visible: bool,
    /// Opacity of the content area; 0 hides previously rendered data.
    pub content_alpha: f32,
    pub progress_visible: bool,
    pub refreshing: bool,
    pub content: Option<AirQualityView>,
    /// Background token of the whole screen, driven by the composite grade.
    pub background: &'static str,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            error_visible: false,
            content_alpha: 0.0,
            progress_visible: true,
            refreshing: false,
            content: None,
            background: Grade::Unknown.color(),
        }
    }
}

impl ScreenState {
    /// Content is shown only when rendered and not faded out.
    pub fn content_visible(&self) -> bool {
        self.content.is_some() && self.content_alpha > 0.0
    }
}

impl Presenter for ScreenState {
    fn begin_cycle(&mut self) {
        self.error_visible = false;
        self.refreshing = true;
    }

    fn display(&mut self, view: AirQualityView) {
        self.error_visible = false;
        self.content_alpha = 1.0;
        self.background = view.composite.color;
        self.content = Some(view);
    }

    fn show_error(&mut self) {
        self.error_visible = true;
        self.content_alpha = 0.0;
    }

    fn end_cycle(&mut self) {
        self.progress_visible = false;
        self.refreshing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airquality_core::ProjectedCoordinates;
    use chrono::NaiveDateTime;

    fn row(view: &AirQualityView, pollutant: Pollutant) -> &PollutantRow {
        view.rows
            .iter()
            .find(|row| row.pollutant == pollutant)
            .expect("expected pollutant row")
    }

    fn station() -> MonitoringStation {
        MonitoringStation {
            name: "종로구".to_string(),
            address: "서울 종로구 종로35가길 19".to_string(),
            projected_coordinates: ProjectedCoordinates {
                x: 198_245.05,
                y: 451_586.03,
            },
        }
    }

    fn measured() -> MeasuredValue {
        let mut value = MeasuredValue {
            measured_at: NaiveDateTime::parse_from_str("2024-05-01 14:00", "%Y-%m-%d %H:%M").ok(),
            composite_grade: Some(Grade::Bad),
            ..Default::default()
        };
        value.set_reading(Pollutant::Pm10, Some(45.0), Some(Grade::Normal));
        value.set_reading(Pollutant::Pm25, Some(12.0), Some(Grade::Good));
        value.set_reading(Pollutant::So2, Some(0.003), Some(Grade::Good));
        value.set_reading(Pollutant::O3, Some(0.121), Some(Grade::VeryBad));
        value.set_reading(Pollutant::No2, Some(0.021), None);
        value
    }

    #[test]
    fn view_falls_back_to_unknown_and_dash() {
        let view = AirQualityView::new(&station(), &measured());
        let co = row(&view, Pollutant::Co);
        assert_eq!(co.value, "-");
        assert_eq!(co.grade.grade, Grade::Unknown);
        let no2 = row(&view, Pollutant::No2);
        assert_eq!(no2.value, "0.021 ppm");
        assert_eq!(no2.grade.grade, Grade::Unknown);
    }

    #[test]
    fn view_keeps_pollutant_order_and_units() {
        let view = AirQualityView::new(&station(), &measured());
        let pollutants: Vec<_> = view.rows.iter().map(|row| row.pollutant).collect();
        assert_eq!(pollutants, Pollutant::ALL.to_vec());
        assert_eq!(row(&view, Pollutant::Pm10).value, "45 ㎍/㎥");
        assert_eq!(view.composite.color, "yellow");
        assert_eq!(view.measured_at.as_deref(), Some("2024-05-01 14:00"));
    }

    #[test]
    fn message_lists_every_row() {
        let view = AirQualityView::new(&station(), &measured());
        let expected = "측정소: 종로구\n\
주소: 서울 종로구 종로35가길 19\n\
통합대기환경지수: 나쁨 😞\n\
미세먼지: 45 ㎍/㎥ 보통 🙂\n\
초미세먼지: 12 ㎍/㎥ 좋음 😆\n\
아황산가스: 0.003 ppm 좋음 😆\n\
일산화탄소: - 미측정 🧐\n\
오존: 0.121 ppm 매우 나쁨 😱\n\
이산화질소: 0.021 ppm 미측정 🧐\n\
측정 시각: 2024-05-01 14:00";
        assert_eq!(view.message(), expected);
    }

    #[test]
    fn screen_error_hides_previous_content() {
        let mut screen = ScreenState::default();
        screen.begin_cycle();
        screen.display(AirQualityView::new(&station(), &measured()));
        screen.end_cycle();
        assert!(screen.content_visible());
        assert_eq!(screen.background, "yellow");

        screen.begin_cycle();
        assert!(screen.refreshing);
        screen.show_error();
        screen.end_cycle();
        assert!(screen.error_visible);
        assert!(!screen.content_visible());
        assert!(!screen.refreshing);
        assert!(!screen.progress_visible);
    }

    #[test]
    fn begin_cycle_clears_stale_error() {
        let mut screen = ScreenState::default();
        screen.show_error();
        screen.begin_cycle();
        assert!(!screen.error_visible);
    }
}
