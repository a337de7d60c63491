use crate::{Grade, Pollutant};
use chrono::NaiveDateTime;

/// Latest readings of a single station.
///
/// Every field is optional: the provider drops readings it considers invalid
/// and a missing reading must never be read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasuredValue {
    /// Provider local time of the measurement.
    pub measured_at: Option<NaiveDateTime>,

    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
    pub o3: Option<f64>,
    pub no2: Option<f64>,

    /// Composite index value backing `composite_grade`.
    pub khai_value: Option<f64>,

    pub composite_grade: Option<Grade>,
    pub pm10_grade: Option<Grade>,
    pub pm25_grade: Option<Grade>,
    pub so2_grade: Option<Grade>,
    pub co_grade: Option<Grade>,
    pub o3_grade: Option<Grade>,
    pub no2_grade: Option<Grade>,
}

impl MeasuredValue {
    pub fn value(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm25 => self.pm25,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
            Pollutant::O3 => self.o3,
            Pollutant::No2 => self.no2,
        }
    }

    /// The grade as delivered by the provider, if any.
    pub fn stored_grade(&self, pollutant: Pollutant) -> Option<Grade> {
        match pollutant {
            Pollutant::Pm10 => self.pm10_grade,
            Pollutant::Pm25 => self.pm25_grade,
            Pollutant::So2 => self.so2_grade,
            Pollutant::Co => self.co_grade,
            Pollutant::O3 => self.o3_grade,
            Pollutant::No2 => self.no2_grade,
        }
    }

    pub fn grade_of(&self, pollutant: Pollutant) -> Grade {
        self.stored_grade(pollutant).unwrap_or(Grade::Unknown)
    }

    /// Provider-sourced overall grade. Not derived from the per-pollutant
    /// grades.
    pub fn composite(&self) -> Grade {
        self.composite_grade.unwrap_or(Grade::Unknown)
    }

    pub fn set_reading(&mut self, pollutant: Pollutant, value: Option<f64>, grade: Option<Grade>) {
        let (slot, grade_slot) = match pollutant {
            Pollutant::Pm10 => (&mut self.pm10, &mut self.pm10_grade),
            Pollutant::Pm25 => (&mut self.pm25, &mut self.pm25_grade),
            Pollutant::So2 => (&mut self.so2, &mut self.so2_grade),
            Pollutant::Co => (&mut self.co, &mut self.co_grade),
            Pollutant::O3 => (&mut self.o3, &mut self.o3_grade),
            Pollutant::No2 => (&mut self.no2, &mut self.no2_grade),
        };
        *slot = value;
        *grade_slot = grade;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_grades_fall_back_to_unknown() {
        let value = MeasuredValue::default();
        assert_eq!(value.composite(), Grade::Unknown);
        for pollutant in Pollutant::ALL {
            assert_eq!(value.grade_of(pollutant), Grade::Unknown);
            assert_eq!(value.stored_grade(pollutant), None);
        }
    }

    #[test]
    fn absent_reading_is_not_zero() {
        let mut value = MeasuredValue::default();
        value.set_reading(Pollutant::So2, Some(0.0), Some(Grade::Good));
        assert_eq!(value.value(Pollutant::So2), Some(0.0));
        assert_eq!(value.value(Pollutant::Co), None);
    }

    #[test]
    fn set_reading_targets_matching_fields() {
        let mut value = MeasuredValue::default();
        value.set_reading(Pollutant::O3, Some(0.061), Some(Grade::Bad));
        assert_eq!(value.o3, Some(0.061));
        assert_eq!(value.o3_grade, Some(Grade::Bad));
        assert_eq!(value.grade_of(Pollutant::O3), Grade::Bad);
        assert_eq!(value.no2, None);
    }

    #[test]
    fn composite_is_independent_of_pollutant_grades() {
        let mut value = MeasuredValue {
            composite_grade: Some(Grade::Good),
            ..Default::default()
        };
        value.set_reading(Pollutant::Pm10, Some(180.0), Some(Grade::VeryBad));
        assert_eq!(value.composite(), Grade::Good);
    }
}
