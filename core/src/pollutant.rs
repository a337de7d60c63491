use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm10,
    Pm25,
    So2,
    Co,
    O3,
    No2,
}

impl Pollutant {
    /// Display order on the screen: particulates first, then gases.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::So2,
        Pollutant::Co,
        Pollutant::O3,
        Pollutant::No2,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "미세먼지",
            Pollutant::Pm25 => "초미세먼지",
            Pollutant::So2 => "아황산가스",
            Pollutant::Co => "일산화탄소",
            Pollutant::O3 => "오존",
            Pollutant::No2 => "이산화질소",
        }
    }

    pub fn unit(self) -> &'static str {
        if self.is_particulate() { "㎍/㎥" } else { "ppm" }
    }

    pub fn is_particulate(self) -> bool {
        matches!(self, Pollutant::Pm10 | Pollutant::Pm25)
    }
}
