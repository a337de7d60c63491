use serde::Serialize;
use std::fmt;

/// Severity grade reported by the provider for a pollutant or for the
/// composite index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Good,
    Normal,
    Bad,
    VeryBad,
    Unknown,
}

impl Grade {
    pub const ALL: [Grade; 5] = [
        Grade::Good,
        Grade::Normal,
        Grade::Bad,
        Grade::VeryBad,
        Grade::Unknown,
    ];

    /// Maps a provider grade code. Only 1..=4 are meaningful, everything else
    /// is `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Grade::Good,
            2 => Grade::Normal,
            3 => Grade::Bad,
            4 => Grade::VeryBad,
            _ => Grade::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Good => "좋음",
            Grade::Normal => "보통",
            Grade::Bad => "나쁨",
            Grade::VeryBad => "매우 나쁨",
            Grade::Unknown => "미측정",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Grade::Good => "😆",
            Grade::Normal => "🙂",
            Grade::Bad => "😞",
            Grade::VeryBad => "😱",
            Grade::Unknown => "🧐",
        }
    }

    /// Background color token for the screen behind the composite grade.
    pub fn color(self) -> &'static str {
        match self {
            Grade::Good => "blue",
            Grade::Normal => "green",
            Grade::Bad => "yellow",
            Grade::VeryBad => "red",
            Grade::Unknown => "gray",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label(), self.emoji())
    }
}

/// Grades an optional provider code; an absent code is `Unknown`.
pub fn grade_of(code: Option<i64>) -> Grade {
    code.map(Grade::from_code).unwrap_or(Grade::Unknown)
}
