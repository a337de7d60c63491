use thiserror::Error;

/// Everything that can stop a fetch cycle.
///
/// The screen shows a single error indicator for all of these; the kinds only
/// matter for logs and for the `outcome` reported by the handler.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("device location unavailable")]
    LocationUnavailable,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("no monitoring station near the device")]
    StationNotFound,

    #[error("no measurement available for station {0}")]
    MeasurementUnavailable(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Stable name used in logs and in the handler response.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::LocationUnavailable => "location_unavailable",
            FetchError::PermissionDenied => "permission_denied",
            FetchError::StationNotFound => "station_not_found",
            FetchError::MeasurementUnavailable(_) => "measurement_unavailable",
            FetchError::Transport(_)
            | FetchError::Decode(_)
            | FetchError::Provider { .. }
            | FetchError::InvalidUrl(_) => "transport_failure",
        }
    }

    /// Only a denied permission ends the session; everything else can be
    /// retried with a refresh.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_family_shares_a_kind() {
        let provider = FetchError::Provider {
            code: "30".to_string(),
            message: "SERVICE_KEY_IS_NOT_REGISTERED_ERROR".to_string(),
        };
        let decode = FetchError::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(provider.kind(), "transport_failure");
        assert_eq!(decode.kind(), "transport_failure");
        assert_eq!(FetchError::StationNotFound.kind(), "station_not_found");
    }

    #[test]
    fn only_permission_denied_is_terminal() {
        assert!(FetchError::PermissionDenied.is_terminal());
        assert!(!FetchError::LocationUnavailable.is_terminal());
        assert!(!FetchError::MeasurementUnavailable("중구".to_string()).is_terminal());
    }
}
