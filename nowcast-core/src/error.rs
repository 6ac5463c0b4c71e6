use thiserror::Error;

/// Coarse classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Network,
    Decode,
    Unknown,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Decode => "decode",
            FetchErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a fetch that did not produce a snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection failure, timeout or a non-2xx status.
    #[error("Network error: {0}")]
    Network(String),

    /// The body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Decode(_) => FetchErrorKind::Decode,
            FetchError::Unknown(_) => FetchErrorKind::Unknown,
        }
    }

    /// Text shown to the user in place of the weather panel.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(msg) => format!("Could not reach the weather service: {msg}"),
            FetchError::Decode(msg) => format!("The weather service sent an unexpected response: {msg}"),
            FetchError::Unknown(msg) => format!("Something went wrong: {msg}"),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key.
        let err = err.without_url();
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if err.is_timeout() || err.is_connect() || err.is_request() || err.is_status() || err.is_body() {
            FetchError::Network(err.to_string())
        } else {
            FetchError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(FetchError::Network("x".into()).kind(), FetchErrorKind::Network);
        assert_eq!(FetchError::Decode("x".into()).kind(), FetchErrorKind::Decode);
        assert_eq!(FetchError::Unknown("x".into()).kind(), FetchErrorKind::Unknown);
    }

    #[test]
    fn serde_errors_are_decode_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        assert_eq!(FetchError::from(err).kind(), FetchErrorKind::Decode);
    }

    #[test]
    fn user_message_keeps_detail() {
        let msg = FetchError::Network("status 503".into()).user_message();
        assert!(msg.contains("Could not reach"));
        assert!(msg.contains("503"));
    }
}
