//! Error types and handling for the lifetrack converter

use thiserror::Error;

/// Main error type for the lifetrack converter
#[derive(Error, Debug)]
pub enum TrackError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Routing provider errors (HTTP status, provider error codes)
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors, e.g. coordinates out of range
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Malformed diary files or provider payloads
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Track document serialization errors
    #[error("XML error: {source}")]
    Xml {
        #[from]
        source: quick_xml::Error,
    },
}

impl TrackError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Whether the error must abort the whole run rather than a single segment or file
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrackError::Config { .. } | TrackError::Validation { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TrackError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and API keys.")
            }
            TrackError::Api { .. } => {
                "Unable to reach the routing provider. Please check your internet connection."
                    .to_string()
            }
            TrackError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            TrackError::Parse { message } => {
                format!("Could not read input: {message}")
            }
            TrackError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            TrackError::Xml { .. } => "Failed to write track file.".to_string(),
        }
    }
}

impl From<reqwest::Error> for TrackError {
    fn from(err: reqwest::Error) -> Self {
        TrackError::api(err.to_string())
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        TrackError::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = TrackError::config("missing API key");
        assert!(matches!(config_err, TrackError::Config { .. }));

        let api_err = TrackError::api("connection failed");
        assert!(matches!(api_err, TrackError::Api { .. }));

        let validation_err = TrackError::validation("invalid coordinates");
        assert!(matches!(validation_err, TrackError::Validation { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = TrackError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = TrackError::api("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let validation_err = TrackError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TrackError::config("no key").is_fatal());
        assert!(TrackError::validation("lat 91").is_fatal());
        assert!(!TrackError::api("502").is_fatal());
        assert!(!TrackError::parse("bad json").is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let track_err: TrackError = io_err.into();
        assert!(matches!(track_err, TrackError::Io { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let track_err: TrackError = json_err.into();
        assert!(matches!(track_err, TrackError::Parse { .. }));
    }
}
