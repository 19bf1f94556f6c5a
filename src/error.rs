use serde::Serialize;
use thiserror::Error;

/// Structured error type for the pipeline. Callers can match on the
/// variant (or on the serialized `code`) instead of parsing messages.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum PipelineError {
    /// A numeric precondition was violated (negative duration, component
    /// outside [0, 1], intensity outside 1..=5, ...).
    #[error("{message}")]
    InvalidInput { message: String },
    /// A light was requested from a channel that does not address it.
    #[error("Light {light} is not part of this channel")]
    UnknownLight { light: String },
    /// No timing grid of the section admits a legal strobe subdivision.
    #[error("No strobe sync possible for time signature {time_signature} (section at {section_start:.3}s)")]
    NoStrobeSync {
        time_signature: u32,
        section_start: f64,
    },
    #[error("No lights available to animate")]
    NoLights,
    #[error("Config error: {message}")]
    Config { message: String },
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl PipelineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Config {
            message: e.to_string(),
        }
    }
}

/// Allow converting PipelineError to String for callers that only report text.
impl From<PipelineError> for String {
    fn from(e: PipelineError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_code_and_detail() {
        let err = PipelineError::NoStrobeSync {
            time_signature: 4,
            section_start: 12.5,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NoStrobeSync");
        assert_eq!(json["detail"]["time_signature"], 4);
    }

    #[test]
    fn unit_variant_serializes_code_only() {
        let json = serde_json::to_value(PipelineError::NoLights).unwrap();
        assert_eq!(json["code"], "NoLights");
    }

    #[test]
    fn display_mentions_light() {
        let err = PipelineError::UnknownLight {
            light: "hue:3".into(),
        };
        assert_eq!(err.to_string(), "Light hue:3 is not part of this channel");
    }
}
