use thiserror::Error;

/// Common error type for gateway components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MQTT error: {0}")]
    Mqtt(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the gateway's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a serial line or bus topic could not be translated.
///
/// Every variant is recoverable: the caller drops the offending line or
/// message and carries on with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// The line carried no delimiter and no content.
    #[error("empty line")]
    Empty,

    /// The node id segment is not a non-negative integer.
    #[error("invalid node id {0:?}")]
    InvalidNode(String),

    /// The raw bytes are not valid UTF-8.
    #[error("invalid UTF-8 at byte {0}")]
    InvalidUtf8(usize),
}

impl ParseFailure {
    /// Short, stable name of the failure kind (used as a log field).
    pub fn kind(&self) -> &'static str {
        match self {
            ParseFailure::Empty => "empty",
            ParseFailure::InvalidNode(_) => "invalid_node",
            ParseFailure::InvalidUtf8(_) => "invalid_utf8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_kind() {
        assert_eq!(ParseFailure::Empty.kind(), "empty");
        assert_eq!(ParseFailure::InvalidNode("abc".into()).kind(), "invalid_node");
        assert_eq!(ParseFailure::InvalidUtf8(3).kind(), "invalid_utf8");
    }

    #[test]
    fn test_parse_failure_display() {
        assert_eq!(
            ParseFailure::InvalidNode("abc".into()).to_string(),
            "invalid node id \"abc\""
        );
    }
}
