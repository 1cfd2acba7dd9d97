// Error taxonomy shared by every module of the uploader. Each variant maps
// to one failure class so callers can branch on what went wrong instead of
// string-matching messages.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

/// Body of a provider response kept for diagnostics: parsed JSON when the
/// body is valid JSON, the raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Best-effort parse of a raw response body.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(v) => write!(f, "{}", v),
            ResponseBody::Text(t) => f.write_str(t),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required setting absent or unparsable. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Both the refresh exchange and the password login failed.
    #[error("token request failed: {status} {body}")]
    Auth { status: u16, body: String },

    /// The authenticated account owns no usable video channel.
    #[error("no video channels available for user")]
    Resolution,

    /// The provider could not be reached (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success answer from an API endpoint other than the upload itself.
    #[error("{endpoint} returned {status}: {body}")]
    Application {
        endpoint: &'static str,
        status: u16,
        body: ResponseBody,
    },

    /// Local video file missing. Detected before any network call.
    #[error("video file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walkdir(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_body_keeps_json_when_parseable() {
        let body = ResponseBody::parse(r#"{"error": "bad request"}"#);
        assert_eq!(
            body.as_json().and_then(|v| v.get("error")).and_then(|v| v.as_str()),
            Some("bad request")
        );
    }

    #[test]
    fn response_body_falls_back_to_text() {
        let body = ResponseBody::parse("<html>502 Bad Gateway</html>");
        assert_eq!(body, ResponseBody::Text("<html>502 Bad Gateway</html>".into()));
        assert_eq!(body.to_string(), "<html>502 Bad Gateway</html>");
    }

    #[test]
    fn not_found_message_names_the_path() {
        let err = Error::NotFound(PathBuf::from("/videos/missing.mp4"));
        assert_eq!(err.to_string(), "video file not found: /videos/missing.mp4");
    }
}
