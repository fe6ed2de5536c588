//! Resolver error types
//!
//! One error enum for the whole pipeline. Terminal kinds (URL, channel
//! disambiguation, signing) abort a resolution; metadata kinds are isolated
//! per request by the negotiator.

use thiserror::Error;

/// Maximum response body size for platform HTTP calls (16 MB).
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Why the external signer could not produce a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerFailure {
    #[error("signer process could not be started: {0}")]
    Missing(String),

    #[error("signer returned unparseable output: {0:?}")]
    Unparseable(String),

    #[error("signer did not finish within {0:?}")]
    Timeout(std::time::Duration),
}

/// Fieldless classification of [`ResolveError`], for callers that render guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UrlNotRecognized,
    Resolution,
    SigningUnavailable,
    Schema,
    EmptyMetadata,
    Transport,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("URL not recognized: {0}")]
    UrlNotRecognized(String),

    #[error("Could not resolve channel: {0}")]
    Resolution(String),

    #[error("Signing unavailable: {0}")]
    SigningUnavailable(#[from] SignerFailure),

    #[error("Schema error in {context}: {message}")]
    Schema { context: &'static str, message: String },

    #[error("Empty metadata payload from {0}")]
    EmptyMetadata(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },
}

impl ResolveError {
    pub(crate) fn schema(context: &'static str, message: impl Into<String>) -> Self {
        Self::Schema {
            context,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UrlNotRecognized(_) => ErrorKind::UrlNotRecognized,
            Self::Resolution(_) => ErrorKind::Resolution,
            Self::SigningUnavailable(_) => ErrorKind::SigningUnavailable,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::EmptyMetadata(_) => ErrorKind::EmptyMetadata,
            Self::Network(_)
            | Self::Timeout(_)
            | Self::Http { .. }
            | Self::Parse(_)
            | Self::ResponseTooLarge { .. } => ErrorKind::Transport,
        }
    }

    /// Actionable guidance for the user, if this failure has any.
    #[must_use]
    pub const fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::UrlNotRecognized(_) => Some(
                "Expected https://www.douyu.com/<room> or https://v.douyu.com/show/<video id>.",
            ),
            Self::Resolution(_) => Some(
                "Add '?ch=N' (1-based) or '?roomIndex=N' (0-based) to the URL to pick a sub-channel.",
            ),
            Self::SigningUnavailable(SignerFailure::Missing(_)) => Some(
                "Please install Node.js first. If it is installed, make sure `node` is on PATH \
                 or set DOUYU_SIGNER__NODE_COMMAND, and point DOUYU_SIGNER__SCRIPT_DIR at the signer scripts.",
            ),
            Self::SigningUnavailable(_) => Some(
                "The signer scripts ran but produced unexpected output; check DOUYU_SIGNER__SCRIPT_DIR.",
            ),
            _ => None,
        }
    }
}

/// Read a response body with size limit.
pub async fn text_with_limit(response: reqwest::Response) -> Result<String, ResolveError> {
    if let Some(cl) = response.content_length() {
        if cl as usize > MAX_RESPONSE_SIZE {
            return Err(ResolveError::ResponseTooLarge { size: cl });
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(ResolveError::ResponseTooLarge { size: bytes.len() as u64 });
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Check HTTP response status before processing body.
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ResolveError> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(ResolveError::Http {
            status,
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let url = err.url().map_or_else(String::new, ToString::to_string);
            return Self::Timeout(url);
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display_http() {
        let err = ResolveError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            url: "https://www.douyu.com/lapi/live/getPlay/1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error 404 Not Found for https://www.douyu.com/lapi/live/getPlay/1"
        );
    }

    #[test]
    fn test_error_display_schema() {
        let err = ResolveError::schema("tier api", "missing field `rtmp_url`");
        assert_eq!(err.to_string(), "Schema error in tier api: missing field `rtmp_url`");
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_signing_failures_are_distinguishable() {
        let missing: ResolveError = SignerFailure::Missing("No such file".to_string()).into();
        let garbled: ResolveError = SignerFailure::Unparseable("hello".to_string()).into();
        let slow: ResolveError = SignerFailure::Timeout(Duration::from_secs(3)).into();

        for err in [&missing, &garbled, &slow] {
            assert_eq!(err.kind(), ErrorKind::SigningUnavailable);
        }
        assert!(missing.remediation().unwrap().contains("Node.js"));
        assert!(!garbled.remediation().unwrap().contains("install"));
        assert!(matches!(
            missing,
            ResolveError::SigningUnavailable(SignerFailure::Missing(_))
        ));
        assert!(matches!(
            garbled,
            ResolveError::SigningUnavailable(SignerFailure::Unparseable(_))
        ));
    }

    #[test]
    fn test_transport_errors_have_no_remediation() {
        let err = ResolveError::Network("connection refused".to_string());
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.remediation().is_none());
    }

    #[test]
    fn test_error_display_response_too_large() {
        let err = ResolveError::ResponseTooLarge { size: 20_000_000 };
        let msg = err.to_string();
        assert!(msg.contains("20000000"));
        assert!(msg.contains(&MAX_RESPONSE_SIZE.to_string()));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ResolveError = json_err.into();
        assert!(matches!(err, ResolveError::Parse(_)));
    }
}
