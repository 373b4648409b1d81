use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// One news source was unreachable or its page could not be parsed.
    #[error("Source {source_name} failed: {message}")]
    SourceFetch { source_name: String, message: String },

    /// The summarization endpoint answered with a non-success status, or the
    /// request never completed (transport failure, timeout). `status` is
    /// `None` when no response was received.
    #[error("Upstream request failed ({}): {body}", status_label(.status))]
    UpstreamRequest { status: Option<u16>, body: String },

    #[error("Upstream response has unexpected shape: {0}")]
    UpstreamResponseShape(String),

    /// The model reply was not the structured document we asked for.
    #[error("Failed to parse upstream reply: {message}")]
    UpstreamParse { message: String, raw: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("A summarization run is already in progress")]
    RunInProgress,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Errors raised by the summarization stage.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamRequest { .. } | Error::UpstreamResponseShape(_) | Error::UpstreamParse { .. }
        )
    }

    /// Worth another attempt: no response at all, rate limiting, or a server error.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::UpstreamRequest { status: None, .. } => true,
            Error::UpstreamRequest { status: Some(status), .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "no response".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_request_message() {
        let err = Error::UpstreamRequest { status: Some(503), body: "busy".to_string() };
        assert_eq!(err.to_string(), "Upstream request failed (503): busy");

        let err = Error::UpstreamRequest { status: None, body: "timed out".to_string() };
        assert_eq!(err.to_string(), "Upstream request failed (no response): timed out");
    }

    #[test]
    fn test_classification() {
        assert!(Error::UpstreamResponseShape("no choices".to_string()).is_upstream());
        assert!(!Error::Persistence("disk full".to_string()).is_upstream());

        assert!(Error::UpstreamRequest { status: Some(429), body: String::new() }.is_transient());
        assert!(Error::UpstreamRequest { status: Some(502), body: String::new() }.is_transient());
        assert!(Error::UpstreamRequest { status: None, body: String::new() }.is_transient());
        assert!(!Error::UpstreamRequest { status: Some(401), body: String::new() }.is_transient());
        assert!(!Error::UpstreamParse { message: "eof".to_string(), raw: "{".to_string() }.is_transient());
    }

    #[test]
    fn test_serialization_is_the_only_conversion() {
        let err: Error = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(!err.is_upstream());
        assert!(!err.is_transient());
    }
}
