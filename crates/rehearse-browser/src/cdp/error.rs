//! CDP driver error types.

use rehearse_protocols::AutomationError;
use thiserror::Error;

/// Errors raised by the CDP driver layer.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not reachable on the debugging endpoint.
    #[error("chrome not available at {0}")]
    ChromeNotAvailable(String),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Error response from the protocol.
    #[error("cdp error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during endpoint discovery.
    #[error("http error: {0}")]
    Http(String),

    /// Navigation failed.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// Element not found.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// JavaScript evaluation threw in the page.
    #[error("javascript error: {0}")]
    JavaScript(String),

    /// Timed out waiting for a response or a page condition.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Session closed underneath a pending request.
    #[error("session closed")]
    SessionClosed,

    /// Response did not carry the expected payload.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("invalid URL: {}", e))
    }
}

impl From<CdpError> for AutomationError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ElementNotFound(sel) => AutomationError::ElementNotFound(sel),
            CdpError::Timeout(msg) => AutomationError::InteractionTimeout(msg),
            CdpError::NavigationFailed(msg) => AutomationError::NavigationError(msg),
            other => AutomationError::BrowserUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_into_the_engine_taxonomy() {
        let err: AutomationError = CdpError::ElementNotFound("#go".into()).into();
        assert!(matches!(err, AutomationError::ElementNotFound(_)));

        let err: AutomationError = CdpError::Timeout("click".into()).into();
        assert!(matches!(err, AutomationError::InteractionTimeout(_)));

        let err: AutomationError = CdpError::SessionClosed.into();
        assert!(matches!(err, AutomationError::BrowserUnavailable(_)));
        assert!(err.is_fatal());
    }
}
