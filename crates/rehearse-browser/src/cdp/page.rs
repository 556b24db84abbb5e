//! CDP page session: commands scoped to a single attached target.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::client::{CdpClient, PendingRequest, WsSink};
use super::error::CdpError;
use super::protocol::{KeyEventType, MouseButton, MouseEventType, ScreenshotFormat};

/// Element geometry reported by the in-page rect probe, in top-document
/// viewport coordinates (iframe offsets already applied).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub visible: bool,
}

impl ElementRect {
    /// Center point, the coordinate input events are dispatched at.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A session attached to a single page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a CDP command scoped to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        CdpClient::call_on(
            &self.ws_tx,
            &self.pending,
            &self.request_id,
            method,
            params,
            Some(&self.session_id),
        )
        .await
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Issue a navigation. Readiness is a separate concern; callers compose
    /// the wait ladder they need from the `wait_*` helpers below.
    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            if !error.is_empty() {
                return Err(CdpError::NavigationFailed(error.to_string()));
            }
        }

        debug!("navigated to {}", url);
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    pub async fn title(&self) -> Result<String, CdpError> {
        let result = self.evaluate("document.title").await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    // ========================================================================
    // JavaScript
    // ========================================================================

    /// Evaluate an expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Register a script to run in every new document of this target.
    pub async fn add_init_script(&self, source: &str) -> Result<(), CdpError> {
        self.call(
            "Page.addScriptToEvaluateOnNewDocument",
            Some(json!({"source": source})),
        )
        .await?;
        Ok(())
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Dispatch a press/release pair at page coordinates.
    pub async fn click_at(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
    ) -> Result<(), CdpError> {
        for count in 1..=click_count {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": MouseEventType::MousePressed,
                    "x": x,
                    "y": y,
                    "button": button,
                    "clickCount": count,
                })),
            )
            .await?;

            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": MouseEventType::MouseReleased,
                    "x": x,
                    "y": y,
                    "button": button,
                    "clickCount": count,
                })),
            )
            .await?;
        }

        debug!("clicked at ({:.0}, {:.0})", x, y);
        Ok(())
    }

    /// Move the pointer to page coordinates.
    pub async fn move_mouse(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
            })),
        )
        .await?;
        Ok(())
    }

    /// Insert text into the focused element.
    pub async fn insert_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        Ok(())
    }

    /// Press and release a named key ("Enter", "Escape", "Tab", ...).
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        for event_type in [KeyEventType::KeyDown, KeyEventType::KeyUp] {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({
                    "type": event_type,
                    "key": key,
                })),
            )
            .await?;
        }
        Ok(())
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Take a screenshot, returned as base64.
    pub async fn screenshot(
        &self,
        format: ScreenshotFormat,
        quality: Option<u8>,
        full_page: bool,
    ) -> Result<String, CdpError> {
        let mut params = json!({
            "format": format,
            "captureBeyondViewport": full_page,
        });
        if let Some(q) = quality {
            params["quality"] = json!(q);
        }

        let result = self.call("Page.captureScreenshot", Some(params)).await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("missing screenshot data".to_string()))
    }

    // ========================================================================
    // Readiness waits
    // ========================================================================

    /// Poll `document.readyState` until it reaches at least the given state.
    pub async fn wait_ready(&self, complete: bool, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();
        loop {
            let state = self.evaluate("document.readyState").await?;
            match state.as_str() {
                Some("complete") => return Ok(()),
                Some("interactive") if !complete => return Ok(()),
                _ => {}
            }
            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("page load timeout".to_string()));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Best-effort network-idle approximation: the number of resource timing
    /// entries must hold still across consecutive polls. Returns `false` on
    /// timeout rather than erroring; callers tolerate a busy network.
    pub async fn wait_network_settled(&self, timeout: Duration) -> Result<bool, CdpError> {
        const PROBE: &str = "performance.getEntriesByType('resource').length";
        const STABLE_POLLS: u32 = 3;

        let start = Instant::now();
        let mut last: i64 = -1;
        let mut stable = 0u32;

        while start.elapsed() < timeout {
            let count = self.evaluate(PROBE).await?.as_i64().unwrap_or(0);
            if count == last {
                stable += 1;
                if stable >= STABLE_POLLS {
                    return Ok(true);
                }
            } else {
                stable = 0;
                last = count;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        debug!("network did not settle within {:?}", timeout);
        Ok(false)
    }

    /// Poll the document height until it is unchanged across several
    /// consecutive samples. Returns `false` on timeout; a page that keeps
    /// reflowing is not fatal.
    pub async fn wait_dom_stable(&self, timeout: Duration) -> Result<bool, CdpError> {
        const PROBE: &str = "document.body ? document.body.scrollHeight : 0";
        const STABLE_POLLS: u32 = 3;

        let start = Instant::now();
        let mut last: i64 = -1;
        let mut stable = 0u32;

        while start.elapsed() < timeout {
            let height = self.evaluate(PROBE).await?.as_i64().unwrap_or(0);
            if height == last {
                stable += 1;
                if stable >= STABLE_POLLS {
                    return Ok(true);
                }
            } else {
                stable = 0;
                last = height;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        debug!("document height did not stabilize within {:?}", timeout);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_center() {
        let rect = ElementRect {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
            visible: true,
        };
        assert_eq!(rect.center(), (60.0, 40.0));
    }
}
