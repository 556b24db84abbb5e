//! CDP message and input-event types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Error payload inside a response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

/// Browser version info from `/json/version`.
///
/// Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Page info from the `/json` discovery endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
    pub web_socket_debugger_url: Option<String>,
}

/// Mouse button for `Input.dispatchMouseEvent`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
}

/// Mouse event type for `Input.dispatchMouseEvent`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    MousePressed,
    MouseReleased,
    MouseMoved,
    MouseWheel,
}

/// Key event type for `Input.dispatchKeyEvent`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
}

/// Screenshot format for `Page.captureScreenshot`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    Jpeg,
    Png,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = CdpRequest {
            id: 4,
            method: "Runtime.evaluate".into(),
            params: Some(serde_json::json!({"expression": "1 + 1"})),
            session_id: Some("SID".into()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["sessionId"], "SID");
        assert_eq!(json["params"]["expression"], "1 + 1");
    }

    #[test]
    fn response_distinguishes_events() {
        let event: CdpResponse = serde_json::from_str(
            r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S"}"#,
        )
        .unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));

        let reply: CdpResponse =
            serde_json::from_str(r#"{"id": 9, "result": {"frameId": "F"}}"#).unwrap();
        assert_eq!(reply.id, Some(9));
        assert!(reply.method.is_none());
    }

    #[test]
    fn input_enums_serialize_camel_case() {
        assert_eq!(
            serde_json::to_string(&MouseEventType::MousePressed).unwrap(),
            "\"mousePressed\""
        );
        assert_eq!(serde_json::to_string(&MouseButton::Left).unwrap(), "\"left\"");
        assert_eq!(serde_json::to_string(&KeyEventType::KeyUp).unwrap(), "\"keyUp\"");
    }
}
