//! Raw events captured inside the page context.
//!
//! These are the objects the recorder script appends to the in-page buffer.
//! They are transient: every event passes through deduplication before it
//! becomes a [`Step`](crate::step::Step), and none is persisted directly.

use serde::{Deserialize, Serialize};

use crate::step::Action;

/// Absolute scroll offset in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// Direction of travel along each axis: `"left"`, `"right"`, `"up"`,
/// `"down"` or `"none"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrollDirection {
    pub x: String,
    pub y: String,
}

/// Distance travelled since the previously recorded scroll position.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScrollDelta {
    pub x: f64,
    pub y: f64,
}

/// One raw event drained from the in-page buffer.
///
/// Field names mirror the JSON the recorder script emits (camelCase for the
/// scroll payloads, matching the browser-side object literals).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedEvent {
    pub action: Action,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "scrollPosition")]
    pub scroll_position: Option<ScrollPosition>,
    #[serde(default, rename = "scrollDirection")]
    pub scroll_direction: Option<ScrollDirection>,
    #[serde(default, rename = "scrollDistance")]
    pub scroll_distance: Option<ScrollDelta>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl CapturedEvent {
    pub fn new(action: Action, timestamp: i64) -> Self {
        Self {
            action,
            selector: None,
            text: None,
            url: None,
            scroll_position: None,
            scroll_direction: None,
            scroll_distance: None,
            key: None,
            timestamp,
        }
    }

    pub fn click(selector: impl Into<String>, timestamp: i64) -> Self {
        let mut event = Self::new(Action::Click, timestamp);
        event.selector = Some(selector.into());
        event
    }

    pub fn fill(selector: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        let mut event = Self::new(Action::Fill, timestamp);
        event.selector = Some(selector.into());
        event.text = Some(text.into());
        event
    }

    pub fn navigate(url: impl Into<String>, timestamp: i64) -> Self {
        let mut event = Self::new(Action::Navigate, timestamp);
        event.url = Some(url.into());
        event
    }

    pub fn submit(selector: impl Into<String>, timestamp: i64) -> Self {
        let mut event = Self::new(Action::Submit, timestamp);
        event.selector = Some(selector.into());
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_scroll_payload() {
        let json = r#"{
            "action": "scroll",
            "scrollPosition": {"x": 0.0, "y": 640.0},
            "scrollDirection": {"x": "none", "y": "down"},
            "scrollDistance": {"x": 0.0, "y": 640.0},
            "timestamp": 1712000000000
        }"#;
        let event: CapturedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.action, Action::Scroll);
        assert_eq!(event.scroll_position.unwrap().y, 640.0);
        assert_eq!(event.scroll_direction.unwrap().y, "down");
    }

    #[test]
    fn tolerates_unknown_extras_from_the_page() {
        // Extra fields a future recorder script might ship must not break
        // the drain path.
        let json = r##"{
            "action": "click",
            "selector": "#login",
            "timestamp": 1,
            "elementInfo": {"tagName": "BUTTON"}
        }"##;
        let event: CapturedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.selector.as_deref(), Some("#login"));
    }
}
