//! Canonical step records: the unit of recorded and replayed action.

use serde::{Deserialize, Serialize};

use crate::event::ScrollPosition;

/// Action kind, one variant per replayable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Navigate,
    Click,
    Fill,
    DoubleClick,
    RightClick,
    Hover,
    Scroll,
    Submit,
    Keypress,
    Wait,
    WaitForSelector,
    WaitForElementVisible,
    ExtractText,
    ExtractJson,
    Screenshot,
}

impl Action {
    /// Extraction actions feed the compare engine.
    pub fn is_extraction(&self) -> bool {
        matches!(self, Action::ExtractText | Action::ExtractJson)
    }

    /// Interactions that commonly mutate form state get a longer settle delay.
    pub fn affects_form(&self) -> bool {
        matches!(self, Action::Fill | Action::Submit | Action::Keypress)
    }
}

/// How a step's selector string should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorType {
    #[default]
    Css,
    Xpath,
    Text,
    Role,
    Testid,
}

/// Comparison mode for extraction steps.
///
/// `Contains` and `Partial` are implemented identically; the original system
/// never distinguished them and the equivalence is preserved deliberately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareType {
    #[default]
    Equals,
    NotEquals,
    Contains,
    Partial,
}

/// One canonical, replayable unit of recorded user action.
///
/// `input_value` is overloaded by action kind: the URL for `navigate`, the
/// text for `fill`, the key for `keypress`, the wait duration in milliseconds
/// for `wait`, and the expected text for extraction steps (absent for a
/// passive extraction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default)]
    pub selector_type: SelectorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_value: Option<String>,
    #[serde(default)]
    pub compare_type: CompareType,
    /// Selector of a same-origin iframe the step's target lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_context: Option<String>,
    /// Position within the owning sequence; contiguous and strictly
    /// increasing after [`renumber`].
    #[serde(default)]
    pub order: u32,
    /// Capture time in milliseconds. Used during deduplication only; never
    /// consulted on replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Absolute scroll target for `scroll` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_position: Option<ScrollPosition>,
    /// Override for the wait-style actions, milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            selector: None,
            selector_type: SelectorType::default(),
            input_value: None,
            compare_type: CompareType::default(),
            iframe_context: None,
            order: 0,
            timestamp: None,
            scroll_position: None,
            timeout_ms: None,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        let mut step = Self::new(Action::Navigate);
        step.input_value = Some(url.into());
        step
    }

    pub fn click(selector: impl Into<String>) -> Self {
        let mut step = Self::new(Action::Click);
        step.selector = Some(selector.into());
        step
    }

    pub fn fill(selector: impl Into<String>, text: impl Into<String>) -> Self {
        let mut step = Self::new(Action::Fill);
        step.selector = Some(selector.into());
        step.input_value = Some(text.into());
        step
    }

    pub fn submit(selector: impl Into<String>) -> Self {
        let mut step = Self::new(Action::Submit);
        step.selector = Some(selector.into());
        step
    }

    pub fn keypress(selector: impl Into<String>, key: impl Into<String>) -> Self {
        let mut step = Self::new(Action::Keypress);
        step.selector = Some(selector.into());
        step.input_value = Some(key.into());
        step
    }

    pub fn scroll(position: ScrollPosition) -> Self {
        let mut step = Self::new(Action::Scroll);
        step.scroll_position = Some(position);
        step
    }

    pub fn hover(selector: impl Into<String>) -> Self {
        let mut step = Self::new(Action::Hover);
        step.selector = Some(selector.into());
        step
    }

    pub fn extract_text(selector: impl Into<String>, expected: Option<String>) -> Self {
        let mut step = Self::new(Action::ExtractText);
        step.selector = Some(selector.into());
        step.input_value = expected;
        step
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The step's timestamp, or zero when it was never captured.
    pub fn timestamp_or_zero(&self) -> i64 {
        self.timestamp.unwrap_or(0)
    }
}

/// Reassign `order` values so they are contiguous and strictly increasing,
/// starting at 1. Call after deduplication or any edit of the sequence.
pub fn renumber(steps: &mut [Step]) {
    for (index, step) in steps.iter_mut().enumerate() {
        step.order = index as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_snake_case() {
        let json = serde_json::to_string(&Action::WaitForElementVisible).unwrap();
        assert_eq!(json, "\"wait_for_element_visible\"");
        let json = serde_json::to_string(&Action::ExtractJson).unwrap();
        assert_eq!(json, "\"extract_json\"");
    }

    #[test]
    fn step_round_trips_external_shape() {
        let json = r#"{
            "action": "fill",
            "selector": "input[name=\"q\"]",
            "selector_type": "css",
            "input_value": "hello",
            "compare_type": "equals",
            "order": 3
        }"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.action, Action::Fill);
        assert_eq!(step.selector.as_deref(), Some("input[name=\"q\"]"));
        assert_eq!(step.input_value.as_deref(), Some("hello"));
        assert_eq!(step.order, 3);
        assert!(step.iframe_context.is_none());

        let back = serde_json::to_value(&step).unwrap();
        assert_eq!(back["action"], "fill");
        assert_eq!(back["order"], 3);
        // Optional fields stay off the wire when unset.
        assert!(back.get("iframe_context").is_none());
        assert!(back.get("timestamp").is_none());
    }

    #[test]
    fn missing_enums_take_defaults() {
        let step: Step = serde_json::from_str(r##"{"action": "click", "selector": "#go"}"##).unwrap();
        assert_eq!(step.selector_type, SelectorType::Css);
        assert_eq!(step.compare_type, CompareType::Equals);
    }

    #[test]
    fn renumber_is_contiguous_from_one() {
        let mut steps = vec![Step::click("#a"), Step::click("#b"), Step::click("#c")];
        steps[0].order = 7;
        steps[2].order = 2;
        renumber(&mut steps);
        assert_eq!(
            steps.iter().map(|s| s.order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
