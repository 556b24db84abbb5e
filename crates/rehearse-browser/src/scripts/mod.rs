//! Versioned in-page script assets.
//!
//! Everything that runs in the page context lives in `.js` files embedded at
//! build time; hosts never assemble page scripts by string concatenation.
//! Parameterized assets are written as single function expressions and
//! invoked with JSON-encoded arguments via [`invoke`].

use serde_json::Value;

/// Selector synthesizer + event capture listener. Installed both as an
/// init script (for documents created after navigation) and by direct
/// evaluation (for the already-loaded document); installation is idempotent.
pub(crate) const RECORDER_JS: &str = include_str!("recorder.js");

/// Text/JSON extraction cascade: `(selector, frameSelector, wantJson)`.
pub(crate) const EXTRACT_JS: &str = include_str!("extract.js");

/// Element geometry probe: `(selector, frameSelector)` →
/// `{x, y, width, height, visible} | null` in top-document coordinates.
pub(crate) const RECT_JS: &str = include_str!("rect.js");

/// Match count probe: `(selector, frameSelector)` → number.
pub(crate) const COUNT_JS: &str = include_str!("count.js");

/// Direct DOM click fallback: `(selector, frameSelector)` → bool.
pub(crate) const CLICK_JS: &str = include_str!("click.js");

/// Focus-and-select helper used by the fill ladder:
/// `(selector, frameSelector)` → bool.
pub(crate) const FOCUS_JS: &str = include_str!("focus.js");

/// Script-based value assignment with synthetic `input`/`change`/`blur`
/// dispatch: `(selector, frameSelector, value)` → bool.
pub(crate) const FILL_JS: &str = include_str!("fill.js");

/// Atomically read and clear the in-page event buffer.
pub(crate) const DRAIN_EVENTS_JS: &str = "(() => { \
     const events = window.__rehearseEvents || []; \
     window.__rehearseEvents = []; \
     return JSON.stringify(events); })()";

/// Build an invocation expression for a function-expression asset with
/// JSON-encoded arguments.
pub(crate) fn invoke(asset: &str, args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("({})({})", asset.trim_end(), rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invoke_encodes_arguments_as_json() {
        let expr = invoke("(function (a, b) { return a + b; })", &[json!("x\"y"), json!(2)]);
        assert!(expr.starts_with("((function"));
        assert!(expr.ends_with("(\"x\\\"y\", 2)"));
    }

    #[test]
    fn assets_are_function_expressions() {
        for asset in [EXTRACT_JS, RECT_JS, COUNT_JS, CLICK_JS, FOCUS_JS, FILL_JS] {
            let trimmed = asset.trim_end();
            assert!(trimmed.contains("(function ("), "asset must be callable");
            assert!(trimmed.ends_with(')'), "asset must be parenthesized");
        }
    }

    #[test]
    fn recorder_is_guarded_and_buffered() {
        assert!(RECORDER_JS.contains("__rehearseRecorderInstalled"));
        assert!(RECORDER_JS.contains("__rehearseEvents"));
        // SPA navigations are captured by wrapping the history API.
        assert!(RECORDER_JS.contains("history.pushState"));
        assert!(RECORDER_JS.contains("history.replaceState"));
    }

    #[test]
    fn script_fill_dispatches_the_events_a_real_edit_would() {
        for event in ["'input'", "'change'", "'blur'"] {
            assert!(FILL_JS.contains(event), "fill asset must dispatch {event}");
        }
        assert!(FILL_JS.contains("dispatchEvent"));
    }
}
