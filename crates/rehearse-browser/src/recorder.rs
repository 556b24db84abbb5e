//! Recording session: folds raw in-page events into the canonical step list.
//!
//! Every drained event passes through suppression-window deduplication
//! against the current last step before it may become a step of its own.
//! Selector comparisons happen on normalized selectors so transient state
//! classes do not defeat dedup.

use rehearse_protocols::{Action, CapturedEvent, Step, step::renumber};
use tracing::{debug, trace};

use crate::selector;

/// A navigate recorded within this window after a submit is the submission's
/// own side effect, not a separate user action.
const SUBMIT_NAVIGATION_WINDOW_MS: i64 = 3000;

/// Recording lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Stopped,
}

/// One ephemeral recording session: owns the step list being assembled and
/// hands it off when recording stops.
pub struct RecordingSession {
    state: RecordingState,
    steps: Vec<Step>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: RecordingState::Idle,
            steps: Vec::new(),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn start(&mut self) {
        self.state = RecordingState::Recording;
        self.steps.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fold one drained event into the step list. Returns true when the
    /// event survived deduplication and became a step.
    pub fn push_event(&mut self, event: CapturedEvent) -> bool {
        if self.state != RecordingState::Recording {
            return false;
        }

        let Some(step) = step_from_event(&event) else {
            trace!("dropping incomplete {:?} event", event.action);
            return false;
        };

        if let Some(last) = self.steps.last() {
            if is_submit_navigation(last, &step) {
                debug!("dropping navigate caused by preceding submit");
                return false;
            }
            if is_duplicate(last, &step) {
                trace!("suppressing duplicate {:?} step", step.action);
                return false;
            }
        }

        self.steps.push(step);
        true
    }

    /// Record a host-driven navigation (e.g. the seed URL) through the same
    /// dedup path as in-page navigations.
    pub fn push_navigation(&mut self, url: &str, timestamp: i64) -> bool {
        self.push_event(CapturedEvent::navigate(url, timestamp))
    }

    /// Stop recording and hand off the canonical step list, with `order`
    /// renumbered contiguously.
    pub fn finish(mut self) -> Vec<Step> {
        self.state = RecordingState::Stopped;
        renumber(&mut self.steps);
        self.steps
    }
}

/// Convert a raw event into a step candidate; events missing their required
/// payload yield nothing.
fn step_from_event(event: &CapturedEvent) -> Option<Step> {
    let selector = event
        .selector
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut step = Step::new(event.action);
    step.timestamp = Some(event.timestamp);

    match event.action {
        Action::Navigate => {
            step.input_value = Some(event.url.clone()?);
        }
        Action::Click | Action::Hover | Action::Submit | Action::DoubleClick | Action::RightClick => {
            step.selector = Some(selector?);
        }
        Action::Fill => {
            step.selector = Some(selector?);
            step.input_value = Some(event.text.clone().unwrap_or_default());
        }
        Action::Keypress => {
            step.selector = selector;
            step.input_value = Some(event.key.clone()?);
        }
        Action::Scroll => {
            step.scroll_position = Some(event.scroll_position?);
        }
        // Wait/extract/screenshot steps are authored, never captured.
        _ => return None,
    }

    Some(step)
}

/// Suppression window for repeats of the same action, in milliseconds.
fn suppression_window_ms(action: Action) -> i64 {
    match action {
        Action::Navigate | Action::Fill => 2000,
        Action::Click
        | Action::Hover
        | Action::Keypress
        | Action::Submit
        | Action::Scroll => 1000,
        _ => 0,
    }
}

fn same_selector(a: &Step, b: &Step) -> bool {
    match (a.selector.as_deref(), b.selector.as_deref()) {
        (Some(a), Some(b)) => selector::equivalent(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Is `candidate` a short-interval repeat of `last`?
fn is_duplicate(last: &Step, candidate: &Step) -> bool {
    if last.action != candidate.action {
        return false;
    }

    let elapsed = candidate.timestamp_or_zero() - last.timestamp_or_zero();
    if elapsed >= suppression_window_ms(candidate.action) {
        return false;
    }

    match candidate.action {
        Action::Navigate => last.input_value == candidate.input_value,
        Action::Click | Action::Hover | Action::Submit => same_selector(last, candidate),
        Action::Fill => same_selector(last, candidate) && last.input_value == candidate.input_value,
        Action::Keypress => {
            same_selector(last, candidate) && last.input_value == candidate.input_value
        }
        Action::Scroll => last.scroll_position == candidate.scroll_position,
        _ => false,
    }
}

/// A navigate right after a submit is the form submission's own navigation.
fn is_submit_navigation(last: &Step, candidate: &Step) -> bool {
    last.action == Action::Submit
        && candidate.action == Action::Navigate
        && candidate.timestamp_or_zero() - last.timestamp_or_zero() < SUBMIT_NAVIGATION_WINDOW_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> RecordingSession {
        let mut session = RecordingSession::new();
        session.start();
        session
    }

    #[test]
    fn idle_session_records_nothing() {
        let mut session = RecordingSession::new();
        assert!(!session.push_event(CapturedEvent::click("#a", 0)));
        assert!(session.is_empty());
    }

    #[test]
    fn dedup_is_idempotent_within_window() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::click("#a", 1000)));
        assert!(!session.push_event(CapturedEvent::click("#a", 1500)));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn repeats_outside_the_window_are_kept() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::click("#a", 1000)));
        assert!(session.push_event(CapturedEvent::click("#a", 2100)));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn navigate_window_is_two_seconds() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::navigate("https://e.com/a", 0)));
        assert!(!session.push_event(CapturedEvent::navigate("https://e.com/a", 1900)));
        assert!(session.push_event(CapturedEvent::navigate("https://e.com/a", 4000)));
        assert!(session.push_event(CapturedEvent::navigate("https://e.com/b", 4100)));
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn fill_dedup_needs_same_text() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::fill("#q", "hel", 0)));
        assert!(!session.push_event(CapturedEvent::fill("#q", "hel", 500)));
        assert!(session.push_event(CapturedEvent::fill("#q", "hello", 900)));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn normalization_defeats_state_class_churn() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::click("button.save.is-active", 0)));
        assert!(!session.push_event(CapturedEvent::click("button.save", 400)));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn submit_navigation_is_dropped() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::click("#go", 0)));
        assert!(session.push_event(CapturedEvent::submit("#go", 100)));
        assert!(!session.push_event(CapturedEvent::navigate("https://e.com/done", 2500)));

        let steps = session.finish();
        assert_eq!(
            steps.iter().map(|s| s.action).collect::<Vec<_>>(),
            vec![Action::Click, Action::Submit]
        );
    }

    #[test]
    fn late_navigation_after_submit_survives() {
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::submit("#go", 0)));
        assert!(session.push_event(CapturedEvent::navigate("https://e.com/done", 3500)));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn click_then_submit_on_same_selector_both_survive() {
        // Different actions never suppress each other.
        let mut session = recording();
        assert!(session.push_event(CapturedEvent::click("#go", 0)));
        assert!(session.push_event(CapturedEvent::submit("#go", 50)));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn keypress_dedup_keys_on_key() {
        let mut session = recording();
        let mut enter = CapturedEvent::new(Action::Keypress, 0);
        enter.selector = Some("#q".into());
        enter.key = Some("Enter".into());
        let mut tab = enter.clone();
        tab.key = Some("Tab".into());
        tab.timestamp = 200;

        assert!(session.push_event(enter.clone()));
        enter.timestamp = 100;
        assert!(!session.push_event(enter));
        assert!(session.push_event(tab));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn incomplete_events_are_dropped() {
        let mut session = recording();
        // A click with no selector cannot be replayed.
        assert!(!session.push_event(CapturedEvent::new(Action::Click, 0)));
        // A scroll with no position is meaningless.
        assert!(!session.push_event(CapturedEvent::new(Action::Scroll, 0)));
        assert!(session.is_empty());
    }

    #[test]
    fn finish_renumbers_contiguously() {
        let mut session = recording();
        session.push_event(CapturedEvent::navigate("https://e.com", 0));
        session.push_event(CapturedEvent::click("#a", 3000));
        session.push_event(CapturedEvent::fill("#q", "hi", 6000));

        let steps = session.finish();
        assert_eq!(steps.iter().map(|s| s.order).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
