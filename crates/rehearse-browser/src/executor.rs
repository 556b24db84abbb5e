//! Playback executor: drives the browser session through a recorded step
//! list with a per-step, multi-strategy state machine.
//!
//! Each step runs `Pending → Attempting(strategy i) → Succeeded | Failed`;
//! a strategy is only tried when the previous one threw. Per-step failures
//! land in that step's result entry and the run continues; fatal errors
//! (browser lost, sequencing violation) abort the remaining sequence.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use rehearse_protocols::{
    Action, AutomationError, RunReport, RunStatus, Step, StepResult, StepStatus,
};

use crate::cdp::{CdpError, ElementRect, MouseButton, PageSession, ScreenshotFormat};
use crate::compare::{ComparisonOutcome, evaluate_extraction};
use crate::scripts;
use crate::selector;

/// Tunables for playback pacing and patience.
#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    /// Skip hover steps entirely; they are rarely load-bearing and the most
    /// failure-prone interaction.
    pub skip_hover: bool,
    /// Per-strategy wait for an element to become visible.
    pub visibility_timeout: Duration,
    /// Default ceiling for explicit wait-for steps.
    pub wait_timeout: Duration,
    /// Ceiling for page load readiness after navigation.
    pub load_timeout: Duration,
    /// Best-effort network-idle bound after navigation; timeout tolerated.
    pub network_idle_timeout: Duration,
    /// Document-height stability bound after navigation; timeout tolerated.
    pub dom_stable_timeout: Duration,
    /// Fixed settle delay after navigation readiness.
    pub settle_after_navigation: Duration,
    /// Settle delay after simple pointer interactions.
    pub settle_after_click: Duration,
    /// Settle delay after form-affecting interactions.
    pub settle_after_form: Duration,
    /// Settle delay after scrolling.
    pub settle_after_scroll: Duration,
    /// Pause between characters in the type-simulation fill strategies.
    pub type_char_delay: Duration,
    /// Where screenshot steps write their captures.
    pub screenshot_dir: PathBuf,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            skip_hover: true,
            visibility_timeout: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(30),
            load_timeout: Duration::from_secs(30),
            network_idle_timeout: Duration::from_secs(25),
            dom_stable_timeout: Duration::from_secs(8),
            settle_after_navigation: Duration::from_millis(500),
            settle_after_click: Duration::from_millis(150),
            settle_after_form: Duration::from_millis(300),
            settle_after_scroll: Duration::from_millis(200),
            type_char_delay: Duration::from_millis(20),
            screenshot_dir: PathBuf::from("."),
        }
    }
}

/// Reject sequences whose submit has no click anywhere before it. Runs
/// before any browser call.
pub fn validate_sequence(steps: &[Step]) -> Result<(), AutomationError> {
    let mut click_seen = false;
    for step in steps {
        match step.action {
            Action::Click => click_seen = true,
            Action::Submit if !click_seen => {
                return Err(AutomationError::SequencingViolation(format!(
                    "submit step {} has no preceding click in the sequence",
                    step.order
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Connection-class driver faults turn into fatal `BrowserUnavailable`
/// errors; everything else stays a per-step failure.
fn connection_lost(error: &CdpError) -> bool {
    matches!(
        error,
        CdpError::SessionClosed | CdpError::WebSocket(_) | CdpError::ConnectionFailed(_)
    )
}

/// Drives one step list against a live page session.
pub struct PlaybackExecutor<'a> {
    page: &'a PageSession,
    options: &'a PlaybackOptions,
    /// Set once a click step has executed successfully in this run.
    click_executed: bool,
}

impl<'a> PlaybackExecutor<'a> {
    pub fn new(page: &'a PageSession, options: &'a PlaybackOptions) -> Self {
        Self {
            page,
            options,
            click_executed: false,
        }
    }

    /// Execute the step list in ascending `order` and assemble the run
    /// report. Never panics or leaks a raw error: every outcome is a
    /// structured report.
    pub async fn run(&mut self, steps: &[Step]) -> RunReport {
        let started = Instant::now();

        if let Err(violation) = validate_sequence(steps) {
            return build_report(Vec::new(), Some(violation.to_string()), started.elapsed());
        }

        let mut ordered: Vec<Step> = steps.to_vec();
        ordered.sort_by_key(|s| s.order);

        let mut results: Vec<StepResult> = Vec::with_capacity(ordered.len());
        let mut fatal: Option<String> = None;

        for step in ordered {
            debug!(order = step.order, action = ?step.action, "executing step");
            match self.execute_step(&step).await {
                Ok(result) => results.push(result),
                Err(error) => {
                    warn!(order = step.order, %error, "fatal error, aborting run");
                    results.push(StepResult::error(step, error.to_string()));
                    fatal = Some(error.to_string());
                    break;
                }
            }
        }

        build_report(results, fatal, started.elapsed())
    }

    /// Run one step through its strategy ladder. `Err` is reserved for fatal
    /// conditions; per-step failures come back as error result entries.
    async fn execute_step(&mut self, step: &Step) -> Result<StepResult, AutomationError> {
        let outcome = match step.action {
            Action::Navigate => {
                let Some(url) = step.input_value.as_deref() else {
                    return Ok(StepResult::error(step.clone(), "navigate step without URL"));
                };
                self.navigate_and_settle(url).await
            }
            Action::Click => {
                let result = self.click_ladder(step, MouseButton::Left, 1, true).await;
                if result.is_ok() {
                    self.click_executed = true;
                }
                result
            }
            Action::DoubleClick => self.click_ladder(step, MouseButton::Left, 2, false).await,
            Action::RightClick => self.click_ladder(step, MouseButton::Right, 1, false).await,
            Action::Fill => {
                let text = step.input_value.clone().unwrap_or_default();
                self.fill_ladder(step, &text).await
            }
            Action::Submit => {
                if !self.click_executed {
                    return Err(AutomationError::SequencingViolation(format!(
                        "submit step {} reached with no successfully executed click",
                        step.order
                    )));
                }
                // Submission is always a click on the recorded control, so
                // client-side validation and handlers still run.
                self.click_ladder(step, MouseButton::Left, 1, true).await
            }
            Action::Hover => {
                if self.options.skip_hover {
                    info!(selector = ?step.selector, "hover skipped by policy (deliberate no-op)");
                    return Ok(StepResult::skipped(step.clone(), "hover skipped by policy"));
                }
                self.hover(step).await
            }
            Action::Scroll => self.scroll(step).await,
            Action::Keypress => self.keypress(step).await,
            Action::Wait => {
                let millis = step
                    .input_value
                    .as_deref()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1000);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(())
            }
            Action::WaitForSelector => self.wait_for_selector(step, false).await,
            Action::WaitForElementVisible => self.wait_for_selector(step, true).await,
            Action::ExtractText | Action::ExtractJson => {
                return self.extract(step).await;
            }
            Action::Screenshot => self.screenshot(step).await,
        };

        match outcome {
            Ok(()) => {
                self.settle(step.action).await;
                Ok(StepResult::success(step.clone()))
            }
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => Ok(StepResult::error(step.clone(), error.to_string())),
        }
    }

    /// Settle delay scaled to the action's blast radius.
    async fn settle(&self, action: Action) {
        let delay = match action {
            Action::Click | Action::DoubleClick | Action::RightClick | Action::Hover => {
                self.options.settle_after_click
            }
            _ if action.affects_form() => self.options.settle_after_form,
            Action::Scroll => self.options.settle_after_scroll,
            _ => return,
        };
        tokio::time::sleep(delay).await;
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate and wait through the full readiness ladder: DOM content,
    /// then the load event, then a bounded best-effort network idle, a fixed
    /// settle delay, and a document-height stability poll.
    pub(crate) async fn navigate_and_settle(&self, url: &str) -> Result<(), AutomationError> {
        self.page.navigate(url).await.map_err(self.lift())?;

        // DOM content first, then the full load event.
        self.page
            .wait_ready(false, self.options.load_timeout)
            .await
            .map_err(|e| AutomationError::NavigationError(e.to_string()))?;
        self.page
            .wait_ready(true, self.options.load_timeout)
            .await
            .map_err(|e| AutomationError::NavigationError(e.to_string()))?;

        // Best-effort waits: a chatty network or reflowing page is tolerated.
        let _ = self
            .page
            .wait_network_settled(self.options.network_idle_timeout)
            .await;
        tokio::time::sleep(self.options.settle_after_navigation).await;
        let _ = self.page.wait_dom_stable(self.options.dom_stable_timeout).await;

        Ok(())
    }

    // ========================================================================
    // Element resolution
    // ========================================================================

    fn frame_arg(step: &Step) -> Value {
        step.iframe_context
            .as_deref()
            .map(Value::from)
            .unwrap_or(Value::Null)
    }

    async fn probe_count(&self, candidate: &str, frame: &Value) -> Result<u64, AutomationError> {
        let expr = scripts::invoke(scripts::COUNT_JS, &[json!(candidate), frame.clone()]);
        let value = self.page.evaluate(&expr).await.map_err(self.lift())?;
        Ok(value.as_u64().unwrap_or(0))
    }

    async fn probe_rect(
        &self,
        candidate: &str,
        frame: &Value,
    ) -> Result<Option<ElementRect>, AutomationError> {
        let expr = scripts::invoke(scripts::RECT_JS, &[json!(candidate), frame.clone()]);
        let value = self.page.evaluate(&expr).await.map_err(self.lift())?;
        if value.is_null() {
            return Ok(None);
        }
        let rect: ElementRect = serde_json::from_value(value).map_err(|e| {
            AutomationError::BrowserUnavailable(format!("malformed rect payload: {}", e))
        })?;
        Ok(Some(rect))
    }

    /// Resolve a step's selector, widening through the degradation ladder
    /// when the exact recorded selector no longer matches.
    async fn resolve(&self, step: &Step) -> Result<(String, ElementRect), AutomationError> {
        let Some(recorded) = step.selector.as_deref() else {
            return Err(AutomationError::ElementNotFound(
                "step carries no selector".to_string(),
            ));
        };

        let frame = Self::frame_arg(step);
        for candidate in selector::degrade(recorded) {
            if let Some(rect) = self.probe_rect(&candidate, &frame).await? {
                if candidate != recorded {
                    debug!(%recorded, %candidate, "selector degraded for playback");
                }
                return Ok((candidate, rect));
            }
        }

        Err(AutomationError::ElementNotFound(recorded.to_string()))
    }

    /// Poll until the candidate is visible, for the actionability-checked
    /// strategies.
    async fn wait_visible(
        &self,
        candidate: &str,
        frame: &Value,
    ) -> Result<ElementRect, AutomationError> {
        let deadline = Instant::now() + self.options.visibility_timeout;
        loop {
            if let Some(rect) = self.probe_rect(candidate, frame).await? {
                if rect.visible {
                    return Ok(rect);
                }
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::InteractionTimeout(format!(
                    "{} did not become visible",
                    candidate
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Lift a driver error: connection loss becomes fatal, the rest map into
    /// the engine taxonomy.
    fn lift(&self) -> impl Fn(CdpError) -> AutomationError {
        |error| {
            if connection_lost(&error) {
                AutomationError::BrowserUnavailable(error.to_string())
            } else {
                error.into()
            }
        }
    }

    // ========================================================================
    // Click ladder
    // ========================================================================

    async fn click_ladder(
        &self,
        step: &Step,
        button: MouseButton,
        click_count: u32,
        js_fallback: bool,
    ) -> Result<(), AutomationError> {
        let (candidate, _) = self.resolve(step).await?;
        let frame = Self::frame_arg(step);
        let mut last_error: Option<AutomationError> = None;

        // Strategy 1: wait for visibility, then a native input-event click.
        match self.wait_visible(&candidate, &frame).await {
            Ok(rect) => {
                let (x, y) = rect.center();
                match self.page.click_at(x, y, button, click_count).await {
                    Ok(()) => return Ok(()),
                    Err(e) if connection_lost(&e) => {
                        return Err(AutomationError::BrowserUnavailable(e.to_string()));
                    }
                    Err(e) => last_error = Some(e.into()),
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => last_error = Some(e),
        }
        warn!(%candidate, "native click failed, forcing");

        // Strategy 2: forced click, no actionability checks.
        if let Some(rect) = self.probe_rect(&candidate, &frame).await? {
            let (x, y) = rect.center();
            match self.page.click_at(x, y, button, click_count).await {
                Ok(()) => return Ok(()),
                Err(e) if connection_lost(&e) => {
                    return Err(AutomationError::BrowserUnavailable(e.to_string()));
                }
                Err(e) => last_error = Some(e.into()),
            }
        }

        // Strategy 3: direct DOM click from inside the page.
        if js_fallback {
            warn!(%candidate, "forced click failed, invoking DOM click");
            let expr = scripts::invoke(scripts::CLICK_JS, &[json!(candidate), frame.clone()]);
            match self.page.evaluate(&expr).await {
                Ok(value) if value.as_bool() == Some(true) => return Ok(()),
                Ok(_) => {}
                Err(e) if connection_lost(&e) => {
                    return Err(AutomationError::BrowserUnavailable(e.to_string()));
                }
                Err(e) => last_error = Some(e.into()),
            }
        }

        Err(AutomationError::InteractionTimeout(format!(
            "click ladder exhausted for {}: {}",
            candidate,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    // ========================================================================
    // Fill ladder
    // ========================================================================

    async fn focus_target(&self, candidate: &str, frame: &Value) -> Result<bool, AutomationError> {
        let expr = scripts::invoke(scripts::FOCUS_JS, &[json!(candidate), frame.clone()]);
        let value = self.page.evaluate(&expr).await.map_err(self.lift())?;
        Ok(value.as_bool() == Some(true))
    }

    async fn insert_whole(&self, candidate: &str, frame: &Value, text: &str) -> Result<(), AutomationError> {
        if !self.focus_target(candidate, frame).await? {
            return Err(AutomationError::ElementNotFound(candidate.to_string()));
        }
        self.page.insert_text(text).await.map_err(self.lift())
    }

    async fn insert_by_char(
        &self,
        candidate: &str,
        frame: &Value,
        text: &str,
    ) -> Result<(), AutomationError> {
        if !self.focus_target(candidate, frame).await? {
            return Err(AutomationError::ElementNotFound(candidate.to_string()));
        }
        for ch in text.chars() {
            self.page
                .insert_text(&ch.to_string())
                .await
                .map_err(self.lift())?;
            tokio::time::sleep(self.options.type_char_delay).await;
        }
        Ok(())
    }

    async fn fill_ladder(&self, step: &Step, text: &str) -> Result<(), AutomationError> {
        let (candidate, _) = self.resolve(step).await?;
        let frame = Self::frame_arg(step);
        let mut last_error: Option<AutomationError> = None;

        // Strategy 1: wait for visibility, then a native fill.
        match self.wait_visible(&candidate, &frame).await {
            Ok(_) => match self.insert_whole(&candidate, &frame, text).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => last_error = Some(e),
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => last_error = Some(e),
        }
        warn!(%candidate, "native fill failed, forcing");

        // Strategy 2: forced fill, no visibility wait.
        match self.insert_whole(&candidate, &frame, text).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => last_error = Some(e),
        }

        // Strategy 3: character-by-character typing.
        match self.insert_by_char(&candidate, &frame, text).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => last_error = Some(e),
        }

        // Strategy 4: forced typing after a direct click for focus.
        if let Some(rect) = self.probe_rect(&candidate, &frame).await? {
            let (x, y) = rect.center();
            let _ = self.page.click_at(x, y, MouseButton::Left, 1).await;
            match self.insert_by_char(&candidate, &frame, text).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => last_error = Some(e),
            }
        }

        // Strategy 5: script-based value assignment with synthetic
        // input/change/blur dispatch.
        warn!(%candidate, "typed fill failed, assigning value via script");
        let expr = scripts::invoke(
            scripts::FILL_JS,
            &[json!(candidate), frame.clone(), json!(text)],
        );
        match self.page.evaluate(&expr).await {
            Ok(value) if value.as_bool() == Some(true) => return Ok(()),
            Ok(_) => {}
            Err(e) if connection_lost(&e) => {
                return Err(AutomationError::BrowserUnavailable(e.to_string()));
            }
            Err(e) => last_error = Some(e.into()),
        }

        Err(AutomationError::InteractionTimeout(format!(
            "fill ladder exhausted for {}: {}",
            candidate,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    // ========================================================================
    // Remaining actions
    // ========================================================================

    async fn hover(&self, step: &Step) -> Result<(), AutomationError> {
        let (candidate, _) = self.resolve(step).await?;
        let frame = Self::frame_arg(step);
        let rect = self.wait_visible(&candidate, &frame).await?;
        let (x, y) = rect.center();
        self.page.move_mouse(x, y).await.map_err(self.lift())
    }

    async fn scroll(&self, step: &Step) -> Result<(), AutomationError> {
        let expr = match step.scroll_position {
            Some(position) => format!(
                "window.scrollTo({:.0}, {:.0})",
                position.x, position.y
            ),
            None => {
                let pixels = step
                    .input_value
                    .as_deref()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(500);
                format!("window.scrollBy(0, {})", pixels)
            }
        };
        self.page.evaluate(&expr).await.map_err(self.lift())?;
        Ok(())
    }

    async fn keypress(&self, step: &Step) -> Result<(), AutomationError> {
        let Some(key) = step.input_value.as_deref() else {
            return Err(AutomationError::InteractionTimeout(
                "keypress step without key".to_string(),
            ));
        };

        if let Some(selector) = step.selector.as_deref() {
            if !selector.is_empty() {
                let frame = Self::frame_arg(step);
                for candidate in selector::degrade(selector) {
                    if self.focus_target(&candidate, &frame).await? {
                        break;
                    }
                }
            }
        }

        self.page.press_key(key).await.map_err(self.lift())
    }

    async fn wait_for_selector(
        &self,
        step: &Step,
        require_visible: bool,
    ) -> Result<(), AutomationError> {
        let Some(sel) = step.selector.as_deref() else {
            return Err(AutomationError::ElementNotFound(
                "wait step carries no selector".to_string(),
            ));
        };
        let timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.options.wait_timeout);
        let frame = Self::frame_arg(step);

        let deadline = Instant::now() + timeout;
        loop {
            let present = if require_visible {
                self.probe_rect(sel, &frame)
                    .await?
                    .is_some_and(|rect| rect.visible)
            } else {
                self.probe_count(sel, &frame).await? > 0
            };
            if present {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::InteractionTimeout(format!(
                    "waiting for {} timed out after {:?}",
                    sel, timeout
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn extract(&mut self, step: &Step) -> Result<StepResult, AutomationError> {
        let Some(sel) = step.selector.as_deref() else {
            return Ok(StepResult::error(
                step.clone(),
                "extraction step carries no selector",
            ));
        };

        let frame = Self::frame_arg(step);
        let want_json = step.action == Action::ExtractJson;

        // Degrade the selector like any interaction; an extraction that
        // resolves nothing reads as empty rather than erroring out.
        let mut extracted = String::new();
        for candidate in selector::degrade(sel) {
            let expr = scripts::invoke(
                scripts::EXTRACT_JS,
                &[json!(candidate), frame.clone(), json!(want_json)],
            );
            let value = self.page.evaluate(&expr).await.map_err(self.lift())?;
            if let Some(text) = value.as_str() {
                if !text.is_empty() {
                    extracted = text.to_string();
                    break;
                }
            }
        }

        if want_json && !extracted.is_empty() {
            // The page-side scan already parsed it once; re-validate on the
            // host before the fragment reaches the compare engine.
            if serde_json::from_str::<Value>(&extracted).is_err() {
                extracted = String::new();
            }
        }

        let expected = step.input_value.as_deref();
        let result = match evaluate_extraction(&extracted, expected, step.compare_type) {
            ComparisonOutcome::Passed => {
                StepResult::success(step.clone()).with_extracted(extracted)
            }
            ComparisonOutcome::Inconclusive => {
                info!(selector = sel, "extraction yielded nothing; no assertion to make");
                StepResult::skipped(step.clone(), "empty extraction with no expected value")
            }
            ComparisonOutcome::Failed => {
                let failure = AutomationError::AssertionFailure {
                    extracted: extracted.clone(),
                    expected: expected.unwrap_or_default().to_string(),
                    mode: step.compare_type,
                };
                StepResult::error(step.clone(), failure.to_string()).with_extracted(extracted)
            }
        };

        Ok(result)
    }

    async fn screenshot(&self, step: &Step) -> Result<(), AutomationError> {
        let data = self
            .page
            .screenshot(ScreenshotFormat::Png, None, false)
            .await
            .map_err(self.lift())?;
        let bytes = BASE64.decode(data.as_bytes()).map_err(|e| {
            AutomationError::BrowserUnavailable(format!("undecodable screenshot payload: {}", e))
        })?;

        let path = match step.input_value.as_deref() {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self
                .options
                .screenshot_dir
                .join(format!("screenshot_{}.png", Utc::now().timestamp_millis())),
        };
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AutomationError::InteractionTimeout(format!(
                "failed to write screenshot {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "screenshot written");
        Ok(())
    }
}

/// Assemble the aggregate run record from the per-step results.
fn build_report(results: Vec<StepResult>, fatal: Option<String>, elapsed: Duration) -> RunReport {
    let first_step_error = results
        .iter()
        .find(|r| r.status == StepStatus::Error)
        .and_then(|r| r.error.clone());
    let error = fatal.or(first_step_error);

    let last_extraction = results
        .iter()
        .rev()
        .find(|r| r.step.action.is_extraction());
    let extracted_text = last_extraction.and_then(|r| r.extracted_text.clone());
    let expected_text = last_extraction.and_then(|r| r.step.input_value.clone());

    RunReport {
        status: if error.is_none() {
            RunStatus::Success
        } else {
            RunStatus::Error
        },
        duration: elapsed.as_secs_f64(),
        extracted_text,
        expected_text,
        error,
        results,
        finished_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_without_click_before_submit_is_rejected() {
        let mut steps = vec![Step::submit("#go")];
        rehearse_protocols::step::renumber(&mut steps);
        let err = validate_sequence(&steps).unwrap_err();
        assert!(matches!(err, AutomationError::SequencingViolation(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn click_before_submit_is_accepted() {
        let mut steps = vec![
            Step::navigate("https://e.com"),
            Step::click("#field"),
            Step::submit("#go"),
        ];
        rehearse_protocols::step::renumber(&mut steps);
        assert!(validate_sequence(&steps).is_ok());
    }

    #[test]
    fn click_after_submit_does_not_satisfy_the_invariant() {
        let mut steps = vec![Step::submit("#go"), Step::click("#field")];
        rehearse_protocols::step::renumber(&mut steps);
        assert!(validate_sequence(&steps).is_err());
    }

    #[test]
    fn empty_sequence_is_valid() {
        assert!(validate_sequence(&[]).is_ok());
    }

    #[test]
    fn report_surfaces_first_error_and_last_extraction() {
        let extraction =
            StepResult::success(Step::extract_text("#total", Some("42".into()))).with_extracted("42");
        let failure = StepResult::error(Step::click("#gone"), "element not found: #gone");
        let report = build_report(
            vec![failure, extraction],
            None,
            Duration::from_millis(1250),
        );

        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.error.as_deref(), Some("element not found: #gone"));
        assert_eq!(report.extracted_text.as_deref(), Some("42"));
        assert_eq!(report.expected_text.as_deref(), Some("42"));
        assert!((report.duration - 1.25).abs() < 1e-9);
    }

    #[test]
    fn clean_report_is_success() {
        let report = build_report(
            vec![StepResult::success(Step::navigate("https://e.com"))],
            None,
            Duration::from_secs(1),
        );
        assert_eq!(report.status, RunStatus::Success);
        assert!(report.error.is_none());
    }

    #[test]
    fn fatal_message_wins_over_step_errors() {
        let report = build_report(
            vec![StepResult::error(Step::click("#a"), "late failure")],
            Some("browser unavailable: connection lost".into()),
            Duration::from_secs(2),
        );
        assert_eq!(
            report.error.as_deref(),
            Some("browser unavailable: connection lost")
        );
    }

    #[test]
    fn skipped_steps_do_not_fail_a_run() {
        let report = build_report(
            vec![StepResult::skipped(
                Step::hover("#menu"),
                "hover skipped by policy",
            )],
            None,
            Duration::from_secs(1),
        );
        assert_eq!(report.status, RunStatus::Success);
    }

    #[test]
    fn default_options_match_policy() {
        let options = PlaybackOptions::default();
        assert!(options.skip_hover);
        assert_eq!(options.network_idle_timeout, Duration::from_secs(25));
        assert!(options.settle_after_form > options.settle_after_click);
    }
}
