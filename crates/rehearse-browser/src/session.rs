//! The automation session: one logical session owning one live browser.
//!
//! Replaces the original system's process-wide singleton with an explicit
//! per-session object. Exactly one browser + one page exist per session, and
//! the session is owned exclusively by the automation worker; nothing else
//! touches the driver handles.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use rehearse_protocols::{AutomationError, CapturedEvent, RunReport, Step};

use crate::cdp::{CdpClient, PageSession, ScreenshotFormat};
use crate::executor::{PlaybackExecutor, PlaybackOptions};
use crate::recorder::RecordingSession;
use crate::scripts;

/// Browser session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chrome remote-debugging port.
    pub debug_port: u16,
    /// Run Chrome headless.
    pub headless: bool,
    /// Window size passed to Chrome.
    pub window_width: u32,
    pub window_height: u32,
    /// Profile directory for persistent state; defaults to
    /// `~/.rehearse/browser-profile`.
    pub profile_dir: Option<PathBuf>,
    /// Explicit Chrome binary; autodetected when unset.
    pub chrome_path: Option<PathBuf>,
    /// Playback pacing and patience.
    pub playback: PlaybackOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            headless: false,
            window_width: 1920,
            window_height: 1080,
            profile_dir: None,
            chrome_path: None,
            playback: PlaybackOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".rehearse")
                .join("browser-profile")
        })
    }
}

/// Browser session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Launched,
    NavigatedReady,
}

/// One logical automation session: config, at most one live browser, and at
/// most one recording in flight.
pub struct AutomationSession {
    config: SessionConfig,
    chrome: Option<Child>,
    client: Option<CdpClient>,
    page: Option<PageSession>,
    recording: Option<RecordingSession>,
    state: SessionState,
}

impl AutomationSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            chrome: None,
            client: None,
            page: None,
            recording: None,
            state: SessionState::Closed,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Locate a Chrome/Chromium binary.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        candidates
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    async fn is_chrome_running(&self) -> bool {
        reqwest::get(format!("{}/json/version", self.config.endpoint()))
            .await
            .is_ok()
    }

    async fn spawn_chrome(&self) -> Result<Child, AutomationError> {
        let chrome_path = self
            .config
            .chrome_path
            .clone()
            .or_else(Self::find_chrome)
            .ok_or_else(|| {
                AutomationError::BrowserUnavailable("no Chrome installation found".to_string())
            })?;

        let profile_dir = self.config.profile_dir();
        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("failed to create profile directory: {}", e);
        }

        info!(
            "launching {} with profile {}",
            chrome_path.display(),
            profile_dir.display()
        );

        let mut cmd = Command::new(&chrome_path);
        cmd.arg(format!("--remote-debugging-port={}", self.config.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg(format!(
                "--window-size={},{}",
                self.config.window_width, self.config.window_height
            ))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        if self.config.headless {
            cmd.arg("--headless=new");
        }

        cmd.spawn().map_err(|e| {
            AutomationError::BrowserUnavailable(format!("failed to launch Chrome: {}", e))
        })
    }

    /// Launch the browser session: spawn Chrome if needed, connect, open the
    /// single page, and install the recorder script for every future
    /// document plus the current one.
    pub async fn launch(&mut self) -> Result<(), AutomationError> {
        if self.client.is_some() {
            return Ok(());
        }

        if !self.is_chrome_running().await {
            let child = self.spawn_chrome().await?;
            self.chrome = Some(child);

            let mut attempts = 0;
            while !self.is_chrome_running().await {
                attempts += 1;
                if attempts > 30 {
                    return Err(AutomationError::BrowserUnavailable(
                        "Chrome did not start accepting connections".to_string(),
                    ));
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        } else {
            info!("Chrome already running on port {}", self.config.debug_port);
        }

        let client = CdpClient::connect(&self.config.endpoint()).await?;
        let page = client.new_page(None).await?;

        // Dual installation: init script for documents created after every
        // navigation, direct evaluation for the one already loaded.
        page.add_init_script(scripts::RECORDER_JS).await?;
        page.evaluate(scripts::RECORDER_JS).await?;

        self.client = Some(client);
        self.page = Some(page);
        self.state = SessionState::Launched;

        info!("browser session launched");
        Ok(())
    }

    pub async fn ensure_launched(&mut self) -> Result<(), AutomationError> {
        if self.client.is_none() {
            self.launch().await?;
        }
        Ok(())
    }

    fn page(&self) -> Result<&PageSession, AutomationError> {
        self.page.as_ref().ok_or_else(|| {
            AutomationError::BrowserUnavailable("browser session is closed".to_string())
        })
    }

    /// Navigate the page and wait through the full readiness ladder. While a
    /// recording is active the navigation is folded into the step list via
    /// the usual dedup path.
    pub async fn goto(&mut self, url: &str) -> Result<(), AutomationError> {
        self.ensure_launched().await?;

        {
            let executor = PlaybackExecutor::new(self.page()?, &self.config.playback);
            executor.navigate_and_settle(url).await?;
        }
        self.state = SessionState::NavigatedReady;

        if let Some(recording) = self.recording.as_mut() {
            recording.push_navigation(url, Utc::now().timestamp_millis());
        }
        Ok(())
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Begin a recording session, optionally seeding it with a navigation.
    pub async fn start_recording(&mut self, seed_url: Option<&str>) -> Result<(), AutomationError> {
        self.ensure_launched().await?;

        // Re-installation is a no-op when the listener is already in place.
        self.page()?.evaluate(scripts::RECORDER_JS).await?;

        let mut recording = RecordingSession::new();
        recording.start();
        self.recording = Some(recording);

        if let Some(url) = seed_url {
            self.goto(url).await?;
        }

        info!("recording started");
        Ok(())
    }

    /// Drain the in-page event buffer (read + clear in one evaluation) and
    /// fold the events into the step list. Returns how many raw events were
    /// drained.
    pub async fn sync_events(&mut self) -> Result<usize, AutomationError> {
        if self.recording.is_none() {
            return Ok(0);
        }

        let raw = self.page()?.evaluate(scripts::DRAIN_EVENTS_JS).await?;
        let payload = raw.as_str().unwrap_or("[]");
        let events: Vec<CapturedEvent> = serde_json::from_str(payload).map_err(|e| {
            AutomationError::BrowserUnavailable(format!("malformed event buffer: {}", e))
        })?;

        let drained = events.len();
        if let Some(recording) = self.recording.as_mut() {
            for event in events {
                recording.push_event(event);
            }
        }

        if drained > 0 {
            debug!("drained {} in-page events", drained);
        }
        Ok(drained)
    }

    /// Stop recording, hand off the canonical step list, and tear the
    /// browser session down.
    pub async fn stop_recording(&mut self) -> Result<Vec<Step>, AutomationError> {
        if let Err(e) = self.sync_events().await {
            warn!("final event drain failed: {}", e);
        }

        let steps = match self.recording.take() {
            Some(recording) => recording.finish(),
            None => Vec::new(),
        };

        info!("recording stopped with {} steps", steps.len());
        self.close().await;
        Ok(steps)
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Replay a step sequence, optionally navigating to a seed URL first.
    /// Always returns a structured report, and always attempts teardown
    /// afterwards regardless of the outcome.
    pub async fn execute_steps(&mut self, steps: &[Step], seed_url: Option<&str>) -> RunReport {
        let report = self.execute_steps_inner(steps, seed_url).await;
        // Teardown runs in all cases so browser processes never leak.
        self.close().await;
        report
    }

    async fn execute_steps_inner(&mut self, steps: &[Step], seed_url: Option<&str>) -> RunReport {
        let started = std::time::Instant::now();

        let failure_report = |message: String, elapsed: Duration| RunReport {
            status: rehearse_protocols::RunStatus::Error,
            duration: elapsed.as_secs_f64(),
            extracted_text: None,
            expected_text: None,
            error: Some(message),
            results: Vec::new(),
            finished_at: Utc::now(),
        };

        // Sequencing is validated before the browser is even launched.
        if let Err(e) = crate::executor::validate_sequence(steps) {
            return failure_report(e.to_string(), started.elapsed());
        }

        if let Err(e) = self.ensure_launched().await {
            return failure_report(e.to_string(), started.elapsed());
        }

        if let Some(url) = seed_url {
            if let Err(e) = self.goto(url).await {
                return failure_report(e.to_string(), started.elapsed());
            }
        }

        let page = match self.page() {
            Ok(page) => page,
            Err(e) => return failure_report(e.to_string(), started.elapsed()),
        };

        let mut executor = PlaybackExecutor::new(page, &self.config.playback);
        executor.run(steps).await
    }

    // ========================================================================
    // One-off operations
    // ========================================================================

    /// Extract text for a selector on the current page.
    pub async fn extract_text(&mut self, selector: &str) -> Result<String, AutomationError> {
        self.ensure_launched().await?;
        let expr = scripts::invoke(
            scripts::EXTRACT_JS,
            &[json!(selector), serde_json::Value::Null, json!(false)],
        );
        let value = self.page()?.evaluate(&expr).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Capture a PNG screenshot of the current page.
    pub async fn screenshot(&mut self, path: Option<&str>) -> Result<PathBuf, AutomationError> {
        use base64::Engine as _;

        self.ensure_launched().await?;
        let data = self
            .page()?
            .screenshot(ScreenshotFormat::Png, None, false)
            .await?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| {
                AutomationError::BrowserUnavailable(format!(
                    "undecodable screenshot payload: {}",
                    e
                ))
            })?;

        let path = match path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(format!("screenshot_{}.png", Utc::now().timestamp_millis())),
        };
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AutomationError::BrowserUnavailable(format!(
                "failed to write screenshot {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(path)
    }

    /// Current page URL.
    pub async fn current_url(&mut self) -> Result<String, AutomationError> {
        self.ensure_launched().await?;
        Ok(self.page()?.current_url().await?)
    }

    /// Current page title.
    pub async fn title(&mut self) -> Result<String, AutomationError> {
        self.ensure_launched().await?;
        Ok(self.page()?.title().await?)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear the browser session down. Errors are logged, never raised: this
    /// runs on every exit path.
    pub async fn close(&mut self) {
        self.recording = None;

        if let (Some(client), Some(page)) = (self.client.as_ref(), self.page.as_ref()) {
            if let Err(e) = client.close_page(page.target_id()).await {
                debug!("close_page during teardown: {}", e);
            }
        }
        self.page = None;
        self.client = None;

        if let Some(mut child) = self.chrome.take() {
            if let Err(e) = child.kill().await {
                debug!("chrome kill during teardown: {}", e);
            }
        }

        self.state = SessionState::Closed;
        info!("browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.debug_port, 9222);
        assert_eq!(config.endpoint(), "http://localhost:9222");
        assert!(!config.headless);
        assert_eq!((config.window_width, config.window_height), (1920, 1080));
    }

    #[test]
    fn profile_dir_defaults_under_home() {
        let config = SessionConfig::default();
        assert!(config.profile_dir().ends_with(".rehearse/browser-profile"));
    }

    #[test]
    fn new_session_is_closed_and_not_recording() {
        let session = AutomationSession::new(SessionConfig::default());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_recording());
    }

    #[tokio::test]
    async fn close_without_launch_is_harmless() {
        let mut session = AutomationSession::new(SessionConfig::default());
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn sync_events_without_recording_is_zero() {
        let mut session = AutomationSession::new(SessionConfig::default());
        assert_eq!(session.sync_events().await.unwrap(), 0);
    }
}
