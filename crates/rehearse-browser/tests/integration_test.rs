//! Live-browser integration tests.
//!
//! These need a local Chrome install and are `#[ignore]`d by default.
//! Run with: cargo test -p rehearse-browser --test integration_test -- --ignored --nocapture

use rehearse_browser::session::{AutomationSession, SessionConfig};
use rehearse_browser::worker::AutomationWorker;
use rehearse_protocols::{RunStatus, Step};

fn test_config() -> SessionConfig {
    SessionConfig {
        debug_port: 9333, // off the default port so a dev Chrome is untouched
        headless: true,
        profile_dir: Some(std::env::temp_dir().join("rehearse-test-profile")),
        ..SessionConfig::default()
    }
}

#[test]
#[ignore = "requires a local Chrome install"]
fn chrome_is_detectable() {
    let path = AutomationSession::find_chrome().expect("Chrome should be installed");
    assert!(path.exists());
}

#[test]
#[ignore = "requires a local Chrome install"]
fn navigate_and_extract() {
    let worker = AutomationWorker::start(test_config()).unwrap();

    worker.launch().unwrap();
    worker.navigate("https://example.com").unwrap();

    let url = worker.current_url().unwrap();
    assert!(url.contains("example.com"));

    let heading = worker.extract_text("h1").unwrap();
    assert!(!heading.is_empty());

    worker.close().unwrap();
}

#[test]
#[ignore = "requires a local Chrome install"]
fn replay_with_extraction_assertion() {
    let worker = AutomationWorker::start(test_config()).unwrap();

    let mut steps = vec![
        Step::navigate("https://example.com"),
        Step::extract_text("h1", Some("Example Domain".to_string())),
    ];
    rehearse_protocols::step::renumber(&mut steps);

    let report = worker.execute_steps(steps, None).unwrap();
    assert_eq!(report.status, RunStatus::Success, "report: {:?}", report);
    assert_eq!(report.extracted_text.as_deref(), Some("Example Domain"));
}

#[test]
#[ignore = "requires a local Chrome install"]
fn recording_captures_host_navigation() {
    let worker = AutomationWorker::start(test_config()).unwrap();

    worker.launch().unwrap();
    worker.start_recording(Some("https://example.com")).unwrap();
    worker.sync_events().unwrap();

    let steps = worker.stop_recording().unwrap();
    assert!(!steps.is_empty());
    assert_eq!(steps[0].input_value.as_deref(), Some("https://example.com"));
    assert_eq!(steps[0].order, 1);
}

#[test]
#[ignore = "requires a local Chrome install"]
fn submit_without_click_aborts_before_browser_work() {
    let worker = AutomationWorker::start(test_config()).unwrap();

    let mut steps = vec![Step::navigate("https://example.com"), Step::submit("#go")];
    rehearse_protocols::step::renumber(&mut steps);

    let report = worker.execute_steps(steps, None).unwrap();
    assert_eq!(report.status, RunStatus::Error);
    assert!(report.error.unwrap().contains("sequencing violation"));
    // The violation is raised before any step executes.
    assert!(report.results.is_empty());
}
