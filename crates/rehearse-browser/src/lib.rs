//! Browser record-and-replay automation engine.
//!
//! Watches a human operate a web page, synthesizes durable element locators,
//! compresses the raw event stream into a canonical step list, and later
//! replays that list against a live browser with resilient multi-strategy
//! execution and text-based assertions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   bounded channel    ┌───────────────────────────┐
//! │ callers (sync)   │ ───────────────────► │ AutomationWorker thread   │
//! │                  │ ◄─────────────────── │  owns AutomationSession   │
//! └──────────────────┘   reply channels     └────────────┬──────────────┘
//!                                                        │ CDP WebSocket
//!                                                        ▼
//!                                           ┌───────────────────────────┐
//!                                           │ Chrome (one page)         │
//!                                           │  recorder.js buffer       │
//!                                           └───────────────────────────┘
//! ```
//!
//! Recording: the embedded `recorder.js` asset synthesizes a selector for
//! every interaction and appends normalized events to an in-page buffer; the
//! host drains the buffer and folds events into steps through
//! suppression-window deduplication.
//!
//! Playback: each step runs through a per-action strategy ladder (native
//! input events first, forced variants next, script injection last), with
//! selector degradation when the recorded locator no longer resolves.
//!
//! Exactly one browser session exists at a time; the worker serializes every
//! operation, so recording and playback can never overlap.

pub mod cdp;
pub mod compare;
pub mod executor;
pub mod recorder;
mod scripts;
pub mod selector;
pub mod session;
pub mod worker;

pub use cdp::{CdpClient, CdpError, PageSession};
pub use compare::{ComparisonOutcome, compare, evaluate_extraction};
pub use executor::{PlaybackExecutor, PlaybackOptions, validate_sequence};
pub use recorder::{RecordingSession, RecordingState};
pub use session::{AutomationSession, SessionConfig, SessionState};
pub use worker::{AutomationWorker, DEFAULT_OP_TIMEOUT, Operation, Worker};
