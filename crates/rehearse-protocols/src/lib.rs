//! # Rehearse Protocols
//!
//! Shared data model for the rehearse record-and-replay engine:
//! the canonical [`Step`] record, the raw in-page [`CapturedEvent`],
//! execution results, and the engine error taxonomy.
//!
//! This crate holds data and invariants only — no browser logic.

pub mod error;
pub mod event;
pub mod result;
pub mod step;

pub use error::AutomationError;
pub use event::{CapturedEvent, ScrollDelta, ScrollDirection, ScrollPosition};
pub use result::{RunReport, RunStatus, StepResult, StepStatus};
pub use step::{Action, CompareType, SelectorType, Step};
