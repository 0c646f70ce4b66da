//! State module for tracking crawl progress
//!
//! `TargetState` is the per-page state machine driven by the fetch executor.

mod target_state;

pub use target_state::TargetState;
