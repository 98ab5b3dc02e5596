// src/review/mod.rs
//
// The review workflow core: score aggregation, the submission status state
// machine, the AI bulk-grading pass, and the lesson-review checklist.

pub mod aggregate;
pub mod grading;
pub mod lesson;
pub mod state_machine;
