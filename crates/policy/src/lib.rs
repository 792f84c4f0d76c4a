//! # Sentinel Policy
//!
//! The decision policy turns a workload's logs into a [`Decision`] by asking
//! the model to fill in a fixed signature, steered by a small set of
//! demonstrations. [`calibrate`] builds that set offline; [`ExampleStore`]
//! serves it and swaps it atomically.
//!
//! [`Decision`]: sentinel_core::Decision

pub mod calibrate;
pub mod examples;
pub mod expert;
pub mod parse;
pub mod policy;
pub mod signature;

#[cfg(test)]
mod test_helpers;

pub use calibrate::{
    CalibrationError, CalibrationReport, Calibrator, LabeledExample, default_trainset,
    load_dataset,
};
pub use examples::{Demonstration, ExampleSet, ExampleSetSummary, ExampleStore, StoreError};
pub use expert::ConsultExpertTool;
pub use parse::parse_decision;
pub use policy::{DecisionPolicy, PolicyOutcome, PolicySettings};
