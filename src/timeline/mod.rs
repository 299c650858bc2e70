//! Placement of clips on the output timeline.

pub mod sequencer;

pub use sequencer::{ClipPlan, Timeline, TimelineEntry, TimelinePlan, TimelineSettings};
