//! Execution runtime - in-process implementation of the execution queue

mod lane_queue;

pub use lane_queue::{LaneQueue, LaneQueueConfig};
