//! Simulator seam.
//!
//! The extractor drives any type implementing [`Simulator`]: launch it, load
//! a task, reset an episode, then alternately advance the scripted
//! demonstration and capture every camera view. [`SyntheticScene`] is the
//! built-in implementation.

pub mod synthetic;
pub mod task;

pub use synthetic::{SyntheticScene, HANDLE_BACKGROUND, HANDLE_GRIPPER, HANDLE_GROUND, HANDLE_OBJECT};
pub use task::TaskKind;

use capture_types::{
    CameraParams, CameraView, DepthFrame, LowDimState, MaskFrame, RgbFrame, DEFAULT_STEP_INTERVAL,
};

use crate::error::SimError;

/// Everything rendered for one view at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub rgb: RgbFrame,
    pub depth: DepthFrame,
    pub mask: Option<MaskFrame>,
    pub params: CameraParams,
}

/// A scene that can play back task demonstrations and render camera views.
pub trait Simulator {
    /// Starts the simulator. Calling it twice is harmless.
    fn launch(&mut self) -> Result<(), SimError>;

    fn is_running(&self) -> bool;

    /// The stock camera set of this simulator.
    fn default_views(&self) -> Result<Vec<CameraView>, SimError>;

    /// Task names this simulator can load.
    fn available_tasks(&self) -> Vec<String>;

    /// Makes `task` the current task.
    fn load_task(&mut self, task: &str) -> Result<(), SimError>;

    /// Starts episode `episode` of the current task and returns its
    /// natural-language descriptions.
    fn reset(&mut self, episode: usize) -> Result<Vec<String>, SimError>;

    /// Moves the demonstration one step forward and returns the new
    /// proprioceptive state, or `None` once the demonstration is over.
    fn advance_demo(&mut self) -> Result<Option<LowDimState>, SimError>;

    /// Renders `view` at the current state.
    fn capture(&self, view: &CameraView) -> Result<Capture, SimError>;

    /// Seconds between demonstration steps.
    fn step_interval(&self) -> f64 {
        DEFAULT_STEP_INTERVAL
    }

    /// Stops the simulator and releases its resources.
    fn shutdown(&mut self);
}
