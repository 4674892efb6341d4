//! Errors raised while driving a simulator and extracting episodes.

use capture_io::{IoError, VideoError};
use capture_types::{FrameError, ViewError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors reported by a [`Simulator`](crate::sim::Simulator).
#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulator has not been launched")]
    NotLaunched,
    #[error("no task loaded")]
    NoTask,
    #[error("unknown task '{0}'")]
    UnknownTask(String),
    #[error("no episode in progress; reset the task first")]
    NotReset,
    #[error("invalid camera view: {0}")]
    View(#[from] ViewError),
    #[error("rendered frame is invalid: {0}")]
    Frame(#[from] FrameError),
}

/// Top-level error for capture runs.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("simulator error: {0}")]
    Sim(#[from] SimError),
    #[error("dataset error: {0}")]
    Io(#[from] IoError),
    #[error("video error: {0}")]
    Video(#[from] VideoError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
    #[error("no camera named '{0}'")]
    UnknownCamera(String),
    #[error("episode {episode} of {task} produced no steps")]
    EmptyEpisode { task: String, episode: usize },
}
