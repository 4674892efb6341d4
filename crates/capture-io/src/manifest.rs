//! Per-task run manifest.
//!
//! `manifest.json` sits next to the episode directories of a task and records
//! which cameras were used and what each episode produced.

use std::path::Path;

use capture_types::layout::MANIFEST_FILE;
use capture_types::CameraView;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IoError;
use crate::reader::read_json;
use crate::serializer::{write_json, EpisodeSummary};

/// Generates a fresh run id.
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskManifest {
    pub run_id: Uuid,
    pub task_name: String,
    pub cameras: Vec<CameraView>,
    pub episodes: Vec<EpisodeSummary>,
}

impl TaskManifest {
    pub fn new(task_name: impl Into<String>, cameras: Vec<CameraView>) -> Self {
        Self {
            run_id: generate_run_id(),
            task_name: task_name.into(),
            cameras,
            episodes: Vec::new(),
        }
    }

    pub fn total_steps(&self) -> usize {
        self.episodes.iter().map(|e| e.steps).sum()
    }

    /// Writes `task_dir/manifest.json`.
    pub fn write(&self, task_dir: &Path) -> Result<(), IoError> {
        write_json(&task_dir.join(MANIFEST_FILE), self)
    }

    /// Reads `task_dir/manifest.json`.
    pub fn read(task_dir: &Path) -> Result<Self, IoError> {
        read_json(&task_dir.join(MANIFEST_FILE))
    }
}
