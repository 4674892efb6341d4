//! Episode Records
//!
//! An [`EpisodeRecord`] is the in-memory form of one recorded demonstration:
//! an ordered list of steps, each holding one observation per camera plus the
//! robot's low-dimensional state. Records are built by the extractor, handed
//! to the serializer, then dropped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::frame::{DepthFrame, MaskFrame, PointCloud, RgbFrame};
use crate::layout::episode_dir_name;
use crate::params::CameraParams;

/// Seconds between consecutive demo steps.
pub const DEFAULT_STEP_INTERVAL: f64 = 0.1;

/// Proprioceptive and task state for one step. Absent fields are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LowDimState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_positions: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_velocities: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_forces: Option<Vec<f64>>,
    /// 1.0 fully open, 0.0 closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gripper_open: Option<f64>,
    /// [x, y, z, qx, qy, qz, qw]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gripper_pose: Option<[f64; 7]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gripper_joint_positions: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gripper_touch_forces: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_low_dim_state: Option<Vec<f64>>,
}

impl LowDimState {
    /// Returns true if no field is populated.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything one camera saw at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewObservation {
    pub rgb: RgbFrame,
    pub depth: DepthFrame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_cloud: Option<PointCloud>,
    pub params: CameraParams,
}

/// One timestep of an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepObservation {
    pub step: usize,
    /// Seconds since the episode started
    pub timestamp: f64,
    pub views: BTreeMap<String, ViewObservation>,
    #[serde(default)]
    pub low_dim: LowDimState,
}

impl StepObservation {
    /// Creates an empty step with the timestamp derived from `interval`.
    pub fn new(step: usize, interval: f64) -> Self {
        Self {
            step,
            timestamp: step as f64 * interval,
            views: BTreeMap::new(),
            low_dim: LowDimState::default(),
        }
    }

    pub fn with_low_dim(mut self, low_dim: LowDimState) -> Self {
        self.low_dim = low_dim;
        self
    }

    pub fn insert_view(&mut self, name: impl Into<String>, observation: ViewObservation) {
        self.views.insert(name.into(), observation);
    }
}

/// A complete recorded demonstration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub task_name: String,
    pub episode_index: usize,
    #[serde(default)]
    pub descriptions: Vec<String>,
    pub steps: Vec<StepObservation>,
}

impl EpisodeRecord {
    /// Creates an empty episode.
    pub fn new(task_name: impl Into<String>, episode_index: usize) -> Self {
        Self {
            task_name: task_name.into(),
            episode_index,
            descriptions: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_descriptions(mut self, descriptions: Vec<String>) -> Self {
        self.descriptions = descriptions;
        self
    }

    pub fn push_step(&mut self, step: StepObservation) {
        self.steps.push(step);
    }

    /// Directory name for this episode, e.g. `episode_007`.
    pub fn episode_id(&self) -> String {
        episode_dir_name(self.episode_index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of every camera seen in any step, sorted.
    pub fn camera_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.steps.iter().flat_map(|s| s.views.keys()).collect();
        names.into_iter().cloned().collect()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.timestamp).collect()
    }

    /// Colour frames of one camera in step order.
    pub fn rgb_frames(&self, camera: &str) -> Vec<&RgbFrame> {
        self.steps
            .iter()
            .filter_map(|s| s.views.get(camera))
            .map(|v| &v.rgb)
            .collect()
    }

    /// Camera parameters of one camera in step order.
    pub fn camera_trajectory(&self, camera: &str) -> Vec<&CameraParams> {
        self.steps
            .iter()
            .filter_map(|s| s.views.get(camera))
            .map(|v| &v.params)
            .collect()
    }

    /// Returns true if the camera's extrinsics changed during the episode.
    pub fn camera_moved(&self, camera: &str) -> bool {
        let trajectory = self.camera_trajectory(camera);
        match trajectory.first() {
            Some(first) => trajectory.iter().any(|p| p.extrinsics != first.extrinsics),
            None => false,
        }
    }
}
