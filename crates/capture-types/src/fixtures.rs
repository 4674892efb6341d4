//! Sample data fixtures for testing.
//!
//! This module provides ready-made test data for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // capture-types = { path = "../capture-types", features = ["test-fixtures"] }
//!
//! use capture_types::fixtures;
//!
//! let views = fixtures::sample_views();
//! let episode = fixtures::sample_episode(5);
//! ```

use nalgebra::{Matrix4, Vector3};

use crate::camera::{CameraMount, CameraView, CameraViewSpec, Resolution};
use crate::episode::{EpisodeRecord, LowDimState, StepObservation, ViewObservation, DEFAULT_STEP_INTERVAL};
use crate::frame::{DepthFrame, DepthUnits, MaskFrame, RgbFrame};

/// Frame width used by the fixtures.
pub const FIXTURE_WIDTH: u32 = 4;
/// Frame height used by the fixtures.
pub const FIXTURE_HEIGHT: u32 = 3;

/// Two small views: a fixed front camera and a gripper-mounted wrist camera.
pub fn sample_views() -> Vec<CameraView> {
    let front = CameraView::looking_at(
        "front_camera",
        [0.0, 1.0, 0.3],
        [0.0, 0.0, 0.0],
        Resolution::new(FIXTURE_WIDTH, FIXTURE_HEIGHT),
    )
    .expect("fixture view is valid");
    let wrist = CameraViewSpec::new("wrist_camera", [0.0, 0.0, 0.05], [180.0, 0.0, 0.0])
        .resolution(FIXTURE_WIDTH, FIXTURE_HEIGHT)
        .mount(CameraMount::Gripper)
        .build()
        .expect("fixture view is valid");
    vec![front, wrist]
}

/// An episode of `steps` steps over [`sample_views`].
///
/// The red channel of pixel (0, 0) of every colour frame equals the step
/// index, and the wrist camera moves 1 cm along +x per step.
pub fn sample_episode(steps: usize) -> EpisodeRecord {
    let views = sample_views();
    let mut episode = EpisodeRecord::new("ReachTarget", 0)
        .with_descriptions(vec!["reach the red target".to_string()]);

    for step in 0..steps {
        let mut gripper = Matrix4::identity();
        gripper[(0, 3)] = 0.01 * step as f64;
        gripper[(2, 3)] = 0.4;

        let mut observation = StepObservation::new(step, DEFAULT_STEP_INTERVAL).with_low_dim(
            LowDimState {
                gripper_open: Some(1.0),
                task_low_dim_state: Some(vec![0.1, 0.2, 0.05]),
                ..Default::default()
            },
        );

        for view in &views {
            let mut rgb = RgbFrame::filled(FIXTURE_WIDTH, FIXTURE_HEIGHT, [0, 0, 0])
                .expect("fixture frame is valid");
            rgb.set_pixel(0, 0, [step as u8, 0, 0]);
            let depth =
                DepthFrame::filled(FIXTURE_WIDTH, FIXTURE_HEIGHT, DepthUnits::Normalized, 0.5)
                    .expect("fixture frame is valid");
            let mask = MaskFrame::filled(FIXTURE_WIDTH, FIXTURE_HEIGHT, 1)
                .expect("fixture frame is valid");
            observation.insert_view(
                view.name(),
                ViewObservation {
                    rgb,
                    depth,
                    mask: Some(mask),
                    point_cloud: None,
                    params: view.params(&gripper),
                },
            );
        }
        episode.push_step(observation);
    }
    episode
}

/// A world-frame translation matrix, handy for mount poses.
pub fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}
