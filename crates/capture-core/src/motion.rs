//! Camera motion paths.
//!
//! A [`CameraMotion`] turns into a sequence of look-at views, one per frame.
//! [`record_motion`] renders that sequence through a simulator at a fixed
//! scene state and stitches the frames into a fly-around video.

use std::path::Path;

use capture_io::{VideoAssembler, VideoOutput};
use capture_types::{CameraView, Resolution, ViewError};
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::sim::Simulator;

/// Path followed by the camera eye. The camera always looks at the plan's
/// target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraMotion {
    /// Fixed eye position
    Static { position: [f64; 3] },
    /// Straight dolly from `start` to `end`
    Linear { start: [f64; 3], end: [f64; 3] },
    /// Circle around the target at `radius` and `height` above it
    Orbit {
        radius: f64,
        height: f64,
        /// Degrees, measured from +x towards +y
        start_angle: f64,
        /// Degrees swept over the whole sequence
        sweep: f64,
    },
}

impl CameraMotion {
    /// A full turn around the target.
    pub fn full_orbit(radius: f64, height: f64) -> Self {
        CameraMotion::Orbit {
            radius,
            height,
            start_angle: 0.0,
            sweep: 360.0,
        }
    }

    /// Eye positions for `frames` frames.
    ///
    /// Open paths include both end points. A closed orbit stops one step
    /// short of its start so a looping video does not repeat a frame.
    pub fn positions(&self, target: [f64; 3], frames: usize) -> Vec<[f64; 3]> {
        let fraction = |i: usize, closed: bool| {
            let denom = if closed { frames } else { frames.saturating_sub(1) };
            if denom == 0 {
                0.0
            } else {
                i as f64 / denom as f64
            }
        };

        (0..frames)
            .map(|i| match *self {
                CameraMotion::Static { position } => position,
                CameraMotion::Linear { start, end } => {
                    let s = fraction(i, false);
                    [0, 1, 2].map(|k| start[k] + (end[k] - start[k]) * s)
                }
                CameraMotion::Orbit {
                    radius,
                    height,
                    start_angle,
                    sweep,
                } => {
                    let closed = sweep.abs() >= 360.0;
                    let angle = (start_angle + sweep * fraction(i, closed)).to_radians();
                    [
                        target[0] + radius * angle.cos(),
                        target[1] + radius * angle.sin(),
                        target[2] + height,
                    ]
                }
            })
            .collect()
    }
}

/// A motion together with what it looks at and how it is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionPlan {
    pub motion: CameraMotion,
    pub target: [f64; 3],
    pub resolution: Resolution,
    pub frames: usize,
}

impl MotionPlan {
    /// One view per frame, named `<prefix>_NNNN`.
    pub fn views(&self, prefix: &str) -> Result<Vec<CameraView>, ViewError> {
        self.motion
            .positions(self.target, self.frames)
            .into_iter()
            .enumerate()
            .map(|(i, eye)| {
                let name = format!("{}_{:04}", prefix, i);
                CameraView::looking_at(name, eye, self.target, self.resolution)
            })
            .collect()
    }
}

/// Renders `plan` in episode `episode` of `task` and writes
/// `out_dir/<name>.<ext>`.
///
/// The scene is reset and held at its initial state; only the camera moves.
pub fn record_motion<S: Simulator>(
    sim: &mut S,
    task: &str,
    episode: usize,
    plan: &MotionPlan,
    assembler: &VideoAssembler,
    out_dir: &Path,
    name: &str,
) -> Result<VideoOutput, CaptureError> {
    sim.launch()?;
    sim.load_task(task)?;
    sim.reset(episode)?;

    let views = plan.views(name)?;
    let mut frames = Vec::with_capacity(views.len());
    for view in &views {
        frames.push(sim.capture(view)?.rgb);
    }
    tracing::info!(
        "Rendered {} motion frames of {} episode {}",
        frames.len(),
        task,
        episode
    );
    Ok(assembler.assemble(&frames, out_dir, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
    }

    #[test]
    fn test_static_motion() {
        let motion = CameraMotion::Static {
            position: [1.0, 2.0, 3.0],
        };
        let positions = motion.positions([0.0; 3], 4);
        assert_eq!(positions, vec![[1.0, 2.0, 3.0]; 4]);
    }

    #[test]
    fn test_linear_includes_end_points() {
        let motion = CameraMotion::Linear {
            start: [0.0, 0.0, 1.0],
            end: [1.0, 0.0, 1.0],
        };
        let positions = motion.positions([0.0; 3], 5);
        assert_eq!(positions.first(), Some(&[0.0, 0.0, 1.0]));
        assert_eq!(positions.last(), Some(&[1.0, 0.0, 1.0]));
        assert!((positions[2][0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_frame_linear_is_start() {
        let motion = CameraMotion::Linear {
            start: [0.0, 0.0, 1.0],
            end: [1.0, 0.0, 1.0],
        };
        assert_eq!(motion.positions([0.0; 3], 1), vec![[0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_orbit_keeps_radius_and_height() {
        let target = [0.1, -0.2, 0.05];
        let motion = CameraMotion::full_orbit(0.8, 0.5);
        let positions = motion.positions(target, 12);

        assert_eq!(positions.len(), 12);
        for p in &positions {
            let horizontal = distance([p[0], p[1], 0.0], [target[0], target[1], 0.0]);
            assert!((horizontal - 0.8).abs() < 1e-9);
            assert!((p[2] - 0.55).abs() < 1e-9);
        }
        // Closed loop: last frame is not a repeat of the first
        assert!(distance(positions[0], positions[11]) > 0.1);
    }

    #[test]
    fn test_partial_orbit_ends_at_sweep() {
        let motion = CameraMotion::Orbit {
            radius: 1.0,
            height: 0.0,
            start_angle: 0.0,
            sweep: 90.0,
        };
        let positions = motion.positions([0.0; 3], 3);
        assert!((positions[2][0]).abs() < 1e-9);
        assert!((positions[2][1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_views_look_at_target() {
        let plan = MotionPlan {
            motion: CameraMotion::full_orbit(1.0, 0.5),
            target: [0.0, 0.0, 0.0],
            resolution: Resolution::new(16, 12),
            frames: 8,
        };
        let views = plan.views("orbit").unwrap();

        assert_eq!(views.len(), 8);
        assert_eq!(views[3].name(), "orbit_0003");
        for view in &views {
            let axis = view.rotation() * nalgebra::Vector3::z();
            let to_target = -nalgebra::Vector3::from(view.position()).normalize();
            assert!((axis - to_target).norm() < 1e-9);
        }
    }

    #[test]
    fn test_motion_serialization() {
        let json = serde_json::to_string(&CameraMotion::full_orbit(1.0, 0.5)).unwrap();
        assert!(json.contains(r#""kind":"orbit""#));
        let back: CameraMotion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CameraMotion::full_orbit(1.0, 0.5));
    }
}
