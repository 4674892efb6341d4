//! Procedural tabletop scene.
//!
//! A checkered table, one task object and a gripper, rendered by casting one
//! ray per pixel. Object placement is drawn from a `SmallRng` seeded per
//! task and episode, so the same configuration always renders the same
//! frames. The scripted demonstration moves the gripper to the object along
//! a smoothstep path and, for grasping tasks, carries the object to a goal.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use capture_types::{
    CameraMount, CameraParams, CameraView, CameraViewSpec, DepthFrame, DepthUnits, LowDimState,
    MaskFrame, RgbFrame,
};

use super::task::TaskKind;
use super::{Capture, Simulator};
use crate::config::SceneConfig;
use crate::error::SimError;

/// Mask handle of pixels that hit nothing.
pub const HANDLE_BACKGROUND: u8 = 0;
/// Mask handle of the table.
pub const HANDLE_GROUND: u8 = 1;
/// Mask handle of the task object.
pub const HANDLE_OBJECT: u8 = 2;
/// Mask handle of the gripper.
pub const HANDLE_GRIPPER: u8 = 3;

/// Point the stock cameras look at.
const SCENE_CENTER: [f64; 3] = [0.0, 0.0, 0.05];
const TABLE_HALF_EXTENT: f64 = 0.75;
const CHECKER_SIZE: f64 = 0.1;
const OBJECT_SPAWN_EXTENT: f64 = 0.25;
const GRIPPER_HOME: [f64; 3] = [0.0, 0.0, 0.45];
const GRIPPER_JITTER: f64 = 0.05;
const GRIPPER_RADIUS: f64 = 0.025;
const FINGER_SPREAD: f64 = 0.04;

const BACKGROUND_COLOR: [u8; 3] = [25, 28, 36];
const CHECKER_LIGHT: [u8; 3] = [205, 200, 190];
const CHECKER_DARK: [u8; 3] = [150, 145, 138];
const GRIPPER_COLOR: [u8; 3] = [90, 92, 98];

/// State of the episode being played back.
#[derive(Debug, Clone)]
struct EpisodeState {
    task: TaskKind,
    object_start: Vector3<f64>,
    gripper_start: Vector3<f64>,
    gripper_yaw: f64,
    step: usize,
    gripper: Vector3<f64>,
    object: Vector3<f64>,
    gripper_open: f64,
    joints: Vec<f64>,
}

impl EpisodeState {
    /// Gripper frame in world coordinates.
    fn gripper_frame(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.gripper)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.gripper_yaw).to_homogeneous()
    }

    /// Places the gripper and object at demonstration phase `t` in `[0, 1]`.
    fn apply_phase(&mut self, t: f64) {
        let task = self.task;
        let grasp = self.object_start + Vector3::z() * (task.object_radius() + GRIPPER_RADIUS);

        if !task.grasps_object() {
            self.gripper = self.gripper_start.lerp(&grasp, smoothstep(t));
            self.object = self.object_start;
            self.gripper_open = 1.0;
        } else if t < 0.5 {
            self.gripper = self.gripper_start.lerp(&grasp, smoothstep(t / 0.5));
            self.object = self.object_start;
            self.gripper_open = 1.0;
        } else {
            let carry = task.goal_offset() * smoothstep((t - 0.5) / 0.5);
            self.gripper = grasp + carry;
            self.object = self.object_start + carry;
            self.gripper_open = 0.0;
        }
        self.joints = joint_positions(&self.gripper, self.gripper_yaw, self.gripper_open);
    }

    fn low_dim(&self, velocities: Vec<f64>) -> LowDimState {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.gripper_yaw);
        let finger = FINGER_SPREAD * self.gripper_open;
        LowDimState {
            joint_positions: Some(self.joints.clone()),
            joint_velocities: Some(velocities),
            gripper_open: Some(self.gripper_open),
            gripper_pose: Some([
                self.gripper.x,
                self.gripper.y,
                self.gripper.z,
                q.i,
                q.j,
                q.k,
                q.w,
            ]),
            gripper_joint_positions: Some(vec![finger, finger]),
            task_low_dim_state: Some(vec![self.object.x, self.object.y, self.object.z]),
            ..Default::default()
        }
    }
}

/// Closest surface along a ray.
struct Hit {
    depth: f64,
    color: [u8; 3],
    handle: u8,
}

/// Built-in deterministic simulator.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    config: SceneConfig,
    running: bool,
    task: Option<TaskKind>,
    state: Option<EpisodeState>,
}

impl SyntheticScene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            running: false,
            task: None,
            state: None,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn current_task(&self) -> Option<TaskKind> {
        self.task
    }

    /// World position of the task object, once an episode is reset.
    pub fn object_position(&self) -> Option<Vector3<f64>> {
        self.state.as_ref().map(|s| s.object)
    }

    /// Gripper frame in world coordinates, once an episode is reset.
    pub fn gripper_pose(&self) -> Option<Matrix4<f64>> {
        self.state.as_ref().map(EpisodeState::gripper_frame)
    }

    fn episode_seed(&self, task: TaskKind, episode: usize) -> u64 {
        self.config
            .seed
            .wrapping_add((task as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_add(episode as u64)
    }

    fn trace(
        &self,
        state: &EpisodeState,
        origin: &Vector3<f64>,
        dir: &Vector3<f64>,
        near: f64,
        see_gripper: bool,
    ) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        let mut consider = |hit: Option<Hit>| {
            if let Some(hit) = hit {
                if best.as_ref().map_or(true, |b| hit.depth < b.depth) {
                    best = Some(hit);
                }
            }
        };

        consider(hit_table(origin, dir, near));
        consider(hit_sphere(
            origin,
            dir,
            near,
            &state.object,
            state.task.object_radius(),
            state.task.object_color(),
            HANDLE_OBJECT,
        ));
        if see_gripper {
            consider(hit_sphere(
                origin,
                dir,
                near,
                &state.gripper,
                GRIPPER_RADIUS,
                GRIPPER_COLOR,
                HANDLE_GRIPPER,
            ));
        }
        best
    }

    fn render(
        &self,
        state: &EpisodeState,
        view: &CameraView,
        params: &CameraParams,
    ) -> Result<Capture, SimError> {
        let resolution = view.resolution();
        let (width, height) = (resolution.width, resolution.height);
        let pixels = resolution.pixel_count();
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut depth = Vec::with_capacity(pixels);
        let mut mask = Vec::with_capacity(pixels);

        let origin = params.camera_position();
        // A wrist camera does not see the gripper it is mounted on
        let see_gripper = view.mount() == CameraMount::World;

        for v in 0..height {
            for u in 0..width {
                let dir = params.pixel_direction(u as f64 + 0.5, v as f64 + 0.5);
                let hit = self
                    .trace(state, &origin, &dir, params.near_plane, see_gripper)
                    .filter(|h| h.depth <= params.far_plane);
                let (color, meters, handle) = match hit {
                    Some(h) => (h.color, h.depth, h.handle),
                    None => (BACKGROUND_COLOR, params.far_plane, HANDLE_BACKGROUND),
                };
                rgb.extend_from_slice(&color);
                depth.push(match self.config.depth_units {
                    DepthUnits::Normalized => params.meters_to_normalized(meters) as f32,
                    DepthUnits::Meters => meters as f32,
                });
                mask.push(handle);
            }
        }

        Ok(Capture {
            rgb: RgbFrame::new(width, height, rgb)?,
            depth: DepthFrame::new(width, height, self.config.depth_units, depth)?,
            mask: if self.config.masks {
                Some(MaskFrame::new(width, height, mask)?)
            } else {
                None
            },
            params: params.clone(),
        })
    }
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Simulator for SyntheticScene {
    fn launch(&mut self) -> Result<(), SimError> {
        if !self.running {
            self.running = true;
            tracing::info!("Synthetic scene launched (seed {})", self.config.seed);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn default_views(&self) -> Result<Vec<CameraView>, SimError> {
        let res = self.config.resolution;
        Ok(vec![
            CameraView::looking_at("left_shoulder_camera", [0.3, 0.8, 0.4], SCENE_CENTER, res)?,
            CameraView::looking_at("right_shoulder_camera", [-0.3, 0.8, 0.4], SCENE_CENTER, res)?,
            CameraView::looking_at("overhead_camera", [0.0, 0.0, 1.2], SCENE_CENTER, res)?,
            CameraViewSpec::new("wrist_camera", [0.0, 0.0, 0.05], [180.0, 0.0, 0.0])
                .resolution(res.width, res.height)
                .mount(CameraMount::Gripper)
                .build()?,
            CameraView::looking_at("front_camera", [0.0, 1.0, 0.3], SCENE_CENTER, res)?,
        ])
    }

    fn available_tasks(&self) -> Vec<String> {
        TaskKind::ALL.iter().map(|t| t.name().to_string()).collect()
    }

    fn load_task(&mut self, task: &str) -> Result<(), SimError> {
        if !self.running {
            return Err(SimError::NotLaunched);
        }
        let task: TaskKind = task.parse()?;
        tracing::debug!("Loaded task {}", task);
        self.task = Some(task);
        self.state = None;
        Ok(())
    }

    fn reset(&mut self, episode: usize) -> Result<Vec<String>, SimError> {
        if !self.running {
            return Err(SimError::NotLaunched);
        }
        let task = self.task.ok_or(SimError::NoTask)?;
        let mut rng = SmallRng::seed_from_u64(self.episode_seed(task, episode));

        let object_start = Vector3::new(
            rng.gen_range(-OBJECT_SPAWN_EXTENT..OBJECT_SPAWN_EXTENT),
            rng.gen_range(-OBJECT_SPAWN_EXTENT..OBJECT_SPAWN_EXTENT),
            task.object_radius(),
        );
        let gripper_start = Vector3::from(GRIPPER_HOME)
            + Vector3::new(
                rng.gen_range(-GRIPPER_JITTER..GRIPPER_JITTER),
                rng.gen_range(-GRIPPER_JITTER..GRIPPER_JITTER),
                0.0,
            );
        let gripper_yaw = rng.gen_range(-std::f64::consts::FRAC_PI_4..std::f64::consts::FRAC_PI_4);

        let mut state = EpisodeState {
            task,
            object_start,
            gripper_start,
            gripper_yaw,
            step: 0,
            gripper: gripper_start,
            object: object_start,
            gripper_open: 1.0,
            joints: Vec::new(),
        };
        state.apply_phase(0.0);
        self.state = Some(state);

        tracing::debug!(
            "Reset {} episode {} (object at [{:.3}, {:.3}, {:.3}])",
            task,
            episode,
            object_start.x,
            object_start.y,
            object_start.z
        );
        Ok(task.descriptions())
    }

    fn advance_demo(&mut self) -> Result<Option<LowDimState>, SimError> {
        let total = self.config.demo_steps;
        let interval = self.config.step_interval;
        let state = self.state.as_mut().ok_or(SimError::NotReset)?;
        if state.step >= total {
            return Ok(None);
        }

        let t = if total > 1 {
            state.step as f64 / (total - 1) as f64
        } else {
            1.0
        };
        let previous = state.joints.clone();
        state.apply_phase(t);
        let velocities = state
            .joints
            .iter()
            .zip(&previous)
            .map(|(now, before)| (now - before) / interval)
            .collect();
        state.step += 1;
        Ok(Some(state.low_dim(velocities)))
    }

    fn capture(&self, view: &CameraView) -> Result<Capture, SimError> {
        if !self.running {
            return Err(SimError::NotLaunched);
        }
        let state = self.state.as_ref().ok_or(SimError::NotReset)?;
        let params = view.params(&state.gripper_frame());
        self.render(state, view, &params)
    }

    fn step_interval(&self) -> f64 {
        self.config.step_interval
    }

    fn shutdown(&mut self) {
        if self.running {
            tracing::info!("Synthetic scene shut down");
        }
        self.running = false;
        self.task = None;
        self.state = None;
    }
}

fn smoothstep(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// Plausible arm joint angles for a gripper position. Not real kinematics.
fn joint_positions(gripper: &Vector3<f64>, yaw: f64, open: f64) -> Vec<f64> {
    let reach = gripper.x.hypot(gripper.y);
    vec![
        gripper.y.atan2(gripper.x),
        0.8 * reach - 0.4 * gripper.z,
        0.1 * yaw,
        -2.2 + reach + gripper.z,
        0.0,
        1.6 + 0.5 * gripper.z,
        yaw + 0.1 * open,
    ]
}

/// Ray against the table top at z = 0. `dir` has unit axial length, so the
/// ray parameter is the axial depth.
fn hit_table(origin: &Vector3<f64>, dir: &Vector3<f64>, near: f64) -> Option<Hit> {
    if dir.z.abs() < 1e-12 {
        return None;
    }
    let t = -origin.z / dir.z;
    if t <= near {
        return None;
    }
    let p = origin + dir * t;
    if p.x.abs() > TABLE_HALF_EXTENT || p.y.abs() > TABLE_HALF_EXTENT {
        return None;
    }
    let cell = (p.x / CHECKER_SIZE).floor() as i64 + (p.y / CHECKER_SIZE).floor() as i64;
    let color = if cell.rem_euclid(2) == 0 {
        CHECKER_LIGHT
    } else {
        CHECKER_DARK
    };
    Some(Hit {
        depth: t,
        color,
        handle: HANDLE_GROUND,
    })
}

fn hit_sphere(
    origin: &Vector3<f64>,
    dir: &Vector3<f64>,
    near: f64,
    center: &Vector3<f64>,
    radius: f64,
    color: [u8; 3],
    handle: u8,
) -> Option<Hit> {
    let oc = origin - center;
    let a = dir.dot(dir);
    let b = 2.0 * dir.dot(&oc);
    let c = oc.dot(&oc) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let t = [(-b - sqrt) / (2.0 * a), (-b + sqrt) / (2.0 * a)]
        .into_iter()
        .find(|&t| t > near)?;

    let normal = (origin + dir * t - center) / radius;
    let light = Vector3::new(0.3, 0.2, 1.0).normalize();
    let shade = 0.35 + 0.65 * normal.dot(&light).max(0.0);
    let shaded = color.map(|ch| (ch as f64 * shade).round().min(255.0) as u8);
    Some(Hit {
        depth: t,
        color: shaded,
        handle,
    })
}
