//! Camera View Descriptors
//!
//! A [`CameraView`] names one viewpoint: where the camera sits, where it
//! points, and how it projects. Views are validated on construction and
//! cannot be mutated afterwards; deserialization goes through the same
//! checks via [`CameraViewSpec`].
//!
//! # Example
//!
//! ```
//! use capture_types::{CameraView, CameraViewSpec};
//!
//! let view = CameraViewSpec::new("side_left_camera", [0.5, 0.8, 0.3], [0.0, -30.0, 90.0])
//!     .resolution(320, 240)
//!     .fov(60.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(view.resolution().width, 320);
//!
//! assert!(CameraView::new("", [0.0; 3], [0.0; 3]).is_err());
//! ```

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::layout::camera_dir_problem;
use crate::params::{intrinsics_matrix, look_at_rotation, pose_matrix, CameraParams};

/// Default field of view in degrees.
pub const DEFAULT_FOV: f64 = 60.0;

/// Default near clipping plane in metres.
pub const DEFAULT_NEAR_PLANE: f64 = 0.01;

/// Default far clipping plane in metres.
pub const DEFAULT_FAR_PLANE: f64 = 10.0;

/// Default image resolution (width, height).
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 640,
    height: 480,
};

/// Image size in pixels. Serializes as a `[width, height]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Creates a new resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if both dimensions are non-zero.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        DEFAULT_RESOLUTION
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(r: Resolution) -> Self {
        (r.width, r.height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Frame a camera pose is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraMount {
    /// Pose is in world coordinates
    #[default]
    World,
    /// Pose is relative to the gripper frame and follows it
    Gripper,
}

/// Unvalidated camera description, as written in configuration files.
///
/// Also serves as the builder for [`CameraView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraViewSpec {
    pub name: String,
    /// (x, y, z) in metres
    pub position: [f64; 3],
    /// (roll, pitch, yaw) in degrees
    pub orientation: [f64; 3],
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_fov")]
    pub fov: f64,
    #[serde(default = "default_near_plane")]
    pub near_plane: f64,
    #[serde(default = "default_far_plane")]
    pub far_plane: f64,
    #[serde(default)]
    pub mount: CameraMount,
}

fn default_fov() -> f64 {
    DEFAULT_FOV
}

fn default_near_plane() -> f64 {
    DEFAULT_NEAR_PLANE
}

fn default_far_plane() -> f64 {
    DEFAULT_FAR_PLANE
}

impl CameraViewSpec {
    /// Starts a spec with default resolution and projection.
    pub fn new(name: impl Into<String>, position: [f64; 3], orientation: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            position,
            orientation,
            resolution: DEFAULT_RESOLUTION,
            fov: DEFAULT_FOV,
            near_plane: DEFAULT_NEAR_PLANE,
            far_plane: DEFAULT_FAR_PLANE,
            mount: CameraMount::World,
        }
    }

    /// Sets the image resolution.
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Resolution::new(width, height);
        self
    }

    /// Sets the field of view in degrees.
    pub fn fov(mut self, fov: f64) -> Self {
        self.fov = fov;
        self
    }

    /// Sets the near and far clipping planes.
    pub fn clip_planes(mut self, near: f64, far: f64) -> Self {
        self.near_plane = near;
        self.far_plane = far;
        self
    }

    /// Sets the mount frame.
    pub fn mount(mut self, mount: CameraMount) -> Self {
        self.mount = mount;
        self
    }

    /// Validates the spec and produces an immutable view.
    pub fn build(self) -> Result<CameraView, ViewError> {
        CameraView::try_from(self)
    }
}

/// A validated camera viewpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CameraViewSpec", into = "CameraViewSpec")]
pub struct CameraView {
    name: String,
    position: [f64; 3],
    orientation: [f64; 3],
    resolution: Resolution,
    fov: f64,
    near_plane: f64,
    far_plane: f64,
    mount: CameraMount,
}

impl TryFrom<CameraViewSpec> for CameraView {
    type Error = ViewError;

    fn try_from(spec: CameraViewSpec) -> Result<Self, Self::Error> {
        if spec.name.trim().is_empty() {
            return Err(ViewError::EmptyName);
        }
        if let Some(reason) = camera_dir_problem(&spec.name) {
            return Err(ViewError::InvalidName {
                name: spec.name,
                reason,
            });
        }
        if !spec.resolution.is_valid() {
            return Err(ViewError::InvalidResolution {
                name: spec.name,
                width: spec.resolution.width,
                height: spec.resolution.height,
            });
        }
        if !(spec.fov > 0.0 && spec.fov < 180.0) {
            return Err(ViewError::InvalidFov {
                name: spec.name,
                fov: spec.fov,
            });
        }
        if !(spec.near_plane > 0.0 && spec.far_plane > spec.near_plane && spec.far_plane.is_finite())
        {
            return Err(ViewError::InvalidClipPlanes {
                name: spec.name,
                near: spec.near_plane,
                far: spec.far_plane,
            });
        }
        if spec
            .position
            .iter()
            .chain(spec.orientation.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ViewError::NonFinitePose { name: spec.name });
        }

        Ok(Self {
            name: spec.name,
            position: spec.position,
            orientation: spec.orientation,
            resolution: spec.resolution,
            fov: spec.fov,
            near_plane: spec.near_plane,
            far_plane: spec.far_plane,
            mount: spec.mount,
        })
    }
}

impl From<CameraView> for CameraViewSpec {
    fn from(view: CameraView) -> Self {
        Self {
            name: view.name,
            position: view.position,
            orientation: view.orientation,
            resolution: view.resolution,
            fov: view.fov,
            near_plane: view.near_plane,
            far_plane: view.far_plane,
            mount: view.mount,
        }
    }
}

impl CameraView {
    /// Creates a world-mounted view with default resolution and projection.
    pub fn new(
        name: impl Into<String>,
        position: [f64; 3],
        orientation: [f64; 3],
    ) -> Result<Self, ViewError> {
        CameraViewSpec::new(name, position, orientation).build()
    }

    /// Creates a world-mounted view whose optical axis points at `target`.
    pub fn looking_at(
        name: impl Into<String>,
        position: [f64; 3],
        target: [f64; 3],
        resolution: Resolution,
    ) -> Result<Self, ViewError> {
        let rotation = look_at_rotation(&Vector3::from(position), &Vector3::from(target));
        let (roll, pitch, yaw) = rotation.euler_angles();
        CameraViewSpec::new(
            name,
            position,
            [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()],
        )
        .resolution(resolution.width, resolution.height)
        .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// (roll, pitch, yaw) in degrees.
    pub fn orientation(&self) -> [f64; 3] {
        self.orientation
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn near_plane(&self) -> f64 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f64 {
        self.far_plane
    }

    pub fn mount(&self) -> CameraMount {
        self.mount
    }

    /// Returns a copy of this view under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Result<Self, ViewError> {
        let mut spec = CameraViewSpec::from(self.clone());
        spec.name = name.into();
        spec.build()
    }

    /// Rotation from camera frame to mount frame.
    pub fn rotation(&self) -> Rotation3<f64> {
        let [roll, pitch, yaw] = self.orientation;
        Rotation3::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians())
    }

    /// Camera-to-mount pose as a 4x4 homogeneous matrix.
    pub fn local_pose(&self) -> Matrix4<f64> {
        pose_matrix(&self.rotation(), &Vector3::from(self.position))
    }

    /// Pinhole intrinsics for this view.
    pub fn intrinsics(&self) -> Matrix3<f64> {
        intrinsics_matrix(self.resolution, self.fov)
    }

    /// Projection parameters given the pose of the mount frame.
    ///
    /// `mount_pose` is ignored for world-mounted cameras.
    pub fn params(&self, mount_pose: &Matrix4<f64>) -> CameraParams {
        let extrinsics = match self.mount {
            CameraMount::World => self.local_pose(),
            CameraMount::Gripper => mount_pose * self.local_pose(),
        };
        CameraParams::new(self.intrinsics(), extrinsics, self.near_plane, self.far_plane)
    }

    /// Projection parameters for a world-mounted camera.
    pub fn world_params(&self) -> CameraParams {
        self.params(&Matrix4::identity())
    }
}
