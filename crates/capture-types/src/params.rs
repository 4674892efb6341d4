//! Projection Parameters
//!
//! Pinhole intrinsics, camera-to-world extrinsics, and the helpers that move
//! points between pixels and the world.
//!
//! Camera frame convention: +Z is the optical axis, +X points right in the
//! image and +Y points down.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::Resolution;

/// Intrinsics, extrinsics and clip planes of one camera at one instant.
///
/// Matrices are stored row-major so the JSON form reads naturally:
/// `intrinsics[row][col]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// 3x3 pinhole matrix
    pub intrinsics: [[f64; 3]; 3],
    /// 4x4 camera-to-world pose
    pub extrinsics: [[f64; 4]; 4],
    pub near_plane: f64,
    pub far_plane: f64,
}

impl CameraParams {
    /// Builds parameters from nalgebra matrices.
    pub fn new(
        intrinsics: Matrix3<f64>,
        extrinsics: Matrix4<f64>,
        near_plane: f64,
        far_plane: f64,
    ) -> Self {
        let mut k = [[0.0; 3]; 3];
        for (r, row) in k.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = intrinsics[(r, c)];
            }
        }
        let mut e = [[0.0; 4]; 4];
        for (r, row) in e.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = extrinsics[(r, c)];
            }
        }
        Self {
            intrinsics: k,
            extrinsics: e,
            near_plane,
            far_plane,
        }
    }

    pub fn intrinsics_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.intrinsics[r][c])
    }

    pub fn extrinsics_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|r, c| self.extrinsics[r][c])
    }

    /// Rotation part of the camera-to-world pose.
    pub fn rotation(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.extrinsics[r][c])
    }

    /// Camera centre in world coordinates.
    pub fn camera_position(&self) -> Vector3<f64> {
        Vector3::new(
            self.extrinsics[0][3],
            self.extrinsics[1][3],
            self.extrinsics[2][3],
        )
    }

    /// Direction in world coordinates of the ray through pixel `(u, v)`.
    ///
    /// Pixel coordinates are continuous; the centre of pixel (0, 0) is (0.5, 0.5).
    /// The returned vector has unit z-component in the camera frame.
    pub fn pixel_direction(&self, u: f64, v: f64) -> Vector3<f64> {
        let [[fx, _, cx], [_, fy, cy], _] = self.intrinsics;
        let cam = Vector3::new((u - cx) / fx, (v - cy) / fy, 1.0);
        self.rotation() * cam
    }

    /// Projects a world point to `(u, v, depth)`.
    ///
    /// Depth is the distance along the optical axis. Returns `None` for
    /// points behind the camera.
    pub fn project(&self, world: &Point3<f64>) -> Option<(f64, f64, f64)> {
        let cam = self.rotation().transpose() * (world.coords - self.camera_position());
        if cam.z <= 0.0 {
            return None;
        }
        let [[fx, _, cx], [_, fy, cy], _] = self.intrinsics;
        Some((fx * cam.x / cam.z + cx, fy * cam.y / cam.z + cy, cam.z))
    }

    /// Lifts pixel `(u, v)` at axial depth `depth` (metres) to world coordinates.
    pub fn back_project(&self, u: f64, v: f64, depth: f64) -> Point3<f64> {
        let p = self.camera_position() + self.pixel_direction(u, v) * depth;
        Point3::from(p)
    }

    /// Converts a depth in `[0, 1]` between the clip planes to metres.
    pub fn normalized_to_meters(&self, normalized: f64) -> f64 {
        self.near_plane + normalized * (self.far_plane - self.near_plane)
    }

    /// Converts a depth in metres to `[0, 1]` between the clip planes.
    pub fn meters_to_normalized(&self, meters: f64) -> f64 {
        ((meters - self.near_plane) / (self.far_plane - self.near_plane)).clamp(0.0, 1.0)
    }
}

/// Pinhole intrinsics from a field of view applied to the larger image side.
pub fn intrinsics_matrix(resolution: Resolution, fov_degrees: f64) -> Matrix3<f64> {
    let w = resolution.width as f64;
    let h = resolution.height as f64;
    let f = (w.max(h) / 2.0) / (fov_degrees.to_radians() / 2.0).tan();
    Matrix3::new(
        f, 0.0, w / 2.0, //
        0.0, f, h / 2.0, //
        0.0, 0.0, 1.0,
    )
}

/// Rotation whose +Z axis points from `eye` towards `target` with image-down
/// roughly along world -Z.
///
/// Falls back to world +Y as the up hint when looking straight up or down.
pub fn look_at_rotation(eye: &Vector3<f64>, target: &Vector3<f64>) -> Rotation3<f64> {
    let forward = (target - eye)
        .try_normalize(1e-12)
        .unwrap_or_else(Vector3::z);
    let mut right = forward.cross(&Vector3::z());
    if right.norm() < 1e-6 {
        right = forward.cross(&Vector3::y());
    }
    let right = right.normalize();
    let down = forward.cross(&right);
    Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[right, down, forward]))
}

/// Homogeneous pose from a rotation and translation.
pub fn pose_matrix(rotation: &Rotation3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut m = rotation.to_homogeneous();
    m[(0, 3)] = translation.x;
    m[(1, 3)] = translation.y;
    m[(2, 3)] = translation.z;
    m
}
