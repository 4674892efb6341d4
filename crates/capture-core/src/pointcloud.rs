//! Depth to world-space point clouds.

use capture_types::{CameraParams, DepthFrame, DepthUnits, FrameError, PointCloud};

/// Back-projects every pixel centre of `depth` into world coordinates.
pub fn point_cloud_from_depth(
    depth: &DepthFrame,
    params: &CameraParams,
) -> Result<PointCloud, FrameError> {
    let (width, height) = (depth.width(), depth.height());
    let mut points = Vec::with_capacity(width as usize * height as usize);
    for v in 0..height {
        for u in 0..width {
            let raw = depth.get(u, v) as f64;
            let meters = match depth.units() {
                DepthUnits::Normalized => params.normalized_to_meters(raw),
                DepthUnits::Meters => raw,
            };
            let p = params.back_project(u as f64 + 0.5, v as f64 + 0.5, meters);
            points.push([p.x as f32, p.y as f32, p.z as f32]);
        }
    }
    PointCloud::new(width, height, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_types::{CameraView, Resolution};
    use nalgebra::Point3;

    #[test]
    fn test_flat_depth_lands_on_plane() {
        // Camera 1 m above the origin looking straight down
        let view = CameraView::looking_at(
            "down",
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
            Resolution::new(6, 4),
        )
        .unwrap();
        let params = view.world_params();
        let depth = DepthFrame::filled(6, 4, DepthUnits::Meters, 1.0).unwrap();

        let cloud = point_cloud_from_depth(&depth, &params).unwrap();
        assert_eq!(cloud.points().len(), 24);
        assert!(cloud.points().iter().all(|p| p[2].abs() < 1e-5));
    }

    #[test]
    fn test_reprojects_to_source_pixel() {
        let view = CameraView::looking_at(
            "front",
            [0.0, 1.0, 0.3],
            [0.0, 0.0, 0.0],
            Resolution::new(8, 6),
        )
        .unwrap();
        let params = view.world_params();
        let depth = DepthFrame::filled(8, 6, DepthUnits::Normalized, 0.1).unwrap();

        let cloud = point_cloud_from_depth(&depth, &params).unwrap();
        let p = cloud.points()[2 * 8 + 5];
        let (u, v, d) = params
            .project(&Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
            .unwrap();

        assert!((u - 5.5).abs() < 1e-3);
        assert!((v - 2.5).abs() < 1e-3);
        assert!((d - params.normalized_to_meters(0.1)).abs() < 1e-4);
    }
}
