//! Frame Buffers
//!
//! Row-major image buffers for colour, depth, segmentation masks and
//! per-pixel point clouds. Every constructor checks that the buffer length
//! matches the declared dimensions.

use serde::{Deserialize, Serialize};

use crate::camera::Resolution;
use crate::error::FrameError;

fn check_len(width: u32, height: u32, channels: usize, actual: usize) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyFrame { width, height });
    }
    let expected = width as usize * height as usize * channels;
    if expected != actual {
        return Err(FrameError::BufferSize {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

/// RGB8 colour frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbFrame {
    /// Wraps an interleaved RGB buffer of length `width * height * 3`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        check_len(width, height, 3, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Result<Self, FrameError> {
        let data = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// Colour at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Sets the colour at `(x, y)`. Panics when out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&color);
    }
}

/// How depth values are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepthUnits {
    /// Linear in `[0, 1]` between the near and far clip planes
    #[default]
    Normalized,
    /// Axial distance in metres
    Meters,
}

/// Single-channel depth frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthFrame {
    width: u32,
    height: u32,
    #[serde(default)]
    units: DepthUnits,
    data: Vec<f32>,
}

impl DepthFrame {
    /// Wraps a row-major depth buffer of length `width * height`.
    pub fn new(
        width: u32,
        height: u32,
        units: DepthUnits,
        data: Vec<f32>,
    ) -> Result<Self, FrameError> {
        check_len(width, height, 1, data.len())?;
        Ok(Self {
            width,
            height,
            units,
            data,
        })
    }

    /// A frame with every pixel set to `value`.
    pub fn filled(
        width: u32,
        height: u32,
        units: DepthUnits,
        value: f32,
    ) -> Result<Self, FrameError> {
        Self::new(
            width,
            height,
            units,
            vec![value; width as usize * height as usize],
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn units(&self) -> DepthUnits {
        self.units
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let i = y as usize * self.width as usize + x as usize;
        self.data[i] = value;
    }
}

/// Segmentation mask holding one object handle per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MaskFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        check_len(width, height, 1, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, handle: u8) -> Result<Self, FrameError> {
        Self::new(width, height, vec![handle; width as usize * height as usize])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, handle: u8) {
        let i = y as usize * self.width as usize + x as usize;
        self.data[i] = handle;
    }

    /// Distinct handles present in the mask, ascending.
    pub fn handles(&self) -> Vec<u8> {
        let mut seen = [false; 256];
        for &h in &self.data {
            seen[h as usize] = true;
        }
        (0..=255u8).filter(|&h| seen[h as usize]).collect()
    }
}

/// World-space point for every pixel of a depth frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    width: u32,
    height: u32,
    points: Vec<[f32; 3]>,
}

impl PointCloud {
    pub fn new(width: u32, height: u32, points: Vec<[f32; 3]>) -> Result<Self, FrameError> {
        check_len(width, height, 1, points.len())?;
        Ok(Self {
            width,
            height,
            points,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    /// Flattened `x, y, z` triples in row-major pixel order.
    pub fn flat(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| p.iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_buffer_size_checked() {
        assert!(RgbFrame::new(2, 2, vec![0; 12]).is_ok());
        assert_eq!(
            RgbFrame::new(2, 2, vec![0; 11]),
            Err(FrameError::BufferSize {
                width: 2,
                height: 2,
                expected: 12,
                actual: 11
            })
        );
        assert!(matches!(
            RgbFrame::new(0, 2, vec![]),
            Err(FrameError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_rgb_pixel_access() {
        let mut frame = RgbFrame::filled(3, 2, [10, 20, 30]).unwrap();
        assert_eq!(frame.pixel(2, 1), [10, 20, 30]);
        frame.set_pixel(1, 1, [255, 0, 0]);
        assert_eq!(frame.pixel(1, 1), [255, 0, 0]);
        assert_eq!(frame.as_bytes()[(3 + 1) * 3], 255);
    }

    #[test]
    fn test_depth_access() {
        let mut depth = DepthFrame::filled(4, 3, DepthUnits::Meters, 1.5).unwrap();
        depth.set(3, 2, 0.25);
        assert_eq!(depth.get(3, 2), 0.25);
        assert_eq!(depth.get(0, 0), 1.5);
        assert_eq!(depth.units(), DepthUnits::Meters);
    }

    #[test]
    fn test_mask_handles() {
        let mut mask = MaskFrame::filled(2, 2, 1).unwrap();
        mask.set(0, 1, 7);
        mask.set(1, 1, 3);
        assert_eq!(mask.handles(), vec![1, 3, 7]);
    }

    #[test]
    fn test_point_cloud_flat() {
        let cloud = PointCloud::new(2, 1, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(cloud.flat(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
