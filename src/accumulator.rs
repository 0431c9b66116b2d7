use crate::detected_points::FrameFeature;
use crate::error::{CalibError, Result};
use crate::result::ImageIndex;

/// Per-image correspondences collected before the solve.
///
/// `object_points[i]` and `image_points[i]` belong to the image
/// that `image_index` maps to `i`.
#[derive(Debug, Default)]
pub struct CalibrationAccumulator {
    pub object_points: Vec<Vec<glam::Vec3>>,
    pub image_points: Vec<Vec<glam::Vec2>>,
    pub image_index: ImageIndex,
    pub img_w_h: Option<(u32, u32)>,
}

impl CalibrationAccumulator {
    pub fn new() -> CalibrationAccumulator {
        CalibrationAccumulator::default()
    }

    /// Appends one detected frame and returns its index.
    pub fn push(&mut self, frame: &FrameFeature) -> Result<usize> {
        if let Some(expected) = self.object_points.first().map(Vec::len) {
            if frame.features.len() != expected {
                return Err(CalibError::PointCountMismatch {
                    view: self.len(),
                    expected,
                    got: frame.features.len(),
                });
            }
        }
        let idx = self.image_index.insert(&frame.name)?;
        let (p3ds, p2ds): (Vec<_>, Vec<_>) = frame.features.iter().map(|f| (f.p3d, f.p2d)).unzip();
        self.object_points.push(p3ds);
        self.image_points.push(p2ds);
        if self.img_w_h.is_none() {
            self.img_w_h = Some(frame.img_w_h);
        } else if self.img_w_h != Some(frame.img_w_h) {
            log::warn!(
                "{} is {:?}, calibrating for {:?}",
                frame.name,
                frame.img_w_h,
                self.img_w_h
            );
        }
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.object_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_points.is_empty()
    }
}
