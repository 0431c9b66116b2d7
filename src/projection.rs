use std::io::BufRead;

use image::{Rgb, RgbImage};
use nalgebra as na;

use crate::camera_model::{CameraModel, OpenCVModel5};
use crate::error::{CalibError, Result};
use crate::result::CalibrationResult;
use crate::types::RvecTvec;

pub const MARKER_RADIUS: u32 = 20;
/// Blue.
pub const MARKER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const MARKER_THICKNESS: u32 = 2;

/// Largest pixel coordinate magnitude handed out by [`Projector::project_rounded`].
const MAX_PIXEL_COORD: f64 = 1e9;

/// Projects board-frame points into one calibrated image.
#[derive(Debug, Clone)]
pub struct Projector {
    pub image_name: String,
    pub index: usize,
    model: OpenCVModel5<f64>,
    transform: na::Isometry3<f64>,
}

impl Projector {
    /// Looks `image_name` up in the result and fixes its pose.
    pub fn new(result: &CalibrationResult, image_name: &str) -> Result<Projector> {
        let (index, pose) = result.pose_for_image(image_name)?;
        Ok(Projector::from_pose(
            image_name,
            index,
            result.camera_model(),
            &pose,
        ))
    }

    pub fn from_pose(
        image_name: &str,
        index: usize,
        model: OpenCVModel5<f64>,
        pose: &RvecTvec,
    ) -> Projector {
        Projector {
            image_name: image_name.to_string(),
            index,
            model,
            transform: pose.to_na_isometry3(),
        }
    }

    pub fn project(&self, p3d: [f64; 3]) -> [f64; 2] {
        let p_cam = self.transform * na::Point3::new(p3d[0], p3d[1], p3d[2]);
        let p2d = self.model.project_one(&p_cam.coords);
        [p2d[0], p2d[1]]
    }

    /// Pixel center nearest to the projection.
    ///
    /// `None` for points on or behind the camera plane and for projections too
    /// far out to be a pixel coordinate.
    pub fn project_rounded(&self, p3d: [f64; 3]) -> Option<(i64, i64)> {
        let p_cam = self.transform * na::Point3::new(p3d[0], p3d[1], p3d[2]);
        if !p_cam.z.is_finite() || p_cam.z <= 0.0 {
            return None;
        }
        let p2d = self.model.project_one(&p_cam.coords);
        let (x, y) = (p2d[0].round(), p2d[1].round());
        if [x, y].iter().any(|v| !v.is_finite() || v.abs() > MAX_PIXEL_COORD) {
            return None;
        }
        Some((x as i64, y as i64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionCommand {
    Quit,
    Point([f64; 3]),
}

/// Parses one input line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ProjectionCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "q" {
        return Ok(Some(ProjectionCommand::Quit));
    }
    let invalid = || CalibError::InvalidPointInput(line.to_string());
    let values = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<f64>>>()?;
    match values.as_slice() {
        [x, y, z] if values.iter().all(|v| v.is_finite()) => {
            Ok(Some(ProjectionCommand::Point([*x, *y, *z])))
        }
        _ => Err(invalid()),
    }
}

/// Reads points line by line and hands each projection to `on_point`.
///
/// Stops at `q` or end of input and returns how many points were projected.
/// Malformed lines and points that do not land on the image plane are logged and
/// skipped; an error from `on_point` ends the loop.
pub fn run_projection_loop<R, F>(reader: R, projector: &Projector, mut on_point: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut([f64; 3], (i64, i64)) -> Result<()>,
{
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(Some(ProjectionCommand::Quit)) => break,
            Ok(Some(ProjectionCommand::Point(p3d))) => {
                let Some(pixel) = projector.project_rounded(p3d) else {
                    log::warn!(
                        "{:?} does not project into {}: behind or on the camera plane",
                        p3d,
                        projector.image_name
                    );
                    continue;
                };
                log::debug!("{:?} -> {:?} in {}", p3d, pixel, projector.image_name);
                on_point(p3d, pixel)?;
                count += 1;
            }
            Ok(None) => {}
            Err(e) => log::warn!("{}", e),
        }
    }
    Ok(count)
}

/// Draws a hollow circle; the parts outside the image are clipped.
pub fn draw_marker(
    image: &mut RgbImage,
    center: (i64, i64),
    radius: u32,
    color: Rgb<u8>,
    thickness: u32,
) {
    let half = thickness.max(1) as f64 / 2.0;
    let outer = (radius as f64 + half).ceil() as i64;
    let (w, h) = (image.width() as i64, image.height() as i64);
    let (x0, x1) = (
        center.0.saturating_sub(outer).max(0),
        center.0.saturating_add(outer).min(w - 1),
    );
    let (y0, y1) = (
        center.1.saturating_sub(outer).max(0),
        center.1.saturating_add(outer).min(h - 1),
    );
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 - center.0 as f64;
            let dy = y as f64 - center.1 as f64;
            let d = (dx * dx + dy * dy).sqrt();
            if (d - radius as f64).abs() <= half {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
