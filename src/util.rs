use std::collections::HashMap;

use log::{debug, info, warn};
use nalgebra as na;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tiny_solver::LevenbergMarquardtOptimizer;
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};

use crate::accumulator::CalibrationAccumulator;
use crate::board::BoardConfig;
use crate::camera_model::{CameraModel, OPENCV5_PARAM_NUM, OpenCVModel5};
use crate::error::{CalibError, Result};
use crate::optimization::factors::ReprojectionFactor;
use crate::optimization::{estimate_homography, homographies_to_focal, init_pose};
use crate::result::CalibrationResult;
use crate::types::RvecTvec;

const MAX_ITERATIONS: usize = 100;

fn rvec_name(idx: usize) -> String {
    format!("rvec{}", idx)
}

fn tvec_name(idx: usize) -> String {
    format!("tvec{}", idx)
}

/// Pinhole intrinsics from the board homographies, principal point at the image center.
pub fn init_camera_matrix(
    accumulator: &CalibrationAccumulator,
    img_w_h: (u32, u32),
) -> na::Matrix3<f64> {
    let cx = (img_w_h.0 as f64 - 1.0) / 2.0;
    let cy = (img_w_h.1 as f64 - 1.0) / 2.0;
    let homographies: Vec<_> = accumulator
        .object_points
        .iter()
        .zip(&accumulator.image_points)
        .filter_map(|(p3ds, p2ds)| {
            let board: Vec<_> = p3ds
                .iter()
                .map(|p| na::Point2::new(p.x as f64, p.y as f64))
                .collect();
            let img: Vec<_> = p2ds
                .iter()
                .map(|p| na::Point2::new(p.x as f64, p.y as f64))
                .collect();
            estimate_homography(&board, &img)
        })
        .collect();
    debug!(
        "{} of {} views gave a homography",
        homographies.len(),
        accumulator.len()
    );
    let (fx, fy) = homographies_to_focal(&homographies, (cx, cy)).unwrap_or_else(|| {
        let f = img_w_h.0.max(img_w_h.1) as f64;
        warn!("falling back to focal length {}", f);
        (f, f)
    });
    na::Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0)
}

/// Joint intrinsic and extrinsic calibration over every accumulated view.
///
/// Initializes a pinhole camera from the board homographies, one pose per view
/// with PnP, then refines `fx fy cx cy k1 k2 p1 p2 k3` together with all poses by
/// Levenberg-Marquardt on the pixel reprojection residuals.
pub fn calibrate(
    accumulator: &CalibrationAccumulator,
    board: &BoardConfig,
) -> Result<CalibrationResult> {
    if accumulator.is_empty() {
        return Err(CalibError::NoUsableImages);
    }
    let img_w_h = accumulator.img_w_h.ok_or(CalibError::NoUsableImages)?;
    let camera_matrix = init_camera_matrix(accumulator, img_w_h);
    info!(
        "init fx {:.3} fy {:.3} cx {:.3} cy {:.3}",
        camera_matrix[(0, 0)],
        camera_matrix[(1, 1)],
        camera_matrix[(0, 2)],
        camera_matrix[(1, 2)]
    );

    let mut problem = tiny_solver::problem::Problem::new();
    let mut initial_values = HashMap::<String, na::DVector<f64>>::new();
    initial_values.insert(
        "params".to_string(),
        na::dvector![
            camera_matrix[(0, 0)],
            camera_matrix[(1, 1)],
            camera_matrix[(0, 2)],
            camera_matrix[(1, 2)],
            0.0,
            0.0,
            0.0,
            0.0,
            0.0
        ],
    );

    for (view, (p3ds, p2ds)) in accumulator
        .object_points
        .iter()
        .zip(&accumulator.image_points)
        .enumerate()
    {
        let pose = init_pose(p3ds, p2ds, &camera_matrix).ok_or(CalibError::SolverFailed(
            "no initial pose for a detected view",
        ))?;
        let rvec_key = rvec_name(view);
        let tvec_key = tvec_name(view);
        let (rvec, tvec) = pose.to_dvecs();
        initial_values.insert(rvec_key.clone(), rvec);
        initial_values.insert(tvec_key.clone(), tvec);
        for (p3d, p2d) in p3ds.iter().zip(p2ds) {
            let factor = ReprojectionFactor::new(p3d, p2d);
            problem.add_residual_block(
                2,
                &["params", rvec_key.as_str(), tvec_key.as_str()],
                Box::new(factor),
                None,
            );
        }
    }

    let optimizer = LevenbergMarquardtOptimizer::default();
    let options = OptimizerOptions {
        max_iteration: MAX_ITERATIONS,
        ..OptimizerOptions::default()
    };
    let result = optimizer
        .optimize(&problem, &initial_values, Some(options))
        .ok_or(CalibError::SolverFailed("levenberg-marquardt did not converge"))?;

    let params = result
        .get("params")
        .ok_or(CalibError::SolverFailed("camera parameters missing from solution"))?;
    if params.len() != OPENCV5_PARAM_NUM || params.iter().any(|v| !v.is_finite()) {
        return Err(CalibError::SolverFailed("camera parameters are not finite"));
    }
    let model = OpenCVModel5::new(params, img_w_h.0, img_w_h.1);

    let mut rvecs = Vec::with_capacity(accumulator.len());
    let mut tvecs = Vec::with_capacity(accumulator.len());
    for view in 0..accumulator.len() {
        let (Some(rvec), Some(tvec)) = (result.get(&rvec_name(view)), result.get(&tvec_name(view)))
        else {
            return Err(CalibError::SolverFailed("view pose missing from solution"));
        };
        let pose = RvecTvec::new(rvec.as_slice(), tvec.as_slice());
        rvecs.push(pose.rvec);
        tvecs.push(pose.tvec);
    }

    let mut calib_result = CalibrationResult {
        image_size: img_w_h,
        camera_matrix: model.camera_matrix(),
        dist_coeffs: model.dist_coeffs(),
        rvecs,
        tvecs,
        mean_error: 0.0,
        rms_error: 0.0,
        per_view_errors: Vec::new(),
        image_index: accumulator.image_index.clone(),
        board: *board,
        created_at: timestamp_now(),
    };
    let (per_view_errors, rms_error) = reprojection_errors(&calib_result, accumulator);
    calib_result.mean_error =
        per_view_errors.iter().sum::<f64>() / per_view_errors.len() as f64;
    calib_result.per_view_errors = per_view_errors;
    calib_result.rms_error = rms_error;
    info!(
        "mean reprojection error {:.5} px, rms {:.5} px over {} views",
        calib_result.mean_error,
        calib_result.rms_error,
        accumulator.len()
    );
    Ok(calib_result)
}

/// Per-view mean pixel distance and the overall RMS of the reprojection residuals.
///
/// Views are matched to poses by position; a view without a stored pose scores NaN.
pub fn reprojection_errors(
    result: &CalibrationResult,
    accumulator: &CalibrationAccumulator,
) -> (Vec<f64>, f64) {
    let model = result.camera_model();
    let params = model.params();
    let mut squared_sum = 0.0;
    let mut point_count = 0usize;
    let per_view = accumulator
        .object_points
        .iter()
        .zip(&accumulator.image_points)
        .enumerate()
        .map(|(view, (p3ds, p2ds))| {
            let Some(transform) = result.pose(view).map(|p| p.to_na_isometry3()) else {
                return f64::NAN;
            };
            let dists: Vec<f64> = p3ds
                .iter()
                .zip(p2ds)
                .map(|(p3d, p2d)| {
                    let p3d = na::Point3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64);
                    let p_cam = transform * p3d;
                    let p = OpenCVModel5::project_one_impl(&params, &p_cam.coords);
                    let dx = p[0] - p2d.x as f64;
                    let dy = p[1] - p2d.y as f64;
                    dx * dx + dy * dy
                })
                .collect();
            squared_sum += dists.iter().sum::<f64>();
            point_count += dists.len();
            dists.iter().map(|d| d.sqrt()).sum::<f64>() / dists.len() as f64
        })
        .collect();
    let rms = (squared_sum / point_count.max(1) as f64).sqrt();
    (per_view, rms)
}

fn timestamp_now() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
