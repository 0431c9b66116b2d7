#![allow(dead_code)]

use chessboard_calib::board::{Board, BoardConfig};
use chessboard_calib::camera_model::{CameraModel, OpenCVModel5};
use chessboard_calib::detected_points::{FeaturePoint, FrameFeature};
use chessboard_calib::types::RvecTvec;
use glam::Vec2;
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

pub fn board_config() -> BoardConfig {
    BoardConfig {
        rows: 9,
        cols: 6,
        square_size_mm: 30.0,
    }
}

pub fn gt_model() -> OpenCVModel5<f64> {
    let params = na::dvector![800.0, 780.0, 322.0, 236.0, -0.08, 0.02, 0.0005, -0.0003, 0.0];
    OpenCVModel5::new(&params, WIDTH, HEIGHT)
}

/// Board poses looking at the board center from 600-800 mm with up to ~23 deg tilt.
pub fn gt_poses(board: &Board, num: usize, seed: u64) -> Vec<RvecTvec> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let center = na::Vector3::new(
        (board.rows - 1) as f64 * 15.0,
        (board.cols - 1) as f64 * 15.0,
        0.0,
    );
    (0..num)
        .map(|_| {
            let axis = na::Vector3::<f64>::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-0.3..0.3),
            )
            .normalize();
            let angle: f64 = rng.random_range(0.15..0.4);
            let rot = na::Rotation3::from_scaled_axis(axis * angle);
            let t = na::Vector3::<f64>::new(
                rng.random_range(-20.0..20.0),
                rng.random_range(-20.0..20.0),
                rng.random_range(600.0..800.0),
            );
            let tvec = t - rot * center;
            RvecTvec::new(rot.scaled_axis().as_slice(), tvec.as_slice())
        })
        .collect()
}

pub fn project_board(model: &OpenCVModel5<f64>, board: &Board, pose: &RvecTvec) -> Vec<Vec2> {
    let transform = pose.to_na_isometry3();
    board
        .points_3d
        .iter()
        .map(|p| {
            let p_cam = transform * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
            let p2d = model.project_one(&p_cam.coords);
            assert!(p2d[0] > 0.0 && p2d[0] < WIDTH as f64);
            assert!(p2d[1] > 0.0 && p2d[1] < HEIGHT as f64);
            Vec2::new(p2d[0] as f32, p2d[1] as f32)
        })
        .collect()
}

pub fn frame_feature(name: &str, board: &Board, corners: &[Vec2]) -> FrameFeature {
    FrameFeature {
        name: name.to_string(),
        path: PathBuf::from(name),
        img_w_h: (WIDTH, HEIGHT),
        features: corners
            .iter()
            .zip(&board.points_3d)
            .map(|(p2d, p3d)| FeaturePoint {
                p2d: *p2d,
                p3d: *p3d,
            })
            .collect(),
    }
}

/// Noise-free detections of `num` views named `cb_{i}.bmp`.
pub fn synthetic_frames(num: usize, seed: u64) -> (Board, Vec<FrameFeature>) {
    let board = Board::from_config(&board_config());
    let model = gt_model();
    let frames = gt_poses(&board, num, seed)
        .iter()
        .enumerate()
        .map(|(i, pose)| {
            let corners = project_board(&model, &board, pose);
            frame_feature(&format!("cb_{}.bmp", i + 1), &board, &corners)
        })
        .collect();
    (board, frames)
}
