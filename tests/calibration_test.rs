mod common;

use std::collections::HashMap;

use chessboard_calib::accumulator::CalibrationAccumulator;
use chessboard_calib::board::Board;
use chessboard_calib::data_loader::{list_images, load_chessboard_frames};
use chessboard_calib::detector::CornerDetector;
use chessboard_calib::error::CalibError;
use chessboard_calib::util::{calibrate, init_camera_matrix, reprojection_errors};
use glam::Vec2;
use image::{GrayImage, Luma};

/// Looks the corners up by the gray value of the top-left pixel.
struct MockDetector {
    corners: HashMap<u8, Vec<Vec2>>,
}

impl CornerDetector for MockDetector {
    fn detect(&self, img: &GrayImage, _board: &Board) -> Option<Vec<Vec2>> {
        self.corners.get(&img.get_pixel(0, 0)[0]).cloned()
    }
}

fn accumulate(frames: &[chessboard_calib::detected_points::FrameFeature]) -> CalibrationAccumulator {
    let mut accumulator = CalibrationAccumulator::new();
    for f in frames {
        accumulator.push(f).unwrap();
    }
    accumulator
}

#[test]
fn test_calibrate_recovers_intrinsics() {
    let (_, frames) = common::synthetic_frames(8, 7);
    let accumulator = accumulate(&frames);
    let result = calibrate(&accumulator, &common::board_config()).unwrap();
    let gt = common::gt_model();

    let k = result.camera_matrix;
    assert!((k[0][0] - gt.fx).abs() < 2.0, "fx {}", k[0][0]);
    assert!((k[1][1] - gt.fy).abs() < 2.0, "fy {}", k[1][1]);
    assert!((k[0][2] - gt.cx).abs() < 2.0, "cx {}", k[0][2]);
    assert!((k[1][2] - gt.cy).abs() < 2.0, "cy {}", k[1][2]);
    assert!((result.dist_coeffs[0] - gt.k1).abs() < 1e-2, "k1 {}", result.dist_coeffs[0]);
    assert!(result.mean_error < 0.05, "mean error {}", result.mean_error);
    assert!(result.rms_error < 0.05, "rms error {}", result.rms_error);
    assert_eq!(result.image_size, (common::WIDTH, common::HEIGHT));
    assert_eq!(result.board, common::board_config());
}

#[test]
fn test_calibrate_mapping_and_poses_line_up() {
    let (_, frames) = common::synthetic_frames(6, 11);
    let accumulator = accumulate(&frames);
    let result = calibrate(&accumulator, &common::board_config()).unwrap();

    assert_eq!(result.image_index.len(), frames.len());
    assert_eq!(result.rvecs.len(), frames.len());
    assert_eq!(result.tvecs.len(), frames.len());
    assert_eq!(result.per_view_errors.len(), frames.len());
    for (i, f) in frames.iter().enumerate() {
        assert_eq!(result.image_index.lookup(&f.name).unwrap(), i);
    }
    result.validate().unwrap();

    let gt_poses = common::gt_poses(&Board::from_config(&common::board_config()), 6, 11);
    for (i, gt) in gt_poses.iter().enumerate() {
        let pose = result.pose(i).unwrap();
        assert!((pose.na_tvec() - gt.na_tvec()).norm() < 2.0, "view {}", i);
        assert!((pose.na_rvec() - gt.na_rvec()).norm() < 1e-2, "view {}", i);
    }
}

#[test]
fn test_recomputed_error_matches_recorded() {
    let (_, frames) = common::synthetic_frames(5, 3);
    let accumulator = accumulate(&frames);
    let result = calibrate(&accumulator, &common::board_config()).unwrap();

    let (per_view, rms) = reprojection_errors(&result, &accumulator);
    assert_eq!(per_view, result.per_view_errors);
    assert_eq!(rms, result.rms_error);
    let mean = per_view.iter().sum::<f64>() / per_view.len() as f64;
    assert_eq!(mean, result.mean_error);
}

#[test]
fn test_calibrate_with_pixel_noise() {
    let (_, mut frames) = common::synthetic_frames(10, 5);
    let mut offset = 0.0f32;
    for f in &mut frames {
        for p in &mut f.features {
            offset = (offset + 0.37) % 0.6;
            p.p2d += Vec2::new(offset - 0.3, 0.3 - offset);
        }
    }
    let accumulator = accumulate(&frames);
    let result = calibrate(&accumulator, &common::board_config()).unwrap();
    assert!(result.mean_error > 0.0);
    assert!(result.mean_error < 0.6, "mean error {}", result.mean_error);
    assert!((result.camera_matrix[0][0] - 800.0).abs() < 15.0);
}

#[test]
fn test_focal_init_close_to_truth() {
    let (_, frames) = common::synthetic_frames(8, 21);
    let accumulator = accumulate(&frames);
    let k = init_camera_matrix(&accumulator, (common::WIDTH, common::HEIGHT));
    assert!((k[(0, 0)] - 800.0).abs() < 100.0, "fx {}", k[(0, 0)]);
    assert!((k[(1, 1)] - 780.0).abs() < 100.0, "fy {}", k[(1, 1)]);
    assert_eq!(k[(0, 2)], 319.5);
    assert_eq!(k[(1, 2)], 239.5);
}

#[test]
fn test_empty_accumulator_is_an_error() {
    let accumulator = CalibrationAccumulator::new();
    let result = calibrate(&accumulator, &common::board_config());
    assert!(matches!(result, Err(CalibError::NoUsableImages)));
}

#[test]
fn test_accumulator_rejects_inconsistent_frames() {
    let (board, frames) = common::synthetic_frames(2, 1);
    let mut accumulator = CalibrationAccumulator::new();
    assert_eq!(accumulator.push(&frames[0]).unwrap(), 0);

    let duplicate = accumulator.push(&frames[0]);
    assert!(matches!(duplicate, Err(CalibError::DuplicateImage(_))));

    let short: Vec<Vec2> = frames[1].features[1..].iter().map(|f| f.p2d).collect();
    let truncated = common::frame_feature("short.bmp", &board, &short);
    let mismatch = accumulator.push(&truncated);
    assert!(matches!(
        mismatch,
        Err(CalibError::PointCountMismatch { view: 1, .. })
    ));

    assert_eq!(accumulator.push(&frames[1]).unwrap(), 1);
    assert_eq!(accumulator.len(), 2);
    assert_eq!(accumulator.image_index.len(), 2);
}

#[test]
fn test_detect_folder_then_calibrate() {
    let dir = tempfile::tempdir().unwrap();
    let (board, frames) = common::synthetic_frames(6, 9);

    let mut corners = HashMap::new();
    for (i, f) in frames.iter().enumerate() {
        let id = i as u8 + 1;
        corners.insert(id, f.features.iter().map(|p| p.p2d).collect());
        let img = GrayImage::from_pixel(common::WIDTH, common::HEIGHT, Luma([id]));
        img.save(dir.path().join(format!("view_{}.png", i))).unwrap();
    }
    // board not visible
    GrayImage::from_pixel(common::WIDTH, common::HEIGHT, Luma([200]))
        .save(dir.path().join("view_blank.png"))
        .unwrap();
    std::fs::write(dir.path().join("view_broken.png"), b"not a png").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let paths = list_images(dir.path()).unwrap();
    assert_eq!(paths.len(), 8);

    let detector = MockDetector { corners };
    let detected = load_chessboard_frames(&paths, &detector, &board, false, None);
    assert_eq!(detected.len(), paths.len());

    let skipped: Vec<_> = detected.iter().filter_map(|d| d.as_ref().err()).collect();
    assert_eq!(skipped.len(), 2);
    assert!(skipped.iter().any(|s| s.path.ends_with("view_blank.png")));
    assert!(skipped.iter().any(|s| s.path.ends_with("view_broken.png")));

    let mut accumulator = CalibrationAccumulator::new();
    for f in detected.iter().filter_map(|d| d.as_ref().ok()) {
        accumulator.push(f).unwrap();
    }
    let result = calibrate(&accumulator, &common::board_config()).unwrap();
    for i in 0..6 {
        assert_eq!(result.image_index.lookup(&format!("view_{}.png", i)).unwrap(), i);
    }
    assert!(result.image_index.lookup("view_blank.png").is_err());
    assert!(result.mean_error < 0.05);
}
