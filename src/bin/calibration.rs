use std::path::PathBuf;
use std::time::Instant;

use chessboard_calib::accumulator::CalibrationAccumulator;
use chessboard_calib::board::{Board, BoardConfig};
use chessboard_calib::camera_model::{CameraModel, OpenCVModel5, init_undistort_map, remap};
use chessboard_calib::data_loader::{list_images, load_chessboard_frames};
use chessboard_calib::detector::ChessboardCornerDetector;
use chessboard_calib::io::{object_from_json, write_report};
use chessboard_calib::result::{CalibrationResult, default_output_path};
use chessboard_calib::visualization::{log_image, log_reprojection};
use clap::Parser;
use env_logger::Env;
use image::ImageReader;
use log::{info, warn};
use nalgebra as na;
use rerun::TimeCell;

#[derive(Parser)]
#[command(version, about, author)]
struct CbCalibCli {
    /// #rows of chessboard (inner corners)
    #[arg(short, long, default_value_t = 12)]
    rows: usize,

    /// #cols of chessboard (inner corners)
    #[arg(short, long, default_value_t = 8)]
    cols: usize,

    /// width per block in mm
    #[arg(short, long, default_value_t = 90.0)]
    mm: f32,

    /// images path
    #[arg(short, long, default_value = "data/sample")]
    path: PathBuf,

    /// show detections and the undistorted last image in rerun
    #[arg(short, long)]
    show: bool,

    /// image paths use windows separators
    #[arg(short = 'w')]
    windows: bool,

    /// board json, overrides -r -c -m
    #[arg(long)]
    board_config: Option<PathBuf>,

    /// result file, defaults to cali_out.json two levels above the image folder
    #[arg(long)]
    output: Option<PathBuf>,
}

fn log_reprojected_views(
    recording: &rerun::RecordingStream,
    result: &CalibrationResult,
    accumulator: &CalibrationAccumulator,
) {
    let params = result.camera_model().params();
    for (view, p3ds) in accumulator.object_points.iter().enumerate() {
        let Some(pose) = result.pose(view) else {
            continue;
        };
        let transform = pose.to_na_isometry3();
        let p2ds: Vec<_> = p3ds
            .iter()
            .map(|p| {
                let p_cam = transform * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
                let p2d = OpenCVModel5::project_one_impl(&params, &p_cam.coords);
                (p2d[0] as f32, p2d[1] as f32)
            })
            .collect();
        recording.set_time("stable", TimeCell::from_sequence(view as i64));
        log_reprojection(recording, "calibrated", view, &p2ds);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = CbCalibCli::parse();

    let board_config = match &cli.board_config {
        Some(p) => object_from_json(p)?,
        None => BoardConfig {
            rows: cli.rows,
            cols: cli.cols,
            square_size_mm: cli.mm,
        },
    };
    info!("board {:?}", board_config);
    let board = Board::from_config(&board_config);

    let paths = list_images(&cli.path)?;
    if paths.is_empty() {
        warn!("no images in {}", cli.path.display());
    }
    let recording_option = if cli.show {
        Some(rerun::RecordingStreamBuilder::new("cbcalib").spawn()?)
    } else {
        None
    };

    let detector = ChessboardCornerDetector::new();
    let now = Instant::now();
    let frames = load_chessboard_frames(
        &paths,
        &detector,
        &board,
        cli.windows,
        recording_option.as_ref(),
    );
    let duration_sec = now.elapsed().as_secs_f64();
    println!("detecting feature took {:.6} sec", duration_sec);

    let mut accumulator = CalibrationAccumulator::new();
    for frame in &frames {
        match frame {
            Ok(f) => {
                accumulator.push(f)?;
            }
            Err(skipped) => println!("image {} can't be calibrated.", skipped.path.display()),
        }
    }
    info!("{} of {} images usable", accumulator.len(), paths.len());

    let result = chessboard_calib::util::calibrate(&accumulator, &board_config)?;
    println!("Re-projection error: {}", result.mean_error);

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.path));
    result.save(&output_path)?;
    write_report(&output_path.with_extension("txt"), &result)?;
    println!("Calibration result saved in {}", output_path.display());

    if let Some(recording) = &recording_option {
        log_reprojected_views(recording, &result, &accumulator);
        if let Some(last_file) = paths.last() {
            let img = ImageReader::open(last_file)?.decode()?;
            let model = result.camera_model();
            let k = result.camera_matrix;
            let new_k = na::Matrix3::new(
                k[0][0], k[0][1], k[0][2], k[1][0], k[1][1], k[1][2], k[2][0], k[2][1], k[2][2],
            );
            let (xmap, ymap) = init_undistort_map(&model, &new_k, (img.height(), img.width()));
            let undistorted = remap(&img, &xmap, &ymap);
            recording.set_time("stable", TimeCell::from_sequence(frames.len() as i64));
            log_image(recording, "undistort/original", &img);
            log_image(recording, "undistort/undistorted", &undistorted);
        }
    }
    Ok(())
}
