use std::path::{Path, PathBuf};

use glob::glob;
use image::ImageReader;
use indicatif::ProgressIterator;
use rerun::TimeCell;

use crate::board::Board;
use crate::detected_points::{FeaturePoint, FrameFeature};
use crate::detector::CornerDetector;
use crate::error::Result;
use crate::visualization::{log_corners, log_image};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// An input image that did not contribute to the calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

fn is_image(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|ext| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// All image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("*");
    let mut sorted_path = Vec::new();
    for entry in glob(&pattern.to_string_lossy())? {
        let p = entry?;
        if p.is_file() && is_image(&p) {
            sorted_path.push(p);
        }
    }
    sorted_path.sort();
    Ok(sorted_path)
}

/// The filename used as key in the image index.
///
/// With `windows_separators` a backslash also ends a path component, so keys
/// stay bare filenames for paths written on Windows.
pub fn image_key(path: &Path, windows_separators: bool) -> String {
    let s = path.to_string_lossy();
    let name = if windows_separators {
        s.rsplit(['/', '\\']).next()
    } else {
        s.rsplit('/').next()
    };
    name.unwrap_or_default().to_string()
}

fn load_one(
    path: &Path,
    detector: &dyn CornerDetector,
    board: &Board,
    windows_separators: bool,
    recording_option: Option<&rerun::RecordingStream>,
    topic: &str,
) -> std::result::Result<FrameFeature, SkippedImage> {
    let skipped = |reason: String| SkippedImage {
        path: path.to_path_buf(),
        reason,
    };
    let img = ImageReader::open(path)
        .map_err(|e| skipped(format!("cannot open: {}", e)))?
        .with_guessed_format()
        .map_err(|e| skipped(format!("cannot read: {}", e)))?
        .decode()
        .map_err(|e| skipped(format!("cannot decode: {}", e)))?;
    if let Some(recording) = recording_option {
        log_image(recording, topic, &img);
    }
    let corners = detector
        .detect(&img.to_luma8(), board)
        .ok_or_else(|| skipped("chessboard not found".to_string()))?;
    if corners.len() != board.corner_count() {
        return Err(skipped(format!(
            "{} corners found, board has {}",
            corners.len(),
            board.corner_count()
        )));
    }
    if let Some(recording) = recording_option {
        log_corners(recording, topic, &corners);
    }
    let features = corners
        .iter()
        .zip(&board.points_3d)
        .map(|(p2d, p3d)| FeaturePoint {
            p2d: *p2d,
            p3d: *p3d,
        })
        .collect();
    Ok(FrameFeature {
        name: image_key(path, windows_separators),
        path: path.to_path_buf(),
        img_w_h: (img.width(), img.height()),
        features,
    })
}

/// Runs corner detection on every image, in order.
///
/// Returns one entry per input path. Images that cannot be read or do not show
/// the whole board come back as [`SkippedImage`] and are logged; they never stop
/// the run.
pub fn load_chessboard_frames(
    paths: &[PathBuf],
    detector: &dyn CornerDetector,
    board: &Board,
    windows_separators: bool,
    recording_option: Option<&rerun::RecordingStream>,
) -> Vec<std::result::Result<FrameFeature, SkippedImage>> {
    paths
        .iter()
        .enumerate()
        .progress_count(paths.len() as u64)
        .map(|(idx, path)| {
            log::trace!("detecting {}", path.display());
            if let Some(recording) = recording_option {
                recording.set_time("stable", TimeCell::from_sequence(idx as i64));
            }
            let frame = load_one(
                path,
                detector,
                board,
                windows_separators,
                recording_option,
                "cam0",
            );
            if let Err(skipped) = &frame {
                log::warn!("skip {}: {}", skipped.path.display(), skipped.reason);
            }
            frame
        })
        .collect()
}
