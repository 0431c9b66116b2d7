use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::board::BoardConfig;
use crate::camera_model::OpenCVModel5;
use crate::error::{CalibError, Result};
use crate::io::{object_from_json, object_to_json};
use crate::types::RvecTvec;

pub const RESULT_FILE_NAME: &str = "cali_out.json";

/// Filename to extrinsics-index mapping.
///
/// Indices are handed out in insertion order, so they are unique and
/// contiguous from 0. Serialized with names sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageIndex {
    entries: BTreeMap<String, usize>,
}

impl ImageIndex {
    pub fn new() -> ImageIndex {
        ImageIndex::default()
    }

    /// Records `name` as the next index and returns it.
    pub fn insert(&mut self, name: &str) -> Result<usize> {
        if self.entries.contains_key(name) {
            return Err(CalibError::DuplicateImage(name.to_string()));
        }
        let idx = self.entries.len();
        self.entries.insert(name.to_string(), idx);
        Ok(idx)
    }

    pub fn lookup(&self, name: &str) -> Result<usize> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| CalibError::ImageNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, index)` pairs sorted by index, i.e. in detection order.
    pub fn iter_ordered(&self) -> Vec<(&str, usize)> {
        let mut pairs: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        pairs.sort_by_key(|(_, idx)| *idx);
        pairs
    }

    /// Checks that the indices are exactly `0..len`.
    pub fn validate(&self) -> Result<()> {
        let mut seen = vec![false; self.entries.len()];
        for (name, &idx) in &self.entries {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(CalibError::CorruptResult(format!(
                        "index {idx} of \"{name}\" is duplicated or out of range"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Everything one calibration run produces. Written once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub image_size: (u32, u32),
    pub camera_matrix: [[f64; 3]; 3],
    /// OpenCV order: k1, k2, p1, p2, k3.
    pub dist_coeffs: [f64; 5],
    pub rvecs: Vec<[f64; 3]>,
    pub tvecs: Vec<[f64; 3]>,
    pub mean_error: f64,
    pub rms_error: f64,
    pub per_view_errors: Vec<f64>,
    pub image_index: ImageIndex,
    pub board: BoardConfig,
    pub created_at: String,
}

impl CalibrationResult {
    pub fn camera_model(&self) -> OpenCVModel5<f64> {
        OpenCVModel5::from_camera_matrix(
            &self.camera_matrix,
            &self.dist_coeffs,
            self.image_size.0,
            self.image_size.1,
        )
    }

    pub fn pose(&self, idx: usize) -> Option<RvecTvec> {
        Some(RvecTvec::new(self.rvecs.get(idx)?, self.tvecs.get(idx)?))
    }

    /// Resolves an image filename to its stored pose.
    pub fn pose_for_image(&self, name: &str) -> Result<(usize, RvecTvec)> {
        let idx = self.image_index.lookup(name)?;
        let pose = self.pose(idx).ok_or_else(|| {
            CalibError::CorruptResult(format!("index {idx} of \"{name}\" has no stored pose"))
        })?;
        Ok((idx, pose))
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.image_index.len();
        if self.rvecs.len() != n || self.tvecs.len() != n || self.per_view_errors.len() != n {
            return Err(CalibError::CorruptResult(format!(
                "{} mapped images but {} rvecs, {} tvecs and {} per-view errors",
                n,
                self.rvecs.len(),
                self.tvecs.len(),
                self.per_view_errors.len()
            )));
        }
        self.image_index.validate()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        object_to_json(path, self)
    }

    pub fn load(path: &Path) -> Result<CalibrationResult> {
        if !path.exists() {
            return Err(CalibError::MissingInput(path.to_path_buf()));
        }
        let result: CalibrationResult = object_from_json(path)?;
        result.validate()?;
        Ok(result)
    }
}

/// Where the calibration tool writes its result for a given image directory.
///
/// The file goes two levels above the image directory, e.g. `data/run1/images`
/// yields `data/cali_out.json`. A trailing separator counts as an empty last
/// component, so `data/sample/` yields `data/cali_out.json` as well. A missing
/// ancestor means the current directory.
pub fn default_output_path(image_dir: &Path) -> PathBuf {
    let trailing_separator = image_dir
        .as_os_str()
        .as_encoded_bytes()
        .last()
        .is_some_and(|b| std::path::is_separator(*b as char));
    let head = if trailing_separator {
        Some(image_dir.components().as_path())
    } else {
        image_dir.parent()
    };
    let base = head
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(RESULT_FILE_NAME)
}
