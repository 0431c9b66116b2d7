use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::result::CalibrationResult;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Writes a plain-text summary of a calibration next to the result file.
pub fn write_report(output_path: &Path, result: &CalibrationResult) -> Result<()> {
    let k = &result.camera_matrix;
    let mut s = String::new();
    s += format!("created: {}\n", result.created_at).as_str();
    s += format!(
        "image size: {} x {}\n\n",
        result.image_size.0, result.image_size.1
    )
    .as_str();
    s += format!("fx {:.4} fy {:.4} cx {:.4} cy {:.4}\n", k[0][0], k[1][1], k[0][2], k[1][2]).as_str();
    s += format!("dist (k1 k2 p1 p2 k3): {:?}\n\n", result.dist_coeffs).as_str();
    s += format!("mean reprojection error: {:.5} px\n", result.mean_error).as_str();
    s += format!("rms  reprojection error: {:.5} px\n\n", result.rms_error).as_str();
    for (name, idx) in result.image_index.iter_ordered() {
        s += format!(
            "view {:>3} {}: {:.5} px\n",
            idx,
            name,
            result.per_view_errors.get(idx).copied().unwrap_or(f64::NAN)
        )
        .as_str();
    }
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(s.as_bytes())?;
    Ok(())
}
