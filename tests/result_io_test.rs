mod common;

use std::path::{Path, PathBuf};

use chessboard_calib::accumulator::CalibrationAccumulator;
use chessboard_calib::error::CalibError;
use chessboard_calib::io::write_report;
use chessboard_calib::result::{CalibrationResult, ImageIndex, RESULT_FILE_NAME, default_output_path};
use chessboard_calib::util::calibrate;

fn calibrated() -> CalibrationResult {
    let (_, frames) = common::synthetic_frames(5, 13);
    let mut accumulator = CalibrationAccumulator::new();
    for f in &frames {
        accumulator.push(f).unwrap();
    }
    calibrate(&accumulator, &common::board_config()).unwrap()
}

#[test]
fn test_result_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(RESULT_FILE_NAME);
    let result = calibrated();
    result.save(&path).unwrap();
    let loaded = CalibrationResult::load(&path).unwrap();
    assert_eq!(loaded, result);

    let (idx, pose) = loaded.pose_for_image("cb_3.bmp").unwrap();
    assert_eq!(idx, 2);
    assert_eq!(pose.rvec, result.rvecs[2]);
    assert_eq!(pose.tvec, result.tvecs[2]);
}

#[test]
fn test_missing_image_name() {
    let result = calibrated();
    let err = result.pose_for_image("cb_99.bmp").unwrap_err();
    assert!(matches!(err, CalibError::ImageNotFound(name) if name == "cb_99.bmp"));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = CalibrationResult::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CalibError::MissingInput(_)));
}

#[test]
fn test_load_rejects_inconsistent_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(RESULT_FILE_NAME);
    let result = calibrated();

    let mut short = result.clone();
    short.rvecs.pop();
    short.save(&path).unwrap();
    let err = CalibrationResult::load(&path).unwrap_err();
    assert!(matches!(err, CalibError::CorruptResult(_)));

    let mut value = serde_json::to_value(&result).unwrap();
    value["image_index"]["cb_1.bmp"] = serde_json::json!(17);
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    let err = CalibrationResult::load(&path).unwrap_err();
    assert!(matches!(err, CalibError::CorruptResult(_)));

    std::fs::write(&path, "{ not json").unwrap();
    let err = CalibrationResult::load(&path).unwrap_err();
    assert!(matches!(err, CalibError::Json(_)));
}

#[test]
fn test_image_index() {
    let mut index = ImageIndex::new();
    assert!(index.is_empty());
    assert_eq!(index.insert("b.png").unwrap(), 0);
    assert_eq!(index.insert("a.png").unwrap(), 1);
    assert!(matches!(
        index.insert("b.png"),
        Err(CalibError::DuplicateImage(_))
    ));
    assert_eq!(index.len(), 2);
    assert_eq!(index.lookup("a.png").unwrap(), 1);
    assert_eq!(index.iter_ordered(), vec![("b.png", 0), ("a.png", 1)]);
    index.validate().unwrap();

    let json = serde_json::to_string(&index).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value, serde_json::json!({"b.png": 0, "a.png": 1}));
}

#[test]
fn test_image_index_json_is_stable() {
    let mut index = ImageIndex::new();
    for name in ["cb_3.bmp", "cb_1.bmp", "cb_2.bmp"] {
        index.insert(name).unwrap();
    }
    let json = serde_json::to_string(&index).unwrap();
    assert_eq!(json, r#"{"cb_1.bmp":1,"cb_2.bmp":2,"cb_3.bmp":0}"#);

    let mut again = ImageIndex::new();
    for name in ["cb_3.bmp", "cb_1.bmp", "cb_2.bmp"] {
        again.insert(name).unwrap();
    }
    assert_eq!(serde_json::to_string(&again).unwrap(), json);
    assert_eq!(
        index.iter_ordered(),
        vec![("cb_3.bmp", 0), ("cb_1.bmp", 1), ("cb_2.bmp", 2)]
    );
}

#[test]
fn test_default_output_path() {
    assert_eq!(
        default_output_path(Path::new("data/run1/images")),
        PathBuf::from("data/cali_out.json")
    );
    assert_eq!(
        default_output_path(Path::new("data/sample")),
        PathBuf::from("./cali_out.json")
    );
    assert_eq!(
        default_output_path(Path::new("sample")),
        PathBuf::from("./cali_out.json")
    );
    assert_eq!(
        default_output_path(Path::new("data/sample/")),
        PathBuf::from("data/cali_out.json")
    );
    assert_eq!(
        default_output_path(Path::new("sample/")),
        PathBuf::from("./cali_out.json")
    );
}

#[test]
fn test_write_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cali_out.txt");
    let result = calibrated();
    write_report(&path, &result).unwrap();
    let report = std::fs::read_to_string(&path).unwrap();
    assert!(report.contains("mean reprojection error"));
    assert!(report.contains("cb_1.bmp"));
    assert!(report.contains("cb_5.bmp"));
}
