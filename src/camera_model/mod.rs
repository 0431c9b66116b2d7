pub mod generic;
pub mod opencv5;

pub use generic::{CameraModel, init_undistort_map, remap};
pub use opencv5::{OPENCV5_PARAM_NUM, OpenCVModel5};
