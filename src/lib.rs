pub mod accumulator;
pub mod board;
pub mod camera_model;
pub mod data_loader;
pub mod detected_points;
pub mod detector;
pub mod error;
pub mod frames;
pub mod io;
pub mod optimization;
pub mod projection;
pub mod rename;
pub mod result;
pub mod types;
pub mod util;
pub mod visualization;

pub use error::{CalibError, Result};
