use std::path::PathBuf;

/// Whole-run failures.
///
/// Per-image detection failures are not errors; they are reported as
/// [`SkippedImage`](crate::data_loader::SkippedImage) values and the run continues.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error("no usable images: the chessboard was not detected in any input image")]
    NoUsableImages,
    #[error("image \"{0}\" is not in the calibration result")]
    ImageNotFound(String),
    #[error("image \"{0}\" was already added to the calibration")]
    DuplicateImage(String),
    #[error("view {view} has {got} image points, expected {expected}")]
    PointCountMismatch {
        view: usize,
        expected: usize,
        got: usize,
    },
    #[error("calibration solver failed: {0}")]
    SolverFailed(&'static str),
    #[error("corrupt calibration result: {0}")]
    CorruptResult(String),
    #[error("invalid point input \"{0}\": expected three numbers or \"q\"")]
    InvalidPointInput(String),
    #[error("cannot rename {from} to {to}: target exists and is not being renumbered")]
    RenameCollision { from: PathBuf, to: PathBuf },
    #[error("rename of {path} failed: {source}")]
    RenameFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported video: {0}")]
    UnsupportedVideo(String),
    #[error("{0} does not exist")]
    MissingInput(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Pattern(#[from] glob::PatternError),
    #[error("{0}")]
    Glob(#[from] glob::GlobError),
    #[error("y4m error: {0}")]
    Y4m(#[from] y4m::Error),
}

pub type Result<T> = std::result::Result<T, CalibError>;
