use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub p2d: glam::Vec2,
    pub p3d: glam::Vec3,
}

/// All chessboard corners found in one image, in board order.
#[derive(Debug, Clone)]
pub struct FrameFeature {
    /// Key used in the filename-to-index mapping.
    pub name: String,
    pub path: PathBuf,
    pub img_w_h: (u32, u32),
    pub features: Vec<FeaturePoint>,
}
