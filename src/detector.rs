use calib_targets::chessboard::DetectorParams;
use calib_targets::detect::detect_chessboard;
use glam::Vec2;
use image::GrayImage;

use crate::board::Board;

/// Finds every inner corner of `board` in a grayscale image.
///
/// Implementations return `None` unless the complete grid was found. On
/// success the corners are in board order, i.e. entry `board.corner_index(r, c)`
/// is the corner at grid position `(r, c)`.
pub trait CornerDetector {
    fn detect(&self, img: &GrayImage, board: &Board) -> Option<Vec<Vec2>>;
}

/// ChESS corners assembled into a grid by `calib-targets`.
///
/// The detector only labels the grid it finds; the expected board size is
/// enforced afterwards by [`order_grid_corners`].
#[derive(Debug, Default, Clone)]
pub struct ChessboardCornerDetector {
    pub params: DetectorParams,
}

impl ChessboardCornerDetector {
    pub fn new() -> ChessboardCornerDetector {
        ChessboardCornerDetector::default()
    }
}

impl CornerDetector for ChessboardCornerDetector {
    fn detect(&self, img: &GrayImage, board: &Board) -> Option<Vec<Vec2>> {
        let result = detect_chessboard(img, &self.params)?;
        let grid_corners: Vec<(i32, i32, Vec2)> = result
            .target
            .corners
            .iter()
            .filter_map(|c| {
                c.grid
                    .as_ref()
                    .map(|g| (g.i, g.j, Vec2::new(c.position.x, c.position.y)))
            })
            .collect();
        order_grid_corners(&grid_corners, board)
    }
}

/// Puts `(i, j, pixel)` grid-labelled corners into board order.
///
/// The grid labels may start anywhere and may have the two axes swapped relative
/// to `board`; a grid with missing or repeated corners gives `None`.
pub fn order_grid_corners(grid_corners: &[(i32, i32, Vec2)], board: &Board) -> Option<Vec<Vec2>> {
    if grid_corners.len() != board.corner_count() {
        return None;
    }
    let min_i = grid_corners.iter().map(|c| c.0).min()?;
    let min_j = grid_corners.iter().map(|c| c.1).min()?;
    let max_i = grid_corners.iter().map(|c| c.0).max()?;
    let max_j = grid_corners.iter().map(|c| c.1).max()?;
    let extent = ((max_i - min_i + 1) as usize, (max_j - min_j + 1) as usize);
    let swap = if extent == (board.rows, board.cols) {
        false
    } else if extent == (board.cols, board.rows) {
        true
    } else {
        log::debug!("grid extent {:?} does not fit the board", extent);
        return None;
    };

    let mut ordered: Vec<Option<Vec2>> = vec![None; board.corner_count()];
    for &(i, j, p) in grid_corners {
        let (i, j) = ((i - min_i) as usize, (j - min_j) as usize);
        let (r, c) = if swap { (j, i) } else { (i, j) };
        let slot = &mut ordered[board.corner_index(r, c)];
        if slot.is_some() {
            return None;
        }
        *slot = Some(p);
    }
    ordered.into_iter().collect()
}
