use serde::{Deserialize, Serialize};

/// Inner-corner layout of a printed chessboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Inner corners along the first pattern axis.
    pub rows: usize,
    /// Inner corners along the second pattern axis.
    pub cols: usize,
    pub square_size_mm: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 12,
            cols: 8,
            square_size_mm: 90.0,
        }
    }
}

pub struct Board {
    pub rows: usize,
    pub cols: usize,
    /// Board-frame coordinates of every inner corner, in detection order.
    pub points_3d: Vec<glam::Vec3>,
}

impl Board {
    pub fn from_config(board_config: &BoardConfig) -> Board {
        Self::init_chessboard(
            board_config.rows,
            board_config.cols,
            board_config.square_size_mm,
        )
    }

    /// Corner `c * rows + r` sits at `(r * square, c * square, 0)`.
    pub fn init_chessboard(rows: usize, cols: usize, square_size_mm: f32) -> Board {
        let mut points_3d = Vec::with_capacity(rows * cols);
        for c in 0..cols {
            for r in 0..rows {
                points_3d.push(glam::Vec3 {
                    x: r as f32 * square_size_mm,
                    y: c as f32 * square_size_mm,
                    z: 0.0,
                });
            }
        }
        Board {
            rows,
            cols,
            points_3d,
        }
    }

    pub fn corner_count(&self) -> usize {
        self.points_3d.len()
    }

    /// Index of the corner at grid position `(r, c)`.
    pub fn corner_index(&self, r: usize, c: usize) -> usize {
        c * self.rows + r
    }
}
