use log::{debug, warn};
use nalgebra as na;

fn hartley_normalization(pts: &[na::Point2<f64>]) -> (Vec<na::Point2<f64>>, na::Matrix3<f64>) {
    let n = pts.len() as f64;
    let centroid = pts.iter().fold(na::Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = pts.iter().map(|p| (p.coords - centroid).norm()).sum::<f64>() / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = na::Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    );
    let normalized = pts
        .iter()
        .map(|p| {
            let v = t * na::Vector3::new(p.x, p.y, 1.0);
            na::Point2::new(v[0], v[1])
        })
        .collect();
    (normalized, t)
}

/// Normalized DLT estimate of `H` with `img ~ H * board`.
///
/// `board` holds the planar (x, y) board coordinates. Returns `None` for fewer
/// than four correspondences or a degenerate configuration.
pub fn estimate_homography(
    board: &[na::Point2<f64>],
    img: &[na::Point2<f64>],
) -> Option<na::Matrix3<f64>> {
    if board.len() != img.len() || board.len() < 4 {
        return None;
    }
    let (b, tb) = hartley_normalization(board);
    let (i, ti) = hartley_normalization(img);

    // pad to at least 9 rows so V^T is square and carries the null vector
    let rows = (2 * board.len()).max(9);
    let mut a = na::DMatrix::<f64>::zeros(rows, 9);
    for k in 0..board.len() {
        let (x, y) = (b[k].x, b[k].y);
        let (u, v) = (i[k].x, i[k].y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|l, r| l.1.total_cmp(r.1))?;
    let h = vt.row(min_idx);
    let hn = na::Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    let h_den = ti.try_inverse()? * hn * tb;
    let s = h_den[(2, 2)];
    if s.abs() < 1e-12 {
        debug!("homography with vanishing h22");
        return None;
    }
    Some(h_den / s)
}

/// Focal lengths from a set of board homographies, principal point fixed at `cxcy`.
///
/// Every homography contributes two orthogonality constraints, one between its
/// first two columns and one between their sum and difference. The stacked
/// system is solved for `1/fx^2` and `1/fy^2`.
pub fn homographies_to_focal(
    homographies: &[na::Matrix3<f64>],
    cxcy: (f64, f64),
) -> Option<(f64, f64)> {
    if homographies.is_empty() {
        return None;
    }
    let shift = na::Matrix3::new(1.0, 0.0, -cxcy.0, 0.0, 1.0, -cxcy.1, 0.0, 0.0, 1.0);
    let mut a = na::DMatrix::<f64>::zeros(homographies.len() * 2, 2);
    let mut b = na::DVector::<f64>::zeros(homographies.len() * 2);
    for (idx, h) in homographies.iter().enumerate() {
        let h = shift * h;
        let c0 = h.column(0).into_owned();
        let c1 = h.column(1).into_owned();
        let h1 = c0.normalize();
        let h2 = c1.normalize();
        let d1 = ((c0 + c1) * 0.5).normalize();
        let d2 = ((c0 - c1) * 0.5).normalize();

        let rows = [
            (h1[0] * h2[0], h1[1] * h2[1], -h1[2] * h2[2]),
            (d1[0] * d2[0], d1[1] * d2[1], -d1[2] * d2[2]),
        ];
        for (k, (a0, a1, rhs)) in rows.into_iter().enumerate() {
            let norm = (a0 * a0 + a1 * a1).sqrt().max(1e-12);
            a[(idx * 2 + k, 0)] = a0 / norm;
            a[(idx * 2 + k, 1)] = a1 / norm;
            b[idx * 2 + k] = rhs / norm;
        }
    }
    let x = a.svd(true, true).solve(&b, 1e-12).ok()?;
    let fx = (1.0 / x[0].abs()).sqrt();
    let fy = (1.0 / x[1].abs()).sqrt();
    if fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0 {
        Some((fx, fy))
    } else {
        warn!("focal initialization is degenerate: {:?}", x.as_slice());
        None
    }
}

/// Board pose from a homography and known intrinsics.
///
/// Returns the rotation (as an orthonormalized matrix) and translation of the
/// board frame in the camera frame.
pub fn homography_to_pose(
    h_mat: &na::Matrix3<f64>,
    camera_matrix: &na::Matrix3<f64>,
) -> Option<(na::Rotation3<f64>, na::Vector3<f64>)> {
    let k_inv = camera_matrix.try_inverse()?;
    let m = k_inv * h_mat;
    let scale = m.column(0).norm();
    if scale < 1e-12 {
        return None;
    }
    let mut r1 = m.column(0) / scale;
    let mut r2 = m.column(1) / scale;
    let mut t = m.column(2) / scale;
    if t[2] < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    let approx = na::Matrix3::from_columns(&[r1, r2, r3]);
    let svd = approx.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let mut rot = u * v_t;
    if rot.determinant() < 0.0 {
        rot = u * na::Matrix3::from_diagonal(&na::Vector3::new(1.0, 1.0, -1.0)) * v_t;
    }
    Some((na::Rotation3::from_matrix_unchecked(rot), t))
}
