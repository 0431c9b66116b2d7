use log::debug;
use nalgebra as na;
use sqpnp_simple::sqpnp_solve_glam;

use super::homography::{estimate_homography, homography_to_pose};
use crate::types::RvecTvec;

/// Initial board pose for one frame, ignoring lens distortion.
///
/// Uses SQPnP on normalized image coordinates and falls back to decomposing the
/// board homography when SQPnP does not return a solution.
pub fn init_pose(
    p3ds: &[glam::Vec3],
    p2ds: &[glam::Vec2],
    camera_matrix: &na::Matrix3<f64>,
) -> Option<RvecTvec> {
    let fx = camera_matrix[(0, 0)];
    let fy = camera_matrix[(1, 1)];
    let cx = camera_matrix[(0, 2)];
    let cy = camera_matrix[(1, 2)];
    if p3ds.len() != p2ds.len() || p3ds.len() < 4 {
        return None;
    }
    let p2ds_z: Vec<_> = p2ds
        .iter()
        .map(|p| {
            glam::Vec2::new(
                ((p.x as f64 - cx) / fx) as f32,
                ((p.y as f64 - cy) / fy) as f32,
            )
        })
        .collect();

    if let Some((rvec, tvec)) = sqpnp_solve_glam(p3ds, &p2ds_z) {
        let pose = RvecTvec::new(&[rvec.0, rvec.1, rvec.2], &[tvec.0, tvec.1, tvec.2]);
        if pose.tvec[2] > 0.0 && pose.rvec.iter().chain(&pose.tvec).all(|v| v.is_finite()) {
            return Some(pose);
        }
    }
    debug!("sqpnp found no pose, decomposing the homography");

    let board: Vec<_> = p3ds
        .iter()
        .map(|p| na::Point2::new(p.x as f64, p.y as f64))
        .collect();
    let img: Vec<_> = p2ds
        .iter()
        .map(|p| na::Point2::new(p.x as f64, p.y as f64))
        .collect();
    let h_mat = estimate_homography(&board, &img)?;
    let (rot, t) = homography_to_pose(&h_mat, camera_matrix)?;
    let rvec = rot.scaled_axis();
    Some(RvecTvec::new(rvec.as_slice(), t.as_slice()))
}
