use crate::camera_model::OpenCVModel5;
use nalgebra as na;
use tiny_solver::factors::Factor;

/// Pixel residual of one board corner.
///
/// Parameter blocks: `[camera params (9), rvec (3), tvec (3)]`.
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    pub p3d: na::Point3<f64>,
    pub p2d: na::Vector2<f64>,
}

impl ReprojectionFactor {
    pub fn new(p3d: &glam::Vec3, p2d: &glam::Vec2) -> ReprojectionFactor {
        let p3d = na::Point3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64);
        let p2d = na::Vector2::new(p2d.x as f64, p2d.y as f64);
        ReprojectionFactor { p3d, p2d }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        // params[params, rvec, tvec]
        let rvec = na::Vector3::new(
            params[1][0].clone(),
            params[1][1].clone(),
            params[1][2].clone(),
        );
        let tvec = na::Vector3::new(
            params[2][0].clone(),
            params[2][1].clone(),
            params[2][2].clone(),
        );
        let transform = na::Isometry3::new(tvec, rvec);
        let p3d: na::Point3<T> = self.p3d.cast();
        let p3d_t = transform * p3d;
        let p2d_p = OpenCVModel5::project_one_impl(&params[0], &p3d_t.coords);

        na::dvector![
            p2d_p[0].clone() - T::from_f64(self.p2d[0]).unwrap(),
            p2d_p[1].clone() - T::from_f64(self.p2d[1]).unwrap()
        ]
    }
}
