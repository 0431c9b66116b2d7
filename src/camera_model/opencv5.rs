use super::generic::CameraModel;
use nalgebra as na;

/// Pinhole camera with the five-coefficient OpenCV radial-tangential distortion.
///
/// Parameter vector layout: `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCVModel5<T: na::RealField + Clone> {
    pub fx: T,
    pub fy: T,
    pub cx: T,
    pub cy: T,
    pub k1: T,
    pub k2: T,
    pub p1: T,
    pub p2: T,
    pub k3: T,
    pub width: u32,
    pub height: u32,
}

pub const OPENCV5_PARAM_NUM: usize = 9;

impl<T: na::RealField + Clone> OpenCVModel5<T> {
    pub fn new(params: &na::DVector<T>, width: u32, height: u32) -> OpenCVModel5<T> {
        OpenCVModel5 {
            fx: params[0].clone(),
            fy: params[1].clone(),
            cx: params[2].clone(),
            cy: params[3].clone(),
            k1: params[4].clone(),
            k2: params[5].clone(),
            p1: params[6].clone(),
            p2: params[7].clone(),
            k3: params[8].clone(),
            width,
            height,
        }
    }

    /// Projects a point already expressed in the camera frame.
    pub fn project_one_impl(params: &na::DVector<T>, pt: &na::Vector3<T>) -> na::Vector2<T> {
        let fx = &params[0];
        let fy = &params[1];
        let cx = &params[2];
        let cy = &params[3];
        let k1 = &params[4];
        let k2 = &params[5];
        let p1 = &params[6];
        let p2 = &params[7];
        let k3 = &params[8];
        let one = T::from_f64(1.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        let xn = pt[0].clone() / pt[2].clone();
        let yn = pt[1].clone() / pt[2].clone();
        let x2 = xn.clone() * xn.clone();
        let y2 = yn.clone() * yn.clone();
        let xy = xn.clone() * yn.clone();
        let r2 = x2.clone() + y2.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();

        let radial = one + k1.clone() * r2.clone() + k2.clone() * r4 + k3.clone() * r6;
        let xd = xn * radial.clone()
            + two.clone() * p1.clone() * xy.clone()
            + p2.clone() * (r2.clone() + two.clone() * x2);
        let yd = yn * radial
            + p1.clone() * (r2 + two.clone() * y2)
            + two * p2.clone() * xy;

        na::Vector2::new(fx.clone() * xd + cx.clone(), fy.clone() * yd + cy.clone())
    }
}

impl OpenCVModel5<f64> {
    pub fn from_camera_matrix(
        camera_matrix: &[[f64; 3]; 3],
        dist_coeffs: &[f64; 5],
        width: u32,
        height: u32,
    ) -> OpenCVModel5<f64> {
        let params = na::dvector![
            camera_matrix[0][0],
            camera_matrix[1][1],
            camera_matrix[0][2],
            camera_matrix[1][2],
            dist_coeffs[0],
            dist_coeffs[1],
            dist_coeffs[2],
            dist_coeffs[3],
            dist_coeffs[4]
        ];
        Self::new(&params, width, height)
    }

    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    pub fn dist_coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }
}

impl CameraModel<f64> for OpenCVModel5<f64> {
    fn params(&self) -> nalgebra::DVector<f64> {
        na::dvector![
            self.fx, self.fy, self.cx, self.cy, self.k1, self.k2, self.p1, self.p2, self.k3
        ]
    }
    fn project_one(&self, pt: &nalgebra::Vector3<f64>) -> nalgebra::Vector2<f64> {
        Self::project_one_impl(&self.params(), pt)
    }

    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }
}
