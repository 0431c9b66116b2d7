use nalgebra as na;

/// Board-to-camera pose as a Rodrigues rotation vector and a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RvecTvec {
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
}

impl RvecTvec {
    pub fn new(rvec: &[f64], tvec: &[f64]) -> RvecTvec {
        RvecTvec {
            rvec: [rvec[0], rvec[1], rvec[2]],
            tvec: [tvec[0], tvec[1], tvec[2]],
        }
    }
    pub fn na_rvec(&self) -> na::Vector3<f64> {
        na::Vector3::from_column_slice(&self.rvec)
    }
    pub fn na_tvec(&self) -> na::Vector3<f64> {
        na::Vector3::from_column_slice(&self.tvec)
    }
    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.na_tvec(), self.na_rvec())
    }
    pub fn to_dvecs(&self) -> (na::DVector<f64>, na::DVector<f64>) {
        (
            na::DVector::from_column_slice(&self.rvec),
            na::DVector::from_column_slice(&self.tvec),
        )
    }
}

pub trait ToRvecTvec {
    fn to_rvec_tvec(&self) -> RvecTvec;
}

impl ToRvecTvec for na::Isometry3<f64> {
    fn to_rvec_tvec(&self) -> RvecTvec {
        let rvec = self.rotation.scaled_axis();
        let tvec = self.translation.vector;
        RvecTvec::new(rvec.as_slice(), tvec.as_slice())
    }
}
