use image::DynamicImage;
use nalgebra as na;

/// Nearest-neighbour lookup of `src` through per-pixel source coordinates.
///
/// Pixels whose source coordinate is NaN or outside `src` are black.
pub fn remap(src: &DynamicImage, map0: &na::DMatrix<f32>, map1: &na::DMatrix<f32>) -> DynamicImage {
    let (r, c) = map0.shape();
    let lookup = |x: u32, y: u32| -> Option<(u32, u32)> {
        let (x_cor, y_cor) = (map0[(y as usize, x as usize)], map1[(y as usize, x as usize)]);
        if x_cor.is_nan() || y_cor.is_nan() || x_cor < 0.0 || y_cor < 0.0 {
            return None;
        }
        let x_cor = x_cor.round() as u32;
        let y_cor = y_cor.round() as u32;
        if x_cor >= src.width() || y_cor >= src.height() {
            None
        } else {
            Some((x_cor, y_cor))
        }
    };
    match src {
        DynamicImage::ImageLuma8(img) => {
            let out_img = image::GrayImage::from_fn(c as u32, r as u32, |x, y| {
                lookup(x, y)
                    .map(|(xs, ys)| *img.get_pixel(xs, ys))
                    .unwrap_or(image::Luma([0]))
            });
            DynamicImage::ImageLuma8(out_img)
        }
        other => {
            let rgb = other.to_rgb8();
            let out_img = image::RgbImage::from_fn(c as u32, r as u32, |x, y| {
                lookup(x, y)
                    .map(|(xs, ys)| *rgb.get_pixel(xs, ys))
                    .unwrap_or(image::Rgb([0, 0, 0]))
            });
            DynamicImage::ImageRgb8(out_img)
        }
    }
}

pub trait CameraModel<T: na::RealField + Clone> {
    fn params(&self) -> na::DVector<T>;
    fn width(&self) -> T;
    fn height(&self) -> T;
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T>;
    /// Projects camera-frame points, `None` for points outside the image.
    fn project(&self, p3d: &[na::Vector3<T>]) -> Vec<Option<na::Vector2<T>>> {
        let zero = T::from_f64(0.0).unwrap();
        p3d.iter()
            .map(|pt| {
                if pt[2] <= zero {
                    return None;
                }
                let p2d = self.project_one(pt);
                if p2d[0] < zero
                    || p2d[0] > self.width()
                    || p2d[1] < zero
                    || p2d[1] > self.height()
                {
                    None
                } else {
                    Some(p2d)
                }
            })
            .collect()
    }
}

/// Source-pixel maps that undistort into an ideal pinhole camera `projection_mat`.
///
/// `new_h_w` is the (height, width) of the output image.
pub fn init_undistort_map(
    camera_model: &dyn CameraModel<f64>,
    projection_mat: &na::Matrix3<f64>,
    new_h_w: (u32, u32),
) -> (na::DMatrix<f32>, na::DMatrix<f32>) {
    let fx = projection_mat[(0, 0)];
    let fy = projection_mat[(1, 1)];
    let cx = projection_mat[(0, 2)];
    let cy = projection_mat[(1, 2)];
    let (h, w) = (new_h_w.0 as usize, new_h_w.1 as usize);
    let mut xmap = na::DMatrix::from_element(h, w, f32::NAN);
    let mut ymap = na::DMatrix::from_element(h, w, f32::NAN);
    for y in 0..h {
        let p3ds: Vec<na::Vector3<f64>> = (0..w)
            .map(|x| na::Vector3::new((x as f64 - cx) / fx, (y as f64 - cy) / fy, 1.0))
            .collect();
        for (x, p2d) in camera_model.project(&p3ds).into_iter().enumerate() {
            if let Some(xy) = p2d {
                xmap[(y, x)] = xy[0] as f32;
                ymap[(y, x)] = xy[1] as f32;
            }
        }
    }
    (xmap, ymap)
}
