use chessboard_calib::camera_model::{CameraModel, OpenCVModel5};
use chessboard_calib::optimization::factors::ReprojectionFactor;
use chessboard_calib::optimization::{estimate_homography, homographies_to_focal};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec2;
use nalgebra as na;
use tiny_solver::factors::Factor;

fn bench_focal_from_homographies(c: &mut Criterion) {
    let k = na::Matrix3::new(800.0, 0.0, 319.5, 0.0, 780.0, 239.5, 0.0, 0.0, 1.0);
    let board: Vec<_> = (0..54)
        .map(|i| na::Point2::new((i % 9) as f64 * 30.0, (i / 9) as f64 * 30.0))
        .collect();
    let homographies: Vec<_> = (0..6)
        .map(|v| {
            let axis = na::Unit::new_normalize(na::Vector3::new(1.0, 0.5 - v as f64 * 0.2, 0.1));
            let rot = na::Rotation3::from_axis_angle(&axis, 0.3);
            let t = na::Vector3::new(-120.0, -75.0, 700.0);
            let img: Vec<_> = board
                .iter()
                .map(|b| {
                    let p = k * (rot * na::Vector3::new(b.x, b.y, 0.0) + t);
                    na::Point2::new(p.x / p.z, p.y / p.z)
                })
                .collect();
            estimate_homography(&board, &img).unwrap()
        })
        .collect();

    c.bench_function("homographies_to_focal", |b| {
        b.iter(|| homographies_to_focal(black_box(&homographies), (319.5, 239.5)))
    });
}

fn bench_projection(c: &mut Criterion) {
    let params = na::dvector![800.0, 780.0, 319.5, 239.5, -0.08, 0.02, 0.0005, -0.0003, 0.0];
    let model = OpenCVModel5::new(&params, 640, 480);
    let p3ds: Vec<_> = (0..1000)
        .map(|i| na::Vector3::new((i % 40) as f64 - 20.0, (i / 40) as f64 - 12.0, 50.0))
        .collect();

    c.bench_function("opencv5_project", |b| b.iter(|| model.project(black_box(&p3ds))));
}

fn bench_reprojection_residual(c: &mut Criterion) {
    let params = na::dvector![800.0, 780.0, 319.5, 239.5, -0.08, 0.02, 0.0005, -0.0003, 0.0];
    let p3d = glam::Vec3::new(30.0, 60.0, 0.0);
    let p2d = Vec2::new(320.0, 240.0);
    let factor = ReprojectionFactor::new(&p3d, &p2d);

    let rvec = na::dvector![0.1, -0.2, 0.05];
    let tvec = na::dvector![-100.0, -50.0, 700.0];
    let all_params = vec![params, rvec, tvec];

    c.bench_function("reprojection_residual", |b| {
        b.iter(|| {
            let r: na::DVector<f64> = factor.residual_func(black_box(&all_params));
            r
        })
    });
}

criterion_group!(
    benches,
    bench_focal_from_homographies,
    bench_projection,
    bench_reprojection_residual
);
criterion_main!(benches);
