use std::io::Cursor;

use glam::Vec2;
use image::DynamicImage;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

/// Logs `img` as an encoded image under `{topic}/image`.
///
/// Grayscale stays grayscale, anything else is sent as RGB.
pub fn log_image_as_compressed(
    recording: &RecordingStream,
    topic: &str,
    img: &DynamicImage,
    format: image::ImageFormat,
) {
    let mut bytes: Vec<u8> = Vec::new();
    let encoded = match img {
        DynamicImage::ImageLuma8(gray) => gray.write_to(&mut Cursor::new(&mut bytes), format),
        other => other
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut bytes), format),
    };
    if let Err(e) = encoded {
        log::warn!("cannot encode {}: {}", topic, e);
        return;
    }
    let image = rerun::EncodedImage::from_file_contents(bytes);
    if let Err(e) = recording.log(format!("{}/image", topic), &image) {
        log::warn!("cannot log {}: {}", topic, e);
    }
}

pub fn log_image(recording: &RecordingStream, topic: &str, img: &DynamicImage) {
    log_image_as_compressed(recording, topic, img, image::ImageFormat::Png);
}

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

/// Detected corners in board order, colored along a rainbow from first to last.
pub fn log_corners(recording: &RecordingStream, topic: &str, corners: &[Vec2]) {
    let last = corners.len().max(2) - 1;
    let (pts, (colors, labels)): (Vec<_>, (Vec<_>, Vec<_>)) = corners
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let c = colorous::TURBO.eval_continuous(i as f64 / last as f64);
            ((p.x, p.y), ((c.r, c.g, c.b, 255), format!("{}", i)))
        })
        .unzip();
    let pts = rerun_shift(&pts);
    if let Err(e) = recording.log(
        format!("{}/pts", topic),
        &rerun::Points2D::new(pts)
            .with_colors(colors)
            .with_labels(labels)
            .with_radii([rerun::Radius::new_ui_points(3.0)]),
    ) {
        log::warn!("cannot log corners of {}: {}", topic, e);
    }
}

/// Reprojected board points of one view, one color per view.
pub fn log_reprojection(recording: &RecordingStream, topic: &str, view: usize, p2ds: &[(f32, f32)]) {
    let color = id_to_color(view);
    let pts = rerun_shift(p2ds);
    if let Err(e) = recording.log(
        format!("{}/reprojected", topic),
        &rerun::Points2D::new(pts)
            .with_colors([color])
            .with_radii([rerun::Radius::new_ui_points(2.0)]),
    ) {
        log::warn!("cannot log reprojection of {}: {}", topic, e);
    }
}
