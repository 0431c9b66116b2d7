use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use image::{DynamicImage, GrayImage, ImageReader, Rgb, RgbImage, imageops::FilterType};

use crate::data_loader::list_images;
use crate::error::{CalibError, Result};

/// A forward-only stream of video frames.
pub trait FrameSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// `None` when the container does not say.
    fn fps(&self) -> Option<f64>;
    /// `None` when the length is not known up front.
    fn frame_count(&self) -> Option<usize>;
    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn fps(&self) -> Option<f64> {
        (**self).fps()
    }

    fn frame_count(&self) -> Option<usize> {
        (**self).frame_count()
    }

    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        (**self).next_frame()
    }
}

/// YUV4MPEG2 frames, luma only.
///
/// Anything that is not a `.y4m` file is converted on the fly by an `ffmpeg`
/// child process, which is killed when the source is dropped.
pub struct Y4mSource {
    decoder: y4m::Decoder<Box<dyn Read>>,
    ffmpeg_child: Option<Child>,
}

impl Y4mSource {
    pub fn open(path: &Path) -> Result<Y4mSource> {
        if !path.exists() {
            return Err(CalibError::MissingInput(path.to_path_buf()));
        }
        let is_y4m = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("y4m"))
            .unwrap_or(false);
        if is_y4m {
            let file = std::fs::File::open(path)?;
            return Y4mSource::from_reader(Box::new(std::io::BufReader::new(file)));
        }

        #[rustfmt::skip]
        let args = [
            "-nostdin",
            "-loglevel", "error",
            "-i", &format!("{}", path.display()),
            "-f", "yuv4mpegpipe",
            "pipe:",
        ];
        let mut ffmpeg_child = Command::new("ffmpeg")
            .args(args)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CalibError::UnsupportedVideo(format!("when spawning ffmpeg {:?}: {}", args, e))
            })?;
        let Some(ffmpeg_out) = ffmpeg_child.stdout.take() else {
            let _ = ffmpeg_child.kill();
            let _ = ffmpeg_child.wait();
            return Err(CalibError::UnsupportedVideo("ffmpeg has no stdout".to_string()));
        };
        match Y4mSource::from_reader(Box::new(ffmpeg_out)) {
            Ok(mut source) => {
                source.ffmpeg_child = Some(ffmpeg_child);
                Ok(source)
            }
            Err(e) => {
                let _ = ffmpeg_child.kill();
                let _ = ffmpeg_child.wait();
                Err(CalibError::UnsupportedVideo(format!(
                    "{} cannot be decoded: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    pub fn from_reader(reader: Box<dyn Read>) -> Result<Y4mSource> {
        let decoder = y4m::decode(reader)?;
        if decoder.get_bytes_per_sample() != 1 {
            return Err(CalibError::UnsupportedVideo(format!(
                "{}-bit samples",
                decoder.get_bit_depth()
            )));
        }
        Ok(Y4mSource {
            decoder,
            ffmpeg_child: None,
        })
    }
}

impl FrameSource for Y4mSource {
    fn width(&self) -> u32 {
        self.decoder.get_width() as u32
    }

    fn height(&self) -> u32 {
        self.decoder.get_height() as u32
    }

    fn fps(&self) -> Option<f64> {
        let rate = self.decoder.get_framerate();
        if rate.den == 0 {
            None
        } else {
            Some(rate.num as f64 / rate.den as f64)
        }
    }

    fn frame_count(&self) -> Option<usize> {
        None
    }

    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let (w, h) = (self.width(), self.height());
        let subsampling = chroma_subsampling(self.decoder.get_colorspace());
        match self.decoder.read_frame() {
            Ok(frame) => {
                let img = yuv_frame_to_image(
                    w,
                    h,
                    subsampling,
                    frame.get_y_plane(),
                    frame.get_u_plane(),
                    frame.get_v_plane(),
                )?;
                Ok(Some(img))
            }
            Err(y4m::Error::EOF) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Horizontal and vertical chroma decimation, `None` for grayscale.
fn chroma_subsampling(colorspace: y4m::Colorspace) -> Option<(u32, u32)> {
    use y4m::Colorspace::*;
    match colorspace {
        Cmono | Cmono12 => None,
        C422 | C422p10 | C422p12 => Some((2, 1)),
        C444 | C444p10 | C444p12 => Some((1, 1)),
        _ => Some((2, 2)),
    }
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// BT.601 studio-range YUV to RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    Rgb([
        clamp_u8((298 * c + 409 * e + 128) >> 8),
        clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp_u8((298 * c + 516 * d + 128) >> 8),
    ])
}

fn yuv_frame_to_image(
    w: u32,
    h: u32,
    subsampling: Option<(u32, u32)>,
    y_plane: &[u8],
    u_plane: &[u8],
    v_plane: &[u8],
) -> Result<DynamicImage> {
    let short_plane = |plane: &str, got: usize, expected: usize| {
        CalibError::UnsupportedVideo(format!(
            "frame has {} {} bytes, expected {} for {} x {}",
            got, plane, expected, w, h
        ))
    };
    let luma_len = (w * h) as usize;
    if y_plane.len() < luma_len {
        return Err(short_plane("luma", y_plane.len(), luma_len));
    }
    let Some((sx, sy)) = subsampling else {
        let img = GrayImage::from_raw(w, h, y_plane[..luma_len].to_vec())
            .ok_or_else(|| short_plane("luma", y_plane.len(), luma_len))?;
        return Ok(DynamicImage::ImageLuma8(img));
    };
    let (cw, ch) = (w.div_ceil(sx), h.div_ceil(sy));
    let chroma_len = (cw * ch) as usize;
    if u_plane.len() < chroma_len || v_plane.len() < chroma_len {
        return Err(short_plane(
            "chroma",
            u_plane.len().min(v_plane.len()),
            chroma_len,
        ));
    }
    let img = RgbImage::from_fn(w, h, |x, y| {
        let ci = ((y / sy) * cw + x / sx) as usize;
        yuv_to_rgb(y_plane[(y * w + x) as usize], u_plane[ci], v_plane[ci])
    });
    Ok(DynamicImage::ImageRgb8(img))
}

impl Drop for Y4mSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.ffmpeg_child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// A directory of still images played back in sorted order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next_idx: usize,
    img_w_h: (u32, u32),
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<ImageSequenceSource> {
        let paths = list_images(dir)?;
        let img_w_h = match paths.first() {
            Some(p) => image::image_dimensions(p)?,
            None => (0, 0),
        };
        Ok(ImageSequenceSource {
            paths,
            next_idx: 0,
            img_w_h,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn width(&self) -> u32 {
        self.img_w_h.0
    }

    fn height(&self) -> u32 {
        self.img_w_h.1
    }

    fn fps(&self) -> Option<f64> {
        None
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.paths.len())
    }

    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let Some(path) = self.paths.get(self.next_idx) else {
            return Ok(None);
        };
        self.next_idx += 1;
        Ok(Some(ImageReader::open(path)?.decode()?))
    }
}

/// Opens a directory as an image sequence and anything else as a video.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        Ok(Box::new(ImageSequenceSource::open(path)?))
    } else {
        Ok(Box::new(Y4mSource::open(path)?))
    }
}

#[derive(Debug, Clone)]
pub struct SteppedFrame {
    /// 1-based position of the frame in the stream.
    pub frame_no: usize,
    pub image: DynamicImage,
}

/// Hands out frames one at a time after dropping `skip` leading frames.
pub struct FrameStepper<S: FrameSource> {
    source: S,
    skip: usize,
    skipped: bool,
    finished: bool,
    next_no: usize,
}

impl<S: FrameSource> FrameStepper<S> {
    pub fn new(source: S, skip: usize) -> FrameStepper<S> {
        FrameStepper {
            source,
            skip,
            skipped: false,
            finished: false,
            next_no: skip + 1,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The next frame to show, or `None` once the stream is over.
    ///
    /// A stream that ends inside the skipped range simply yields no frames.
    pub fn next_frame(&mut self) -> Result<Option<SteppedFrame>> {
        if self.finished {
            return Ok(None);
        }
        if !self.skipped {
            self.skipped = true;
            for n in 0..self.skip {
                if self.source.next_frame()?.is_none() {
                    log::info!("stream ended after {} of {} skipped frames", n, self.skip);
                    self.finished = true;
                    return Ok(None);
                }
            }
        }
        let Some(image) = self.source.next_frame()? else {
            self.finished = true;
            return Ok(None);
        };
        let frame = SteppedFrame {
            frame_no: self.next_no,
            image,
        };
        self.next_no += 1;
        Ok(Some(frame))
    }
}

/// Text shown over every frame: resolution, frame rate and frame number.
pub fn overlay_lines(width: u32, height: u32, fps: Option<f64>, frame_no: usize) -> [String; 3] {
    let fps = fps.map(|f| f.to_string()).unwrap_or_else(|| "unknown".to_string());
    [
        format!("{} x {}", width, height),
        format!("FPS:{}", fps),
        format!("Frame no.: {}", frame_no),
    ]
}

/// Resizes a frame by `scale` in both directions.
pub fn scale_frame(img: &DynamicImage, scale: f64) -> DynamicImage {
    let w = ((img.width() as f64 * scale) as u32).max(1);
    let h = ((img.height() as f64 * scale) as u32).max(1);
    img.resize_exact(w, h, FilterType::Triangle)
}
