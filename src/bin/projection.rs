use std::path::PathBuf;

use chessboard_calib::data_loader::image_key;
use chessboard_calib::error::CalibError;
use chessboard_calib::projection::{
    MARKER_COLOR, MARKER_RADIUS, MARKER_THICKNESS, Projector, draw_marker, run_projection_loop,
};
use chessboard_calib::result::CalibrationResult;
use chessboard_calib::visualization::log_image;
use clap::Parser;
use env_logger::Env;
use image::DynamicImage;
use rerun::TimeCell;

#[derive(Parser)]
#[command(version, about, author)]
struct CbProjectCli {
    /// image path
    #[arg(short = 'p', long)]
    image_path: PathBuf,

    /// calibration result path
    #[arg(short = 'n', long)]
    result_path: PathBuf,

    /// show the marked image in rerun instead of writing it
    #[arg(short, long)]
    show: bool,

    /// where the marked image is written
    #[arg(long, default_value = "output.jpg")]
    output: PathBuf,

    /// marker radius in pixels
    #[arg(long, default_value_t = MARKER_RADIUS)]
    radius: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = CbProjectCli::parse();

    if !cli.image_path.exists() {
        return Err(CalibError::MissingInput(cli.image_path.clone()).into());
    }
    let result = CalibrationResult::load(&cli.result_path)?;
    for (name, idx) in result.image_index.iter_ordered() {
        println!("{}: {}", name, idx);
    }
    let img_name = image_key(&cli.image_path, false);
    println!("{}", img_name);
    let projector = Projector::new(&result, &img_name)?;
    let base_img = image::open(&cli.image_path)?.to_rgb8();

    let recording_option = if cli.show {
        Some(rerun::RecordingStreamBuilder::new("cbproject").spawn()?)
    } else {
        None
    };

    let mut iteration = 0i64;
    let count = run_projection_loop(std::io::stdin().lock(), &projector, |_, center| {
        println!("({}, {})", center.0, center.1);
        let mut img = base_img.clone();
        draw_marker(&mut img, center, cli.radius, MARKER_COLOR, MARKER_THICKNESS);
        match &recording_option {
            Some(recording) => {
                recording.set_time("stable", TimeCell::from_sequence(iteration));
                log_image(recording, "projection", &DynamicImage::ImageRgb8(img));
            }
            None => img.save(&cli.output)?,
        }
        iteration += 1;
        Ok(())
    })?;
    log::info!("projected {} points into {}", count, img_name);
    Ok(())
}
