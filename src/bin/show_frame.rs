use std::io::BufRead;
use std::path::PathBuf;

use chessboard_calib::frames::{FrameSource, FrameStepper, open_source, overlay_lines, scale_frame};
use chessboard_calib::visualization::log_image;
use clap::Parser;
use env_logger::Env;
use rerun::TimeCell;

#[derive(Parser)]
#[command(version, about, author)]
struct CbFrameCli {
    /// video path, or a folder of frames
    #[arg(short, long)]
    path: PathBuf,

    /// #skip frame
    #[arg(short, long, default_value_t = 0)]
    skip: usize,

    /// display scale
    #[arg(long, default_value_t = 0.6)]
    scale: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = CbFrameCli::parse();

    let source = open_source(&cli.path)?;
    let (width, height, fps) = (source.width(), source.height(), source.fps());
    match source.frame_count() {
        Some(n) => println!("Frame count: {}", n),
        None => println!("Frame count: unknown"),
    }
    println!("Resolution: {} x {}", width, height);
    match fps {
        Some(f) => println!("FPS: {}", f),
        None => println!("FPS: unknown"),
    }

    let recording = rerun::RecordingStreamBuilder::new("cbframe").spawn()?;
    let mut stepper = FrameStepper::new(source, cli.skip);
    let mut stdin = std::io::stdin().lock();
    let mut line = String::new();
    loop {
        let Some(frame) = stepper.next_frame()? else {
            println!("Can't receive frame (stream end?). Exiting...");
            break;
        };
        let lines = overlay_lines(width, height, fps, frame.frame_no);
        recording.set_time("stable", TimeCell::from_sequence(frame.frame_no as i64));
        log_image(&recording, "frame", &scale_frame(&frame.image, cli.scale));
        recording.log("frame/overlay", &rerun::TextDocument::new(lines.join("\n")))?;
        println!("{}", lines[2]);

        line.clear();
        if stdin.read_line(&mut line)? == 0 || line.trim() == "q" {
            break;
        }
    }
    Ok(())
}
