use std::path::PathBuf;

use chessboard_calib::rename::plan_renames;
use clap::Parser;
use env_logger::Env;

#[derive(Parser)]
#[command(version, about, author)]
struct CbRenameCli {
    /// frame folder
    #[arg(short, long)]
    path: PathBuf,

    /// extension of the frames to renumber, matched case-insensitively
    #[arg(long, default_value = "bmp")]
    ext: String,

    /// prefix of the new names
    #[arg(long, default_value = "cb_")]
    prefix: String,

    /// print the renames without performing them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = CbRenameCli::parse();

    let plan = plan_renames(&cli.path, &cli.ext, &cli.prefix)?;
    if plan.is_empty() {
        log::warn!("no *.{} files in {}", cli.ext, cli.path.display());
        return Ok(());
    }
    if cli.dry_run {
        for (source, target) in &plan.moves {
            println!("{} -> {}", source.display(), target.display());
        }
        return Ok(());
    }
    let renamed = plan.apply()?;
    println!(
        "{} files numbered {}1 .. {}{}, {} renamed",
        plan.len(),
        cli.prefix,
        cli.prefix,
        plan.len(),
        renamed
    );
    Ok(())
}
