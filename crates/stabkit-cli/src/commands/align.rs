use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use stabkit_core::io::{list_sequence, load_frame, save_image};
use stabkit_core::{MotionTracker, RingBuffer, TrackOutcome, WarpContext, WarpField};
use tracing::{debug, info};

use super::{load_tracker_config, progress_bar};

#[derive(Args)]
pub struct AlignArgs {
    /// Directory holding the image sequence
    pub input: PathBuf,

    /// Output directory for the stabilized frames
    #[arg(short, long, default_value = "aligned")]
    pub output: PathBuf,

    /// Tracker config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Track global motion only (2x2 field)
    #[arg(long)]
    pub global: bool,

    /// Smoothing radius in frames (0 disables correction)
    #[arg(long, default_value = "15")]
    pub radius: usize,

    /// Overlay the correction field on each output frame
    #[arg(long)]
    pub draw: bool,
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let config = load_tracker_config(args.config.as_deref(), args.global)?;
    let paths = list_sequence(&args.input)
        .with_context(|| format!("Failed to list frames in {}", args.input.display()))?;
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    // First pass: accumulate the camera path.
    let mut tracker = MotionTracker::new(config);
    let mut trajectory = WarpField::new(tracker.motion_resolution());
    let mut path = RingBuffer::new(paths.len());
    let mut lost = 0usize;

    let pb = progress_bar(paths.len(), "Tracking")?;
    for (index, frame_path) in paths.iter().enumerate() {
        let mut frame = load_frame(frame_path)
            .with_context(|| format!("Failed to load {}", frame_path.display()))?;
        frame.metadata.frame_index = index;

        match tracker.track(&frame) {
            TrackOutcome::Motion(mut field) => {
                field.resize(trajectory.size());
                trajectory -= &field;
            }
            TrackOutcome::Lost(reason) => {
                if index > 0 {
                    lost += 1;
                }
                debug!(index, %reason, "holding trajectory");
            }
        }
        path.push(trajectory.clone());
        pb.set_position(index as u64 + 1);
    }
    pb.finish_and_clear();

    let smoothed = smooth_path(&path, args.radius);

    // Second pass: warp each frame onto the smoothed path.
    let mut ctx = WarpContext::new();
    let pb = progress_bar(paths.len(), "Warping")?;
    for (index, frame_path) in paths.iter().enumerate() {
        let mut frame = load_frame(frame_path)
            .with_context(|| format!("Failed to load {}", frame_path.display()))?;
        frame.metadata.frame_index = index;

        let correction = &path[index] - &smoothed[index];
        let mut warped = correction.warp_frame(&frame, &mut ctx);
        if args.draw {
            correction.draw(&mut warped, 1.0, 1);
        }

        let name = frame_path
            .file_name()
            .with_context(|| format!("No file name in {}", frame_path.display()))?;
        let out_path = args.output.join(name);
        save_image(&warped, &out_path)
            .with_context(|| format!("Failed to save {}", out_path.display()))?;
        pb.set_position(index as u64 + 1);
    }
    pb.finish_and_clear();

    let ok = Style::new().green();
    println!(
        "{} {} frames to {} ({} untracked)",
        ok.apply_to("Aligned"),
        paths.len(),
        args.output.display(),
        lost
    );
    Ok(())
}

/// Box-filtered camera path. The window is clipped at both ends of the
/// sequence and each result is divided by the number of frames it covered.
fn smooth_path(path: &RingBuffer<WarpField>, radius: usize) -> RingBuffer<WarpField> {
    let radius = radius.min(path.len().saturating_sub(1) / 2);
    if radius == 0 {
        return path.clone();
    }
    info!(radius, frames = path.len(), "smoothing camera path");

    let width = 2 * radius + 1;
    let mut kernel = RingBuffer::new(width);
    kernel.extend(std::iter::repeat(1.0f32).take(width));

    let mut ones = RingBuffer::new(path.len());
    ones.extend(std::iter::repeat(1.0f32).take(path.len()));
    let coverage = ones.convolve(&kernel);

    let mut smoothed = path.convolve(&kernel);
    for (field, &count) in smoothed.iter_mut().zip(coverage.iter()) {
        *field /= count;
    }
    smoothed
}
