use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use stabkit_core::io::{list_sequence, load_frame};
use stabkit_core::{MotionTracker, TrackOutcome, WarpField};

use super::{load_tracker_config, progress_bar};

#[derive(Args)]
pub struct TrackArgs {
    /// Directory holding the image sequence
    pub input: PathBuf,

    /// Tracker config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Track global motion only (2x2 field)
    #[arg(long)]
    pub global: bool,
}

pub fn run(args: &TrackArgs) -> Result<()> {
    let config = load_tracker_config(args.config.as_deref(), args.global)?;
    let paths = list_sequence(&args.input)
        .with_context(|| format!("Failed to list frames in {}", args.input.display()))?;

    let dim = Style::new().dim();
    let lost = Style::new().yellow();

    let mut tracker = MotionTracker::new(config);
    let pb = progress_bar(paths.len(), "Tracking")?;
    let mut tracked = 0usize;
    let mut losses = BTreeMap::new();
    let mut stability_sum = 0.0f32;

    pb.println(format!(
        "{:>6}  {:>9}  {:>10}  {:>9}  {:>9}",
        "Frame", "Stability", "Uniformity", "dx", "dy"
    ));
    for (index, path) in paths.iter().enumerate() {
        let mut frame =
            load_frame(path).with_context(|| format!("Failed to load {}", path.display()))?;
        frame.metadata.frame_index = index;

        match tracker.track(&frame) {
            TrackOutcome::Motion(field) => {
                let (dx, dy) = mean_motion(&field);
                tracked += 1;
                stability_sum += tracker.stability();
                pb.println(format!(
                    "{:>6}  {:>9.3}  {:>10.3}  {:>9.2}  {:>9.2}",
                    index,
                    tracker.stability(),
                    tracker.uniformity(),
                    dx,
                    dy
                ));
            }
            TrackOutcome::Lost(reason) => {
                *losses.entry(reason.to_string()).or_insert(0usize) += 1;
                pb.println(format!("{:>6}  {}", index, lost.apply_to(reason)));
            }
        }
        pb.set_position(index as u64 + 1);
    }
    pb.finish_and_clear();

    println!();
    println!(
        "Tracked {} of {} frames at {} (motion field {})",
        tracked,
        paths.len(),
        tracker.tracking_resolution(),
        tracker.motion_resolution()
    );
    if tracked > 0 {
        println!("Mean stability: {:.3}", stability_sum / tracked as f32);
    }
    for (reason, count) in &losses {
        println!("  {:<22}{}", dim.apply_to(reason), count);
    }

    Ok(())
}

/// Average motion over the field's nodes, in frame pixels.
fn mean_motion(field: &WarpField) -> (f32, f32) {
    let (sx, sy) = field
        .iter()
        .fold((0.0f32, 0.0f32), |(x, y), (_, offset)| (x + offset.x, y + offset.y));
    let n = (field.cols() * field.rows()) as f32;
    // Offsets point backwards, against the motion.
    (-sx / n, -sy / n)
}
