//! dedupe - find and remove visually similar images in a dataset directory

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use framegrab::{ui, Deduplicator};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory of images to deduplicate.
    images_dir: PathBuf,
    /// Directory of paired label files to remove alongside images.
    #[arg(long)]
    labels_dir: Option<PathBuf>,
    /// Minimum similarity in [0, 1] for two images to count as duplicates.
    #[arg(long, default_value_t = 0.9)]
    threshold: f64,
    /// Report what would be removed without deleting anything.
    #[arg(long)]
    dry_run: bool,
    /// Only print the duplicate map, do not delete anything.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut dedup = Deduplicator::new();

    if args.list {
        let map = {
            let _stage = ui::stage("Score images");
            dedup.find_duplicates(&args.images_dir, args.threshold)?
        };
        for (file, duplicates) in map {
            if !duplicates.is_empty() {
                println!("{file}: {}", duplicates.join(", "));
            }
        }
        return Ok(());
    }

    let removed = {
        let _stage = ui::stage("Remove duplicates");
        dedup.delete_duplicates(
            &args.images_dir,
            args.labels_dir.as_deref(),
            args.threshold,
            args.dry_run,
        )?
    };

    println!(
        "{}: {}",
        if args.dry_run { "would remove" } else { "removed" },
        removed.len()
    );
    for path in &removed {
        println!("  {}", path.display());
    }
    Ok(())
}
