//! scrub - remove corrupted images from a dataset directory

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use framegrab::{ui, ImageValidator};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory to scan (recursively) for corrupted images.
    images_dir: PathBuf,
    /// Report what would be removed without deleting anything.
    #[arg(long)]
    dry_run: bool,
    /// Restrict the scan to these extensions (repeatable).
    #[arg(long = "ext")]
    extensions: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let validator = if args.extensions.is_empty() {
        ImageValidator::new()
    } else {
        ImageValidator::with_extensions(args.extensions)
    };

    let result = {
        let _stage = ui::stage("Check images");
        validator.cleanup(&args.images_dir, args.dry_run)?
    };

    println!("processed: {}", result.total_processed);
    println!(
        "{}: {}",
        if args.dry_run { "would remove" } else { "removed" },
        result.corrupted_removed
    );
    println!("success rate: {:.1}%", result.success_rate());
    for path in &result.removed_files {
        println!("  {}", path.display());
    }
    Ok(())
}
