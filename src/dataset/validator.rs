//! Corrupted-image cleanup.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File extensions recognized as images, lowercase, without the leading dot.
const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Result of one cleanup pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupResult {
    pub total_processed: usize,
    pub corrupted_removed: usize,
    pub removed_files: Vec<PathBuf>,
}

impl CleanupResult {
    /// Percentage of processed files that passed the integrity check.
    /// 0.0 when nothing was processed.
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        (self.total_processed - self.corrupted_removed) as f64 / self.total_processed as f64
            * 100.0
    }
}

/// Scans directories for image files and removes the ones that fail to decode.
pub struct ImageValidator {
    extensions: BTreeSet<String>,
}

impl ImageValidator {
    pub fn new() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()))
    }

    /// Restrict the scan to the given extensions. Leading dots and case are
    /// normalized away.
    pub fn with_extensions(extensions: impl IntoIterator<Item = String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    /// Integrity check: the file decodes as an image.
    pub fn is_valid_image(&self, path: &Path) -> bool {
        image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(anyhow::Error::from)
            .and_then(|reader| reader.decode().map_err(anyhow::Error::from))
            .is_ok()
    }

    /// All files under `dir` (recursively) with a recognized extension,
    /// sorted by path.
    pub fn find_image_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.walk(dir, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)
            .map_err(|e| anyhow!("failed to read directory {}: {}", dir.display(), e))?
        {
            let path = entry?.path();
            if path.is_dir() {
                self.walk(&path, out)?;
            } else if self.has_recognized_extension(&path) {
                out.push(path);
            }
        }
        Ok(())
    }

    pub(crate) fn has_recognized_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    /// Remove corrupted images under `dir`.
    ///
    /// With `dry_run` the result lists what would be removed but nothing is
    /// deleted. Progress is drawn to stderr.
    pub fn cleanup(&self, dir: &Path, dry_run: bool) -> Result<CleanupResult> {
        if !dir.exists() {
            return Err(anyhow!("directory not found: {}", dir.display()));
        }

        let files = self.find_image_files(dir)?;
        log::info!("checking {} image files under {}", files.len(), dir.display());

        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut removed_files = Vec::new();
        for path in &files {
            progress.inc(1);
            if self.is_valid_image(path) {
                continue;
            }
            if !dry_run {
                std::fs::remove_file(path)
                    .map_err(|e| anyhow!("failed to remove {}: {}", path.display(), e))?;
            }
            log::info!(
                "{}: {}",
                if dry_run { "would remove" } else { "removed" },
                path.display()
            );
            removed_files.push(path.clone());
        }
        progress.finish_and_clear();

        Ok(CleanupResult {
            total_processed: files.len(),
            corrupted_removed: removed_files.len(),
            removed_files,
        })
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new()
    }
}
