//! Visual-similarity deduplication.
//!
//! `Deduplicator` maps every image in a directory to the list of images it
//! duplicates, at a similarity threshold in [0, 1], and can delete the
//! flattened duplicate set (plus optional paired label files). The scoring
//! engine is a collaborator behind `SimilarityScorer`; the default is a
//! perceptual difference hash with an exact-content fast path, not a CNN.

use anyhow::{anyhow, Result};
use indicatif::ProgressBar;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::validator::ImageValidator;

/// Similarity score for one unordered pair of files, indices into the scored
/// file list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairScore {
    pub left: usize,
    pub right: usize,
    pub similarity: f64,
}

/// Pairwise visual-similarity scoring over a set of image files.
pub trait SimilarityScorer {
    /// Scores in [0, 1] for every unordered pair of `files`.
    fn score(&self, files: &[PathBuf]) -> Result<Vec<PairScore>>;
}

/// Default scorer: 64-bit difference hash over an 8x8 luma gradient.
///
/// Similarity is `1 - hamming/64`, with byte-identical files short-circuited
/// to 1.0 via a content digest.
pub struct DhashScorer;

struct Signature {
    dhash: u64,
    content: [u8; 32],
}

impl DhashScorer {
    pub fn new() -> Self {
        Self
    }

    fn signature(&self, path: &Path) -> Result<Signature> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))?;
        let content: [u8; 32] = Sha256::digest(&bytes).into();
        let img = image::load_from_memory(&bytes)
            .map_err(|e| anyhow!("failed to decode {}: {}", path.display(), e))?;
        let luma = image::imageops::resize(
            &img.to_luma8(),
            9,
            8,
            image::imageops::FilterType::Triangle,
        );
        let mut dhash = 0u64;
        for y in 0..8 {
            for x in 0..8 {
                dhash <<= 1;
                if luma.get_pixel(x + 1, y).0[0] > luma.get_pixel(x, y).0[0] {
                    dhash |= 1;
                }
            }
        }
        Ok(Signature { dhash, content })
    }
}

impl Default for DhashScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityScorer for DhashScorer {
    fn score(&self, files: &[PathBuf]) -> Result<Vec<PairScore>> {
        let progress = ProgressBar::new(files.len() as u64);
        let mut signatures = Vec::with_capacity(files.len());
        for path in files {
            signatures.push(self.signature(path)?);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let mut scores = Vec::new();
        for left in 0..signatures.len() {
            for right in (left + 1)..signatures.len() {
                let similarity = if signatures[left].content == signatures[right].content {
                    1.0
                } else {
                    let distance =
                        (signatures[left].dhash ^ signatures[right].dhash).count_ones();
                    1.0 - f64::from(distance) / 64.0
                };
                scores.push(PairScore {
                    left,
                    right,
                    similarity,
                });
            }
        }
        Ok(scores)
    }
}

struct DedupState {
    image_dir: PathBuf,
    threshold: f64,
    duplicates_map: BTreeMap<String, Vec<String>>,
    duplicates: BTreeSet<String>,
}

/// Finds and removes visually similar images in a directory.
pub struct Deduplicator {
    scorer: Box<dyn SimilarityScorer>,
    state: Option<DedupState>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::with_scorer(Box::new(DhashScorer::new()))
    }

    pub fn with_scorer(scorer: Box<dyn SimilarityScorer>) -> Self {
        Self {
            scorer,
            state: None,
        }
    }

    /// Map every image file name in `image_dir` to the names of its
    /// duplicates at `min_similarity_threshold`.
    ///
    /// The map is symmetric and covers every scanned file, with an empty list
    /// for files without duplicates. Results are cached for a following
    /// `delete_duplicates` on the same directory and threshold.
    pub fn find_duplicates(
        &mut self,
        image_dir: &Path,
        min_similarity_threshold: f64,
    ) -> Result<&BTreeMap<String, Vec<String>>> {
        if !(0.0..=1.0).contains(&min_similarity_threshold) {
            return Err(anyhow!(
                "similarity threshold must be in [0, 1], got {min_similarity_threshold}"
            ));
        }
        if !image_dir.is_dir() {
            return Err(anyhow!("directory not found: {}", image_dir.display()));
        }

        let files = list_image_names(image_dir)?;
        let paths: Vec<PathBuf> = files.iter().map(|name| image_dir.join(name)).collect();
        log::info!(
            "scoring {} images in {} for duplicates",
            files.len(),
            image_dir.display()
        );
        let scores = self.scorer.score(&paths)?;

        let mut duplicates_map: BTreeMap<String, Vec<String>> =
            files.iter().map(|name| (name.clone(), Vec::new())).collect();
        for score in scores {
            if score.similarity >= min_similarity_threshold {
                duplicates_map
                    .get_mut(&files[score.left])
                    .unwrap()
                    .push(files[score.right].clone());
                duplicates_map
                    .get_mut(&files[score.right])
                    .unwrap()
                    .push(files[score.left].clone());
            }
        }

        // Flatten the values: every name that appears as someone's duplicate
        // is a removal candidate.
        let duplicates = duplicates_map
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<String>>();

        self.state = Some(DedupState {
            image_dir: image_dir.to_path_buf(),
            threshold: min_similarity_threshold,
            duplicates_map,
            duplicates,
        });
        Ok(&self.state.as_ref().unwrap().duplicates_map)
    }

    /// Delete the duplicate set found at `min_similarity_threshold`.
    ///
    /// Reuses the cached map from a previous `find_duplicates` over the same
    /// directory and threshold, recomputing otherwise. When `labels_dir` is
    /// given, a paired `<stem>.txt` label file is removed alongside each
    /// image. With `dry_run` nothing is deleted and the returned list shows
    /// what would go. After a destructive run the cached state is cleared.
    pub fn delete_duplicates(
        &mut self,
        image_dir: &Path,
        labels_dir: Option<&Path>,
        min_similarity_threshold: f64,
        dry_run: bool,
    ) -> Result<Vec<PathBuf>> {
        let stale = match &self.state {
            Some(state) => {
                state.image_dir != image_dir || state.threshold != min_similarity_threshold
            }
            None => true,
        };
        if stale {
            self.find_duplicates(image_dir, min_similarity_threshold)?;
        }
        let state = self.state.as_ref().unwrap();

        let mut removed = Vec::new();
        for name in &state.duplicates {
            let image_path = image_dir.join(name);
            if !dry_run {
                std::fs::remove_file(&image_path)
                    .map_err(|e| anyhow!("failed to remove {}: {}", image_path.display(), e))?;
            }
            removed.push(image_path);

            if let Some(labels_dir) = labels_dir {
                let label_path = labels_dir.join(Path::new(name).with_extension("txt"));
                if label_path.exists() {
                    if !dry_run {
                        std::fs::remove_file(&label_path).map_err(|e| {
                            anyhow!("failed to remove {}: {}", label_path.display(), e)
                        })?;
                    }
                    removed.push(label_path);
                }
            }
        }

        if !dry_run {
            self.state = None;
        }
        Ok(removed)
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Image file names (not paths) directly under `dir`, sorted.
fn list_image_names(dir: &Path) -> Result<Vec<String>> {
    let validator = ImageValidator::new();
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .map_err(|e| anyhow!("failed to read directory {}: {}", dir.display(), e))?
    {
        let path = entry?.path();
        if path.is_file() && validator.has_recognized_extension(&path) {
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{save_frame, JpegWriter};
    use crate::frame::{ChannelOrder, Frame};

    fn write_jpeg(path: &Path, seed: u8) {
        let mut data = vec![0u8; 32 * 32 * 3];
        for (i, px) in data.iter_mut().enumerate() {
            *px = match seed {
                // Horizontal gradient: a distinctive dhash.
                0 => ((i / 3) % 32 * 8) as u8,
                // Vertical gradient: a very different dhash.
                _ => ((i / 3) / 32 * 8) as u8,
            };
        }
        let frame = Frame::new(data, 32, 32, 3, ChannelOrder::Bgr);
        save_frame(&frame, path, &JpegWriter::new()).expect("write fixture");
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        // a and b are byte-identical, c is visually distinct.
        write_jpeg(&dir.path().join("a.jpg"), 0);
        std::fs::copy(dir.path().join("a.jpg"), dir.path().join("b.jpg")).unwrap();
        write_jpeg(&dir.path().join("c.jpg"), 1);
        dir
    }

    #[test]
    fn find_duplicates_builds_a_symmetric_map() {
        let dir = fixture_dir();
        let mut dedup = Deduplicator::new();
        let map = dedup.find_duplicates(dir.path(), 0.95).expect("dedup");

        assert_eq!(map.len(), 3);
        assert_eq!(map["a.jpg"], vec!["b.jpg".to_string()]);
        assert_eq!(map["b.jpg"], vec!["a.jpg".to_string()]);
        assert!(map["c.jpg"].is_empty());
    }

    #[test]
    fn threshold_zero_marks_everything_a_duplicate() {
        let dir = fixture_dir();
        let mut dedup = Deduplicator::new();
        let map = dedup.find_duplicates(dir.path(), 0.0).expect("dedup");
        assert!(map.values().all(|dups| dups.len() == 2));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let dir = fixture_dir();
        let mut dedup = Deduplicator::new();
        assert!(dedup.find_duplicates(dir.path(), 1.5).is_err());
    }

    #[test]
    fn delete_removes_the_flattened_duplicate_set() {
        let dir = fixture_dir();
        let mut dedup = Deduplicator::new();
        let removed = dedup
            .delete_duplicates(dir.path(), None, 0.95, false)
            .expect("delete");

        // a and b name each other, so both land in the removal set.
        assert_eq!(
            removed,
            vec![dir.path().join("a.jpg"), dir.path().join("b.jpg")]
        );
        assert!(!dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("b.jpg").exists());
        assert!(dir.path().join("c.jpg").exists());
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let dir = fixture_dir();
        let mut dedup = Deduplicator::new();
        let removed = dedup
            .delete_duplicates(dir.path(), None, 0.95, true)
            .expect("delete");
        assert_eq!(removed.len(), 2);
        assert!(dir.path().join("a.jpg").exists());
        assert!(dir.path().join("b.jpg").exists());
    }

    #[test]
    fn paired_label_files_are_removed_with_their_images() {
        let dir = fixture_dir();
        let labels = tempfile::tempdir().expect("tempdir");
        std::fs::write(labels.path().join("a.txt"), b"0 0.5 0.5 1 1").unwrap();

        let mut dedup = Deduplicator::new();
        let removed = dedup
            .delete_duplicates(dir.path(), Some(labels.path()), 0.95, false)
            .expect("delete");

        assert!(removed.contains(&labels.path().join("a.txt")));
        assert!(!labels.path().join("a.txt").exists());
    }

    #[test]
    fn destructive_delete_clears_cached_state() {
        let dir = fixture_dir();
        let mut dedup = Deduplicator::new();
        dedup.find_duplicates(dir.path(), 0.95).expect("dedup");
        dedup
            .delete_duplicates(dir.path(), None, 0.95, false)
            .expect("delete");
        assert!(dedup.state.is_none());
    }

    #[test]
    fn identical_files_score_one() {
        let dir = fixture_dir();
        let scorer = DhashScorer::new();
        let scores = scorer
            .score(&[dir.path().join("a.jpg"), dir.path().join("b.jpg")])
            .expect("score");
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].similarity, 1.0);
    }

    #[test]
    fn distinct_gradients_score_low() {
        let dir = fixture_dir();
        let scorer = DhashScorer::new();
        let scores = scorer
            .score(&[dir.path().join("a.jpg"), dir.path().join("c.jpg")])
            .expect("score");
        assert!(scores[0].similarity < 0.9);
    }
}
