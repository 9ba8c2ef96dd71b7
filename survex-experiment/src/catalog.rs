use std::path::{Path, PathBuf};

use survex_core::VideoStimulus;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{ExperimentConfig, Trial};

/// Ordered, immutable list of trials built once at startup
#[derive(Debug, Clone, Default)]
pub struct VideoCatalog {
    root: PathBuf,
    trials: Vec<Trial>,
}

impl VideoCatalog {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::load(&config.video_dir, &config.video_extensions)
    }

    /// Recursively collects files under `root` whose suffix is in
    /// `extensions`, sorted by path. Unreadable entries are skipped.
    pub fn load(root: &Path, extensions: &[String]) -> Self {
        if !root.is_dir() {
            warn!("Video directory {} not found, catalog is empty", root.display());
            return Self::from_paths(root, Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if has_allowed_suffix(entry.path(), extensions) {
                        paths.push(entry.into_path());
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Error accessing entry: {}", e),
            }
        }

        let catalog = Self::from_paths(root, paths);
        if catalog.is_empty() {
            warn!("No videos found under {}", root.display());
        } else {
            info!("Loaded {} videos from {}", catalog.len(), root.display());
        }
        catalog
    }

    pub fn from_paths(root: &Path, mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        paths.dedup();
        let trials = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                debug!("Video {} -> {}", i + 1, path.display());
                Trial {
                    index: i + 1,
                    stimulus: VideoStimulus::new(root, path),
                }
            })
            .collect();
        Self {
            root: root.to_path_buf(),
            trials,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Looks up a trial by its 1-based index.
    pub fn get(&self, index: usize) -> Option<&Trial> {
        index.checked_sub(1).and_then(|i| self.trials.get(i))
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }
}

fn has_allowed_suffix(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let suffix = format!(".{}", ext.to_string_lossy());
    extensions.iter().any(|e| *e == suffix)
}
