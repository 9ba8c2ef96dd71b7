use serde::Serialize;
use std::path::{Path, PathBuf};

/// Defines stimuli and where their media lives
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    fn source(&self) -> &Path;

    /// Media is checked at presentation time, not at catalog time.
    fn is_available(&self) -> bool {
        self.source().is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoStimulus {
    path: PathBuf,
    relative: String,
}

impl VideoStimulus {
    /// `path` must live under `root`; the relative form uses `/` separators
    /// so it can be used directly as a URL suffix.
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self { path, relative }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn relative_path(&self) -> &str {
        &self.relative
    }
}

impl Stimulus for VideoStimulus {
    fn source(&self) -> &Path {
        &self.path
    }
}
